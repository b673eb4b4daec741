use log::{Log, Metadata, Record as LogRecord};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Simple logger implementation
pub struct SimpleLogger;

impl Log for SimpleLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &LogRecord) {
        println!(
            "{} [{}] {}",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            record.level(),
            record.args()
        );
    }

    fn flush(&self) {}
}

/// One application row from the apps file
#[derive(Debug, Clone, PartialEq)]
pub struct AppRecord {
    pub app: String,
    pub category: String,
    pub rating: Option<f64>,
    /// Raw cell text. Parsed and narrowed to i32 only for apps in the
    /// selected category.
    pub reviews: String,
    pub installs: String,
}

/// One review row from the reviews file.
///
/// `extra` holds the remaining cells of the source row in column order so that
/// duplicate detection compares the full row, not just the projected fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRecord {
    pub app: String,
    pub sentiment_polarity: Option<f64>,
    pub extra: Vec<String>,
}

impl ReviewRecord {
    pub fn new(app: impl Into<String>, sentiment_polarity: Option<f64>) -> Self {
        Self {
            app: app.into(),
            sentiment_polarity,
            extra: Vec::new(),
        }
    }
}

/// Top applications report row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    #[serde(rename = "App")]
    pub app: String,
    #[serde(rename = "Rating")]
    pub rating: f64,
    #[serde(rename = "Reviews")]
    pub reviews: i32,
    #[serde(rename = "Installs")]
    pub installs: String,
    #[serde(rename = "Sentiment_Polarity")]
    pub sentiment_polarity: Option<f64>,
}

impl ReportRecord {
    /// Column names of the report, in output order.
    pub const COLUMNS: [&'static str; 5] =
        ["App", "Rating", "Reviews", "Installs", "Sentiment_Polarity"];
}

/// Configuration for the transform stage
#[derive(Debug, Clone)]
pub struct TransformConfig {
    pub category: String,
    /// Exclusive lower bound on Rating
    pub min_rating: f64,
    /// Exclusive lower bound on Reviews
    pub min_reviews: f64,
    /// Where the CSV snapshot of the report is written on every run
    pub snapshot_path: PathBuf,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            category: "FOOD_AND_DRINK".to_string(),
            min_rating: 4.0,
            min_reviews: 1000.0,
            snapshot_path: PathBuf::from("top_apps.csv"),
        }
    }
}
