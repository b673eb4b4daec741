use arrow_schema::ArrowError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Source Read Error ({}): {reason}", .path.display())]
    SourceRead { path: PathBuf, reason: String },
    #[error("Schema Error ({table}): {reason}")]
    Schema { table: String, reason: String },
    #[error("Narrowing Overflow: Reviews value {value} for app '{app}' does not fit in i32")]
    NarrowingOverflow { app: String, value: i64 },
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parquet Error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("Arrow Error: {0}")]
    Arrow(#[from] ArrowError),
    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite Error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl PipelineError {
    pub(crate) fn schema(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            table: table.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
