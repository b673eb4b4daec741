use clap::Parser;
use lib::{
    PipelineError, ReportRecord, SimpleLogger, TransformConfig, apps_from_table,
    describe, extract_file, load, reviews_from_table, transform, write_json, write_parquet,
};
use log::{debug, info};
use std::path::PathBuf;
use std::time::Instant;

static LOGGER: SimpleLogger = SimpleLogger;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Apps CSV file (App, Category, Rating, Reviews, Installs, ...)
    #[arg(long, default_value = "apps_data.csv")]
    apps: PathBuf,

    /// Reviews CSV file (App, Sentiment_Polarity, ...)
    #[arg(long, default_value = "review_data.csv")]
    reviews: PathBuf,

    /// Only apps in this category (exact, case-sensitive) are considered
    #[arg(short, long, default_value = "FOOD_AND_DRINK")]
    category: String,

    /// Keep apps rated strictly above this value
    #[arg(long, default_value_t = 4.0)]
    min_rating: f64,

    /// Keep apps with strictly more reviews than this value
    #[arg(long, default_value_t = 1000.0)]
    min_reviews: f64,

    /// CSV snapshot of the report, overwritten on every run
    #[arg(long, default_value = "top_apps.csv")]
    snapshot: PathBuf,

    /// SQLite database the report is loaded into
    #[arg(long, default_value = "market_research")]
    database: PathBuf,

    /// Table the report replaces in the database
    #[arg(long, default_value = "top_apps")]
    table: String,

    /// Stop after the transform stage
    #[arg(long, default_value_t = false)]
    skip_load: bool,

    /// Also export the report as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Also export the report as Parquet
    #[arg(long)]
    parquet: Option<PathBuf>,

    /// Log level for output
    #[arg(long, default_value = "false")]
    debug: bool,
}

fn main() -> Result<(), PipelineError> {
    let total_start = Instant::now();
    log::set_logger(&LOGGER).unwrap();

    let args = Args::parse();
    if args.debug {
        log::set_max_level(log::LevelFilter::Debug);
    } else {
        log::set_max_level(log::LevelFilter::Info);
    }
    debug!("{:?}", args);

    // Extract
    let apps_table = extract_file(&args.apps)?;
    describe(&apps_table);
    let reviews_table = extract_file(&args.reviews)?;
    describe(&reviews_table);

    let apps = apps_from_table(&apps_table)?;
    let reviews = reviews_from_table(&reviews_table)?;

    // Transform
    let config = TransformConfig {
        category: args.category,
        min_rating: args.min_rating,
        min_reviews: args.min_reviews,
        snapshot_path: args.snapshot,
    };
    let transform_start = Instant::now();
    let top_apps = transform(&apps, &reviews, &config)?;
    debug!("Transform took {:.2?}", transform_start.elapsed());

    if let Some(path) = &args.json {
        write_json(&top_apps, path)?;
        info!("Wrote JSON export to {}", path.display());
    }
    if let Some(path) = &args.parquet {
        write_parquet(&top_apps, path)?;
        info!("Wrote Parquet export to {}", path.display());
    }

    // Load
    if args.skip_load {
        info!("Skipping load stage");
    } else {
        let outcome = load(&top_apps, &args.database, &args.table)?;
        debug!("Load outcome: {:?}", outcome);
    }

    print_report(&top_apps);
    info!("Pipeline completed in {:.2?}", total_start.elapsed());
    Ok(())
}

fn print_report(rows: &[ReportRecord]) {
    println!(
        "\n{:>5}  {:<40} {:>6} {:>10} {:>16} {:>18}",
        "", "App", "Rating", "Reviews", "Installs", "Sentiment_Polarity"
    );
    for (index, row) in rows.iter().enumerate() {
        let polarity = row
            .sentiment_polarity
            .map(|value| format!("{:.6}", value))
            .unwrap_or_else(|| "NaN".to_string());
        println!(
            "{:>5}  {:<40} {:>6.1} {:>10} {:>16} {:>18}",
            index, row.app, row.rating, row.reviews, row.installs, polarity
        );
    }
    println!("\n[{} rows x {} columns]", rows.len(), ReportRecord::COLUMNS.len());
}
