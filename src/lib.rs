pub mod error;
pub mod extract;
pub mod load;
pub mod sink;
pub mod structs;
pub mod transform;

// Re-export public API
pub use error::{PipelineError, Result};
pub use extract::{Table, TableSummary, apps_from_table, describe, extract_file, reviews_from_table};
pub use load::{write_csv, write_json, write_parquet};
pub use sink::{LoadOutcome, LoadedTable, RelationalStore, SqliteStore, load, load_into};
pub use structs::{AppRecord, ReportRecord, ReviewRecord, SimpleLogger, TransformConfig};
pub use transform::{transform, transform_records};
