use crate::error::Result;
use crate::structs::ReportRecord;
use log::{debug, info, warn};
use rusqlite::{params, types::Value, Connection};
use std::path::Path;

/// A relational store the report can be written to and read back from.
pub trait RelationalStore {
    /// Replaces `table_name` with a fresh table holding `rows`.
    fn replace_table(&mut self, table_name: &str, rows: &[ReportRecord]) -> Result<()>;

    /// Reads every row of `table_name`.
    fn read_table(&self, table_name: &str) -> Result<LoadedTable>;
}

/// A table as read back from a store.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl LoadedTable {
    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }
}

/// Result of the post-load shape check. A mismatch is reported, not raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Validated,
    ShapeMismatch {
        written: (usize, usize),
        loaded: (usize, usize),
    },
}

/// SQLite-backed store. The connection closes when the store is dropped.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens the database at `path`, creating it if absent.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        debug!("Opened SQLite store {}", path.display());
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl RelationalStore for SqliteStore {
    fn replace_table(&mut self, table_name: &str, rows: &[ReportRecord]) -> Result<()> {
        let table = quote_identifier(table_name);
        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table};
             CREATE TABLE {table} (
                \"App\" TEXT,
                \"Rating\" REAL,
                \"Reviews\" INTEGER,
                \"Installs\" TEXT,
                \"Sentiment_Polarity\" REAL
             );"
        ))?;
        {
            let mut stmt = tx.prepare(&format!("INSERT INTO {table} VALUES (?1, ?2, ?3, ?4, ?5)"))?;
            for row in rows {
                stmt.execute(params![
                    row.app,
                    row.rating,
                    row.reviews,
                    row.installs,
                    row.sentiment_polarity,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn read_table(&self, table_name: &str) -> Result<LoadedTable> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {}", quote_identifier(table_name)))?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(LoadedTable { columns, rows })
    }
}

/// Writes the report into `table_name` of the SQLite store `store_name`,
/// replacing any existing table, then validates the round trip.
///
/// The connection is held only for the duration of this call.
///
/// # Errors
/// Returns `PipelineError::Sqlite` if the store cannot be opened, written or
/// read. A shape mismatch is not an error; see [`LoadOutcome`].
pub fn load(rows: &[ReportRecord], store_name: &Path, table_name: &str) -> Result<LoadOutcome> {
    let mut store = SqliteStore::open(store_name)?;
    load_into(&mut store, rows, table_name)
}

/// Replace, read back and compare (rows, columns) against what was written.
pub fn load_into<S: RelationalStore>(
    store: &mut S,
    rows: &[ReportRecord],
    table_name: &str,
) -> Result<LoadOutcome> {
    store.replace_table(table_name, rows)?;
    info!("Report has been loaded into table {}", table_name);

    let loaded = store.read_table(table_name)?;
    info!("Table {} has been read back for validation", table_name);

    let written = (rows.len(), ReportRecord::COLUMNS.len());
    let loaded = loaded.shape();
    if written == loaded {
        info!(
            "Success! The data in the {} table has been loaded and validated",
            table_name
        );
        Ok(LoadOutcome::Validated)
    } else {
        warn!(
            "Shape of table {} is not consistent before and after loading: wrote {:?}, read back {:?}",
            table_name, written, loaded
        );
        Ok(LoadOutcome::ShapeMismatch { written, loaded })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(app: &str, polarity: Option<f64>) -> ReportRecord {
        ReportRecord {
            app: app.to_string(),
            rating: 4.5,
            reviews: 1500,
            installs: "10,000+".to_string(),
            sentiment_polarity: polarity,
        }
    }

    /// Drops the last row on read to force a shape mismatch.
    struct TruncatingStore(SqliteStore);

    impl RelationalStore for TruncatingStore {
        fn replace_table(&mut self, table_name: &str, rows: &[ReportRecord]) -> Result<()> {
            self.0.replace_table(table_name, rows)
        }

        fn read_table(&self, table_name: &str) -> Result<LoadedTable> {
            let mut table = self.0.read_table(table_name)?;
            table.rows.pop();
            Ok(table)
        }
    }

    #[test]
    fn round_trip_validates() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let rows = vec![row("A", Some(0.4)), row("B", None)];

        let outcome = load_into(&mut store, &rows, "top_apps").unwrap();
        assert_eq!(outcome, LoadOutcome::Validated);

        let loaded = store.read_table("top_apps").unwrap();
        assert_eq!(loaded.columns, ReportRecord::COLUMNS);
        assert_eq!(loaded.rows[0][0], Value::Text("A".to_string()));
        assert_eq!(loaded.rows[0][2], Value::Integer(1500));
        assert_eq!(loaded.rows[0][4], Value::Real(0.4));
        assert_eq!(loaded.rows[1][4], Value::Null);
    }

    #[test]
    fn load_replaces_existing_table() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        load_into(&mut store, &[row("A", None), row("B", None)], "top_apps").unwrap();
        load_into(&mut store, &[row("C", None)], "top_apps").unwrap();

        let loaded = store.read_table("top_apps").unwrap();
        assert_eq!(loaded.shape(), (1, 5));
        assert_eq!(loaded.rows[0][0], Value::Text("C".to_string()));
    }

    #[test]
    fn shape_mismatch_is_reported_not_raised() {
        let mut store = TruncatingStore(SqliteStore::open_in_memory().unwrap());
        let rows = vec![row("A", Some(0.1)), row("B", Some(0.2))];

        let outcome = load_into(&mut store, &rows, "top_apps").unwrap();
        assert_eq!(
            outcome,
            LoadOutcome::ShapeMismatch {
                written: (2, 5),
                loaded: (1, 5),
            }
        );
    }

    #[test]
    fn load_creates_store_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("market_research");

        let outcome = load(&[row("A", None)], &path, "top_apps").unwrap();
        assert_eq!(outcome, LoadOutcome::Validated);
        assert!(path.exists());

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.read_table("top_apps").unwrap().shape(), (1, 5));
    }

    #[test]
    fn table_names_are_quoted() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let outcome = load_into(&mut store, &[row("A", None)], "top \"apps\"").unwrap();
        assert_eq!(outcome, LoadOutcome::Validated);
    }
}
