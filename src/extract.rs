use crate::error::{PipelineError, Result};
use crate::structs::{AppRecord, ReviewRecord};
use arrow_schema::{DataType, Field, Schema};
use log::info;
use std::{
    fmt,
    fs::File,
    path::{Path, PathBuf},
};

/// Cell values read as missing in numeric columns.
const NULL_TOKENS: &[&str] = &[
    "", "NaN", "nan", "-NaN", "-nan", "NA", "N/A", "n/a", "#N/A", "<NA>", "NULL", "null", "None",
];

/// An in-memory rectangular table read from a delimited file.
///
/// Cells are kept as raw text; typing happens in [`Table::schema`] for
/// diagnostics and in [`apps_from_table`] / [`reviews_from_table`] for the
/// pipeline itself.
#[derive(Debug, Clone)]
pub struct Table {
    pub source: PathBuf,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Row count, column count and inferred column types of a [`Table`].
#[derive(Debug, Clone)]
pub struct TableSummary {
    pub source: PathBuf,
    pub rows: usize,
    pub columns: usize,
    pub fields: Vec<(String, DataType)>,
}

impl fmt::Display for TableSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} has {} rows and {} columns",
            self.source.display(),
            self.rows,
            self.columns
        )?;
        write!(f, "Column types:")?;
        for (name, data_type) in &self.fields {
            write!(f, "\n  {:<24} {}", name, data_type)?;
        }
        Ok(())
    }
}

/// Returns true when `cell` is one of the recognised missing-value tokens.
pub fn is_null(cell: &str) -> bool {
    NULL_TOKENS.contains(&cell)
}

impl Table {
    /// Builds a table from already-split rows, rejecting ragged input.
    pub fn new(
        source: impl Into<PathBuf>,
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    ) -> Result<Self> {
        let source = source.into();
        if headers.is_empty() {
            return Err(PipelineError::SourceRead {
                path: source,
                reason: "missing header row".to_string(),
            });
        }
        if let Some(idx) = rows.iter().position(|row| row.len() != headers.len()) {
            return Err(PipelineError::SourceRead {
                path: source,
                reason: format!(
                    "row {} has {} fields, expected {}",
                    idx + 1,
                    rows[idx].len(),
                    headers.len()
                ),
            });
        }
        Ok(Self {
            source,
            headers,
            rows,
        })
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.headers.len())
    }

    /// Position of a named column, or a schema error naming the source.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| {
                PipelineError::schema(
                    self.source.display().to_string(),
                    format!("missing column '{}'", name),
                )
            })
    }

    /// Infers the scalar type of a column: Int64 if every present value is an
    /// integer, Float64 if every present value is numeric, Utf8 otherwise.
    /// A column with no present values is Float64.
    pub fn infer_column_type(&self, column: usize) -> DataType {
        let mut data_type = DataType::Float64;
        let mut seen = false;
        for cell in self.rows.iter().map(|row| row[column].as_str()) {
            if is_null(cell) {
                continue;
            }
            if !seen {
                seen = true;
                data_type = DataType::Int64;
            }
            if data_type == DataType::Int64 && cell.parse::<i64>().is_ok() {
                continue;
            }
            if cell.parse::<f64>().is_ok() {
                data_type = DataType::Float64;
                continue;
            }
            return DataType::Utf8;
        }
        data_type
    }

    /// Arrow schema of the table with inferred column types.
    pub fn schema(&self) -> Schema {
        let fields: Vec<Field> = self
            .headers
            .iter()
            .enumerate()
            .map(|(column, name)| {
                let nullable = self.rows.iter().any(|row| is_null(&row[column]));
                Field::new(name, self.infer_column_type(column), nullable)
            })
            .collect();
        Schema::new(fields)
    }

    pub fn summary(&self) -> TableSummary {
        let (rows, columns) = self.shape();
        TableSummary {
            source: self.source.clone(),
            rows,
            columns,
            fields: self
                .schema()
                .fields()
                .iter()
                .map(|field| (field.name().clone(), field.data_type().clone()))
                .collect(),
        }
    }
}

/// Reads a delimited file with a header row into a [`Table`].
///
/// # Errors
/// Returns `PipelineError::SourceRead` if the file cannot be opened, has no
/// header row, or contains rows whose field count differs from the header.
pub fn extract_file(path: &Path) -> Result<Table> {
    let source_error = |reason: String| PipelineError::SourceRead {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|e| source_error(e.to_string()))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| source_error(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| source_error(e.to_string()))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Table::new(path, headers, rows)
}

/// Emits the summary of a freshly extracted table.
pub fn describe(table: &Table) {
    for line in table.summary().to_string().lines() {
        info!("{}", line);
    }
}

/// Converts the apps table into typed records.
///
/// Requires the columns App, Category, Rating, Reviews and Installs; any other
/// column is ignored. Reviews stays as cell text here and is only parsed for
/// apps that survive the category filter.
pub fn apps_from_table(table: &Table) -> Result<Vec<AppRecord>> {
    let app = table.column_index("App")?;
    let category = table.column_index("Category")?;
    let rating = table.column_index("Rating")?;
    let reviews = table.column_index("Reviews")?;
    let installs = table.column_index("Installs")?;

    table
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            Ok(AppRecord {
                app: row[app].clone(),
                category: row[category].clone(),
                rating: parse_optional_f64(table, "Rating", idx, &row[rating])?,
                reviews: row[reviews].clone(),
                installs: row[installs].clone(),
            })
        })
        .collect()
}

/// Converts the reviews table into typed records, keeping every other column
/// in `extra` for full-row duplicate detection.
pub fn reviews_from_table(table: &Table) -> Result<Vec<ReviewRecord>> {
    let app = table.column_index("App")?;
    let polarity = table.column_index("Sentiment_Polarity")?;

    table
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let extra = row
                .iter()
                .enumerate()
                .filter(|(column, _)| *column != app && *column != polarity)
                .map(|(_, cell)| cell.clone())
                .collect();
            Ok(ReviewRecord {
                app: row[app].clone(),
                sentiment_polarity: parse_optional_f64(
                    table,
                    "Sentiment_Polarity",
                    idx,
                    &row[polarity],
                )?,
                extra,
            })
        })
        .collect()
}

fn parse_optional_f64(table: &Table, column: &str, idx: usize, cell: &str) -> Result<Option<f64>> {
    if is_null(cell) {
        return Ok(None);
    }
    match cell.trim().parse::<f64>() {
        Ok(value) if value.is_nan() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(_) => Err(non_numeric(table, column, idx, cell)),
    }
}

fn non_numeric(table: &Table, column: &str, idx: usize, cell: &str) -> PipelineError {
    PipelineError::schema(
        table.source.display().to_string(),
        format!(
            "non-numeric value '{}' in column '{}' at row {}",
            cell,
            column,
            idx + 1
        ),
    )
}
