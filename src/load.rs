use crate::error::Result;
use crate::structs::ReportRecord;
use arrow_array::{Float64Array, Int32Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use csv::Writer;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::{fs::File, path::Path, sync::Arc};

/// Writes the report to a CSV file with a leading row-index column.
///
/// The index header is empty and indices start at zero. Missing polarity is
/// written as an empty field.
///
/// # Arguments
/// * `results` - Report rows in their final order
/// * `output_path` - Path where the CSV file will be created or overwritten
///
/// # Errors
/// Returns error if file cannot be created or written to.
pub fn write_csv(results: &[ReportRecord], output_path: &Path) -> Result<()> {
    let file = File::create(output_path)?;
    let mut writer = Writer::from_writer(file);

    let mut header = vec![""];
    header.extend(ReportRecord::COLUMNS);
    writer.write_record(&header)?;

    for (index, row) in results.iter().enumerate() {
        writer.write_record(&[
            index.to_string(),
            row.app.clone(),
            format_float(row.rating),
            row.reviews.to_string(),
            row.installs.clone(),
            row.sentiment_polarity.map(format_float).unwrap_or_default(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Float cells always carry a fractional part, so 5.0 is written as `5.0`.
fn format_float(value: f64) -> String {
    let text = value.to_string();
    if value.is_finite() && !text.contains('.') {
        format!("{}.0", text)
    } else {
        text
    }
}

/// Writes the report to a pretty-formatted JSON array.
///
/// # Errors
/// Returns error if file cannot be created or serialization fails.
pub fn write_json(results: &[ReportRecord], output_path: &Path) -> Result<()> {
    let file = File::create(output_path)?;
    serde_json::to_writer_pretty(file, results)?;
    Ok(())
}

/// Writes the report to a Parquet file using Arrow format.
///
/// # Errors
/// Returns error if file cannot be created, schema is invalid, or Arrow operations fail.
pub fn write_parquet(results: &[ReportRecord], output_path: &Path) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("App", DataType::Utf8, false),
        Field::new("Rating", DataType::Float64, false),
        Field::new("Reviews", DataType::Int32, false),
        Field::new("Installs", DataType::Utf8, false),
        Field::new("Sentiment_Polarity", DataType::Float64, true),
    ]));

    let apps = StringArray::from_iter_values(results.iter().map(|r| r.app.as_str()));
    let ratings: Float64Array = results.iter().map(|r| r.rating).collect();
    let reviews: Int32Array = results.iter().map(|r| r.reviews).collect();
    let installs = StringArray::from_iter_values(results.iter().map(|r| r.installs.as_str()));
    let polarity: Float64Array = results.iter().map(|r| r.sentiment_polarity).collect();

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(apps),
            Arc::new(ratings),
            Arc::new(reviews),
            Arc::new(installs),
            Arc::new(polarity),
        ],
    )?;

    let file = File::create(output_path)?;
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}
