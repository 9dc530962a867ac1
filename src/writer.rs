use crate::config::{CsvDialect, Quoting};
use crate::error::{Error, Result};
use crate::sensor::{SensorSnapshot, TIMESTAMP_COLUMN};
use chrono::NaiveDateTime;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

fn quote_style(quoting: Quoting) -> csv::QuoteStyle {
    match quoting {
        Quoting::Minimal => csv::QuoteStyle::Necessary,
        Quoting::All => csv::QuoteStyle::Always,
        Quoting::NonNumeric => csv::QuoteStyle::NonNumeric,
        Quoting::Never => csv::QuoteStyle::Never,
    }
}

/// Rows end in `\r\n`, matching files written by Python's `csv` module.
fn writer_for(file: fs::File, dialect: &CsvDialect) -> csv::Writer<fs::File> {
    csv::WriterBuilder::new()
        .delimiter(dialect.delimiter)
        .quote(dialect.quote)
        .quote_style(quote_style(dialect.quoting))
        .terminator(csv::Terminator::CRLF)
        .has_headers(false)
        .from_writer(file)
}

/// Header row of an existing output file. An empty file has no columns.
pub fn read_columns(path: &Path, dialect: &CsvDialect) -> Result<Vec<String>> {
    let file = fs::File::open(path).map_err(|err| {
        tracing::error!(path = %path.display(), error = %err, "failed to open output file");
        Error::io(path, err)
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(dialect.delimiter)
        .quote(dialect.quote)
        .has_headers(true)
        .flexible(true)
        .from_reader(file);
    let headers = reader.headers().map_err(|err| {
        tracing::error!(path = %path.display(), error = %err, "failed to read output header");
        Error::csv(path, err)
    })?;
    Ok(headers.iter().map(str::to_string).collect())
}

/// One data row aligned to `columns`.
///
/// Sensors without an OK state leave their column empty. Repeated column
/// names all receive the same value.
pub fn build_row(columns: &[String], snapshot: &SensorSnapshot, now: NaiveDateTime) -> Vec<String> {
    let values = snapshot.ok_values();
    let timestamp = now.format(TIMESTAMP_FORMAT).to_string();
    columns
        .iter()
        .map(|column| {
            if column == TIMESTAMP_COLUMN {
                timestamp.clone()
            } else {
                values
                    .get(column.as_str())
                    .map(|value| format_value(*value))
                    .unwrap_or_default()
            }
        })
        .collect()
}

/// Always keeps a fractional digit: `20.0`, `21.5`.
fn format_value(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Creates `path`, writes the header and one data row.
///
/// Refuses to touch a file that already exists.
pub fn initialize(
    path: &Path,
    columns: &[String],
    snapshot: &SensorSnapshot,
    dialect: &CsvDialect,
    now: NaiveDateTime,
) -> Result<()> {
    let file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|err| {
            tracing::error!(path = %path.display(), error = %err, "failed to create output file");
            if err.kind() == ErrorKind::AlreadyExists {
                Error::FileConflict {
                    path: path.to_path_buf(),
                }
            } else {
                Error::io(path, err)
            }
        })?;

    let mut writer = writer_for(file, dialect);
    write_rows(&mut writer, path, [columns.to_vec(), build_row(columns, snapshot, now)])
}

/// Appends one data row to an existing file, in the file's column order.
pub fn append(
    path: &Path,
    columns: &[String],
    snapshot: &SensorSnapshot,
    dialect: &CsvDialect,
    now: NaiveDateTime,
) -> Result<()> {
    let file = fs::OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|err| {
            tracing::error!(path = %path.display(), error = %err, "failed to open output file for append");
            Error::io(path, err)
        })?;

    let mut writer = writer_for(file, dialect);
    write_rows(&mut writer, path, [build_row(columns, snapshot, now)])
}

fn write_rows<I>(writer: &mut csv::Writer<fs::File>, path: &Path, rows: I) -> Result<()>
where
    I: IntoIterator<Item = Vec<String>>,
{
    for row in rows {
        writer.write_record(&row).map_err(|err| {
            tracing::error!(path = %path.display(), error = %err, "failed to write csv row");
            Error::csv(path, err)
        })?;
    }
    writer.flush().map_err(|err| {
        tracing::error!(path = %path.display(), error = %err, "failed to flush output file");
        Error::io(path, err)
    })
}
