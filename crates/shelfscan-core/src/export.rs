//! Flat CSV export of inventory results.
//!
//! One file per analysis, named by capture time. Text fields never get
//! quoted: embedded delimiters are substituted so that every row splits into
//! exactly five fields with a naive `split(',')`.

use crate::types::{InventoryItem, InventoryResult};
use chrono::{DateTime, SecondsFormat, Utc};
use std::borrow::Cow;
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Fixed header row.
pub const CSV_HEADER: &str = "label,brand,estimated_quantity,position,confidence";

/// Replacement for a comma inside a text field.
const DELIMITER_SUBSTITUTE: char = ';';

/// Substitute characters that would break the row structure.
///
/// Commas become semicolons; CR and LF become spaces.
pub fn escape_field(value: &str) -> Cow<'_, str> {
    if !value.contains([',', '\n', '\r']) {
        return Cow::Borrowed(value);
    }
    Cow::Owned(
        value
            .chars()
            .map(|c| match c {
                ',' => DELIMITER_SUBSTITUTE,
                '\n' | '\r' => ' ',
                other => other,
            })
            .collect(),
    )
}

/// A writer that serializes inventory items as CSV rows.
pub struct CsvWriter<W: Write> {
    writer: W,
    rows_written: usize,
}

impl<W: Write> CsvWriter<W> {
    /// Create a writer and emit the header row.
    pub fn new(mut writer: W) -> io::Result<Self> {
        writeln!(writer, "{CSV_HEADER}")?;
        Ok(Self {
            writer,
            rows_written: 0,
        })
    }

    /// Write a single item as one row.
    pub fn write(&mut self, item: &InventoryItem) -> io::Result<()> {
        writeln!(
            self.writer,
            "{},{},{},{},{}",
            escape_field(&item.label),
            escape_field(&item.brand),
            item.estimated_quantity,
            escape_field(item.position.as_deref().unwrap_or("")),
            item.confidence
        )?;
        self.rows_written += 1;
        Ok(())
    }

    /// Write every item of a result, in order.
    pub fn write_all(&mut self, result: &InventoryResult) -> io::Result<()> {
        for item in result.iter() {
            self.write(item)?;
        }
        Ok(())
    }

    /// Get the number of data rows written.
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Render a result to a CSV string (header included).
pub fn render(result: &InventoryResult) -> String {
    let mut buffer = Vec::new();
    // Writing into a Vec cannot fail
    if let Ok(mut writer) = CsvWriter::new(&mut buffer) {
        let _ = writer.write_all(result);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// File name for an export captured at `captured_at`.
///
/// RFC 3339 with milliseconds, with `:` and `.` replaced so the name is valid
/// on every filesystem.
pub fn export_file_name(captured_at: DateTime<Utc>) -> String {
    let stamp = captured_at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("inventory_{stamp}.csv")
}

/// Writes one CSV file per exported result into a directory.
#[derive(Debug, Clone)]
pub struct CsvExporter {
    dir: PathBuf,
}

impl CsvExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `result` to a new timestamped file and return its path.
    ///
    /// Never overwrites: an existing file with the same name is an error.
    pub fn export(&self, result: &InventoryResult, captured_at: DateTime<Utc>) -> io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(export_file_name(captured_at));

        let file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        let mut writer = CsvWriter::new(BufWriter::new(file))?;
        writer.write_all(result)?;
        let rows = writer.rows_written();
        writer.into_inner()?;

        tracing::info!(path = %path.display(), rows, "Exported inventory CSV");
        Ok(path)
    }
}
