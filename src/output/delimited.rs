//! CSV record writer
//!
//! Columns are fixed by the keys of the first record. Later records fill
//! those columns by name; missing fields are left empty and extra fields
//! are dropped.

use crate::output::traits::{OutputError, OutputResult, RecordSink};
use crate::Record;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes object records as CSV rows under a header line
pub struct CsvWriter<W: Write> {
    writer: csv::Writer<W>,
    columns: Option<Vec<String>>,
    written: u64,
}

impl CsvWriter<BufWriter<File>> {
    /// Creates (or truncates) the file at `path`
    pub fn create(path: &Path) -> OutputResult<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> CsvWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
            columns: None,
            written: 0,
        }
    }

    /// Flushes pending rows and returns the underlying writer
    pub fn into_inner(mut self) -> OutputResult<W> {
        self.finish()?;
        self.writer
            .into_inner()
            .map_err(|e| OutputError::Write(e.to_string()))
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn as_object(record: &Record) -> OutputResult<&Map<String, Value>> {
    record
        .as_object()
        .ok_or_else(|| OutputError::Format(format!("CSV rows must be objects, got {}", record)))
}

impl<W: Write> RecordSink for CsvWriter<W> {
    fn write_record(&mut self, record: &Record) -> OutputResult<()> {
        let fields = as_object(record)?;

        if self.columns.is_none() {
            let header: Vec<String> = fields.keys().cloned().collect();
            self.writer.write_record(&header)?;
            self.columns = Some(header);
        }

        let columns = self.columns.as_deref().unwrap_or_default();
        let row: Vec<String> = columns.iter().map(|c| cell(fields.get(c))).collect();
        self.writer.write_record(&row)?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn written(&self) -> u64 {
        self.written
    }
}
