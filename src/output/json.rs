//! JSON record writers and sink selection
//!
//! [`JsonArrayWriter`] produces a single pretty-printed JSON array, and
//! [`JsonLinesWriter`] writes one compact record per line.

use crate::output::delimited::CsvWriter;
use crate::output::traits::{OutputError, OutputResult, RecordSink};
use crate::Record;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes records as one JSON array
pub struct JsonArrayWriter<W: Write> {
    writer: W,
    written: u64,
    finished: bool,
}

impl JsonArrayWriter<BufWriter<File>> {
    /// Creates (or truncates) the file at `path`
    pub fn create(path: &Path) -> OutputResult<Self> {
        Self::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write> JsonArrayWriter<W> {
    pub fn new(mut writer: W) -> OutputResult<Self> {
        writer.write_all(b"[")?;
        Ok(Self {
            writer,
            written: 0,
            finished: false,
        })
    }

    /// Finishes the array and returns the underlying writer
    pub fn into_inner(mut self) -> OutputResult<W> {
        self.finish()?;
        Ok(self.writer)
    }
}

impl<W: Write> RecordSink for JsonArrayWriter<W> {
    fn write_record(&mut self, record: &Record) -> OutputResult<()> {
        if self.finished {
            return Err(OutputError::Write("array already closed".to_string()));
        }
        let separator: &[u8] = if self.written == 0 { b"\n  " } else { b",\n  " };
        self.writer.write_all(separator)?;
        serde_json::to_writer(&mut self.writer, record)?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        if self.written > 0 {
            self.writer.write_all(b"\n")?;
        }
        self.writer.write_all(b"]\n")?;
        self.writer.flush()?;
        self.finished = true;
        Ok(())
    }

    fn written(&self) -> u64 {
        self.written
    }
}

/// Writes records as JSON lines
pub struct JsonLinesWriter<W: Write> {
    writer: W,
    written: u64,
}

impl JsonLinesWriter<BufWriter<File>> {
    pub fn create(path: &Path) -> OutputResult<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn into_inner(mut self) -> OutputResult<W> {
        self.finish()?;
        Ok(self.writer)
    }
}

impl<W: Write> RecordSink for JsonLinesWriter<W> {
    fn write_record(&mut self, record: &Record) -> OutputResult<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
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

/// Opens a sink for `path` by extension: `.jsonl` for JSON lines, `.csv` for
/// CSV, anything else for a JSON array
pub fn open_sink(path: &Path) -> OutputResult<Box<dyn RecordSink>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("jsonl") => Ok(Box::new(JsonLinesWriter::create(path)?)),
        Some("csv") => Ok(Box::new(CsvWriter::create(path)?)),
        _ => Ok(Box::new(JsonArrayWriter::create(path)?)),
    }
}
