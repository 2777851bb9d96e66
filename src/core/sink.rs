//! Append-only record sinks.

use chrono::NaiveDate;
use log::{debug, info};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Suffixes tried, in order, when naming a day's record file.
const FILE_LETTERS: [char; 9] = ['a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i'];

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("record i/o: {0}")]
    Io(#[from] io::Error),
    #[error("all default file names for the day are taken in {}", dir.display())]
    NamesExhausted { dir: PathBuf },
}

/// Somewhere records go. One call appends exactly one record.
pub trait RecordSink {
    fn append(&mut self, fields: &[String]) -> Result<(), SinkError>;
}

/// Comma-delimited text file opened in append mode.
///
/// The header row is written only when the file is empty, so reopening an
/// existing file continues it.
#[derive(Debug)]
pub struct CsvSink<W: Write = File> {
    writer: W,
}

impl CsvSink<File> {
    pub fn create(path: impl AsRef<Path>, header: &[&str]) -> Result<CsvSink<File>, SinkError> {
        let path = path.as_ref();
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        let mut sink = CsvSink { writer: file };
        if sink.writer.metadata()?.len() == 0 {
            debug!("New record file {}, writing header", path.display());
            sink.write_line(header)?;
        }

        Ok(sink)
    }
}

impl<W: Write> CsvSink<W> {
    /// Wraps an arbitrary writer, writing `header` immediately.
    pub fn from_writer(writer: W, header: &[&str]) -> Result<CsvSink<W>, SinkError> {
        let mut sink = CsvSink { writer };
        sink.write_line(header)?;
        Ok(sink)
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line<S: AsRef<str>>(&mut self, fields: &[S]) -> Result<(), SinkError> {
        let mut line = fields
            .iter()
            .map(|f| escape(f.as_ref()))
            .collect::<Vec<_>>()
            .join(",");
        line.push('\n');

        // Whole line in a single write so a failure never leaves half a row.
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> RecordSink for CsvSink<W> {
    fn append(&mut self, fields: &[String]) -> Result<(), SinkError> {
        self.write_line(fields)
    }
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<Vec<String>>,
}

impl RecordSink for MemorySink {
    fn append(&mut self, fields: &[String]) -> Result<(), SinkError> {
        self.records.push(fields.to_vec());
        Ok(())
    }
}

/// Discards records; the idle (no logging) mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl RecordSink for NullSink {
    fn append(&mut self, _fields: &[String]) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: RecordSink + ?Sized> RecordSink for &mut S {
    fn append(&mut self, fields: &[String]) -> Result<(), SinkError> {
        (**self).append(fields)
    }
}

/// Picks the first free `MM-DD-YY{a..i}.csv` in `dir`, creating `dir` if needed.
pub fn next_data_file(dir: impl AsRef<Path>, date: NaiveDate) -> Result<PathBuf, SinkError> {
    let dir = dir.as_ref();
    if !dir.exists() {
        fs::create_dir_all(dir)?;
        info!("New data directory {}", dir.display());
    }

    let stem = date.format("%m-%d-%y").to_string();
    FILE_LETTERS
        .iter()
        .map(|letter| dir.join(format!("{stem}{letter}.csv")))
        .find(|candidate| !candidate.exists())
        .ok_or_else(|| SinkError::NamesExhausted {
            dir: dir.to_path_buf(),
        })
}
