//! Streaming reader for header-first, comma-delimited source files
//!
//! [`SourceReader::open`] yields a [`RecordStream`], a lazy iterator of
//! `Result<RawRecord, ParseError>`. Malformed lines come out as `Err` items and
//! iteration resumes at the next line; a read failure of the underlying stream
//! is yielded once and then the iterator is exhausted. Lines that are empty
//! after trimming are skipped, before the header and between records.

use crate::config::CompressionMode;
use crate::error::{ImportError, ParseError};
use csv::{ReaderBuilder, StringRecord, Trim};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::sync::Arc;

/// One data line, keyed by the file's header names
#[derive(Debug, Clone)]
pub struct RawRecord {
    headers: Arc<StringRecord>,
    fields: StringRecord,
    line: u64,
}

impl RawRecord {
    /// Value of a field; `None` when the header has no such column
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .position(|header| header == name)
            .and_then(|idx| self.fields.get(idx))
    }

    /// 1-based line number in the source file
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Build a record from name/value pairs
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let headers: StringRecord = pairs.iter().map(|(name, _)| *name).collect();
        let fields: StringRecord = pairs.iter().map(|(_, value)| *value).collect();
        Self {
            headers: Arc::new(headers),
            fields,
            line: 0,
        }
    }
}

pub struct SourceReader;

impl SourceReader {
    /// Open a source file and read its header row
    ///
    /// A missing file is [`ImportError::SourceAbsent`]; one that cannot be
    /// opened, decompressed or that has no header is
    /// [`ImportError::SourceUnreadable`].
    pub fn open(path: &Path, compression: CompressionMode) -> Result<RecordStream, ImportError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ImportError::SourceAbsent(path.to_path_buf()));
            },
            Err(e) => return Err(unreadable(path, e)),
        };

        let input: Box<dyn Read + Send> = if compression.is_gzip(path) {
            Box::new(GzDecoder::new(BufReader::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        Self::from_reader(path, input)
    }

    /// Wrap an already-open byte stream (used for in-memory input)
    pub fn from_reader(
        path: &Path,
        input: Box<dyn Read + Send>,
    ) -> Result<RecordStream, ImportError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(input);

        // Whitespace-only lines trim down to a single empty field
        let mut headers = StringRecord::new();
        loop {
            match reader.read_record(&mut headers) {
                Ok(true) if is_blank(&headers) => continue,
                Ok(true) => break,
                Ok(false) => return Err(unreadable(path, "missing header row")),
                Err(e) => return Err(unreadable(path, e)),
            }
        }

        Ok(RecordStream {
            reader,
            headers: Arc::new(headers),
            finished: false,
        })
    }
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(str::is_empty)
}

fn unreadable(path: &Path, reason: impl std::fmt::Display) -> ImportError {
    ImportError::SourceUnreadable {
        path: path.to_path_buf(),
        message: reason.to_string(),
    }
}

/// Lazy, non-restartable sequence of records from one source file
pub struct RecordStream {
    reader: csv::Reader<Box<dyn Read + Send>>,
    headers: Arc<StringRecord>,
    finished: bool,
}

impl Iterator for RecordStream {
    type Item = Result<RawRecord, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let mut fields = StringRecord::new();
        let read = loop {
            match self.reader.read_record(&mut fields) {
                Ok(true) if is_blank(&fields) => continue,
                read => break read,
            }
        };

        match read {
            Ok(false) => {
                self.finished = true;
                None
            },
            Ok(true) => {
                let line = fields.position().map_or(0, |pos| pos.line());
                if fields.len() != self.headers.len() {
                    return Some(Err(ParseError::FieldCount {
                        line,
                        expected: self.headers.len(),
                        found: fields.len(),
                    }));
                }
                Some(Ok(RawRecord {
                    headers: Arc::clone(&self.headers),
                    fields,
                    line,
                }))
            },
            Err(e) if e.is_io_error() => {
                self.finished = true;
                Some(Err(ParseError::Read {
                    message: e.to_string(),
                }))
            },
            Err(e) => Some(Err(ParseError::Malformed {
                line: e.position().map_or(0, |pos| pos.line()),
                message: e.to_string(),
            })),
        }
    }
}
