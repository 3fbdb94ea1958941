//! Recorded-event readers.
//!
//! An event file holds one decoded bunch crossing per line:
//!
//! ```json
//! {"run": 1, "lumi_section": 4, "telescopes": [{"channel": 5, "planes": [...]}]}
//! ```
//!
//! Blank lines are skipped.

use crate::{Error, Result};
use plttrack_core::Event;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// One bunch crossing with its run bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// Run number.
    pub run: u32,
    /// Lumisection within the run.
    pub lumi_section: u32,
    /// Decoded telescopes.
    #[serde(flatten)]
    pub event: Event,
}

/// Line-by-line reader of a recorded-event stream.
pub struct EventFileReader<R> {
    lines: std::io::Lines<R>,
    line: usize,
    path: Option<PathBuf>,
}

impl EventFileReader<BufReader<File>> {
    /// Opens an event file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        let mut reader = Self::new(BufReader::new(file));
        reader.path = Some(path.as_ref().to_path_buf());
        Ok(reader)
    }
}

impl<R: BufRead> EventFileReader<R> {
    /// Wraps any buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
            path: None,
        }
    }

    /// Path of the underlying file, when opened from one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Lines consumed so far.
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }
}

impl<R: BufRead> Iterator for EventFileReader<R> {
    type Item = Result<RecordedEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let text = match self.lines.next()? {
                Ok(text) => text,
                Err(e) => return Some(Err(e.into())),
            };
            self.line += 1;
            if text.trim().is_empty() {
                continue;
            }
            return Some(
                serde_json::from_str(&text).map_err(|source| Error::Record {
                    line: self.line,
                    source,
                }),
            );
        }
    }
}
