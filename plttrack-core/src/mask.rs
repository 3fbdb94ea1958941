//! Online pixel mask.

use crate::error::{Error, Result};
use crate::{Channel, PixelCoord};
use std::collections::HashSet;
use std::path::Path;

/// Set of pixels excluded from measurement.
///
/// Text format: one pixel per line, `channel plane column row`, whitespace
/// separated. Blank lines and lines starting with `#` are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PixelMask {
    masked: HashSet<(Channel, usize, PixelCoord)>,
}

impl PixelMask {
    /// Creates an empty mask.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Masks one pixel.
    pub fn insert(&mut self, channel: Channel, plane: usize, pixel: PixelCoord) {
        self.masked.insert((channel, plane, pixel));
    }

    /// Whether the pixel is masked.
    #[must_use]
    pub fn contains(&self, channel: Channel, plane: usize, pixel: PixelCoord) -> bool {
        self.masked.contains(&(channel, plane, pixel))
    }

    /// Number of masked pixels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.masked.len()
    }

    /// Returns true if no pixel is masked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.masked.is_empty()
    }

    /// Parses the text format.
    ///
    /// # Errors
    /// Returns `PixelMask` for the first malformed line.
    pub fn parse(text: &str) -> Result<Self> {
        let mut mask = Self::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let err = |message: String| Error::PixelMask {
                line: index + 1,
                message,
            };
            let fields: Vec<&str> = line.split_whitespace().collect();
            let [channel, plane, column, row] = fields[..] else {
                return Err(err(format!("expected 4 fields, found {}", fields.len())));
            };
            let channel = channel
                .parse::<Channel>()
                .map_err(|e| err(format!("channel '{channel}': {e}")))?;
            let plane = plane
                .parse::<usize>()
                .map_err(|e| err(format!("plane '{plane}': {e}")))?;
            let column = column
                .parse::<u16>()
                .map_err(|e| err(format!("column '{column}': {e}")))?;
            let row = row
                .parse::<u16>()
                .map_err(|e| err(format!("row '{row}': {e}")))?;
            mask.insert(channel, plane, PixelCoord::new(column, row));
        }
        Ok(mask)
    }

    /// Reads and parses a mask file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or a line is malformed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }
}
