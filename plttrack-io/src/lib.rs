//! plttrack-io: Event replay and report files for plttrack.
//!
//! This crate reads recorded events (one JSON document per line) and writes
//! the per-run efficiency, accidental-rate and zero-counting tables.
//!

mod error;
mod reader;
mod writer;

pub use error::{Error, Result};
pub use reader::{EventFileReader, RecordedEvent};
pub use writer::{ReportKind, ReportWriter};
