//! Per-run report files.
//!
//! Every run gets three CSV tables in the output directory:
//! `efficiency_<run>.csv`, `accidentals_<run>.csv` and
//! `zero_counting_<run>.csv`. The first row names the columns, then each
//! published lumisection appends one row starting with its number.

use crate::{Error, Result};
use plttrack_algorithms::ChannelReport;
use plttrack_core::{Channel, PLANES_PER_TELESCOPE};
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// The report tables written for every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// Per-plane tag-and-probe efficiency.
    Efficiency,
    /// Accidental-track fraction.
    Accidentals,
    /// Real tracks per crossing.
    ZeroCounting,
}

impl ReportKind {
    /// All tables, in file-creation order.
    pub const ALL: [Self; 3] = [Self::Efficiency, Self::Accidentals, Self::ZeroCounting];

    /// File name prefix.
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Efficiency => "efficiency",
            Self::Accidentals => "accidentals",
            Self::ZeroCounting => "zero_counting",
        }
    }

    /// File name of this table for a run.
    #[must_use]
    pub fn file_name(self, run: u32) -> String {
        format!("{}_{run}.csv", self.prefix())
    }

    fn header(self, channels: &[Channel]) -> String {
        let mut line = String::from("ls");
        for channel in channels {
            match self {
                Self::Efficiency => {
                    for plane in 0..PLANES_PER_TELESCOPE {
                        let _ = write!(line, ",ch{channel}_plane{plane}");
                    }
                }
                Self::Accidentals | Self::ZeroCounting => {
                    let _ = write!(line, ",ch{channel}");
                }
            }
        }
        line
    }

    fn row(self, lumi_section: u32, reports: &[ChannelReport]) -> String {
        let mut line = lumi_section.to_string();
        for report in reports {
            match self {
                Self::Efficiency => {
                    for eff in report.efficiency {
                        let _ = write!(line, ",{eff}");
                    }
                }
                Self::Accidentals => {
                    let _ = write!(line, ",{}", report.accidental_rate);
                }
                Self::ZeroCounting => {
                    let _ = write!(line, ",{}", report.zero_counting);
                }
            }
        }
        line
    }
}

struct RunFiles {
    run: u32,
    channels: Vec<Channel>,
    tables: Vec<(ReportKind, BufWriter<File>)>,
}

/// Writer for the per-run report tables.
///
/// Files for a run are created on its first publication; publishing a
/// different run closes them and opens a new set.
pub struct ReportWriter {
    output_dir: PathBuf,
    current: Option<RunFiles>,
    rows: usize,
}

impl ReportWriter {
    /// Creates a writer, creating the output directory if needed.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn create<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        fs::create_dir_all(&output_dir)?;
        Ok(Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            current: None,
            rows: 0,
        })
    }

    /// Output directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Run whose files are open.
    #[must_use]
    pub fn current_run(&self) -> Option<u32> {
        self.current.as_ref().map(|files| files.run)
    }

    /// Rows published since creation.
    #[must_use]
    pub fn rows_written(&self) -> usize {
        self.rows
    }

    /// Path of a table for a run.
    #[must_use]
    pub fn path(&self, kind: ReportKind, run: u32) -> PathBuf {
        self.output_dir.join(kind.file_name(run))
    }

    /// Appends one lumisection row to every table of `run` and flushes.
    ///
    /// # Errors
    /// Returns an error on I/O failure, or if the channels differ from those
    /// the run's header was written with.
    pub fn publish(&mut self, run: u32, lumi_section: u32, reports: &[ChannelReport]) -> Result<()> {
        if self.current_run() != Some(run) {
            self.open_run(run, reports)?;
        }
        let Some(files) = self.current.as_mut() else {
            return Err(Error::InvalidReport(format!("no open files for run {run}")));
        };
        if !reports.iter().map(|r| r.channel).eq(files.channels.iter().copied()) {
            return Err(Error::InvalidReport(format!(
                "run {run}: channels {:?} do not match header {:?}",
                reports.iter().map(|r| r.channel).collect::<Vec<_>>(),
                files.channels
            )));
        }

        for (kind, writer) in &mut files.tables {
            writeln!(writer, "{}", kind.row(lumi_section, reports))?;
            writer.flush()?;
        }
        self.rows += 1;
        log::debug!("published run {run} lumisection {lumi_section}");
        Ok(())
    }

    fn open_run(&mut self, run: u32, reports: &[ChannelReport]) -> Result<()> {
        self.finish()?;
        let channels: Vec<Channel> = reports.iter().map(|r| r.channel).collect();
        let mut tables = Vec::with_capacity(ReportKind::ALL.len());
        for kind in ReportKind::ALL {
            let mut writer = BufWriter::new(File::create(self.path(kind, run))?);
            writeln!(writer, "{}", kind.header(&channels))?;
            writer.flush()?;
            tables.push((kind, writer));
        }
        log::info!("opened report files for run {run} in {}", self.output_dir.display());
        self.current = Some(RunFiles {
            run,
            channels,
            tables,
        });
        Ok(())
    }

    /// Flushes and closes the open run files.
    ///
    /// # Errors
    /// Returns an error if a flush fails.
    pub fn finish(&mut self) -> Result<()> {
        if let Some(mut files) = self.current.take() {
            for (_, writer) in &mut files.tables {
                writer.flush()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn report(channel: Channel, eff: f64) -> ChannelReport {
        ChannelReport {
            channel,
            efficiency: [eff, 1.0, 0.5],
            accidental_rate: 0.25,
            zero_counting: 0.75,
        }
    }

    #[test]
    fn test_rows_per_lumisection() {
        let dir = tempdir().unwrap();
        let mut writer = ReportWriter::create(dir.path()).unwrap();
        writer.publish(3, 1, &[report(5, 0.0), report(8, 0.5)]).unwrap();
        writer.publish(3, 2, &[report(5, 1.0), report(8, 0.5)]).unwrap();
        writer.finish().unwrap();

        let efficiency = fs::read_to_string(dir.path().join("efficiency_3.csv")).unwrap();
        let lines: Vec<&str> = efficiency.lines().collect();
        assert_eq!(
            lines[0],
            "ls,ch5_plane0,ch5_plane1,ch5_plane2,ch8_plane0,ch8_plane1,ch8_plane2"
        );
        assert_eq!(lines[1], "1,0,1,0.5,0.5,1,0.5");
        assert_eq!(lines[2], "2,1,1,0.5,0.5,1,0.5");

        let accidentals = fs::read_to_string(dir.path().join("accidentals_3.csv")).unwrap();
        assert_eq!(accidentals, "ls,ch5,ch8\n1,0.25,0.25\n2,0.25,0.25\n");
        let zero = fs::read_to_string(dir.path().join("zero_counting_3.csv")).unwrap();
        assert_eq!(zero.lines().nth(2), Some("2,0.75,0.75"));
        assert_eq!(writer.rows_written(), 2);
    }

    #[test]
    fn test_new_run_opens_new_files() {
        let dir = tempdir().unwrap();
        let mut writer = ReportWriter::create(dir.path().join("reports")).unwrap();
        writer.publish(1, 9, &[report(5, 1.0)]).unwrap();
        writer.publish(2, 1, &[report(5, 1.0)]).unwrap();
        assert_eq!(writer.current_run(), Some(2));

        for run in [1, 2] {
            for kind in ReportKind::ALL {
                let text = fs::read_to_string(writer.path(kind, run)).unwrap();
                assert_eq!(text.lines().count(), 2, "{}", kind.file_name(run));
            }
        }
    }

    #[test]
    fn test_channel_mismatch_is_rejected() {
        let dir = tempdir().unwrap();
        let mut writer = ReportWriter::create(dir.path()).unwrap();
        writer.publish(1, 1, &[report(5, 1.0)]).unwrap();
        assert!(matches!(
            writer.publish(1, 2, &[report(8, 1.0)]),
            Err(Error::InvalidReport(_))
        ));
    }
}
