//! plttrack CLI: Offline replay of recorded telescope events.
//!
//! This binary feeds recorded bunch crossings through the event analyzer and
//! writes the per-lumisection report tables.
#![allow(clippy::uninlined_format_args, clippy::too_many_lines)]

use clap::{Parser, Subcommand};

use plttrack_algorithms::{AnalyzerConfig, CalibrationTable, EventAnalyzer};
use plttrack_core::{Alignment, AlignmentTable, Channel, PixelMask, PLANES_PER_TELESCOPE};
use plttrack_io::{EventFileReader, ReportWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    PlttrackIo(#[from] plttrack_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] plttrack_core::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Usage error: {0}")]
    Usage(String),
}

/// Pixel-telescope track analysis.
#[derive(Parser)]
#[command(name = "plttrack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Sources shared by every subcommand.
#[derive(clap::Args)]
struct Inputs {
    /// Alignment JSON; an ideal stack is used when absent
    #[arg(long)]
    alignment: Option<PathBuf>,

    /// Plane spacing of the ideal stack (cm)
    #[arg(long, default_value = "3.77")]
    spacing: f64,

    /// Track calibration table
    #[arg(long)]
    calibration: Option<PathBuf>,

    /// Analyzer configuration JSON; omitted fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Channels to analyze (defaults to every aligned channel)
    #[arg(long, value_delimiter = ',')]
    channels: Vec<Channel>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay recorded events and write per-run report tables
    Process {
        /// Event file(s), one JSON record per line
        #[arg(required = true)]
        input: Vec<PathBuf>,

        #[command(flatten)]
        inputs: Inputs,

        /// Pixel mask file
        #[arg(long)]
        mask: Option<PathBuf>,

        /// Override the warm-up length in crossings
        #[arg(long)]
        warmup: Option<u64>,

        /// Reset all counters when the run number changes
        #[arg(long)]
        reset_per_run: bool,

        /// Directory for the report tables
        #[arg(short, long, default_value = "reports")]
        output_dir: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show the alignment, calibration and configuration in use
    Info {
        #[command(flatten)]
        inputs: Inputs,
    },
}

struct Setup {
    config: AnalyzerConfig,
    alignment: AlignmentTable,
    calibration: CalibrationTable,
    channels: Vec<Channel>,
}

fn load(inputs: &Inputs) -> Result<Setup> {
    let config = match &inputs.config {
        Some(path) => AnalyzerConfig::from_file(path)?,
        None => AnalyzerConfig::default(),
    };

    let (alignment, channels) = match &inputs.alignment {
        Some(path) => {
            let table = AlignmentTable::from_file(path)?;
            let channels = if inputs.channels.is_empty() {
                table.channels()
            } else {
                inputs.channels.clone()
            };
            (table, channels)
        }
        None if inputs.channels.is_empty() => {
            return Err(CliError::Usage(
                "--channels is required without --alignment".to_string(),
            ));
        }
        None => (
            AlignmentTable::nominal(&inputs.channels, inputs.spacing),
            inputs.channels.clone(),
        ),
    };

    let calibration = match &inputs.calibration {
        Some(path) => CalibrationTable::from_file(path)?,
        None => CalibrationTable::new(),
    };

    Ok(Setup {
        config,
        alignment,
        calibration,
        channels,
    })
}

/// Whether a record's `(run, lumi_section)` moves past the last published key.
fn advances(last: (u32, u32), key: (u32, u32)) -> bool {
    key > last
}

fn display(path: Option<&Path>) -> String {
    path.map_or_else(|| "<none>".to_string(), |p| p.display().to_string())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            input,
            inputs,
            mask,
            warmup,
            reset_per_run,
            output_dir,
            verbose,
        } => {
            let Setup {
                mut config,
                alignment,
                calibration,
                channels,
            } = load(&inputs)?;
            if let Some(crossings) = warmup {
                config = config.with_warmup_crossings(crossings);
            }

            if verbose {
                eprintln!("Processing {} file(s)...", input.len());
                eprintln!("Channels: {:?}", channels);
                eprintln!("Alignment: {}", display(inputs.alignment.as_deref()));
                eprintln!("Calibration: {}", display(inputs.calibration.as_deref()));
                eprintln!("Warm-up: {} crossings", config.warmup_crossings);
                eprintln!("Output directory: {}", output_dir.display());
            }

            let mut analyzer = EventAnalyzer::new(config, alignment, calibration, &channels)?;
            if let Some(path) = &mask {
                let mask = PixelMask::from_file(path)?;
                log::info!("masking {} pixels from {}", mask.len(), path.display());
                analyzer = analyzer.with_pixel_mask(mask);
            }
            let mut writer = ReportWriter::create(&output_dir)?;

            let start = Instant::now();
            let mut events = 0usize;
            let mut skipped = 0usize;
            let mut current: Option<(u32, u32)> = None;

            for path in &input {
                if verbose {
                    eprintln!("Reading: {}", path.display());
                }
                for record in EventFileReader::open(path)? {
                    let mut record = record?;
                    let key = (record.run, record.lumi_section);

                    match current {
                        None => current = Some(key),
                        Some(last) if advances(last, key) => {
                            writer.publish(last.0, last.1, &analyzer.snapshot())?;
                            if reset_per_run && key.0 > last.0 {
                                analyzer.reinitialize_counters();
                            }
                            current = Some(key);
                        }
                        Some(last) if last != key => log::debug!(
                            "run {} ls {} arrived after run {} ls {}; counted without publishing",
                            key.0,
                            key.1,
                            last.0,
                            last.1
                        ),
                        Some(_) => {}
                    }

                    match analyzer.analyze_event(&mut record.event) {
                        Ok(()) => events += 1,
                        Err(plttrack_core::Error::UnknownChannel(channel)) => {
                            log::warn!(
                                "run {} ls {}: skipping event with unconfigured channel {}",
                                record.run,
                                record.lumi_section,
                                channel
                            );
                            skipped += 1;
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }

            if let Some((run, ls)) = current {
                writer.publish(run, ls, &analyzer.snapshot())?;
            }
            writer.finish()?;

            let elapsed = start.elapsed();
            println!(
                "Processed {} events in {:.2}s ({} skipped)",
                events,
                elapsed.as_secs_f64(),
                skipped
            );
            println!("Lumisections published: {}", writer.rows_written());
            if verbose {
                println!("{:-<65}", "");
                println!(
                    "{:>8} {:>10} {:>10} {:>10} {:>10} {:>10}",
                    "Channel", "Eff0", "Eff1", "Eff2", "Acc", "ZeroCount"
                );
                for report in analyzer.snapshot() {
                    println!(
                        "{:>8} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4}",
                        report.channel,
                        report.efficiency[0],
                        report.efficiency[1],
                        report.efficiency[2],
                        report.accidental_rate,
                        report.zero_counting
                    );
                }
            }
        }

        Commands::Info { inputs } => {
            let Setup {
                config,
                alignment,
                calibration,
                channels,
            } = load(&inputs)?;

            println!("Alignment: {}", display(inputs.alignment.as_deref()));
            let pixels = alignment.pixels();
            println!(
                "Pixels: {} x {}, pitch {} x {} cm",
                pixels.columns, pixels.rows, pixels.pitch_x, pixels.pitch_y
            );
            println!("{:-<65}", "");
            println!(
                "{:>8} {:>6} {:>12} {:>12} {:>12} {:>12}",
                "Channel", "Plane", "Rotation", "X", "Y", "Z"
            );
            for &channel in &channels {
                for plane in 0..PLANES_PER_TELESCOPE {
                    match alignment.plane(channel, plane) {
                        Some(g) => println!(
                            "{:>8} {:>6} {:>12.6} {:>12.6} {:>12.6} {:>12.6}",
                            channel, plane, g.rotation, g.x, g.y, g.z
                        ),
                        None => println!("{:>8} {:>6} {:>12}", channel, plane, "missing"),
                    }
                }
            }
            println!("{:-<65}", "");

            println!("Calibration: {}", display(inputs.calibration.as_deref()));
            println!("Calibrated channels: {}", calibration.len());
            let uncalibrated: Vec<Channel> = channels
                .iter()
                .copied()
                .filter(|&c| !calibration.contains(c))
                .collect();
            if !uncalibrated.is_empty() {
                println!("Without calibration: {:?}", uncalibrated);
            }
            println!("{:-<65}", "");

            println!("Configuration:");
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
