//! mmv - Inspect and publish MMV metric segments
//!
//! Clean modular structure:
//!   - main.rs: argument handling and the dump command
//!   - logging.rs: tracing subscriber setup
//!   - sample.rs: demonstration segment writer

mod logging;
mod sample;

use clap::{Parser, Subcommand};
use console::style;
use mmv_memory::dump::write_segment;
use mmv_memory::{
    default_segment_path, DecodeOptions, DecodePolicy, MmvError, ReaderConfig, RetryPolicy,
    SegmentReader,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "mmv")]
#[command(about = "Memory-mapped metric segment tools", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a segment and print its contents
    Dump {
        /// Segment file (default: $PCP_TMP_DIR/mmv/test)
        path: Option<PathBuf>,

        /// Skip bad records instead of stopping at the first one
        #[arg(short, long)]
        keep_going: bool,

        /// Decode attempts while the writer is mid-update
        #[arg(short, long, default_value = "1")]
        retries: u32,
    },

    /// Write a demonstration segment covering every metric type
    Sample {
        /// Segment file (default: $PCP_TMP_DIR/mmv/test)
        path: Option<PathBuf>,

        /// Keep updating values for this many seconds
        #[arg(short, long, default_value = "0")]
        seconds: u64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Dump {
            path,
            keep_going,
            retries,
        } => {
            let path = path.unwrap_or_else(default_segment_path);
            let config = ReaderConfig {
                retry: RetryPolicy {
                    max_attempts: retries.max(1),
                    ..RetryPolicy::default()
                },
                decode: DecodeOptions {
                    policy: if keep_going {
                        DecodePolicy::SkipInvalid
                    } else {
                        DecodePolicy::FailFast
                    },
                    ..DecodeOptions::default()
                },
            };
            run_dump(&path, config)
        }
        Commands::Sample { path, seconds } => {
            let path = path.unwrap_or_else(default_segment_path);
            match sample::run(&path, seconds) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    report(&e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Dump
// ═══════════════════════════════════════════════════════════════════════════

fn run_dump(path: &Path, config: ReaderConfig) -> ExitCode {
    let mut reader = match SegmentReader::open(path, config) {
        Ok(r) => r,
        Err(e) => {
            report(&e);
            return ExitCode::FAILURE;
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match reader.snapshot() {
        Ok(segment) => {
            if let Err(e) = write_segment(&mut out, path, &segment) {
                eprintln!("{} {}", style("error:").red().bold(), e);
                return ExitCode::FAILURE;
            }
            if segment.skipped.is_empty() {
                return ExitCode::SUCCESS;
            }
            let _ = out.flush();
            for e in &segment.skipped {
                report(e);
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            // Show whatever decoded before the failure
            let mut decoder = mmv_memory::Decoder::new(reader.bytes(), config.decode);
            let _ = decoder.run();
            let _ = write_segment(&mut out, path, decoder.segment());
            let _ = out.flush();
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn report(err: &MmvError) {
    eprintln!("{} {}", style("error:").red().bold(), err);
}
