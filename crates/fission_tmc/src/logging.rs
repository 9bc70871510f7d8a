//! Campaign log: every event at the chosen level goes to a plain-text file
//! in the campaign output directory, and progress lines go to stderr.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use color_eyre::eyre::{Result, eyre};
use jiff::Timestamp;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE_NAME: &str = "fission_tmc.log";
/// Holds the log of earlier runs once the current file grows too large
pub const PREVIOUS_LOG_FILE_NAME: &str = "fission_tmc.log.1";

const MAX_LOG_SIZE: u64 = 5 * 1024 * 1024;

/// Move the log in `dir` to [`PREVIOUS_LOG_FILE_NAME`] when it is larger than
/// `max_size`, replacing any older one. Returns whether it moved.
fn retire_oversized_log(dir: &Path, max_size: u64) -> io::Result<bool> {
    let current = dir.join(LOG_FILE_NAME);
    match fs::metadata(&current) {
        Ok(meta) if meta.len() > max_size => {
            fs::rename(&current, dir.join(PREVIOUS_LOG_FILE_NAME))?;
            Ok(true)
        }
        Ok(_) => Ok(false),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// `RUST_LOG` wins when set; otherwise both crates log at `level`
fn campaign_filter(level: &str) -> Result<EnvFilter> {
    let level: Level = level
        .parse()
        .map_err(|_| eyre!("Unknown log level '{level}'"))?;
    Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("fission_tmc={level},fission_tmc_core={level}"))
    }))
}

/// Start logging for one run into `output_dir`. Returns the log path.
pub fn init_logging(output_dir: &Path, level: &str) -> Result<PathBuf> {
    let filter = campaign_filter(level)?;
    fs::create_dir_all(output_dir)?;
    if let Err(e) = retire_oversized_log(output_dir, MAX_LOG_SIZE) {
        eprintln!("Warning: could not move the old log aside: {e}");
    }

    let log_path = output_dir.join(LOG_FILE_NAME);
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;
    writeln!(file, "=== run started {} ===", Timestamp::now())?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_thread_ids(true),
        )
        .with(
            fmt::layer()
                .compact()
                .with_writer(io::stderr.with_max_level(Level::INFO))
                .with_target(false),
        )
        .try_init()?;

    tracing::info!(log_path = %log_path.display(), "Campaign logging initialized");
    Ok(log_path)
}
