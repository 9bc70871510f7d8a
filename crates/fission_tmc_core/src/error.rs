//! Error taxonomy for a campaign.
//!
//! Configuration and external-tool failures abort the campaign. Data-quality
//! conditions (malformed event lines, singletons, multi-chance events) never
//! appear here; the reducer absorbs them and only reports counts.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Problems detected before any trial starts
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid distribution {0:?} (expected uniform, normal or max-min)")]
    InvalidDistribution(String),

    #[error("max-min distribution has {scales} scale factors but {trials} trials were requested")]
    MaxMinLengthMismatch { scales: usize, trials: usize },

    #[error("no normal standard deviation configured for parameter {0}")]
    MissingStdDev(String),

    #[error("no element symbol known for Z = {0}")]
    UnknownElement(u16),

    #[error("parameter {0} not found in parameter source")]
    MissingParameter(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("no parameters selected for perturbation")]
    EmptyParameterSelection,
}

/// Failures of the external generator or evaporation code
#[derive(Debug, Error)]
pub enum ExternalToolError {
    #[error("executable {program} not found")]
    NotFound { program: PathBuf },

    #[error("{program} exited with status {code:?} in {dir}")]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        dir: PathBuf,
    },

    #[error("expected output {0} was not produced")]
    MissingOutput(PathBuf),

    #[error("output {0} is empty")]
    EmptyOutput(PathBuf),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ExternalToolError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ExternalToolError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Yield reduction failures
#[derive(Debug, Error)]
pub enum ReduceError {
    #[error("{retained} unique splits exceed the yield table capacity of {capacity}")]
    CapacityExceeded { retained: usize, capacity: usize },
}

/// Failures while saving, loading or merging campaign files
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode campaign: {0}")]
    Encode(String),

    #[error("failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },

    #[error("{path} is not a campaign file")]
    BadMagic { path: PathBuf },

    #[error("unsupported campaign format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("cannot merge campaigns: {0}")]
    Inconsistent(String),

    #[error("no campaign files found in {0}")]
    NoCampaigns(PathBuf),
}

/// Anything that aborts a campaign
#[derive(Debug, Error)]
pub enum CampaignError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    ExternalTool(#[from] ExternalToolError),

    #[error(transparent)]
    Reduce(#[from] ReduceError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),

    #[error("campaign aborted after an earlier trial failed")]
    Aborted,
}

pub type Result<T, E = CampaignError> = std::result::Result<T, E>;
