//! Campaign files: save, load and merge
//!
//! A campaign file is a bincode-encoded [`FileHeader`] followed by the
//! [`Campaign`]. The header is decoded on its own first, so a file written
//! by a newer format version is rejected with a clear error instead of a
//! garbled decode.

use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::PersistError;
use crate::model::{Campaign, TrialId, TrialResults};

/// Leading bytes of every campaign file
pub const MAGIC: [u8; 4] = *b"FTMC";

/// Bump whenever the encoded shape of [`Campaign`] changes
pub const CAMPAIGN_FORMAT_VERSION: u32 = 2;

pub const FILE_EXTENSION: &str = "tmc";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHeader {
    pub magic: [u8; 4],
    pub version: u32,
    /// Milliseconds since the Unix epoch
    pub created_ms: i64,
}

impl FileHeader {
    fn now() -> Self {
        Self {
            magic: MAGIC,
            version: CAMPAIGN_FORMAT_VERSION,
            created_ms: Timestamp::now().as_millisecond(),
        }
    }

    /// Creation time, if the stored value is in range
    #[must_use]
    pub fn created(&self) -> Option<Timestamp> {
        Timestamp::from_millisecond(self.created_ms).ok()
    }
}

/// Serialize `campaign` to bytes
pub fn encode(campaign: &Campaign) -> Result<Vec<u8>, PersistError> {
    let mut bytes = bincode::serialize(&FileHeader::now())
        .map_err(|err| PersistError::Encode(err.to_string()))?;
    bincode::serialize_into(&mut bytes, campaign)
        .map_err(|err| PersistError::Encode(err.to_string()))?;
    Ok(bytes)
}

/// Deserialize a campaign file; `path` is only used in errors
pub fn decode(bytes: &[u8], path: &Path) -> Result<(FileHeader, Campaign), PersistError> {
    let decode_error = |err: bincode::Error| PersistError::Decode {
        path: path.to_path_buf(),
        message: err.to_string(),
    };
    let mut cursor = Cursor::new(bytes);
    let header: FileHeader = bincode::deserialize_from(&mut cursor).map_err(|_| {
        PersistError::BadMagic {
            path: path.to_path_buf(),
        }
    })?;
    if header.magic != MAGIC {
        return Err(PersistError::BadMagic {
            path: path.to_path_buf(),
        });
    }
    if header.version != CAMPAIGN_FORMAT_VERSION {
        return Err(PersistError::UnsupportedVersion {
            found: header.version,
            expected: CAMPAIGN_FORMAT_VERSION,
        });
    }
    let campaign = bincode::deserialize_from(&mut cursor).map_err(decode_error)?;
    Ok((header, campaign))
}

/// Write `campaign` into `dir` and return the path. The file appears
/// atomically.
///
/// The first batch of a campaign gets its canonical file name; later
/// batches saved into the same directory get `_2`, `_3`, ... suffixes, so
/// an existing batch is never replaced.
pub fn save(campaign: &Campaign, dir: &Path) -> Result<PathBuf, PersistError> {
    fs::create_dir_all(dir).map_err(|source| PersistError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = claim_batch_path(dir, &campaign.file_stem())?;
    if let Err(err) = save_to(campaign, &path) {
        if let Err(cleanup) = fs::remove_file(&path) {
            warn!(path = %path.display(), error = %cleanup, "Failed to remove batch placeholder");
        }
        return Err(err);
    }
    Ok(path)
}

/// Create an empty placeholder under the first free batch name in `dir`.
/// `create_new` makes the claim atomic, so concurrent saves never pick the
/// same name.
fn claim_batch_path(dir: &Path, stem: &str) -> Result<PathBuf, PersistError> {
    let mut batch = 1usize;
    loop {
        let name = match batch {
            1 => format!("{stem}.{FILE_EXTENSION}"),
            n => format!("{stem}_{n}.{FILE_EXTENSION}"),
        };
        let path = dir.join(name);
        match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => return Ok(path),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "Batch file exists, trying next name");
                batch += 1;
            }
            Err(source) => return Err(PersistError::Io { path, source }),
        }
    }
}

/// Write `campaign` to exactly `path` via a temporary file and rename
pub fn save_to(campaign: &Campaign, path: &Path) -> Result<(), PersistError> {
    let bytes = encode(campaign)?;
    let temp_path = path.with_extension("tmc.tmp");
    let io_error = |source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    };
    fs::write(&temp_path, &bytes).map_err(io_error)?;
    fs::rename(&temp_path, path).map_err(io_error)?;
    info!(
        path = %path.display(),
        bytes = bytes.len(),
        trials = campaign.results.trial_count(),
        "Saved campaign"
    );
    Ok(())
}

/// Load one campaign file together with its header
pub fn load_with_header(path: &Path) -> Result<(FileHeader, Campaign), PersistError> {
    let bytes = fs::read(path).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let loaded = decode(&bytes, path)?;
    debug!(path = %path.display(), version = loaded.0.version, "Loaded campaign");
    Ok(loaded)
}

/// Load one campaign file
pub fn load(path: &Path) -> Result<Campaign, PersistError> {
    load_with_header(path).map(|(_, campaign)| campaign)
}

/// Combine batches of one campaign into a single aggregate.
///
/// All batches must agree on reaction, mode, distribution, event count,
/// evaporation flag and parameter definitions. The first batch's baseline
/// is kept. All-parameters trials are concatenated; single-parameter groups
/// are merged by parameter name. Trial indices are renumbered so they stay
/// unique after the merge, and trial ids are rebuilt to match.
pub fn merge(campaigns: Vec<Campaign>) -> Result<Campaign, PersistError> {
    let mut batches = campaigns.into_iter();
    let Some(mut merged) = batches.next() else {
        return Err(PersistError::Inconsistent("no campaigns to merge".into()));
    };
    for batch in batches {
        check_consistent(&merged, &batch)?;
        merged.spec.trial_count += batch.spec.trial_count;
        match (&mut merged.results, batch.results) {
            (TrialResults::AllParameters(trials), TrialResults::AllParameters(incoming)) => {
                let offset = trials.len();
                trials.extend(incoming.into_iter().map(|mut trial| {
                    trial.index += offset;
                    trial.outcome.trial_id = TrialId::all_parameters(trial.index);
                    trial
                }));
            }
            (TrialResults::SingleParameter(groups), TrialResults::SingleParameter(incoming)) => {
                for group in incoming {
                    match groups
                        .iter_mut()
                        .find(|g| g.parameter.name == group.parameter.name)
                    {
                        Some(existing) => {
                            let offset = existing.trials.len();
                            let name = &group.parameter.name;
                            existing
                                .trials
                                .extend(group.trials.into_iter().map(|mut trial| {
                                    trial.index += offset;
                                    trial.outcome.trial_id = TrialId::single(name, trial.index);
                                    trial
                                }));
                        }
                        None => groups.push(group),
                    }
                }
            }
            (merged_results, incoming) => {
                return Err(PersistError::Inconsistent(format!(
                    "cannot merge {:?} results into {:?} results",
                    incoming.mode(),
                    merged_results.mode()
                )));
            }
        }
    }
    Ok(merged)
}

fn check_consistent(base: &Campaign, other: &Campaign) -> Result<(), PersistError> {
    let (a, b) = (&base.spec, &other.spec);
    let mismatch = if a.reaction != b.reaction {
        Some(format!(
            "reaction {} vs {}",
            a.reaction.label(),
            b.reaction.label()
        ))
    } else if a.mode != b.mode {
        Some(format!("mode {:?} vs {:?}", a.mode, b.mode))
    } else if a.distribution != b.distribution {
        Some(format!("distribution {} vs {}", a.distribution, b.distribution))
    } else if a.events_per_trial != b.events_per_trial {
        Some(format!(
            "events per trial {} vs {}",
            a.events_per_trial, b.events_per_trial
        ))
    } else if a.with_evaporation != b.with_evaporation {
        Some("evaporation stage enabled in only one batch".to_string())
    } else if base.parameters != other.parameters {
        Some("parameter definitions differ".to_string())
    } else if base.baseline.yields.format() != other.baseline.yields.format() {
        Some("baseline yield formats differ".to_string())
    } else {
        None
    };
    match mismatch {
        Some(message) => Err(PersistError::Inconsistent(message)),
        None => Ok(()),
    }
}

/// Campaign files in `dir`, sorted by name
pub fn campaign_files(dir: &Path) -> Result<Vec<PathBuf>, PersistError> {
    let entries = fs::read_dir(dir).map_err(|source| PersistError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file() && path.extension().is_some_and(|ext| ext == FILE_EXTENSION)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Load and merge every campaign file in `dir`
pub fn load_dir(dir: &Path) -> Result<Campaign, PersistError> {
    let files = campaign_files(dir)?;
    if files.is_empty() {
        return Err(PersistError::NoCampaigns(dir.to_path_buf()));
    }
    let campaigns = files
        .iter()
        .map(|path| load(path))
        .collect::<Result<Vec<_>, _>>()?;
    info!(dir = %dir.display(), files = files.len(), "Merging campaign files");
    merge(campaigns)
}
