//! Campaign configuration file
//!
//! A campaign is described by one YAML document. Everything except the
//! reaction and the paths to the external programs has a default.

use std::fs;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{Context, Result, bail, eyre};
use serde::{Deserialize, Serialize};

use fission_tmc_core::config::SamplerConfig;
use fission_tmc_core::executor::{EvaporationSettings, ExecutorSettings};
use fission_tmc_core::external::evaporation;
use fission_tmc_core::parameters::DEFAULT_SELECTION;
use fission_tmc_core::scheduler::PoolSizes;
use fission_tmc_core::{CampaignSpec, Distribution, Mode, Reaction};

/// Target and projectile energy as written in the file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionConfig {
    pub z_target: u16,
    pub a_compound: u16,
    pub energy_mev: f64,
}

/// Locations of the external programs and of the campaign output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Fission event generator executable
    pub generator: PathBuf,

    /// Source file the nominal parameter values are read from
    pub parameter_source: PathBuf,

    /// Evaporation code executable, required when evaporation is on
    #[serde(default)]
    pub evaporation: Option<PathBuf>,

    /// Evaporation code installation root holding `structure/fission/ff`
    #[serde(default)]
    pub evaporation_root: Option<PathBuf>,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

/// Optional worker-count overrides; unset fields follow the core count
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkersConfig {
    #[serde(default)]
    pub outer: Option<usize>,
    #[serde(default)]
    pub inner: Option<usize>,
    #[serde(default)]
    pub tmc: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignConfig {
    pub reaction: ReactionConfig,

    #[serde(default = "default_events_per_trial")]
    pub events_per_trial: u64,

    #[serde(default = "default_trial_count")]
    pub trial_count: usize,

    /// `uniform`, `normal` or `max-min`
    #[serde(default = "default_distribution")]
    pub distribution: String,

    /// `single` or `tmc`
    #[serde(default = "default_mode")]
    pub mode: String,

    #[serde(default)]
    pub with_evaporation: bool,

    pub paths: PathsConfig,

    #[serde(default = "default_parameters")]
    pub parameters: Vec<String>,

    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default)]
    pub workers: WorkersConfig,

    #[serde(default)]
    pub keep_work_dirs: bool,

    #[serde(default)]
    pub sampler: SamplerConfig,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("tmc_output")
}

fn default_events_per_trial() -> u64 {
    1_000_000
}

fn default_trial_count() -> usize {
    100
}

fn default_distribution() -> String {
    "uniform".to_string()
}

fn default_mode() -> String {
    "single".to_string()
}

fn default_parameters() -> Vec<String> {
    DEFAULT_SELECTION.iter().map(|name| (*name).to_string()).collect()
}

impl CampaignConfig {
    /// Parse a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: CampaignConfig =
            serde_saphyr::from_str(content).wrap_err("Invalid campaign configuration")?;
        Ok(config)
    }

    /// Read and parse `path`. Relative paths inside the file are resolved
    /// against the directory containing it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
        let mut config = Self::from_yaml(&content)
            .wrap_err_with(|| format!("Failed to parse {}", path.display()))?;
        if let Some(base) = path.parent() {
            config.paths.resolve_against(base);
        }
        Ok(config)
    }

    #[must_use]
    pub fn reaction(&self) -> Reaction {
        let r = &self.reaction;
        Reaction::new(r.z_target, r.a_compound, r.energy_mev)
    }

    /// Fixed campaign inputs, with every field checked
    pub fn campaign_spec(&self) -> Result<CampaignSpec> {
        let reaction = self.reaction();
        reaction.validate()?;
        let distribution: Distribution = self.distribution.parse()?;
        let mode: Mode = self.mode.parse()?;
        self.sampler.validate()?;
        if self.with_evaporation && self.paths.evaporation.is_none() {
            bail!("with_evaporation is set but paths.evaporation is missing");
        }
        Ok(CampaignSpec {
            reaction,
            events_per_trial: self.events_per_trial,
            trial_count: self.trial_count,
            distribution,
            with_evaporation: self.with_evaporation,
            mode,
        })
    }

    #[must_use]
    pub fn pool_sizes(&self) -> PoolSizes {
        PoolSizes::detect().with_overrides(self.workers.outer, self.workers.inner, self.workers.tmc)
    }

    #[must_use]
    pub fn executor_settings(&self) -> ExecutorSettings {
        let mut settings = ExecutorSettings::new(
            self.reaction(),
            self.events_per_trial,
            self.paths.output_dir.join("generator_work"),
        );
        settings.keep_work_dirs = self.keep_work_dirs;
        settings
    }

    /// Evaporation paths, or `None` when the stage is off
    pub fn evaporation_settings(&self) -> Result<Option<EvaporationSettings>> {
        if !self.with_evaporation {
            return Ok(None);
        }
        let root = self.paths.evaporation_root.as_deref().ok_or_else(|| {
            eyre!("with_evaporation is set but paths.evaporation_root is missing")
        })?;
        Ok(Some(EvaporationSettings {
            work_root: self.paths.output_dir.join("evaporation_work"),
            library_dir: evaporation::library_dir(root, &self.reaction())?,
        }))
    }
}

impl PathsConfig {
    fn resolve_against(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        resolve(&mut self.generator);
        resolve(&mut self.parameter_source);
        resolve(&mut self.output_dir);
        if let Some(path) = self.evaporation.as_mut() {
            resolve(path);
        }
        if let Some(path) = self.evaporation_root.as_mut() {
            resolve(path);
        }
    }
}
