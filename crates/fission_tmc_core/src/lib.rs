//! Total Monte Carlo sensitivity analysis for fission-model parameters
//!
//! This crate drives an external fission event generator (and, optionally,
//! an evaporation code) under perturbed model parameters and collects the
//! resulting fission-fragment yields. It supports:
//! - Magnitude sampling from `uniform`, `normal` and `max-min` families
//! - Perturbation rules for ordinary and zero-nominal parameters
//! - Isolated per-trial working directories, safe under concurrency
//! - Yield reduction with multi-chance and singleton filtering
//! - Parameter-at-a-time and all-parameters (TMC) scheduling
//! - Versioned campaign files that can be reloaded and merged
//!
//! # Example
//!
//! ```ignore
//! use fission_tmc_core::config::SamplerConfig;
//! use fission_tmc_core::executor::{ExecutorSettings, TrialExecutor};
//! use fission_tmc_core::external::Executable;
//! use fission_tmc_core::progress::CampaignProgress;
//! use fission_tmc_core::scheduler::{PoolSizes, plan_trials, planning_rng, run_campaign};
//!
//! let mut rng = planning_rng(Some(7));
//! let plan = plan_trials(&spec, &parameters, &SamplerConfig::default(), &mut rng)?;
//! let executor = TrialExecutor::new(
//!     ExecutorSettings::new(spec.reaction, spec.events_per_trial, "out/generator_work".into()),
//!     Box::new(Executable::new("gef")),
//! );
//! let progress = CampaignProgress::default();
//! let campaign = run_campaign(spec, parameters, plan, &executor, PoolSizes::detect(), &progress)?;
//! fission_tmc_core::persistence::save(&campaign, "out".as_ref())?;
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod events;
pub mod executor;
pub mod external;
pub mod parameters;
pub mod persistence;
pub mod progress;
pub mod reduction;
pub mod sampling;
pub mod scheduler;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod config;
pub mod error;
pub mod format;
pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use error::{CampaignError, ConfigError, ExternalToolError, PersistError, ReduceError};
pub use model::{Campaign, CampaignSpec, Mode, ParameterDefinition, Reaction, TrialOutcome};
pub use sampling::Distribution;
