//! Command-line front end for fission-model TMC campaigns
//!
//! Loads a YAML campaign description, sets up logging into the campaign
//! output directory and hands the work to `fission_tmc_core`.

#![warn(clippy::all)]

// ============================================================================
// Modules
// ============================================================================

pub mod commands;
pub mod config;
pub mod logging;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use config::CampaignConfig;
pub use logging::init_logging;
