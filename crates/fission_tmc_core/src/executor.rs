//! Running one trial end to end
//!
//! A trial owns `GEF_{id}` (and `TALYS_folder_{id}` plus two library files
//! when evaporation is on). Nothing outside those paths is written, so
//! trials with distinct ids can run concurrently.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, info};

use crate::error::CampaignError;
use crate::events::read_event_file;
use crate::external::{ExternalProgram, evaporation, generator, remove_dir_if_exists};
use crate::model::{
    DEFAULT_CAPACITY, Perturbation, Reaction, Report, TrialId, TrialOutcome, YieldTable,
};
use crate::reduction::reduce;

/// Paths for the optional evaporation stage
#[derive(Debug, Clone, PartialEq)]
pub struct EvaporationSettings {
    /// Parent of the per-trial `TALYS_folder_{id}` directories
    pub work_root: PathBuf,
    /// Fission-fragment library directory the code reads `.ff` files from
    pub library_dir: PathBuf,
}

/// Everything a trial needs besides its perturbations
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorSettings {
    pub reaction: Reaction,
    pub events_per_trial: u64,
    /// Parent of the per-trial `GEF_{id}` directories
    pub generator_root: PathBuf,
    pub evaporation: Option<EvaporationSettings>,
    /// Row capacity of every yield table
    pub yield_capacity: usize,
    /// Leave working directories and library files in place after a trial
    pub keep_work_dirs: bool,
}

impl ExecutorSettings {
    #[must_use]
    pub fn new(reaction: Reaction, events_per_trial: u64, generator_root: PathBuf) -> Self {
        Self {
            reaction,
            events_per_trial,
            generator_root,
            evaporation: None,
            yield_capacity: DEFAULT_CAPACITY,
            keep_work_dirs: false,
        }
    }
}

/// Runs trials against the external programs
pub struct TrialExecutor {
    settings: ExecutorSettings,
    generator: Box<dyn ExternalProgram>,
    evaporator: Option<Box<dyn ExternalProgram>>,
}

impl TrialExecutor {
    #[must_use]
    pub fn new(settings: ExecutorSettings, generator: Box<dyn ExternalProgram>) -> Self {
        Self {
            settings,
            generator,
            evaporator: None,
        }
    }

    /// Enable the evaporation stage
    #[must_use]
    pub fn with_evaporation(
        mut self,
        settings: EvaporationSettings,
        evaporator: Box<dyn ExternalProgram>,
    ) -> Self {
        self.settings.evaporation = Some(settings);
        self.evaporator = Some(evaporator);
        self
    }

    #[must_use]
    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    #[must_use]
    pub fn evaporation_enabled(&self) -> bool {
        self.evaporator.is_some() && self.settings.evaporation.is_some()
    }

    /// Run the generator (and evaporation stage, if enabled) for `trial`
    /// with `overrides` written as the parameter file.
    pub fn run_trial(
        &self,
        trial: &TrialId,
        overrides: &[Perturbation],
    ) -> Result<TrialOutcome, CampaignError> {
        let started = Instant::now();
        let settings = &self.settings;
        let reaction = &settings.reaction;

        let dir = generator::work_dir(&settings.generator_root, trial);
        generator::prepare_work_dir(&dir)?;
        generator::write_inputs(&dir, reaction, settings.events_per_trial, overrides)?;
        debug!(trial_id = %trial, dir = %dir.display(), "Running generator");
        self.generator.run(&generator::invocation(&dir))?;

        let events = read_event_file(&generator::event_file(&dir, reaction), reaction.z_target)?;
        let (yields, ignored_singletons) =
            reduce(&events, reaction.a_compound, settings.yield_capacity)?;
        let generator_report = generator::read_report(&dir, reaction)?;
        if !settings.keep_work_dirs {
            remove_dir_if_exists(&dir)?;
        }

        let evaporation_report = match (&settings.evaporation, &self.evaporator) {
            (Some(evaporation_settings), Some(evaporator)) => Some(self.run_evaporation(
                trial,
                &yields,
                evaporation_settings,
                evaporator.as_ref(),
            )?),
            _ => None,
        };

        info!(
            trial_id = %trial,
            events = events.len(),
            splits = yields.len(),
            singletons = ignored_singletons,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Trial complete"
        );

        Ok(TrialOutcome {
            trial_id: trial.clone(),
            yields,
            ignored_singletons,
            raw_events: events.len(),
            generator_report,
            evaporation_report,
        })
    }

    fn run_evaporation(
        &self,
        trial: &TrialId,
        yields: &YieldTable,
        evaporation_settings: &EvaporationSettings,
        evaporator: &dyn ExternalProgram,
    ) -> Result<Report, CampaignError> {
        let reaction = &self.settings.reaction;
        let library = &evaporation_settings.library_dir;
        evaporation::write_library_files(library, reaction, trial, yields)?;

        let dir = evaporation::work_dir(&evaporation_settings.work_root, trial);
        remove_dir_if_exists(&dir)?;
        evaporation::write_deck(&dir, reaction, trial)?;
        debug!(trial_id = %trial, dir = %dir.display(), "Running evaporation code");
        evaporator.run(&evaporation::invocation(&dir, trial))?;

        let report = evaporation::read_reports(&dir)?;
        if !self.settings.keep_work_dirs {
            evaporation::remove_work_dir(&dir)?;
            evaporation::remove_library_files(library, trial)?;
        }
        Ok(report)
    }
}
