//! Subcommand bodies, kept out of `main` so they can be tested

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Instant;

use color_eyre::eyre::{Context, Result};
use jiff::Timestamp;
use tracing::info;

use fission_tmc_core::Campaign;
use fission_tmc_core::executor::TrialExecutor;
use fission_tmc_core::external::Executable;
use fission_tmc_core::model::TrialResults;
use fission_tmc_core::parameters::load_parameter_definitions;
use fission_tmc_core::persistence;
use fission_tmc_core::progress::CampaignProgress;
use fission_tmc_core::scheduler::{plan_trials, planning_rng, run_campaign};

use crate::config::CampaignConfig;

/// Plan, run and save a campaign. Returns the path of the campaign file.
pub fn run(config: &CampaignConfig, seed: Option<u64>) -> Result<PathBuf> {
    let spec = config.campaign_spec()?;
    let parameters =
        load_parameter_definitions(&config.paths.parameter_source, &config.parameters)
            .wrap_err("Failed to load nominal parameter values")?;
    let seed = seed.or(config.seed);
    let plan = plan_trials(&spec, &parameters, &config.sampler, &mut planning_rng(seed))?;

    let mut executor = TrialExecutor::new(
        config.executor_settings(),
        Box::new(Executable::new(&config.paths.generator)),
    );
    if let (Some(settings), Some(program)) = (
        config.evaporation_settings()?,
        config.paths.evaporation.as_ref(),
    ) {
        executor = executor.with_evaporation(settings, Box::new(Executable::new(program)));
    }

    let started = Instant::now();
    let progress = CampaignProgress::default();
    let campaign = run_campaign(
        spec,
        parameters,
        plan,
        &executor,
        config.pool_sizes(),
        &progress,
    )?;
    info!(
        trials = campaign.results.trial_count(),
        elapsed_s = started.elapsed().as_secs(),
        "Campaign finished"
    );

    let path = persistence::save(&campaign, &config.paths.output_dir)?;
    Ok(path)
}

/// Human-readable overview of a campaign file
pub fn inspect(path: &Path) -> Result<String> {
    let (header, campaign) = persistence::load_with_header(path)
        .wrap_err_with(|| format!("Failed to load {}", path.display()))?;
    Ok(summarize(&campaign, header.created())?)
}

pub fn summarize(
    campaign: &Campaign,
    created: Option<Timestamp>,
) -> Result<String, std::fmt::Error> {
    let spec = &campaign.spec;
    let mut out = String::new();
    writeln!(out, "Reaction:      {}", spec.reaction.label())?;
    if let Some(created) = created {
        writeln!(out, "Created:       {}", created.strftime("%Y-%m-%d %H:%M:%S UTC"))?;
    }
    writeln!(out, "Mode:          {:?}", spec.mode)?;
    writeln!(out, "Distribution:  {}", spec.distribution)?;
    writeln!(out, "Events/trial:  {}", spec.events_per_trial)?;
    writeln!(out, "Evaporation:   {}", spec.with_evaporation)?;
    writeln!(out, "Parameters:    {}", campaign.parameters.len())?;
    writeln!(out, "Trials:        {}", campaign.results.trial_count())?;
    writeln!(out, "Baseline rows: {}", campaign.baseline.yields.len())?;
    writeln!(
        out,
        "Report tables: {}",
        campaign.baseline.generator_report.table_count()
    )?;

    match &campaign.results {
        TrialResults::SingleParameter(groups) => {
            for group in groups {
                let rows: Vec<usize> =
                    group.trials.iter().map(|t| t.outcome.yields.len()).collect();
                writeln!(
                    out,
                    "  {:<16} nominal {:<12} trials {:<4} rows {:?}",
                    group.parameter.name,
                    group.parameter.nominal,
                    group.trials.len(),
                    rows
                )?;
            }
        }
        TrialResults::AllParameters(trials) => {
            for trial in trials {
                writeln!(
                    out,
                    "  {:<16} rows {:<6} ignored {}",
                    trial.outcome.trial_id.as_str(),
                    trial.outcome.yields.len(),
                    trial.outcome.ignored_singletons
                )?;
            }
        }
    }
    Ok(out)
}

/// Merge every campaign file in `dir` into `output`
pub fn merge(dir: &Path, output: &Path) -> Result<Campaign> {
    let campaign = persistence::load_dir(dir)
        .wrap_err_with(|| format!("Failed to merge campaigns in {}", dir.display()))?;
    persistence::save_to(&campaign, output)?;
    Ok(campaign)
}
