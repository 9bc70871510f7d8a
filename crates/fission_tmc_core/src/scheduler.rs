//! Campaign scheduling
//!
//! Perturbations are planned up front from one RNG so a bad configuration
//! fails before any external process starts. Trials then fan out over
//! bounded worker pools:
//!
//! - **Single parameter**: an outer pool of plain threads with one task per
//!   parameter; every task opens its own inner pool for that parameter's
//!   trials and blocks until all of them are done. The outer workers are not
//!   rayon threads so a waiting task cannot pick up another parameter.
//! - **All parameters (TMC)**: one pool, one task per trial.
//!
//! The baseline runs on its own thread beside the pools and is joined
//! before the campaign is assembled. Results are appended in completion
//! order. The first fatal error stops new trials from starting and is
//! returned once running trials finish.

use std::num::NonZeroUsize;
use std::thread;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, warn};

use crate::config::SamplerConfig;
use crate::error::{CampaignError, ConfigError};
use crate::executor::TrialExecutor;
use crate::model::{
    AllParametersTrial, Campaign, CampaignSpec, Mode, ParameterDefinition, ParameterGroup,
    Perturbation, SingleParameterTrial, TrialId, TrialResults,
};
use crate::progress::CampaignProgress;
use crate::sampling::{Perturber, Sampler};

/// Worker counts for both scheduling modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSizes {
    /// Parameters processed concurrently in single-parameter mode
    pub outer: usize,
    /// Trials per parameter processed concurrently in single-parameter mode
    pub inner: usize,
    /// Trials processed concurrently in all-parameters mode
    pub all_parameters: usize,
}

impl PoolSizes {
    /// Sizes that keep concurrent external processes within `cores`
    #[must_use]
    pub fn for_cores(cores: usize) -> Self {
        let outer = (cores.saturating_sub(2) / 3).max(1);
        let inner = (cores.saturating_sub(outer) / 2).max(1);
        let all_parameters = (cores * 2 / 3).max(1);
        Self {
            outer,
            inner,
            all_parameters,
        }
    }

    /// Sizes for the logical cores of this machine
    #[must_use]
    pub fn detect() -> Self {
        let cores = thread::available_parallelism().map_or(1, NonZeroUsize::get);
        Self::for_cores(cores)
    }

    /// Replace computed sizes with any configured override
    #[must_use]
    pub fn with_overrides(
        self,
        outer: Option<usize>,
        inner: Option<usize>,
        all_parameters: Option<usize>,
    ) -> Self {
        Self {
            outer: outer.unwrap_or(self.outer).max(1),
            inner: inner.unwrap_or(self.inner).max(1),
            all_parameters: all_parameters.unwrap_or(self.all_parameters).max(1),
        }
    }
}

impl Default for PoolSizes {
    fn default() -> Self {
        Self::detect()
    }
}

/// Perturbed values for one parameter, in trial order
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterPlan {
    pub parameter: ParameterDefinition,
    pub values: Vec<f64>,
}

/// Every trial of a campaign, with its perturbations decided
#[derive(Debug, Clone, PartialEq)]
pub enum TrialPlan {
    SingleParameter(Vec<ParameterPlan>),
    /// One perturbation vector per trial
    AllParameters(Vec<Vec<Perturbation>>),
}

impl TrialPlan {
    #[must_use]
    pub fn mode(&self) -> Mode {
        match self {
            TrialPlan::SingleParameter(_) => Mode::SingleParameter,
            TrialPlan::AllParameters(_) => Mode::AllParameters,
        }
    }

    /// Perturbed trials, baseline excluded
    #[must_use]
    pub fn trial_count(&self) -> usize {
        match self {
            TrialPlan::SingleParameter(plans) => plans.iter().map(|p| p.values.len()).sum(),
            TrialPlan::AllParameters(trials) => trials.len(),
        }
    }
}

/// RNG for planning; a seed makes the plan reproducible
#[must_use]
pub fn planning_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Decide every perturbed value of the campaign.
///
/// In all-parameters mode trial `n` takes the `n`-th magnitude drawn for
/// each parameter, so `max-min` scale `n` applies to every parameter of
/// trial `n`.
pub fn plan_trials<R: rand::Rng + ?Sized>(
    spec: &CampaignSpec,
    parameters: &[ParameterDefinition],
    sampler_config: &SamplerConfig,
    rng: &mut R,
) -> Result<TrialPlan, ConfigError> {
    if parameters.is_empty() {
        return Err(ConfigError::EmptyParameterSelection);
    }
    if spec.trial_count == 0 {
        return Err(ConfigError::InvalidValue {
            field: "trial_count".into(),
            message: "at least one trial is required".into(),
        });
    }
    sampler_config.validate()?;
    let sampler = Sampler::new(sampler_config);
    let perturber = Perturber::new(sampler_config)?;
    let distribution = spec.distribution;
    let count = spec.trial_count;

    for parameter in parameters {
        sampler.check(distribution, &parameter.name, count)?;
    }

    let mut plans = Vec::with_capacity(parameters.len());
    for parameter in parameters {
        let magnitudes =
            sampler.sample(distribution, &parameter.name, parameter.nominal, count, rng)?;
        let values = magnitudes
            .into_iter()
            .map(|magnitude| {
                perturber.perturb(
                    &parameter.name,
                    parameter.nominal,
                    magnitude,
                    distribution,
                    rng,
                )
            })
            .collect();
        plans.push(ParameterPlan {
            parameter: parameter.clone(),
            values,
        });
    }

    Ok(match spec.mode {
        Mode::SingleParameter => TrialPlan::SingleParameter(plans),
        Mode::AllParameters => TrialPlan::AllParameters(
            (0..count)
                .map(|trial| {
                    plans
                        .iter()
                        .map(|plan| Perturbation {
                            parameter: plan.parameter.name.clone(),
                            value: plan.values[trial],
                        })
                        .collect()
                })
                .collect(),
        ),
    })
}

/// Run the baseline and every planned trial, returning the finished campaign.
///
/// `progress` is reset to the number of trials (baseline included) and
/// advanced as each one completes.
pub fn run_campaign(
    spec: CampaignSpec,
    parameters: Vec<ParameterDefinition>,
    plan: TrialPlan,
    executor: &TrialExecutor,
    pools: PoolSizes,
    progress: &CampaignProgress,
) -> Result<Campaign, CampaignError> {
    if plan.mode() != spec.mode {
        return Err(ConfigError::InvalidValue {
            field: "mode".into(),
            message: format!(
                "trial plan is {:?} but the campaign is {:?}",
                plan.mode(),
                spec.mode
            ),
        }
        .into());
    }
    progress.reset(plan.trial_count() + 1);
    info!(
        mode = ?spec.mode,
        distribution = %spec.distribution,
        trials = plan.trial_count(),
        parameters = parameters.len(),
        outer_workers = pools.outer,
        inner_workers = pools.inner,
        tmc_workers = pools.all_parameters,
        "Starting campaign"
    );

    let (baseline, results) = thread::scope(|scope| {
        let baseline = scope.spawn(|| {
            let result = executor.run_trial(&TrialId::baseline(), &[]);
            record(progress, &result);
            result
        });
        let results = match plan {
            TrialPlan::SingleParameter(plans) => {
                run_single_parameter(plans, executor, pools, progress)
                    .map(TrialResults::SingleParameter)
            }
            TrialPlan::AllParameters(trials) => {
                run_all_parameters(trials, executor, pools, progress)
                    .map(TrialResults::AllParameters)
            }
        };
        let baseline = baseline
            .join()
            .map_err(|_| CampaignError::WorkerPool("baseline trial panicked".into()))
            .and_then(|result| result);
        (baseline, results)
    });

    let (baseline, results) = match (baseline, results) {
        (Ok(baseline), Ok(results)) => (baseline, results),
        (Err(err), _) | (Ok(_), Err(err)) => return Err(err),
    };
    info!(
        completed = progress.completed(),
        total = progress.total(),
        "Campaign complete"
    );
    Ok(Campaign::new(spec, parameters, baseline, results))
}

fn run_single_parameter(
    plans: Vec<ParameterPlan>,
    executor: &TrialExecutor,
    pools: PoolSizes,
    progress: &CampaignProgress,
) -> Result<Vec<ParameterGroup>, CampaignError> {
    run_blocking_pool(pools.outer, plans, progress, |plan| {
        let ParameterPlan { parameter, values } = plan;
        let jobs: Vec<(usize, f64)> = values.into_iter().enumerate().collect();
        let mut trials = run_in_pool(pools.inner, jobs, progress, |(index, value)| {
            let overrides = [Perturbation {
                parameter: parameter.name.clone(),
                value,
            }];
            let result = executor.run_trial(&TrialId::single(&parameter.name, index), &overrides);
            record(progress, &result);
            result.map(|outcome| SingleParameterTrial {
                index,
                value,
                outcome,
            })
        })?;
        trials.sort_by_key(|trial| trial.index);
        info!(parameter = %parameter.name, trials = trials.len(), "Parameter complete");
        Ok(ParameterGroup { parameter, trials })
    })
}

fn run_all_parameters(
    trials: Vec<Vec<Perturbation>>,
    executor: &TrialExecutor,
    pools: PoolSizes,
    progress: &CampaignProgress,
) -> Result<Vec<AllParametersTrial>, CampaignError> {
    let jobs: Vec<(usize, Vec<Perturbation>)> = trials.into_iter().enumerate().collect();
    run_in_pool(pools.all_parameters, jobs, progress, |(index, perturbations)| {
        let result = executor.run_trial(&TrialId::all_parameters(index), &perturbations);
        record(progress, &result);
        result.map(|outcome| AllParametersTrial {
            index,
            perturbations,
            outcome,
        })
    })
}

fn record<T>(progress: &CampaignProgress, result: &Result<T, CampaignError>) {
    match result {
        Ok(_) => {
            let completed = progress.increment();
            info!(completed, total = progress.total(), "Progress");
        }
        Err(err) => {
            warn!(error = %err, "Trial failed, aborting campaign");
            progress.abort();
        }
    }
}

/// Run `jobs` on `workers` plain threads that block while a job runs
#[cfg(feature = "parallel")]
fn run_blocking_pool<J, T, F>(
    workers: usize,
    jobs: Vec<J>,
    progress: &CampaignProgress,
    run: F,
) -> Result<Vec<T>, CampaignError>
where
    J: Send,
    T: Send,
    F: Fn(J) -> Result<T, CampaignError> + Sync,
{
    use std::sync::{Mutex, mpsc};

    let workers = workers.min(jobs.len()).max(1);
    let queue = Mutex::new(jobs.into_iter());
    let (sender, receiver) = mpsc::channel();
    let (queue, run) = (&queue, &run);
    thread::scope(|scope| {
        for _ in 0..workers {
            let sender = sender.clone();
            scope.spawn(move || {
                loop {
                    if progress.is_aborted() {
                        break;
                    }
                    let Some(job) = queue.lock().ok().and_then(|mut jobs| jobs.next()) else {
                        break;
                    };
                    let result = run(job);
                    if result.is_err() {
                        progress.abort();
                    }
                    let _ = sender.send(result);
                }
            });
        }
    });
    drop(sender);
    collect_completed(receiver, progress)
}

#[cfg(not(feature = "parallel"))]
fn run_blocking_pool<J, T, F>(
    workers: usize,
    jobs: Vec<J>,
    progress: &CampaignProgress,
    run: F,
) -> Result<Vec<T>, CampaignError>
where
    F: Fn(J) -> Result<T, CampaignError>,
{
    run_in_pool(workers, jobs, progress, run)
}

/// Run `jobs` on a rayon pool of `workers` threads, collecting results in
/// completion order
#[cfg(feature = "parallel")]
fn run_in_pool<J, T, F>(
    workers: usize,
    jobs: Vec<J>,
    progress: &CampaignProgress,
    run: F,
) -> Result<Vec<T>, CampaignError>
where
    J: Send,
    T: Send,
    F: Fn(J) -> Result<T, CampaignError> + Sync,
{
    use std::sync::mpsc;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|err| CampaignError::WorkerPool(err.to_string()))?;
    let (sender, receiver) = mpsc::channel();
    let run = &run;
    pool.scope(|scope| {
        for job in jobs {
            let sender = sender.clone();
            scope.spawn(move |_| {
                if progress.is_aborted() {
                    return;
                }
                let result = run(job);
                if result.is_err() {
                    progress.abort();
                }
                // The receiver outlives the scope
                let _ = sender.send(result);
            });
        }
    });
    drop(sender);
    collect_completed(receiver, progress)
}

#[cfg(not(feature = "parallel"))]
fn run_in_pool<J, T, F>(
    _workers: usize,
    jobs: Vec<J>,
    progress: &CampaignProgress,
    run: F,
) -> Result<Vec<T>, CampaignError>
where
    F: Fn(J) -> Result<T, CampaignError>,
{
    let mut completed = Vec::with_capacity(jobs.len());
    for job in jobs {
        if progress.is_aborted() {
            return Err(CampaignError::Aborted);
        }
        match run(job) {
            Ok(item) => completed.push(item),
            Err(err) => {
                progress.abort();
                return Err(err);
            }
        }
    }
    Ok(completed)
}

/// Keep successes in arrival order. The first real error wins over
/// `Aborted`, and skipped jobs after an abort make the batch fail.
#[cfg(feature = "parallel")]
fn collect_completed<T>(
    results: impl IntoIterator<Item = Result<T, CampaignError>>,
    progress: &CampaignProgress,
) -> Result<Vec<T>, CampaignError> {
    let mut completed = Vec::new();
    let mut failure: Option<CampaignError> = None;
    for result in results {
        match result {
            Ok(item) => completed.push(item),
            Err(err) => {
                failure = match failure {
                    None | Some(CampaignError::Aborted) => Some(err),
                    Some(first) => Some(first),
                };
            }
        }
    }
    match failure {
        Some(err) => Err(err),
        None if progress.is_aborted() => Err(CampaignError::Aborted),
        None => Ok(completed),
    }
}
