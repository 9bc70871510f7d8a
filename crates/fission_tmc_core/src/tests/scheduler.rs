//! Planning and both scheduling modes

use super::{Script, U235, scripted_executor};
use crate::config::SamplerConfig;
use crate::error::{CampaignError, ConfigError, ExternalToolError};
use crate::model::{CampaignSpec, Mode, ParameterDefinition, TrialResults};
use crate::progress::CampaignProgress;
use crate::sampling::Distribution;
use crate::scheduler::{PoolSizes, TrialPlan, plan_trials, planning_rng, run_campaign};

const POOLS: PoolSizes = PoolSizes {
    outer: 2,
    inner: 2,
    all_parameters: 3,
};

fn parameters() -> Vec<ParameterDefinition> {
    vec![
        ParameterDefinition::new("Tscale", 0.93),
        ParameterDefinition::new("Econd", 2.0),
        ParameterDefinition::new("_Delta_S0", 0.0),
    ]
}

fn spec(mode: Mode, distribution: Distribution, trial_count: usize) -> CampaignSpec {
    CampaignSpec {
        reaction: U235,
        events_per_trial: 100_000,
        trial_count,
        distribution,
        with_evaporation: false,
        mode,
    }
}

#[test]
fn test_single_parameter_mode_groups_every_trial() {
    let root = tempfile::tempdir().unwrap();
    let (executor, generator) = scripted_executor(root.path(), Script::Succeed);
    let spec = spec(Mode::SingleParameter, Distribution::Uniform, 5);
    let plan = plan_trials(
        &spec,
        &parameters(),
        &SamplerConfig::default(),
        &mut planning_rng(Some(42)),
    )
    .unwrap();
    let progress = CampaignProgress::default();

    let campaign = run_campaign(spec, parameters(), plan, &executor, POOLS, &progress).unwrap();

    let groups = campaign.groups();
    assert_eq!(groups.len(), 3);
    for group in groups {
        assert_eq!(group.trials.len(), 5, "group {}", group.parameter.name);
        let indices: Vec<usize> = group.trials.iter().map(|t| t.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        for trial in &group.trials {
            let expected = format!("Param_{}_{}", group.parameter.name, trial.index);
            assert_eq!(trial.outcome.trial_id.as_str(), expected);
        }
    }
    assert!(campaign.baseline.trial_id.is_baseline());
    assert_eq!(generator.runs(), 16, "15 trials plus the baseline");
    assert_eq!(progress.completed(), 16);
    assert_eq!(progress.total(), 16);
}

#[test]
fn test_parameter_file_matches_recorded_value() {
    let root = tempfile::tempdir().unwrap();
    let (executor, generator) = scripted_executor(root.path(), Script::Succeed);
    let spec = spec(Mode::SingleParameter, Distribution::MaxMin, 2);
    let plan = plan_trials(
        &spec,
        &parameters(),
        &SamplerConfig::default(),
        &mut planning_rng(None),
    )
    .unwrap();

    let campaign = run_campaign(
        spec,
        parameters(),
        plan,
        &executor,
        POOLS,
        &CampaignProgress::default(),
    )
    .unwrap();

    let files = generator.parameter_files();
    let econd = campaign
        .groups()
        .iter()
        .find(|g| g.parameter.name == "Econd")
        .unwrap();
    let values: Vec<f64> = econd.trials.iter().map(|t| t.value).collect();
    assert_eq!(values, vec![2.0, 3.0]);
    let written = files
        .iter()
        .find(|(dir, _)| dir == "GEF_Param_Econd_1")
        .map(|(_, text)| text.as_str());
    assert_eq!(written, Some("Econd = 3\n"));
    let baseline = files
        .iter()
        .find(|(dir, _)| dir == "GEF_Unperturbed_Param")
        .map(|(_, text)| text.as_str());
    assert_eq!(baseline, Some(""), "baseline runs with no overrides");
}

#[test]
fn test_all_parameters_mode_perturbs_whole_vector() {
    let root = tempfile::tempdir().unwrap();
    let (executor, generator) = scripted_executor(root.path(), Script::Succeed);
    let spec = spec(Mode::AllParameters, Distribution::Normal, 4);
    let plan = plan_trials(
        &spec,
        &parameters(),
        &SamplerConfig::default(),
        &mut planning_rng(Some(7)),
    )
    .unwrap();

    let campaign = run_campaign(
        spec,
        parameters(),
        plan,
        &executor,
        POOLS,
        &CampaignProgress::default(),
    )
    .unwrap();

    let trials = campaign.all_parameter_trials();
    assert_eq!(trials.len(), 4);
    for trial in trials {
        assert_eq!(trial.perturbations.len(), 3);
        assert!(trial.value_of("Econd").is_some());
        assert_eq!(trial.outcome.trial_id.as_str(), format!("TMC_{}", trial.index));
    }
    assert_eq!(generator.runs(), 5);
    assert!(matches!(campaign.results, TrialResults::AllParameters(_)));
}

#[test]
fn test_max_min_scale_applies_per_trial_in_all_parameters_mode() {
    let spec = spec(Mode::AllParameters, Distribution::MaxMin, 2);
    let plan = plan_trials(
        &spec,
        &parameters(),
        &SamplerConfig::default(),
        &mut planning_rng(Some(1)),
    )
    .unwrap();

    let TrialPlan::AllParameters(trials) = plan else {
        panic!("expected an all-parameters plan");
    };
    let econd: Vec<f64> = trials
        .iter()
        .map(|t| t.iter().find(|p| p.parameter == "Econd").unwrap().value)
        .collect();
    assert_eq!(econd, vec![2.0, 3.0]);
    let shifted: Vec<f64> = trials
        .iter()
        .map(|t| t.iter().find(|p| p.parameter == "_Delta_S0").unwrap().value)
        .collect();
    assert_eq!(shifted, vec![0.0, 0.5]);
}

#[test]
fn test_seeded_plans_are_reproducible() {
    let spec = spec(Mode::SingleParameter, Distribution::Uniform, 6);
    let config = SamplerConfig::default();
    let first = plan_trials(&spec, &parameters(), &config, &mut planning_rng(Some(99))).unwrap();
    let second = plan_trials(&spec, &parameters(), &config, &mut planning_rng(Some(99))).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.trial_count(), 18);
}

#[test]
fn test_config_errors_surface_before_any_trial() {
    let spec = spec(Mode::SingleParameter, Distribution::MaxMin, 3);
    let err = plan_trials(
        &spec,
        &parameters(),
        &SamplerConfig::default(),
        &mut planning_rng(Some(1)),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::MaxMinLengthMismatch { .. }));

    let mut config = SamplerConfig::default();
    config.normal_fractions.remove("Econd");
    let spec = self::spec(Mode::AllParameters, Distribution::Normal, 3);
    let err = plan_trials(&spec, &parameters(), &config, &mut planning_rng(Some(1))).unwrap_err();
    assert!(matches!(err, ConfigError::MissingStdDev(name) if name == "Econd"));
}

#[test]
fn test_failed_trial_aborts_campaign() {
    let root = tempfile::tempdir().unwrap();
    let (executor, _) = scripted_executor(root.path(), Script::Crash);
    let spec = spec(Mode::AllParameters, Distribution::Uniform, 6);
    let plan = plan_trials(
        &spec,
        &parameters(),
        &SamplerConfig::default(),
        &mut planning_rng(Some(3)),
    )
    .unwrap();
    let progress = CampaignProgress::default();

    let err = run_campaign(spec, parameters(), plan, &executor, POOLS, &progress).unwrap_err();

    assert!(
        matches!(
            err,
            CampaignError::ExternalTool(ExternalToolError::NonZeroExit { .. })
        ),
        "got {err:?}"
    );
    assert!(progress.is_aborted());
    assert_eq!(progress.completed(), 0);
}

#[test]
fn test_progress_reused_after_aborted_campaign() {
    let progress = CampaignProgress::default();
    let plan_for = |spec: &CampaignSpec| {
        plan_trials(
            spec,
            &parameters(),
            &SamplerConfig::default(),
            &mut planning_rng(Some(5)),
        )
        .unwrap()
    };

    let crashed = tempfile::tempdir().unwrap();
    let (executor, _) = scripted_executor(crashed.path(), Script::Crash);
    let spec = spec(Mode::AllParameters, Distribution::Uniform, 2);
    let plan = plan_for(&spec);
    assert!(run_campaign(spec, parameters(), plan, &executor, POOLS, &progress).is_err());
    assert!(progress.is_aborted());

    let healthy = tempfile::tempdir().unwrap();
    let (executor, _) = scripted_executor(healthy.path(), Script::Succeed);
    let spec = self::spec(Mode::AllParameters, Distribution::Uniform, 2);
    let plan = plan_for(&spec);
    let campaign = run_campaign(spec, parameters(), plan, &executor, POOLS, &progress).unwrap();

    assert_eq!(campaign.all_parameter_trials().len(), 2);
    assert!(!progress.is_aborted());
    assert_eq!(progress.completed(), 3);
}
