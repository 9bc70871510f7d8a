//! Campaign result model
//!
//! A campaign owns its baseline and every trial. Trials never reference each
//! other and carry only what they need: the perturbation(s) that produced
//! them and their own outcome.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{Reaction, Report, TrialId, YieldTable};
use crate::sampling::Distribution;

/// How trials perturb parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Each trial perturbs exactly one parameter
    SingleParameter,
    /// Each trial perturbs the whole parameter vector (TMC)
    AllParameters,
}

impl Mode {
    /// Prefix used in campaign file names
    #[must_use]
    pub fn file_prefix(self) -> &'static str {
        match self {
            Mode::SingleParameter => "Single",
            Mode::AllParameters => "TMC",
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" | "single_parameters" | "single-parameter" => Ok(Mode::SingleParameter),
            "tmc" | "all" | "all-parameters" => Ok(Mode::AllParameters),
            _ => Err(ConfigError::InvalidValue {
                field: "mode".into(),
                message: format!("{s:?} is not one of single, tmc"),
            }),
        }
    }
}

/// A generator parameter and its unperturbed value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub name: String,
    pub nominal: f64,
}

impl ParameterDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>, nominal: f64) -> Self {
        Self {
            name: name.into(),
            nominal,
        }
    }
}

/// One perturbed parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Perturbation {
    pub parameter: String,
    pub value: f64,
}

/// Everything one simulation run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialOutcome {
    pub trial_id: TrialId,
    pub yields: YieldTable,
    /// Unique splits seen once and dropped from `yields`
    pub ignored_singletons: usize,
    /// Events parsed from the generator output, before any filtering
    pub raw_events: usize,
    pub generator_report: Report,
    /// Present when the evaporation stage ran
    pub evaporation_report: Option<Report>,
}

/// A trial of parameter-at-a-time mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleParameterTrial {
    pub index: usize,
    pub value: f64,
    pub outcome: TrialOutcome,
}

/// All trials of one parameter in parameter-at-a-time mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterGroup {
    pub parameter: ParameterDefinition,
    pub trials: Vec<SingleParameterTrial>,
}

/// A trial of all-parameters mode: one outcome shared by the whole vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllParametersTrial {
    pub index: usize,
    pub perturbations: Vec<Perturbation>,
    pub outcome: TrialOutcome,
}

impl AllParametersTrial {
    /// Perturbed value of `parameter` in this trial
    #[must_use]
    pub fn value_of(&self, parameter: &str) -> Option<f64> {
        self.perturbations
            .iter()
            .find(|p| p.parameter == parameter)
            .map(|p| p.value)
    }
}

/// Trials in completion order, shaped by the scheduling mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrialResults {
    SingleParameter(Vec<ParameterGroup>),
    AllParameters(Vec<AllParametersTrial>),
}

impl TrialResults {
    #[must_use]
    pub fn mode(&self) -> Mode {
        match self {
            TrialResults::SingleParameter(_) => Mode::SingleParameter,
            TrialResults::AllParameters(_) => Mode::AllParameters,
        }
    }

    /// Number of simulation outcomes across all groups
    #[must_use]
    pub fn trial_count(&self) -> usize {
        match self {
            TrialResults::SingleParameter(groups) => groups.iter().map(|g| g.trials.len()).sum(),
            TrialResults::AllParameters(trials) => trials.len(),
        }
    }

    /// Every outcome, group by group
    pub fn outcomes(&self) -> Box<dyn Iterator<Item = &TrialOutcome> + '_> {
        match self {
            TrialResults::SingleParameter(groups) => Box::new(
                groups
                    .iter()
                    .flat_map(|g| g.trials.iter().map(|t| &t.outcome)),
            ),
            TrialResults::AllParameters(trials) => Box::new(trials.iter().map(|t| &t.outcome)),
        }
    }
}

/// Fixed inputs of a campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignSpec {
    pub reaction: Reaction,
    /// Generator events requested per trial
    pub events_per_trial: u64,
    /// Trials requested (per parameter in single-parameter mode)
    pub trial_count: usize,
    pub distribution: Distribution,
    pub with_evaporation: bool,
    pub mode: Mode,
}

/// The owning aggregate of one analysis campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub spec: CampaignSpec,
    pub parameters: Vec<ParameterDefinition>,
    pub baseline: TrialOutcome,
    pub results: TrialResults,
}

impl Campaign {
    #[must_use]
    pub fn new(
        spec: CampaignSpec,
        parameters: Vec<ParameterDefinition>,
        baseline: TrialOutcome,
        results: TrialResults,
    ) -> Self {
        Self {
            spec,
            parameters,
            baseline,
            results,
        }
    }

    /// Nominal value of a parameter
    #[must_use]
    pub fn nominal(&self, parameter: &str) -> Option<f64> {
        self.parameters
            .iter()
            .find(|p| p.name == parameter)
            .map(|p| p.nominal)
    }

    /// Groups of a parameter-at-a-time campaign, empty otherwise
    #[must_use]
    pub fn groups(&self) -> &[ParameterGroup] {
        match &self.results {
            TrialResults::SingleParameter(groups) => groups,
            TrialResults::AllParameters(_) => &[],
        }
    }

    /// Trials of an all-parameters campaign, empty otherwise
    #[must_use]
    pub fn all_parameter_trials(&self) -> &[AllParametersTrial] {
        match &self.results {
            TrialResults::AllParameters(trials) => trials,
            TrialResults::SingleParameter(_) => &[],
        }
    }

    /// `TMC_Z92_A236_n_E2.53e-08MeV`, the campaign file name without
    /// batch suffix or extension
    #[must_use]
    pub fn file_stem(&self) -> String {
        format!(
            "{}_{}",
            self.spec.mode.file_prefix(),
            self.spec.reaction.label()
        )
    }
}
