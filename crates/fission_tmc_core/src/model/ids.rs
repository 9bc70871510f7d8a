//! Trial identifiers
//!
//! A trial id is embedded in every path and artifact name a trial touches,
//! so two trials of one campaign must never share an id.

use std::fmt;

use serde::{Deserialize, Serialize};

const BASELINE_ID: &str = "Unperturbed_Param";
const SINGLE_PARAMETER_PREFIX: &str = "Param";
const ALL_PARAMETERS_PREFIX: &str = "TMC";

/// Unique identifier for one trial within a campaign
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrialId(String);

impl TrialId {
    /// The unperturbed reference run
    #[must_use]
    pub fn baseline() -> Self {
        Self(BASELINE_ID.to_string())
    }

    /// Trial `index` of a parameter-at-a-time campaign
    #[must_use]
    pub fn single(parameter: &str, index: usize) -> Self {
        Self(format!("{SINGLE_PARAMETER_PREFIX}_{parameter}_{index}"))
    }

    /// Trial `index` of an all-parameters campaign
    #[must_use]
    pub fn all_parameters(index: usize) -> Self {
        Self(format!("{ALL_PARAMETERS_PREFIX}_{index}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_baseline(&self) -> bool {
        self.0 == BASELINE_ID
    }
}

impl fmt::Display for TrialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trial_ids_are_distinct_per_index() {
        assert_eq!(TrialId::single("Tscale", 3).as_str(), "Param_Tscale_3");
        assert_eq!(TrialId::all_parameters(0).as_str(), "TMC_0");
        assert_ne!(TrialId::single("Tscale", 1), TrialId::single("Tscale", 11));
        assert!(TrialId::baseline().is_baseline());
        assert!(!TrialId::all_parameters(2).is_baseline());
    }
}
