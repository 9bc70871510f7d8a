use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Distribution family used to draw perturbation magnitudes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Distribution {
    /// Uniform around |nominal| with a configured relative span
    Uniform,
    /// Normal around nominal with a per-parameter relative width
    Normal,
    /// Fixed user-supplied scale factors, one per trial
    MaxMin,
}

impl Distribution {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Distribution::Uniform => "uniform",
            Distribution::Normal => "normal",
            Distribution::MaxMin => "max-min",
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Distribution {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uniform" => Ok(Distribution::Uniform),
            "normal" => Ok(Distribution::Normal),
            "max-min" | "maxmin" | "max_min" => Ok(Distribution::MaxMin),
            _ => Err(ConfigError::InvalidDistribution(s.to_string())),
        }
    }
}
