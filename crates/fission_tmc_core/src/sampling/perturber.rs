//! Turning sampled magnitudes into perturbed parameter values

use rand::Rng;
use rand::distr::{Distribution as _, Uniform};
use rand_distr::Normal;
use rustc_hash::FxHashSet;

use crate::config::SamplerConfig;
use crate::error::ConfigError;
use crate::sampling::Distribution;

/// Decimal places kept in every perturbed value
pub const ROUNDING_DECIMALS: i32 = 9;

/// Round to [`ROUNDING_DECIMALS`] places
#[must_use]
pub fn round_value(value: f64) -> f64 {
    let scale = 10f64.powi(ROUNDING_DECIMALS);
    (value * scale).round() / scale
}

/// Applies the per-distribution rule, with absolute draws for zero-nominal
/// parameters where a relative perturbation would always be zero
#[derive(Debug, Clone)]
pub struct Perturber {
    zero_nominal: FxHashSet<String>,
    special_uniform: Uniform<f64>,
    special_normal: Normal<f64>,
}

impl Perturber {
    pub fn new(config: &SamplerConfig) -> Result<Self, ConfigError> {
        let bound = config.special_uniform_bound;
        let special_uniform =
            Uniform::new_inclusive(-bound, bound).map_err(|err| ConfigError::InvalidValue {
                field: "special_uniform_bound".into(),
                message: err.to_string(),
            })?;
        let special_normal = Normal::new(0.0, config.special_normal_std).map_err(|err| {
            ConfigError::InvalidValue {
                field: "special_normal_std".into(),
                message: err.to_string(),
            }
        })?;
        Ok(Self {
            zero_nominal: config.zero_nominal_parameters.iter().cloned().collect(),
            special_uniform,
            special_normal,
        })
    }

    #[must_use]
    pub fn is_zero_nominal(&self, name: &str) -> bool {
        self.zero_nominal.contains(name)
    }

    /// Perturbed value for `name`, rounded to nine decimals
    pub fn perturb<R: Rng + ?Sized>(
        &self,
        name: &str,
        nominal: f64,
        magnitude: f64,
        distribution: Distribution,
        rng: &mut R,
    ) -> f64 {
        let value = if self.is_zero_nominal(name) {
            match distribution {
                Distribution::Uniform => self.special_uniform.sample(rng),
                Distribution::Normal => self.special_normal.sample(rng),
                Distribution::MaxMin => magnitude - 1.0,
            }
        } else {
            match distribution {
                Distribution::Uniform => sign(nominal) * magnitude,
                Distribution::Normal => magnitude,
                Distribution::MaxMin => nominal * magnitude,
            }
        };
        round_value(value)
    }
}

/// -1, 0 or 1; zero stays zero
fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_value() {
        assert_eq!(round_value(0.123_456_789_4), 0.123_456_789);
        assert_eq!(round_value(-1.000_000_000_6), -1.000_000_001);
        assert_eq!(round_value(15.0), 15.0);
    }

    #[test]
    fn test_sign_of_zero_is_zero() {
        assert_eq!(sign(0.0), 0.0);
        assert_eq!(sign(-3.2), -1.0);
    }
}
