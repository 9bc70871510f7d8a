//! Perturbation magnitude sampling
//!
//! Magnitudes are not perturbed values yet. The perturber combines them with
//! the nominal value (sign for `uniform`, product for `max-min`).

use rand::Rng;
use rand::distr::{Distribution as _, Uniform};
use rustc_hash::FxHashMap;

use crate::config::SamplerConfig;
use crate::error::ConfigError;
use crate::sampling::Distribution;

/// Draws magnitudes for one parameter under one distribution family
#[derive(Debug, Clone)]
pub struct Sampler {
    uniform_span: f64,
    normal_fractions: FxHashMap<String, f64>,
    max_min_scales: Vec<f64>,
}

impl Sampler {
    #[must_use]
    pub fn new(config: &SamplerConfig) -> Self {
        Self {
            uniform_span: config.uniform_span,
            normal_fractions: config
                .normal_fractions
                .iter()
                .map(|(name, fraction)| (name.clone(), *fraction))
                .collect(),
            max_min_scales: config.max_min_scales.clone(),
        }
    }

    /// Standard deviation for `normal`, `fraction * |nominal|`
    pub fn normal_std_dev(&self, name: &str, nominal: f64) -> Result<f64, ConfigError> {
        self.normal_fractions
            .get(name)
            .map(|fraction| fraction * nominal.abs())
            .ok_or_else(|| ConfigError::MissingStdDev(name.to_string()))
    }

    /// Check up front that `count` magnitudes can be drawn for `name`
    pub fn check(
        &self,
        distribution: Distribution,
        name: &str,
        count: usize,
    ) -> Result<(), ConfigError> {
        match distribution {
            Distribution::Uniform => Ok(()),
            Distribution::Normal => self.normal_std_dev(name, 0.0).map(|_| ()),
            Distribution::MaxMin if self.max_min_scales.len() == count => Ok(()),
            Distribution::MaxMin => Err(ConfigError::MaxMinLengthMismatch {
                scales: self.max_min_scales.len(),
                trials: count,
            }),
        }
    }

    /// Produce `count` magnitudes for parameter `name` with nominal value `nominal`
    pub fn sample<R: Rng + ?Sized>(
        &self,
        distribution: Distribution,
        name: &str,
        nominal: f64,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<f64>, ConfigError> {
        self.check(distribution, name, count)?;
        match distribution {
            Distribution::Uniform => {
                let base = nominal.abs();
                let window = Uniform::new_inclusive(
                    base * (1.0 - self.uniform_span),
                    base * (1.0 + self.uniform_span),
                )
                .map_err(|err| invalid_window(name, nominal, err))?;
                Ok(window.sample_iter(rng).take(count).collect())
            }
            Distribution::Normal => {
                let std_dev = self.normal_std_dev(name, nominal)?;
                let normal = rand_distr::Normal::new(nominal, std_dev)
                    .map_err(|err| invalid_window(name, nominal, err))?;
                Ok(normal.sample_iter(rng).take(count).collect())
            }
            Distribution::MaxMin => Ok(self.max_min_scales.clone()),
        }
    }
}

fn invalid_window(name: &str, nominal: f64, err: impl std::fmt::Display) -> ConfigError {
    ConfigError::InvalidValue {
        field: name.to_string(),
        message: format!("cannot sample around nominal {nominal}: {err}"),
    }
}
