//! Magnitude sampling and perturbation rules

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::SamplerConfig;
use crate::error::ConfigError;
use crate::sampling::{Distribution, Perturber, Sampler};

fn perturb_all(
    name: &str,
    nominal: f64,
    distribution: Distribution,
    count: usize,
    seed: u64,
) -> Vec<f64> {
    let config = SamplerConfig::default();
    let sampler = Sampler::new(&config);
    let perturber = Perturber::new(&config).unwrap();
    let mut rng = StdRng::seed_from_u64(seed);
    sampler
        .sample(distribution, name, nominal, count, &mut rng)
        .unwrap()
        .into_iter()
        .map(|m| perturber.perturb(name, nominal, m, distribution, &mut rng))
        .collect()
}

#[test]
fn test_uniform_preserves_sign_of_nominal() {
    for nominal in [-2.5, -0.1, 0.3, 7.0] {
        let values = perturb_all("Tscale", nominal, Distribution::Uniform, 200, 11);
        assert!(
            values.iter().all(|v| v.signum() == f64::signum(nominal)),
            "uniform values for nominal {nominal} changed sign: {values:?}"
        );
        let (low, high) = (nominal.abs() * 0.5, nominal.abs() * 1.5);
        assert!(
            values.iter().all(|v| (low..=high).contains(&v.abs())),
            "uniform values for nominal {nominal} left the window"
        );
    }
}

#[test]
fn test_zero_nominal_ignores_nominal_value() {
    for distribution in [Distribution::Uniform, Distribution::Normal] {
        let at_zero = perturb_all("_Delta_S0", 0.0, distribution, 50, 3);
        let at_five = perturb_all("_Delta_S0", 5.0, distribution, 50, 3);
        assert_eq!(
            at_zero, at_five,
            "{distribution} output depends on the nominal value"
        );
    }
    let uniform = perturb_all("_Delta_S0", 0.0, Distribution::Uniform, 200, 5);
    assert!(uniform.iter().all(|v| (-0.5..=0.5).contains(v)));
    let max_min = perturb_all("_Delta_S0", 42.0, Distribution::MaxMin, 2, 0);
    assert_eq!(max_min, vec![0.0, 0.5]);
}

#[test]
fn test_max_min_scales_nominal() {
    let values = perturb_all("Tscale", 10.0, Distribution::MaxMin, 2, 0);
    assert_eq!(values, vec![10.0, 15.0]);
}

#[test]
fn test_max_min_length_mismatch_is_config_error() {
    let sampler = Sampler::new(&SamplerConfig::default());
    let mut rng = StdRng::seed_from_u64(1);
    let err = sampler
        .sample(Distribution::MaxMin, "Tscale", 10.0, 3, &mut rng)
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::MaxMinLengthMismatch {
            scales: 2,
            trials: 3
        }
    ));
}

#[test]
fn test_normal_centered_on_nominal() {
    let values = perturb_all("Tscale", 2.0, Distribution::Normal, 2000, 9);
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    assert!((mean - 2.0).abs() < 0.01, "mean {mean} not near nominal");
    assert!(
        values.iter().all(|v| (v - 2.0).abs() < 0.06 * 6.0),
        "value beyond six standard deviations"
    );
}

#[test]
fn test_normal_without_fraction_is_config_error() {
    let sampler = Sampler::new(&SamplerConfig::default());
    let mut rng = StdRng::seed_from_u64(1);
    let err = sampler
        .sample(Distribution::Normal, "NotAParameter", 1.0, 4, &mut rng)
        .unwrap_err();
    assert!(matches!(err, ConfigError::MissingStdDev(name) if name == "NotAParameter"));
}

#[test]
fn test_values_rounded_to_nine_decimals() {
    let values = perturb_all("Tscale", 0.93, Distribution::Uniform, 20, 17);
    for v in values {
        let scaled = v * 1e9;
        assert!(
            (scaled - scaled.round()).abs() < 1e-3,
            "{v} has more than nine decimals"
        );
    }
}

#[test]
fn test_unknown_distribution_rejected() {
    let err = "triangular".parse::<Distribution>().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidDistribution(name) if name == "triangular"));
}
