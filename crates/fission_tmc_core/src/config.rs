//! Campaign-wide constants for sampling and perturbation
//!
//! `SamplerConfig` is built once at campaign start and passed by reference
//! to the sampler and perturber. Nothing reads distribution constants from
//! global state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Every free parameter of the generator's parameter source. Each gets a
/// normal width of `normal_fraction * |nominal|` unless overridden.
pub const GENERATOR_PARAMETERS: &[&str] = &[
    "_Delta_S0", "EOscale", "_P_DZ_Mean_S1", "_P_corr_S1", "_P_DZ_Mean_S2",
    "_P_DZ_Mean_S3", "_P_DZ_Mean_S4", "ZC_Mode_4L", "_P_Z_Curv_S1", "P_Z_Curvmod_S1",
    "_P_Z_Curv_S2", "_S2leftmod", "P_Z_Curvmod_S2", "_P_A_Width_S2", "_P_Z_Curv_S3",
    "P_Z_Curvmod_S3", "P_Z_Curv_SL4", "P_Z_Sigma_SL4", "_P_Z_Curv_S4", "P_Z_Curvmod_S4",
    "_P_Shell_S1", "_P_Shell_S2", "_P_Shell_S3", "P_Shell_SL4", "_P_Shell_S4",
    "P_S4_mod", "_PZ_S3_olap_pos", "_PZ_S3_olap_curv", "ETHRESHSUPPS1", "ESIGSUPPS1",
    "Level_S11", "Shell_fading", "_T_low_S1", "_T_low_S2", "_T_low_S3",
    "_T_low_S4", "_T_low_SL", "T_low_S11", "_P_att_pol", "P_att_pol2",
    "P_att_pol3", "_P_att_rel", "_dE_Defo_S1", "_dE_Defo_S2", "_dE_Defo_S3",
    "_dE_Defo_S4", "_betaL0", "_betaL1", "_betaH0", "_betaH1",
    "_dbeta_S3", "kappa", "TCOLLFRAC", "_ECOLLFRAC", "TFCOLL",
    "TCOLLMIN", "ESHIFTSASCI_intr", "ESHIFTSASCI_coll", "_EDISSFRAC", "Epot_shift",
    "SIGDEFO", "SIGDEFO_0", "SIGDEFO_slope", "SIGENECK", "EexcSIGrel",
    "DNECK", "FTRUNC50", "ZTRUNC50", "FTRUNC28", "ZTRUNC28",
    "ZMAX_S2", "NTRANSFEREO", "NTRANSFERE", "Csort", "PZ_EO_symm",
    "PN_EO_Symm", "R_EO_THRESH", "R_EO_SIGMA", "R_EO_Max", "_POLARadd",
    "POLARfac", "T_POL_RED", "_HOMPOL", "ZPOL1", "P_n_x",
    "Tscale", "Econd", "Etrans", "T_orbital", "_Jscaling",
    "Spin_odd", "Esort_extend", "Esort_slope", "Esort_slope_S0",
];

/// Parameters whose nominal value is exactly zero
pub const ZERO_NOMINAL_PARAMETERS: &[&str] = &[
    "_Delta_S0",
    "P_att_pol2",
    "P_att_pol3",
    "kappa",
    "Epot_shift",
    "SIGDEFO_slope",
    "ZPOL1",
    "P_n_x",
    "T_orbital",
];

fn default_uniform_span() -> f64 {
    0.5
}

fn default_normal_fraction() -> f64 {
    0.03
}

fn default_max_min_scales() -> Vec<f64> {
    vec![1.0, 1.5]
}

fn default_special_uniform_bound() -> f64 {
    0.5
}

fn default_special_normal_std() -> f64 {
    0.03
}

fn default_normal_fractions() -> BTreeMap<String, f64> {
    GENERATOR_PARAMETERS
        .iter()
        .map(|name| ((*name).to_string(), default_normal_fraction()))
        .collect()
}

fn default_zero_nominal() -> Vec<String> {
    ZERO_NOMINAL_PARAMETERS
        .iter()
        .map(|name| (*name).to_string())
        .collect()
}

/// Distribution constants for one campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Relative half-width `s` of the uniform window around |nominal|
    #[serde(default = "default_uniform_span")]
    pub uniform_span: f64,

    /// Relative standard deviation per parameter name for `normal`.
    /// Parameters missing here cannot be sampled from a normal.
    #[serde(default = "default_normal_fractions")]
    pub normal_fractions: BTreeMap<String, f64>,

    /// Scale factors for `max-min`, one per trial
    #[serde(default = "default_max_min_scales")]
    pub max_min_scales: Vec<f64>,

    /// Half-width `c` of the absolute uniform window for zero-nominal parameters
    #[serde(default = "default_special_uniform_bound")]
    pub special_uniform_bound: f64,

    /// Absolute standard deviation `d` for zero-nominal parameters
    #[serde(default = "default_special_normal_std")]
    pub special_normal_std: f64,

    /// Names treated as zero-nominal
    #[serde(default = "default_zero_nominal")]
    pub zero_nominal_parameters: Vec<String>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            uniform_span: default_uniform_span(),
            normal_fractions: default_normal_fractions(),
            max_min_scales: default_max_min_scales(),
            special_uniform_bound: default_special_uniform_bound(),
            special_normal_std: default_special_normal_std(),
            zero_nominal_parameters: default_zero_nominal(),
        }
    }
}

impl SamplerConfig {
    /// Reject constants no distribution can be built from
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("uniform_span", self.uniform_span),
            ("special_uniform_bound", self.special_uniform_bound),
            ("special_normal_std", self.special_normal_std),
        ];
        for (field, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    message: format!("{value} must be finite and non-negative"),
                });
            }
        }
        if let Some((name, fraction)) = self
            .normal_fractions
            .iter()
            .find(|(_, fraction)| !fraction.is_finite() || **fraction < 0.0)
        {
            return Err(ConfigError::InvalidValue {
                field: format!("normal_fractions.{name}"),
                message: format!("{fraction} must be finite and non-negative"),
            });
        }
        if let Some(scale) = self.max_min_scales.iter().find(|s| !s.is_finite()) {
            return Err(ConfigError::InvalidValue {
                field: "max_min_scales".into(),
                message: format!("{scale} is not finite"),
            });
        }
        Ok(())
    }
}
