//! Loading nominal parameter values from the generator's parameter source
//!
//! Each relevant line reads `name = value ...`; anything after the value is
//! ignored. Lines starting with `'` are comments. The first definition of a
//! name wins.

use std::fs;
use std::path::Path;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{CampaignError, ConfigError, ExternalToolError};
use crate::model::ParameterDefinition;

const COMMENT_MARKER: char = '\'';

/// Parameters perturbed when no selection is configured
pub const DEFAULT_SELECTION: &[&str] = &[
    "POLARfac",
    "T_POL_RED",
    "_HOMPOL",
    "ZPOL1",
    "P_n_x",
    "Tscale",
    "Econd",
    "Etrans",
    "T_orbital",
    "_Jscaling",
    "Spin_odd",
    "Esort_extend",
    "Esort_slope",
    "Esort_slope_S0",
];

/// Every `name = value` pair in `text`, first occurrence winning
#[must_use]
pub fn parse_parameter_source(text: &str) -> FxHashMap<String, f64> {
    let mut values = FxHashMap::default();
    for line in text.lines() {
        let line = line.trim();
        if line.starts_with(COMMENT_MARKER) {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let (Some(name), Some("="), Some(value)) = (tokens.next(), tokens.next(), tokens.next())
        else {
            continue;
        };
        let value = value.trim_end_matches(|c: char| c == ',' || c == ';');
        if let Ok(value) = value.parse::<f64>() {
            values.entry(name.to_string()).or_insert(value);
        }
    }
    values
}

/// Nominal values for `selection`, in selection order
pub fn select_parameters(
    values: &FxHashMap<String, f64>,
    selection: &[String],
) -> Result<Vec<ParameterDefinition>, ConfigError> {
    if selection.is_empty() {
        return Err(ConfigError::EmptyParameterSelection);
    }
    selection
        .iter()
        .map(|name| {
            values
                .get(name)
                .map(|nominal| ParameterDefinition::new(name.clone(), *nominal))
                .ok_or_else(|| ConfigError::MissingParameter(name.clone()))
        })
        .collect()
}

/// Read `path` and return the selected parameter definitions
pub fn load_parameter_definitions(
    path: &Path,
    selection: &[String],
) -> Result<Vec<ParameterDefinition>, CampaignError> {
    let text = fs::read_to_string(path).map_err(|e| ExternalToolError::io(path, e))?;
    let values = parse_parameter_source(&text);
    debug!(
        path = %path.display(),
        available = values.len(),
        selected = selection.len(),
        "Loaded parameter source"
    );
    Ok(select_parameters(&values, selection)?)
}
