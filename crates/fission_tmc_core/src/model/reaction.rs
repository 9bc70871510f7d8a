//! Target nuclide and incident energy of a campaign

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::format::format_energy;

/// Element symbols for the actinides the generator is usually run on
const ELEMENTS: &[(u16, &str)] = &[
    (90, "Th"),
    (91, "Pa"),
    (92, "U"),
    (93, "Np"),
    (94, "Pu"),
    (95, "Am"),
    (96, "Cm"),
    (97, "Bk"),
    (98, "Cf"),
    (99, "Es"),
    (100, "Fm"),
];

/// Look up the chemical symbol for a proton number
pub fn element_symbol(z: u16) -> Result<&'static str, ConfigError> {
    ELEMENTS
        .iter()
        .find(|(number, _)| *number == z)
        .map(|(_, symbol)| *symbol)
        .ok_or(ConfigError::UnknownElement(z))
}

/// Neutron-induced fission of a target nucleus
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    /// Proton number of the target
    pub z_target: u16,
    /// Mass number of the compound nucleus (target + 1)
    pub a_compound: u16,
    /// Incident neutron energy in MeV
    pub energy_mev: f64,
}

impl Reaction {
    #[must_use]
    pub fn new(z_target: u16, a_compound: u16, energy_mev: f64) -> Self {
        Self {
            z_target,
            a_compound,
            energy_mev,
        }
    }

    /// Mass number of the target nucleus
    #[must_use]
    pub fn a_target(&self) -> u16 {
        self.a_compound.saturating_sub(1)
    }

    pub fn symbol(&self) -> Result<&'static str, ConfigError> {
        element_symbol(self.z_target)
    }

    /// Energy as it appears in generator file names
    #[must_use]
    pub fn energy_label(&self) -> String {
        format_energy(self.energy_mev)
    }

    /// `Z92_A236_n_E2.53e-08MeV`, shared by output and campaign file names
    #[must_use]
    pub fn label(&self) -> String {
        format!(
            "Z{}_A{}_n_E{}MeV",
            self.z_target,
            self.a_compound,
            self.energy_label()
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.symbol()?;
        if self.a_compound <= self.z_target {
            return Err(ConfigError::InvalidValue {
                field: "a_compound".into(),
                message: format!("{} is not above Z = {}", self.a_compound, self.z_target),
            });
        }
        if !self.energy_mev.is_finite() || self.energy_mev < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "energy_mev".into(),
                message: format!("{} is not a valid incident energy", self.energy_mev),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reaction_label() {
        let reaction = Reaction::new(92, 236, 2.53e-8);
        assert_eq!(reaction.label(), "Z92_A236_n_E2.53e-08MeV");
        assert_eq!(reaction.a_target(), 235);
        assert_eq!(reaction.symbol().unwrap(), "U");
    }

    #[test]
    fn test_unknown_element() {
        let reaction = Reaction::new(26, 57, 1.0);
        assert!(matches!(
            reaction.validate(),
            Err(ConfigError::UnknownElement(26))
        ));
    }
}
