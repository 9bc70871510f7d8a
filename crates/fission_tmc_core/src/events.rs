//! Raw per-event output of the generator
//!
//! Event lines start with the target Z. In the extended listing each event
//! line may be followed by tagged emission lines:
//! tags 1 and 2 hold neutron energies (light, heavy fragment) in groups of
//! four values, tags 3..=8 hold gamma energies (3-5 light, 6-8 heavy).

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::ExternalToolError;

const COL_Z_LIGHT: usize = 2;
const COL_Z_HEAVY: usize = 3;
const COL_A_LIGHT: usize = 4;
const COL_A_HEAVY: usize = 5;
const COL_EXC_LIGHT: usize = 18;
const COL_EXC_HEAVY: usize = 19;
const COL_TKE: usize = 22;

const COMMENT_MARKER: char = '*';
const NEUTRON_GROUP: usize = 4;

/// Summed emission energies attached to one event
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EmissionEnergies {
    pub neutron_light: f32,
    pub neutron_heavy: f32,
    pub gamma_light: f32,
    pub gamma_heavy: f32,
}

/// One fission event as listed by the generator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawEvent {
    pub z_light: u16,
    pub a_light: u16,
    pub z_heavy: u16,
    pub a_heavy: u16,
    /// Excitation energy of the light fragment (MeV)
    pub exc_light: f32,
    /// Excitation energy of the heavy fragment (MeV)
    pub exc_heavy: f32,
    /// Pre-neutron total kinetic energy (MeV)
    pub tke: f32,
    pub emission: EmissionEnergies,
}

impl RawEvent {
    /// Event without emission data
    #[must_use]
    pub fn new(
        (z_light, a_light): (u16, u16),
        (z_heavy, a_heavy): (u16, u16),
        exc_light: f32,
        exc_heavy: f32,
        tke: f32,
    ) -> Self {
        Self {
            z_light,
            a_light,
            z_heavy,
            a_heavy,
            exc_light,
            exc_heavy,
            tke,
            emission: EmissionEnergies::default(),
        }
    }
}

/// Parsed event listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventTable {
    pub events: Vec<RawEvent>,
    /// True when tagged emission lines were present
    pub extended: bool,
    /// Event lines dropped because a field was missing or carried the
    /// generator's error marker
    pub skipped_lines: usize,
}

impl EventTable {
    #[must_use]
    pub fn from_events(events: Vec<RawEvent>, extended: bool) -> Self {
        Self {
            events,
            extended,
            skipped_lines: 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Parse an event listing for a target of charge `z_target`
#[must_use]
pub fn parse_events(text: &str, z_target: u16) -> EventTable {
    let target = z_target.to_string();
    let mut table = EventTable::default();
    // Emission lines belong to the most recent accepted event
    let mut current: Option<usize> = None;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(COMMENT_MARKER) {
            continue;
        }
        let mut tokens = trimmed.split_whitespace();
        let Some(first) = tokens.next() else {
            continue;
        };

        if first == target {
            match parse_event_line(trimmed) {
                Some(event) => {
                    table.events.push(event);
                    current = Some(table.events.len() - 1);
                }
                None => {
                    table.skipped_lines += 1;
                    current = None;
                }
            }
            continue;
        }

        let Ok(tag) = first.parse::<u8>() else {
            continue;
        };
        if !(1..=8).contains(&tag) {
            continue;
        }
        table.extended = true;
        let Some(index) = current else {
            continue;
        };
        let emission = &mut table.events[index].emission;
        let values: Vec<&str> = tokens.collect();
        match tag {
            1 => emission.neutron_light += sum_neutron_energies(&values),
            2 => emission.neutron_heavy += sum_neutron_energies(&values),
            3..=5 => emission.gamma_light += sum_gamma_energies(&values),
            _ => emission.gamma_heavy += sum_gamma_energies(&values),
        }
    }

    if table.skipped_lines > 0 {
        debug!(
            skipped = table.skipped_lines,
            accepted = table.events.len(),
            "Skipped malformed event lines"
        );
    }
    table
}

/// Read and parse the generator's event file. A missing, empty or eventless
/// file means the generator crashed.
pub fn read_event_file(path: &Path, z_target: u16) -> Result<EventTable, ExternalToolError> {
    if !path.is_file() {
        return Err(ExternalToolError::MissingOutput(path.to_path_buf()));
    }
    let text = fs::read_to_string(path).map_err(|e| ExternalToolError::io(path, e))?;
    if text.trim().is_empty() {
        return Err(ExternalToolError::EmptyOutput(path.to_path_buf()));
    }
    let table = parse_events(&text, z_target);
    if table.is_empty() {
        return Err(ExternalToolError::EmptyOutput(path.to_path_buf()));
    }
    Ok(table)
}

fn parse_event_line(line: &str) -> Option<RawEvent> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() <= COL_TKE {
        return None;
    }
    let mass_or_charge = |col: usize| -> Option<u16> {
        let value: f32 = fields[col].parse().ok()?;
        (value.is_finite() && value >= 0.0).then_some(value.round() as u16)
    };
    let energy = |col: usize| -> Option<f32> {
        let value: f32 = fields[col].parse().ok()?;
        value.is_finite().then_some(value)
    };
    Some(RawEvent::new(
        (mass_or_charge(COL_Z_LIGHT)?, mass_or_charge(COL_A_LIGHT)?),
        (mass_or_charge(COL_Z_HEAVY)?, mass_or_charge(COL_A_HEAVY)?),
        energy(COL_EXC_LIGHT)?,
        energy(COL_EXC_HEAVY)?,
        energy(COL_TKE)?,
    ))
}

/// Neutron lines repeat (energy, ...) in groups of four; the energy leads
fn sum_neutron_energies(values: &[&str]) -> f32 {
    let total: f64 = values
        .iter()
        .step_by(NEUTRON_GROUP)
        .filter_map(|v| v.parse::<f64>().ok())
        .sum();
    total as f32
}

/// Gamma lines mix energies with labels; only numeric tokens count
fn sum_gamma_energies(values: &[&str]) -> f32 {
    let total: f64 = values
        .iter()
        .filter(|v| v.starts_with(|c: char| c.is_ascii_digit()))
        .filter_map(|v| v.parse::<f64>().ok())
        .sum();
    total as f32
}
