//! Fission-yield reduction
//!
//! Turns one trial's raw events into the summary table:
//! 1. drop multi-chance events (fragment masses not adding up to the compound)
//! 2. swap the (Z, A) pairs so the light fragment has the smaller mass;
//!    energy columns are left as listed
//! 3. group by (Zl, Al, Zh, Ah) and drop splits seen only once
//! 4. yield = count / (retained population)
//! 5. per split, f64 means and sample standard deviations (n - 1)
//!
//! The multi-chance filter runs before the swap. Rows come out sorted by key
//! so two reductions of the same events are identical.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::ReduceError;
use crate::events::{EventTable, RawEvent};
use crate::model::{YieldFormat, YieldTable};

type SplitKey = (u16, u16, u16, u16);

/// Reduce `events` for a compound nucleus of mass `a_compound`.
///
/// Returns the table and the number of singleton splits dropped.
pub fn reduce(
    events: &EventTable,
    a_compound: u16,
    capacity: usize,
) -> Result<(YieldTable, usize), ReduceError> {
    let format = if events.extended {
        YieldFormat::Extended
    } else {
        YieldFormat::Basic
    };

    let first_chance: Vec<RawEvent> = events
        .events
        .iter()
        .filter(|e| u32::from(e.a_light) + u32::from(e.a_heavy) == u32::from(a_compound))
        .map(canonicalize)
        .collect();
    let multi_chance = events.len() - first_chance.len();

    let mut groups: BTreeMap<SplitKey, Vec<&RawEvent>> = BTreeMap::new();
    for event in &first_chance {
        groups
            .entry((event.z_light, event.a_light, event.z_heavy, event.a_heavy))
            .or_default()
            .push(event);
    }

    let ignored = groups.values().filter(|members| members.len() == 1).count();
    let retained = groups.len() - ignored;
    if retained > capacity {
        return Err(ReduceError::CapacityExceeded { retained, capacity });
    }

    let mut table = YieldTable::new(format, capacity);
    let population = (first_chance.len() - ignored) as f64;
    let mut row = vec![0.0f32; format.columns()];

    for ((zl, al, zh, ah), members) in groups.iter().filter(|(_, m)| m.len() > 1) {
        let exc_light = stats(members.iter().map(|e| f64::from(e.exc_light)));
        let exc_heavy = stats(members.iter().map(|e| f64::from(e.exc_heavy)));
        let tke = stats(members.iter().map(|e| f64::from(e.tke)));
        let txe = stats(
            members
                .iter()
                .map(|e| f64::from(e.exc_light) + f64::from(e.exc_heavy)),
        );

        row[..11].copy_from_slice(&[
            f32::from(*zl),
            f32::from(*al),
            f32::from(*zh),
            f32::from(*ah),
            (members.len() as f64 / population) as f32,
            tke.mean as f32,
            txe.mean as f32,
            exc_light.mean as f32,
            exc_light.std_dev as f32,
            exc_heavy.mean as f32,
            exc_heavy.std_dev as f32,
        ]);

        if format == YieldFormat::Extended {
            let emission = [
                stats(members.iter().map(|e| f64::from(e.emission.neutron_light))),
                stats(members.iter().map(|e| f64::from(e.emission.neutron_heavy))),
                stats(members.iter().map(|e| f64::from(e.emission.gamma_light))),
                stats(members.iter().map(|e| f64::from(e.emission.gamma_heavy))),
            ];
            for (i, s) in emission.iter().enumerate() {
                row[11 + 2 * i] = s.mean as f32;
                row[12 + 2 * i] = s.std_dev as f32;
            }
        }

        table.push_row(&row);
    }

    debug!(
        events = events.len(),
        multi_chance,
        singletons = ignored,
        retained,
        "Reduced event table"
    );
    Ok((table, ignored))
}

/// Swap the (Z, A) pairs when the listed light fragment is the heavier one.
/// Energy columns stay where the generator listed them.
fn canonicalize(event: &RawEvent) -> RawEvent {
    if event.a_light <= event.a_heavy {
        return *event;
    }
    RawEvent {
        z_light: event.z_heavy,
        a_light: event.a_heavy,
        z_heavy: event.z_light,
        a_heavy: event.a_light,
        ..*event
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Stats {
    mean: f64,
    std_dev: f64,
}

/// Two-pass mean and sample standard deviation (0 for fewer than two values)
fn stats(values: impl Iterator<Item = f64> + Clone) -> Stats {
    let (n, sum) = values.clone().fold((0usize, 0.0), |(n, s), v| (n + 1, s + v));
    if n == 0 {
        return Stats {
            mean: 0.0,
            std_dev: 0.0,
        };
    }
    let mean = sum / n as f64;
    let std_dev = if n > 1 {
        let squares: f64 = values.map(|v| (v - mean).powi(2)).sum();
        (squares / (n - 1) as f64).sqrt()
    } else {
        0.0
    };
    Stats { mean, std_dev }
}
