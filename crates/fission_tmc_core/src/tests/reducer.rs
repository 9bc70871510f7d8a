//! Yield reduction scenarios and invariants

use super::{split, standard_listing};
use crate::error::ReduceError;
use crate::events::{EmissionEnergies, EventTable, RawEvent, parse_events};
use crate::model::{DEFAULT_CAPACITY, YieldFormat, YieldTable, columns};
use crate::reduction::reduce;

const A_COMPOUND: u16 = 236;

fn basic(events: Vec<RawEvent>) -> EventTable {
    EventTable::from_events(events, false)
}

#[test]
fn test_singleton_split_dropped() {
    let events: Vec<RawEvent> = split(5, (38, 96), (54, 140))
        .chain(split(4, (40, 100), (52, 136)))
        .chain(split(1, (36, 90), (56, 146)))
        .collect();
    let (table, ignored) = reduce(&basic(events), A_COMPOUND, DEFAULT_CAPACITY).unwrap();

    assert_eq!(table.len(), 2, "only the two repeated splits are retained");
    assert_eq!(ignored, 1);
    let yields: Vec<f32> = table.rows().map(|r| r[columns::YIELD]).collect();
    assert!((yields[0] - 5.0 / 9.0).abs() < 1e-6, "got {yields:?}");
    assert!((yields[1] - 4.0 / 9.0).abs() < 1e-6, "got {yields:?}");
}

#[test]
fn test_multi_chance_events_excluded() {
    let events = vec![
        RawEvent::new((38, 96), (54, 140), 10.0, 8.0, 170.0),
        RawEvent::new((38, 96), (54, 139), 99.0, 99.0, 999.0),
        RawEvent::new((38, 96), (54, 140), 12.0, 6.0, 172.0),
        RawEvent::new((38, 95), (54, 140), 99.0, 99.0, 999.0),
        RawEvent::new((38, 96), (54, 140), 14.0, 4.0, 174.0),
    ];
    let (table, ignored) = reduce(&basic(events), A_COMPOUND, DEFAULT_CAPACITY).unwrap();

    assert_eq!(ignored, 0);
    assert_eq!(table.len(), 1);
    let row = table.row(0).unwrap();
    assert_eq!(row[columns::YIELD], 1.0);
    assert!((row[columns::TKE] - 172.0).abs() < 1e-4, "TKE mean uses rows 0, 2, 4");
    assert!((row[columns::EXC_LIGHT] - 12.0).abs() < 1e-4);
    assert!((row[columns::EXC_LIGHT_STD] - 2.0).abs() < 1e-4);
    assert!((row[columns::TXE] - 18.0).abs() < 1e-4);
}

#[test]
fn test_fragments_swapped_into_light_heavy_order() {
    let events = vec![
        RawEvent::new((38, 96), (54, 140), 10.0, 8.0, 170.0),
        RawEvent::new((54, 140), (38, 96), 8.0, 12.0, 170.0),
    ];
    let (table, ignored) = reduce(&basic(events), A_COMPOUND, DEFAULT_CAPACITY).unwrap();

    assert_eq!(ignored, 0, "swapped event joins the same split");
    let row = table.row(0).unwrap();
    assert_eq!(&row[..4], &[38.0, 96.0, 54.0, 140.0]);
    assert!(
        (row[columns::EXC_LIGHT] - 9.0).abs() < 1e-6,
        "excitation energies stay in their listed columns"
    );
    assert!((row[columns::EXC_HEAVY] - 10.0).abs() < 1e-6);
}

#[test]
fn test_yields_sum_to_one() {
    let mut events = Vec::new();
    for (i, count) in [2usize, 3, 7, 11, 13, 1, 1].iter().enumerate() {
        let z = 34 + i as u16;
        let a = 86 + 2 * i as u16;
        events.extend(split(*count, (z, a), (92 - z, A_COMPOUND - a)));
    }
    let (table, ignored) = reduce(&basic(events), A_COMPOUND, DEFAULT_CAPACITY).unwrap();

    assert_eq!(ignored, 2);
    assert!(
        (table.total_yield() - 1.0).abs() < 1e-5,
        "yield sum {}",
        table.total_yield()
    );
}

#[test]
fn test_reduction_is_idempotent() {
    let events = parse_events(&standard_listing(92), 92);
    let first = reduce(&events, A_COMPOUND, DEFAULT_CAPACITY).unwrap();
    let second = reduce(&events, A_COMPOUND, DEFAULT_CAPACITY).unwrap();

    assert_eq!(first, second);
    let bits = |t: &YieldTable| -> Vec<u32> {
        t.as_slice().iter().map(|v| v.to_bits()).collect()
    };
    assert_eq!(bits(&first.0), bits(&second.0));
}

#[test]
fn test_capacity_exceeded_is_an_error() {
    let events: Vec<RawEvent> = (0..4u16)
        .flat_map(|i| split(2, (30 + i, 80 + i), (62 - i, A_COMPOUND - 80 - i)))
        .collect();
    let err = reduce(&basic(events), A_COMPOUND, 3).unwrap_err();
    assert!(matches!(
        err,
        ReduceError::CapacityExceeded {
            retained: 4,
            capacity: 3
        }
    ));
}

#[test]
fn test_headroom_rows_stay_zero() {
    let events: Vec<RawEvent> = split(3, (38, 96), (54, 140)).collect();
    let (table, _) = reduce(&basic(events), A_COMPOUND, 10).unwrap();

    assert_eq!(table.capacity(), 10);
    assert_eq!(table.rows().count(), 1);
    assert!(table.row(1).unwrap().iter().all(|v| *v == 0.0));
}

#[test]
fn test_extended_columns_from_emission_data() {
    let with_emission = |neutron_light: f32, gamma_heavy: f32| RawEvent {
        emission: EmissionEnergies {
            neutron_light,
            neutron_heavy: 1.0,
            gamma_light: 2.0,
            gamma_heavy,
        },
        ..RawEvent::new((38, 96), (54, 140), 10.0, 8.0, 170.0)
    };
    let table = EventTable::from_events(
        vec![with_emission(1.0, 3.0), with_emission(3.0, 5.0)],
        true,
    );
    let (table, _) = reduce(&table, A_COMPOUND, DEFAULT_CAPACITY).unwrap();

    assert_eq!(table.format(), YieldFormat::Extended);
    let row = table.row(0).unwrap();
    assert_eq!(row.len(), 19);
    assert!((row[columns::NEUTRON_LIGHT] - 2.0).abs() < 1e-6);
    assert!((row[columns::NEUTRON_LIGHT_STD] - 2f32.sqrt()).abs() < 1e-6);
    assert!((row[columns::NEUTRON_HEAVY] - 1.0).abs() < 1e-6);
    assert_eq!(row[columns::NEUTRON_HEAVY_STD], 0.0);
    assert!((row[columns::GAMMA_HEAVY] - 4.0).abs() < 1e-6);
}
