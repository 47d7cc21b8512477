//! Shared builders for the simulation unit tests.

use chrono::{NaiveDate, NaiveDateTime};

use crate::devices::{Equipment, EquipmentSpec, ManipulationType};
use crate::sim::clock::TimeAxis;
use crate::sim::types::TimeSeries;

pub fn ten_oclock() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2020, 6, 1)
        .and_then(|d| d.and_hms_opt(10, 0, 0))
        .expect("valid timestamp")
}

/// One-minute axis starting at 10:00.
pub fn axis(len: usize) -> TimeAxis {
    TimeAxis::new(ten_oclock(), 1, len)
}

pub fn series(values: Vec<f32>) -> TimeSeries {
    TimeSeries::new(axis(values.len()), values)
}

pub fn spec(name: &str, kind: ManipulationType) -> EquipmentSpec {
    EquipmentSpec {
        name: name.to_string(),
        location: "Test/Room".to_string(),
        nominal_kw: 5.0,
        manipulation: kind,
        standby_kw: 0.0,
        base_load_kw: 1.0,
        cap_factor: 0.6,
        max_period_min: 15,
    }
}

/// Controllable device idling at 1 kW with `cycle` replayed at each start.
pub fn device(
    name: &str,
    kind: ManipulationType,
    len: usize,
    starts: &[usize],
    cycle: Vec<f32>,
) -> Equipment {
    let mut raw = vec![1.0; len];
    for &start in starts {
        for (k, kw) in cycle.iter().enumerate() {
            raw[start + k] = *kw;
        }
    }
    Equipment::new(spec(name, kind), series(raw), series(cycle)).expect("valid device")
}

/// Fixed device drawing a constant `kw`.
pub fn fixed(name: &str, len: usize, kw: f32) -> Equipment {
    Equipment::fixed(spec(name, ManipulationType::None), series(vec![kw; len]))
        .expect("valid device")
}
