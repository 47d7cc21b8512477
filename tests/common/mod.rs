//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use loadshift_sim::devices::{Equipment, EquipmentSpec, ManipulationType};
use loadshift_sim::sim::aggregate::LoadAggregate;
use loadshift_sim::sim::clock::TimeAxis;
use loadshift_sim::sim::target::CurtailmentTarget;
use loadshift_sim::sim::types::TimeSeries;

/// 2020-06-01 10:00, the start of every fixture axis.
pub fn ten_oclock() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2020, 6, 1)
        .and_then(|d| d.and_hms_opt(10, 0, 0))
        .expect("valid timestamp")
}

/// One-minute axis of `len` samples starting at 10:00.
pub fn axis(len: usize) -> TimeAxis {
    TimeAxis::new(ten_oclock(), 1, len)
}

pub fn series(values: Vec<f32>) -> TimeSeries {
    TimeSeries::new(axis(values.len()), values)
}

/// Base load 1 kW, standby 0, cap factor 0.6, 15-minute period.
pub fn spec(name: &str, kind: ManipulationType) -> EquipmentSpec {
    EquipmentSpec {
        name: name.to_string(),
        location: "Radiology/Test room".to_string(),
        nominal_kw: 5.0,
        manipulation: kind,
        standby_kw: 0.0,
        base_load_kw: 1.0,
        cap_factor: 0.6,
        max_period_min: 15,
    }
}

/// Controllable device idling at 1 kW with `cycle` at each start index.
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

/// Aggregate and target for `devices` under a flat PV of `pv_kw`.
pub fn facility(
    devices: &[Equipment],
    pv_kw: f32,
    reference_curtailment: Vec<f32>,
) -> (LoadAggregate, CurtailmentTarget) {
    let len = reference_curtailment.len();
    let aggregate = LoadAggregate::new(axis(len), devices).expect("same axis");
    let target = CurtailmentTarget::new(
        &series(vec![pv_kw; len]),
        &series(reference_curtailment),
        &aggregate,
    )
    .expect("target covers horizon");
    (aggregate, target)
}
