//! Curtailment target: PV production, curtailment and load per timestep.

use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use super::aggregate::{LoadAggregate, Scope};
use super::clock::TimeAxis;
use super::types::TimeSeries;
use crate::error::ConfigurationError;

/// PV production below this level counts as no production (kW).
pub const PV_LIMIT_KW: f32 = 0.1;

/// Curtailment status of one timestep, derived from the reference columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CurtailmentStatus {
    /// PV production is negligible.
    NoPvLimit,
    /// All PV production is consumed.
    FullConsumption,
    /// Part of the PV production is curtailed; eligible for manipulation.
    PartialConsumption,
}

impl CurtailmentStatus {
    /// Classifies one timestep from PV and reference curtailment (kW).
    pub fn classify(pv_kw: f32, reference_curtailment_kw: f32) -> Self {
        if pv_kw < PV_LIMIT_KW {
            CurtailmentStatus::NoPvLimit
        } else if reference_curtailment_kw <= 0.0 {
            CurtailmentStatus::FullConsumption
        } else {
            CurtailmentStatus::PartialConsumption
        }
    }

    /// Numeric status code (0 = no PV, 1 = full, 2 = partial).
    pub fn code(self) -> u8 {
        match self {
            CurtailmentStatus::NoPvLimit => 0,
            CurtailmentStatus::FullConsumption => 1,
            CurtailmentStatus::PartialConsumption => 2,
        }
    }
}

impl fmt::Display for CurtailmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CurtailmentStatus::NoPvLimit => "no_pv",
            CurtailmentStatus::FullConsumption => "full",
            CurtailmentStatus::PartialConsumption => "partial",
        };
        f.write_str(label)
    }
}

/// One exported row of the target timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetRow {
    pub timestamp: NaiveDateTime,
    pub pv_kw: f32,
    pub pv_after_curtailment_kw: f32,
    pub reference_curtailment_kw: f32,
    pub curtailment_kw: f32,
    pub reference_load_kw: f32,
    pub load_kw: f32,
    pub status: CurtailmentStatus,
    pub manipulated: bool,
}

/// Shared curtailment table read by the search and refreshed after each pass.
#[derive(Debug, Clone)]
pub struct CurtailmentTarget {
    axis: TimeAxis,
    pv_kw: Vec<f32>,
    reference_curtailment_kw: Vec<f32>,
    curtailment_kw: Vec<f32>,
    reference_load_kw: Vec<f32>,
    load_kw: Vec<f32>,
    status: Vec<CurtailmentStatus>,
    manipulated: Vec<bool>,
}

impl CurtailmentTarget {
    /// Builds the target on the aggregate's axis.
    ///
    /// PV and reference curtailment are cut to the simulation horizon and
    /// clamped to >= 0. Live curtailment starts from the reference wherever
    /// the status is `PartialConsumption` and is zero elsewhere.
    ///
    /// # Arguments
    ///
    /// * `pv` - PV production trace (kW)
    /// * `reference_curtailment` - Curtailment measured without manipulation (kW)
    /// * `aggregate` - Facility load before any manipulation
    ///
    /// # Errors
    ///
    /// Returns `HorizonMismatch` if either trace does not cover the horizon.
    pub fn new(
        pv: &TimeSeries,
        reference_curtailment: &TimeSeries,
        aggregate: &LoadAggregate,
    ) -> Result<Self, ConfigurationError> {
        let axis = *aggregate.axis();
        let pv_kw: Vec<f32> = clamp_non_negative(pv.window("pv", &axis)?.values());
        let reference_curtailment_kw: Vec<f32> = clamp_non_negative(
            reference_curtailment
                .window("reference curtailment", &axis)?
                .values(),
        );

        let status: Vec<CurtailmentStatus> = pv_kw
            .iter()
            .zip(&reference_curtailment_kw)
            .map(|(pv, curt)| CurtailmentStatus::classify(*pv, *curt))
            .collect();
        let curtailment_kw = reference_curtailment_kw
            .iter()
            .zip(&status)
            .map(|(curt, s)| eligible(*s, *curt))
            .collect();

        Ok(Self {
            axis,
            pv_kw,
            reference_curtailment_kw,
            curtailment_kw,
            reference_load_kw: aggregate.reference_snapshot().to_vec(),
            load_kw: aggregate.total(Scope::All).to_vec(),
            manipulated: vec![false; status.len()],
            status,
        })
    }

    /// Applies one device pass to the live columns.
    ///
    /// Curtailment drops by the increase of the device output and rises
    /// where output was removed, never below zero and only where the status
    /// is `PartialConsumption`. Live load follows the aggregate total.
    pub fn refresh(&mut self, old_out: &[f32], new_out: &[f32], aggregate: &LoadAggregate) {
        for (i, (old, new)) in old_out.iter().zip(new_out).enumerate() {
            let delta = new - old;
            self.curtailment_kw[i] = eligible(self.status[i], self.curtailment_kw[i] - delta);
            if delta != 0.0 {
                self.manipulated[i] = true;
            }
        }
        self.load_kw.copy_from_slice(aggregate.total(Scope::All));
    }

    pub fn axis(&self) -> &TimeAxis {
        &self.axis
    }

    pub fn len(&self) -> usize {
        self.axis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axis.is_empty()
    }

    pub fn status(&self, index: usize) -> CurtailmentStatus {
        self.status[index]
    }

    pub fn pv_kw(&self) -> &[f32] {
        &self.pv_kw
    }

    /// Live curtailment (kW).
    pub fn curtailment_kw(&self) -> &[f32] {
        &self.curtailment_kw
    }

    pub fn reference_curtailment_kw(&self) -> &[f32] {
        &self.reference_curtailment_kw
    }

    pub fn load_kw(&self) -> &[f32] {
        &self.load_kw
    }

    pub fn reference_load_kw(&self) -> &[f32] {
        &self.reference_load_kw
    }

    /// Total reference curtailment over the horizon (kWh).
    pub fn reference_curtailment_kwh(&self) -> f32 {
        self.reference_curtailment_kw.iter().sum::<f32>() * self.axis.dt_hours()
    }

    /// Total live curtailment over the horizon (kWh).
    pub fn curtailment_kwh(&self) -> f32 {
        self.curtailment_kw.iter().sum::<f32>() * self.axis.dt_hours()
    }

    /// Materializes the timeline for export.
    pub fn rows(&self) -> Vec<TargetRow> {
        self.axis
            .iter()
            .map(|(i, timestamp)| TargetRow {
                timestamp,
                pv_kw: self.pv_kw[i],
                pv_after_curtailment_kw: (self.pv_kw[i] - self.reference_curtailment_kw[i])
                    .max(0.0),
                reference_curtailment_kw: self.reference_curtailment_kw[i],
                curtailment_kw: self.curtailment_kw[i],
                reference_load_kw: self.reference_load_kw[i],
                load_kw: self.load_kw[i],
                status: self.status[i],
                manipulated: self.manipulated[i],
            })
            .collect()
    }
}

fn clamp_non_negative(values: &[f32]) -> Vec<f32> {
    values.iter().map(|v| v.max(0.0)).collect()
}

fn eligible(status: CurtailmentStatus, curtailment_kw: f32) -> f32 {
    if status == CurtailmentStatus::PartialConsumption {
        curtailment_kw.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::ManipulationType;
    use crate::sim::fixtures::{axis, device, fixed, series};

    #[test]
    fn classify_statuses() {
        assert_eq!(
            CurtailmentStatus::classify(0.05, 3.0),
            CurtailmentStatus::NoPvLimit
        );
        assert_eq!(
            CurtailmentStatus::classify(4.0, 0.0),
            CurtailmentStatus::FullConsumption
        );
        assert_eq!(
            CurtailmentStatus::classify(4.0, 0.5),
            CurtailmentStatus::PartialConsumption
        );
        assert_eq!(CurtailmentStatus::PartialConsumption.code(), 2);
    }

    #[test]
    fn clamps_negative_inputs() {
        let devices = vec![fixed("lights", 4, 1.0)];
        let aggregate = LoadAggregate::new(axis(4), &devices).expect("same axis");
        let target = CurtailmentTarget::new(
            &series(vec![-1.0, 2.0, 5.0, 5.0]),
            &series(vec![-2.0, 0.0, 1.5, -0.5]),
            &aggregate,
        )
        .expect("covered");

        assert_eq!(target.pv_kw(), &[0.0, 2.0, 5.0, 5.0]);
        assert_eq!(target.reference_curtailment_kw(), &[0.0, 0.0, 1.5, 0.0]);
        assert_eq!(target.status(0), CurtailmentStatus::NoPvLimit);
        assert_eq!(target.status(1), CurtailmentStatus::FullConsumption);
        assert_eq!(target.status(2), CurtailmentStatus::PartialConsumption);
        assert_eq!(target.curtailment_kw(), &[0.0, 0.0, 1.5, 0.0]);
    }

    #[test]
    fn rejects_target_shorter_than_horizon() {
        let devices = vec![fixed("lights", 6, 1.0)];
        let aggregate = LoadAggregate::new(axis(6), &devices).expect("same axis");
        let err = CurtailmentTarget::new(&series(vec![1.0; 4]), &series(vec![0.0; 6]), &aggregate);
        assert!(matches!(
            err,
            Err(ConfigurationError::HorizonMismatch { .. })
        ));
    }

    #[test]
    fn refresh_moves_curtailment_with_output() {
        let mut devices = vec![device("washer", ManipulationType::Shift, 10, &[0], vec![3.0; 2])];
        let mut aggregate = LoadAggregate::new(axis(10), &devices).expect("same axis");
        let mut target = CurtailmentTarget::new(
            &series(vec![10.0; 10]),
            &series(vec![0.0, 0.0, 1.0, 1.0, 1.0, 5.0, 5.0, 5.0, 5.0, 5.0]),
            &aggregate,
        )
        .expect("covered");

        let old_out = devices[0].output_kw().to_vec();
        devices[0].shift(0, 5).expect("feasible");
        aggregate.summarize(&devices);
        target.refresh(&old_out, devices[0].output_kw(), &aggregate);

        // vacated samples sit outside the partial window
        assert_eq!(&target.curtailment_kw()[..2], &[0.0, 0.0]);
        // destination absorbs 2 kW on top of base load
        assert!((target.curtailment_kw()[5] - 3.0).abs() < 1e-6);
        assert!((target.curtailment_kw()[6] - 3.0).abs() < 1e-6);
        assert!((target.curtailment_kw()[7] - 5.0).abs() < 1e-6);

        let rows = target.rows();
        assert!(rows[0].manipulated && rows[5].manipulated);
        assert!(!rows[3].manipulated);
        assert!((rows[5].load_kw - 3.0).abs() < 1e-6);
        assert!((rows[5].reference_load_kw - 1.0).abs() < 1e-6);
        assert!((rows[5].pv_after_curtailment_kw - 5.0).abs() < 1e-6);
        assert!((target.curtailment_kwh() - (target.reference_curtailment_kwh() - 4.0 / 60.0)).abs() < 1e-5);
    }

    #[test]
    fn refresh_clamps_at_zero() {
        let mut devices = vec![device("washer", ManipulationType::Shift, 6, &[0], vec![9.0; 2])];
        let mut aggregate = LoadAggregate::new(axis(6), &devices).expect("same axis");
        let mut target = CurtailmentTarget::new(
            &series(vec![10.0; 6]),
            &series(vec![0.0, 0.0, 0.0, 2.0, 2.0, 0.0]),
            &aggregate,
        )
        .expect("covered");

        let old_out = devices[0].output_kw().to_vec();
        devices[0].shift(0, 3).expect("feasible");
        aggregate.summarize(&devices);
        target.refresh(&old_out, devices[0].output_kw(), &aggregate);

        assert_eq!(&target.curtailment_kw()[3..5], &[0.0, 0.0]);
    }
}
