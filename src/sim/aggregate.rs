//! Facility load aggregation across the device catalogue.
//!
//! Load convention: every device contributes a non-negative consumption.
//! Fixed devices contribute their reference trace, controllable devices
//! their output profile.

use crate::devices::Equipment;
use crate::error::ConfigurationError;

use super::clock::TimeAxis;

/// Which part of the catalogue a total covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Controllable devices (`P_out`).
    Variable,
    /// Non-controllable devices (reference trace).
    Fixed,
    /// Both.
    All,
}

/// Per-timestep load totals plus the reference snapshot taken before any
/// manipulation.
#[derive(Debug, Clone)]
pub struct LoadAggregate {
    axis: TimeAxis,
    fixed: Vec<usize>,
    variable: Vec<usize>,
    fixed_kw: Vec<f32>,
    variable_kw: Vec<f32>,
    total_kw: Vec<f32>,
    reference_kw: Vec<f32>,
}

impl LoadAggregate {
    /// Partitions `devices` and computes the initial totals.
    ///
    /// Variable devices are ordered by manipulation priority
    /// (shift, cap-and-shift, cap); catalogue order is kept within a class.
    ///
    /// # Errors
    ///
    /// Returns `HorizonMismatch` if a device is sampled on a different axis.
    pub fn new(axis: TimeAxis, devices: &[Equipment]) -> Result<Self, ConfigurationError> {
        if let Some(device) = devices.iter().find(|d| *d.axis() != axis) {
            return Err(ConfigurationError::HorizonMismatch {
                series: device.name().to_string(),
            });
        }

        let fixed: Vec<usize> = (0..devices.len())
            .filter(|&i| devices[i].is_fixed())
            .collect();
        let mut variable: Vec<usize> = (0..devices.len())
            .filter(|&i| !devices[i].is_fixed())
            .collect();
        // stable sort keeps catalogue order within a priority class
        variable.sort_by_key(|&i| devices[i].manipulation().priority());

        let fixed_kw = sum_outputs(axis.len(), devices, &fixed);
        let variable_kw = sum_outputs(axis.len(), devices, &variable);
        let total_kw: Vec<f32> = fixed_kw
            .iter()
            .zip(&variable_kw)
            .map(|(f, v)| f + v)
            .collect();

        Ok(Self {
            axis,
            fixed,
            variable,
            fixed_kw,
            variable_kw,
            reference_kw: total_kw.clone(),
            total_kw,
        })
    }

    /// Recomputes the variable and grand totals from the current outputs.
    pub fn summarize(&mut self, devices: &[Equipment]) {
        self.variable_kw = sum_outputs(self.axis.len(), devices, &self.variable);
        for ((total, fixed), variable) in self
            .total_kw
            .iter_mut()
            .zip(&self.fixed_kw)
            .zip(&self.variable_kw)
        {
            *total = fixed + variable;
        }
    }

    /// Per-timestep load for `scope` (kW).
    pub fn total(&self, scope: Scope) -> &[f32] {
        match scope {
            Scope::Variable => &self.variable_kw,
            Scope::Fixed => &self.fixed_kw,
            Scope::All => &self.total_kw,
        }
    }

    /// Facility load before any manipulation (kW).
    pub fn reference_snapshot(&self) -> &[f32] {
        &self.reference_kw
    }

    /// Catalogue indices of the fixed devices.
    pub fn fixed(&self) -> &[usize] {
        &self.fixed
    }

    /// Catalogue indices of the variable devices in processing order.
    pub fn variable(&self) -> &[usize] {
        &self.variable
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
}

fn sum_outputs(len: usize, devices: &[Equipment], indices: &[usize]) -> Vec<f32> {
    let mut total = vec![0.0_f32; len];
    for &i in indices {
        for (acc, kw) in total.iter_mut().zip(devices[i].output_kw()) {
            *acc += kw;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::ManipulationType;
    use crate::sim::clock::TimeAxis;
    use crate::sim::fixtures::{axis, device, fixed, ten_oclock};

    fn catalogue() -> Vec<Equipment> {
        vec![
            device("cap-a", ManipulationType::Cap, 20, &[0], vec![5.0; 3]),
            fixed("lights", 20, 2.0),
            device("shift-a", ManipulationType::Shift, 20, &[4], vec![4.0; 3]),
            device("both", ManipulationType::CapAndShift, 20, &[8], vec![3.0; 3]),
            device("shift-b", ManipulationType::Shift, 20, &[12], vec![6.0; 3]),
        ]
    }

    #[test]
    fn partitions_and_orders_by_priority() {
        let devices = catalogue();
        let aggregate = LoadAggregate::new(axis(20), &devices).expect("same axis");
        assert_eq!(aggregate.fixed(), &[1]);
        assert_eq!(aggregate.variable(), &[2, 4, 3, 0]);
    }

    #[test]
    fn totals_add_up() {
        let devices = catalogue();
        let aggregate = LoadAggregate::new(axis(20), &devices).expect("same axis");

        // t = 0: cap-a runs at 5, three idle devices at 1, lights at 2
        assert!((aggregate.total(Scope::Variable)[0] - 8.0).abs() < 1e-6);
        assert!((aggregate.total(Scope::Fixed)[0] - 2.0).abs() < 1e-6);
        assert!((aggregate.total(Scope::All)[0] - 10.0).abs() < 1e-6);
        assert_eq!(aggregate.reference_snapshot(), aggregate.total(Scope::All));
    }

    #[test]
    fn summarize_tracks_output_but_keeps_reference() {
        let mut devices = catalogue();
        let mut aggregate = LoadAggregate::new(axis(20), &devices).expect("same axis");
        let reference = aggregate.reference_snapshot().to_vec();

        devices[2].shift(4, 10).expect("feasible");
        aggregate.summarize(&devices);

        assert!((aggregate.total(Scope::All)[4] - (reference[4] - 3.0)).abs() < 1e-5);
        assert!((aggregate.total(Scope::All)[14] - (reference[14] + 3.0)).abs() < 1e-5);
        assert_eq!(aggregate.reference_snapshot(), reference.as_slice());
    }

    #[test]
    fn rejects_device_on_other_axis() {
        let devices = catalogue();
        let other = TimeAxis::new(ten_oclock(), 1, 30);
        assert!(matches!(
            LoadAggregate::new(other, &devices),
            Err(ConfigurationError::HorizonMismatch { .. })
        ));
    }

    #[test]
    fn empty_catalogue_has_zero_load() {
        let aggregate = LoadAggregate::new(axis(5), &[]).expect("empty catalogue");
        assert_eq!(aggregate.total(Scope::All), &[0.0; 5]);
        assert!(aggregate.variable().is_empty());
    }
}
