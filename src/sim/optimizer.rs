//! Greedy per-device optimizer against the shared curtailment target.

use tracing::{debug, info, warn};

use crate::devices::{Equipment, OperatingState};
use crate::error::ConfigurationError;

use super::aggregate::LoadAggregate;
use super::kpi::{PassReport, SweepReport};
use super::policy::policy_for;
use super::search::SearchContext;
use super::target::{CurtailmentStatus, CurtailmentTarget};

/// Drives device passes over a borrowed catalogue, aggregate and target.
///
/// Each pass scans one device chronologically against a frozen view of the
/// target and aggregate; the view is refreshed once the pass is complete.
/// Only activations starting outside curtailment are candidates: they are
/// moved or capped into curtailed steps, and the samples they vacate never
/// carry curtailment of their own.
pub struct Optimizer<'a> {
    devices: &'a mut [Equipment],
    aggregate: &'a mut LoadAggregate,
    target: &'a mut CurtailmentTarget,
}

impl<'a> Optimizer<'a> {
    /// Creates an optimizer over an existing facility state.
    ///
    /// # Errors
    ///
    /// Returns `HorizonMismatch` if the target or a device is sampled on a
    /// different axis than the aggregate.
    pub fn new(
        devices: &'a mut [Equipment],
        aggregate: &'a mut LoadAggregate,
        target: &'a mut CurtailmentTarget,
    ) -> Result<Self, ConfigurationError> {
        if target.axis() != aggregate.axis() {
            return Err(ConfigurationError::HorizonMismatch {
                series: "curtailment target".to_string(),
            });
        }
        if let Some(device) = devices.iter().find(|d| d.axis() != aggregate.axis()) {
            return Err(ConfigurationError::HorizonMismatch {
                series: device.name().to_string(),
            });
        }
        Ok(Self {
            devices,
            aggregate,
            target,
        })
    }

    /// Runs one manipulation pass over the device at catalogue `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn load_manipulation(&mut self, index: usize) -> PassReport {
        let before_kwh = self.target.curtailment_kwh();
        let device = &mut self.devices[index];

        if device.is_fixed() {
            warn!(device = device.name(), "fixed load, manipulation not possible");
            return PassReport::empty(device.name(), device.manipulation(), before_kwh);
        }

        let mut report = PassReport::empty(device.name(), device.manipulation(), before_kwh);
        let old_out = device.output_kw().to_vec();
        let policy = policy_for(device.manipulation());

        {
            let ctx = SearchContext::new(&*self.target, &*self.aggregate);
            for (clock, timestamp) in self.target.axis().iter() {
                // activations already inside curtailment have nothing to gain
                if self.target.status(clock) == CurtailmentStatus::PartialConsumption {
                    continue;
                }
                if !device.is_controllable_at(clock)
                    || device.state_at(clock) != Some(OperatingState::CycleStart)
                {
                    continue;
                }

                match policy.manipulate(&ctx, device, clock) {
                    Ok(applied) => {
                        debug!(device = device.name(), %timestamp, ?applied, "manipulated");
                        report.applied.push(applied);
                    }
                    Err(reason) => {
                        debug!(device = device.name(), %timestamp, %reason, "skipped");
                        report.skip(reason);
                    }
                }
            }
        }

        self.aggregate.summarize(self.devices);
        self.target
            .refresh(&old_out, self.devices[index].output_kw(), self.aggregate);
        report.curtailment_after_kwh = self.target.curtailment_kwh();

        info!(
            device = %report.device,
            applied = report.applied_count(),
            skipped = report.skipped_count(),
            reduction_kwh = report.reduction_kwh(),
            "pass complete"
        );
        report
    }

    /// Runs a pass over the device called `name`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownDevice` if no device has that name.
    pub fn manipulate_device(&mut self, name: &str) -> Result<PassReport, ConfigurationError> {
        let index = self
            .devices
            .iter()
            .position(|d| d.name() == name)
            .ok_or_else(|| ConfigurationError::UnknownDevice(name.to_string()))?;
        Ok(self.load_manipulation(index))
    }

    /// Runs a pass over every variable device in priority order.
    ///
    /// The report compares against the curtailment of the unmanipulated
    /// facility, so repeated sweeps keep the original reference.
    pub fn total_load(&mut self) -> SweepReport {
        let reference_kwh = self.target.reference_curtailment_kwh();
        let order = self.aggregate.variable().to_vec();
        let passes: Vec<PassReport> = order
            .into_iter()
            .map(|index| self.load_manipulation(index))
            .collect();
        let report = SweepReport::from_passes(reference_kwh, passes);
        info!(
            reference_kwh = report.reference_curtailment_kwh,
            optimized_kwh = report.optimized_curtailment_kwh,
            "sweep complete"
        );
        report
    }

    pub fn devices(&self) -> &[Equipment] {
        self.devices
    }

    pub fn aggregate(&self) -> &LoadAggregate {
        self.aggregate
    }

    pub fn target(&self) -> &CurtailmentTarget {
        self.target
    }
}
