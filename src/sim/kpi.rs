//! Pass and sweep reports with curtailment and savings figures.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::devices::ManipulationType;
use crate::error::Infeasible;

use super::policy::Manipulation;

/// Emission and cost factors for one kWh of energy not drawn from a source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SavingsFactors {
    /// kg CO2 per kWh.
    pub co2_kg_per_kwh: f32,
    /// Currency units per kWh.
    pub cost_per_kwh: f32,
}

impl SavingsFactors {
    /// Public grid supply.
    pub fn grid() -> Self {
        Self {
            co2_kg_per_kwh: 0.28,
            cost_per_kwh: 0.24,
        }
    }

    /// Diesel generator supply during grid outages.
    pub fn diesel() -> Self {
        Self {
            co2_kg_per_kwh: 0.81,
            cost_per_kwh: 3.62,
        }
    }
}

/// CO2 and cost avoided by consuming otherwise curtailed PV.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Savings {
    pub co2_kg: f32,
    pub cost: f32,
}

/// Outcome of one device pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassReport {
    pub device: String,
    pub manipulation: ManipulationType,
    /// Manipulations applied, in scan order.
    pub applied: Vec<Manipulation>,
    /// Skipped attempts per reason.
    pub skipped: BTreeMap<Infeasible, usize>,
    /// Live curtailment before the pass (kWh).
    pub curtailment_before_kwh: f32,
    /// Live curtailment after the pass (kWh).
    pub curtailment_after_kwh: f32,
}

impl PassReport {
    /// A pass that did nothing, e.g. for a fixed device.
    pub fn empty(device: &str, manipulation: ManipulationType, curtailment_kwh: f32) -> Self {
        Self {
            device: device.to_string(),
            manipulation,
            applied: Vec::new(),
            skipped: BTreeMap::new(),
            curtailment_before_kwh: curtailment_kwh,
            curtailment_after_kwh: curtailment_kwh,
        }
    }

    /// Records a skipped attempt.
    pub fn skip(&mut self, reason: Infeasible) {
        *self.skipped.entry(reason).or_insert(0) += 1;
    }

    /// Marginal curtailment reduction of this pass (kWh).
    pub fn reduction_kwh(&self) -> f32 {
        self.curtailment_before_kwh - self.curtailment_after_kwh
    }

    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.values().sum()
    }
}

/// Outcome of a full sweep over all variable devices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    /// Curtailment before the first pass (kWh).
    pub reference_curtailment_kwh: f32,
    /// Curtailment after the last pass (kWh).
    pub optimized_curtailment_kwh: f32,
    /// Per-device passes in processing order.
    pub passes: Vec<PassReport>,
}

impl SweepReport {
    /// Builds the sweep summary from its passes.
    pub fn from_passes(reference_curtailment_kwh: f32, passes: Vec<PassReport>) -> Self {
        let optimized_curtailment_kwh = passes
            .last()
            .map_or(reference_curtailment_kwh, |p| p.curtailment_after_kwh);
        Self {
            reference_curtailment_kwh,
            optimized_curtailment_kwh,
            passes,
        }
    }

    pub fn reduction_kwh(&self) -> f32 {
        self.reference_curtailment_kwh - self.optimized_curtailment_kwh
    }

    /// Reduction relative to the reference curtailment (%); 0 without curtailment.
    pub fn relative_reduction_pct(&self) -> f32 {
        if self.reference_curtailment_kwh > 0.0 {
            100.0 * self.reduction_kwh() / self.reference_curtailment_kwh
        } else {
            0.0
        }
    }

    /// CO2 and cost avoided at `factors`.
    pub fn savings(&self, factors: &SavingsFactors) -> Savings {
        let kwh = self.reduction_kwh().max(0.0);
        Savings {
            co2_kg: kwh * factors.co2_kg_per_kwh,
            cost: kwh * factors.cost_per_kwh,
        }
    }

    pub fn applied_count(&self) -> usize {
        self.passes.iter().map(PassReport::applied_count).sum()
    }

    /// Skipped attempts per reason over all passes.
    pub fn skipped(&self) -> BTreeMap<Infeasible, usize> {
        let mut total = BTreeMap::new();
        for pass in &self.passes {
            for (reason, count) in &pass.skipped {
                *total.entry(*reason).or_insert(0) += count;
            }
        }
        total
    }
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Curtailment Report ---")?;
        writeln!(
            f,
            "Reference curtailment: {:.2} kWh",
            self.reference_curtailment_kwh
        )?;
        writeln!(
            f,
            "Optimized curtailment: {:.2} kWh",
            self.optimized_curtailment_kwh
        )?;
        writeln!(
            f,
            "Reduction:             {:.2} kWh ({:.2}%)",
            self.reduction_kwh(),
            self.relative_reduction_pct()
        )?;
        writeln!(f, "Manipulations:         {}", self.applied_count())?;
        for (reason, count) in self.skipped() {
            writeln!(f, "  skipped ({reason}): {count}")?;
        }
        for pass in &self.passes {
            writeln!(
                f,
                "  {:<28} {:<9} applied {:>3}  -{:.2} kWh",
                pass.device,
                pass.manipulation.to_string(),
                pass.applied_count(),
                pass.reduction_kwh()
            )?;
        }
        write!(f, "Devices:               {}", self.passes.len())
    }
}
