//! Manipulation policies, one per [`ManipulationType`].

use serde::Serialize;

use crate::devices::{Equipment, ManipulationType};
use crate::error::Infeasible;

use super::search::SearchContext;

/// A manipulation applied to one activation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Manipulation {
    /// Activation moved by `offset` steps.
    Shifted { clock: usize, offset: usize },
    /// Activation capped for `duration` steps and compensated `offset`
    /// steps after the capped window.
    Capped {
        clock: usize,
        duration: usize,
        offset: usize,
        factor: f32,
    },
}

impl Manipulation {
    /// Index of the manipulated activation's first sample.
    pub fn clock(&self) -> usize {
        match self {
            Manipulation::Shifted { clock, .. } | Manipulation::Capped { clock, .. } => *clock,
        }
    }
}

/// Decides how one activation of a device gets manipulated.
///
/// `attempt_shift` and `attempt_cap` run the search and apply its result to
/// the device; implementors combine them in `manipulate`.
pub trait ManipulationPolicy {
    /// Runs the shift search and shifts the activation at `clock`.
    fn attempt_shift(
        &self,
        ctx: &SearchContext<'_>,
        device: &mut Equipment,
        clock: usize,
    ) -> Result<Manipulation, Infeasible> {
        let offset =
            ctx.shift_comp_time(device, clock, device.cycle_len(), device.period_steps())?;
        device.shift(clock, offset)?;
        Ok(Manipulation::Shifted { clock, offset })
    }

    /// Runs the cap search and caps the activation at `clock`.
    fn attempt_cap(
        &self,
        ctx: &SearchContext<'_>,
        device: &mut Equipment,
        clock: usize,
    ) -> Result<Manipulation, Infeasible> {
        let factor = device.spec().cap_factor;
        let plan = ctx.cap_comp_time(
            device,
            clock,
            device.cycle_len(),
            device.period_steps(),
            factor,
        )?;
        device.cap(clock, plan.duration, plan.offset, factor)?;
        Ok(Manipulation::Capped {
            clock,
            duration: plan.duration,
            offset: plan.offset,
            factor,
        })
    }

    /// Manipulates the activation at `clock`, or explains why not.
    fn manipulate(
        &self,
        ctx: &SearchContext<'_>,
        device: &mut Equipment,
        clock: usize,
    ) -> Result<Manipulation, Infeasible>;
}

/// Fixed loads are never manipulated.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedPolicy;

impl ManipulationPolicy for FixedPolicy {
    fn manipulate(
        &self,
        _ctx: &SearchContext<'_>,
        _device: &mut Equipment,
        _clock: usize,
    ) -> Result<Manipulation, Infeasible> {
        Err(Infeasible::FixedLoad)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ShiftPolicy;

impl ManipulationPolicy for ShiftPolicy {
    fn manipulate(
        &self,
        ctx: &SearchContext<'_>,
        device: &mut Equipment,
        clock: usize,
    ) -> Result<Manipulation, Infeasible> {
        self.attempt_shift(ctx, device, clock)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CapPolicy;

impl ManipulationPolicy for CapPolicy {
    fn manipulate(
        &self,
        ctx: &SearchContext<'_>,
        device: &mut Equipment,
        clock: usize,
    ) -> Result<Manipulation, Infeasible> {
        self.attempt_cap(ctx, device, clock)
    }
}

/// Caps first and falls back to shifting when capping yields nothing.
///
/// The reported reason on total failure is the one from the shift attempt.
#[derive(Debug, Default, Clone, Copy)]
pub struct CapAndShiftPolicy;

impl ManipulationPolicy for CapAndShiftPolicy {
    fn manipulate(
        &self,
        ctx: &SearchContext<'_>,
        device: &mut Equipment,
        clock: usize,
    ) -> Result<Manipulation, Infeasible> {
        self.attempt_cap(ctx, device, clock)
            .or_else(|_| self.attempt_shift(ctx, device, clock))
    }
}

/// Returns the policy for a manipulation capability.
pub fn policy_for(kind: ManipulationType) -> &'static dyn ManipulationPolicy {
    match kind {
        ManipulationType::None => &FixedPolicy,
        ManipulationType::Shift => &ShiftPolicy,
        ManipulationType::Cap => &CapPolicy,
        ManipulationType::CapAndShift => &CapAndShiftPolicy,
    }
}
