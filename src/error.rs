//! Outcome and error types shared by the device model and the optimizer.

use serde::Serialize;
use thiserror::Error;

/// Reason a shift or cap attempt was not applied.
///
/// None of these are fatal: the optimizer records the reason and moves on to
/// the next timestep. Ordering follows declaration order so reports list the
/// reasons in a stable sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Error, Serialize)]
pub enum Infeasible {
    /// The sample at the manipulation start is not a `CycleStart`.
    #[error("not at the start of a cycle")]
    NotAtCycleStart,
    /// The activation was already consumed by an earlier manipulation.
    #[error("load already manipulated")]
    AlreadyManipulated,
    /// The destination window contains the start of another activation.
    #[error("destination overlaps the next cycle")]
    OverlapsNextCycle,
    /// The destination window holds samples already written by a manipulation.
    #[error("destination already manipulated")]
    DestinationOccupied,
    /// The manipulation window runs past the end of the horizon.
    #[error("window leaves the simulation horizon")]
    OutOfHorizon,
    /// The device is idle (standby or base load) somewhere in the capped window.
    #[error("device not active during cap window")]
    NotActiveDuringCap,
    /// Capping would push the device below its base load.
    #[error("capped power falls below base load")]
    BelowBaseLoadAfterCap,
    /// No candidate window carries any curtailment.
    #[error("no curtailment to absorb within period")]
    NoBenefit,
    /// The activation already sits at its best position.
    #[error("already at optimal time")]
    AlreadyOptimal,
    /// The device has no manipulation capability.
    #[error("fixed load")]
    FixedLoad,
}

/// Malformed input detected while building devices, aggregates or targets.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("device \"{device}\": duty cycle step ({cycle_minutes} min) differs from profile step ({profile_minutes} min)")]
    StepMismatch {
        device: String,
        profile_minutes: u32,
        cycle_minutes: u32,
    },
    #[error("device \"{device}\": duty cycle ({cycle_len} steps) must be shorter than the horizon ({horizon} steps)")]
    CycleTooLong {
        device: String,
        cycle_len: usize,
        horizon: usize,
    },
    #[error("{series}: series is empty")]
    EmptySeries { series: String },
    #[error("{series}: non-uniform time step at sample {index}")]
    NonUniformStep { series: String, index: usize },
    #[error("{series}: time axis does not cover the simulation horizon")]
    HorizonMismatch { series: String },
    #[error("device \"{device}\": {message}")]
    InvalidThreshold { device: String, message: String },
    #[error("unknown device \"{0}\"")]
    UnknownDevice(String),
}
