//! Common types for the facility device model.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Discrete operating state of a device at one timestep.
///
/// Ordering follows the numeric code, so `state >= CycleStart` means the
/// device is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum OperatingState {
    /// Power at or below the standby level.
    Standby = 0,
    /// Idle draw between standby and base load.
    Base = 1,
    /// First sample of an activation.
    CycleStart = 2,
    /// Any later sample of an activation.
    CycleRunning = 3,
}

impl OperatingState {
    /// Numeric state code (0 = standby .. 3 = running).
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Returns `true` for `CycleStart` and `CycleRunning`.
    pub fn is_active(self) -> bool {
        self >= OperatingState::CycleStart
    }
}

impl fmt::Display for OperatingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OperatingState::Standby => "standby",
            OperatingState::Base => "base",
            OperatingState::CycleStart => "start",
            OperatingState::CycleRunning => "running",
        };
        f.write_str(label)
    }
}

/// Manipulation capability of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManipulationType {
    /// Fixed, non-controllable load.
    None,
    /// Activations may be moved in time.
    Shift,
    /// Activations may be power-limited with later compensation.
    Cap,
    /// Both capping and shifting are allowed.
    CapAndShift,
}

impl ManipulationType {
    /// Processing priority; lower runs first. `None` for fixed loads.
    pub fn priority(self) -> Option<u8> {
        match self {
            ManipulationType::None => None,
            ManipulationType::Shift => Some(0),
            ManipulationType::CapAndShift => Some(1),
            ManipulationType::Cap => Some(2),
        }
    }

    pub fn is_fixed(self) -> bool {
        self == ManipulationType::None
    }
}

impl fmt::Display for ManipulationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ManipulationType::None => "fixed",
            ManipulationType::Shift => "shift",
            ManipulationType::Cap => "cap",
            ManipulationType::CapAndShift => "cap/shift",
        };
        f.write_str(label)
    }
}

/// Static description of one piece of equipment.
#[derive(Debug, Clone, PartialEq)]
pub struct EquipmentSpec {
    /// Display name, unique within a catalogue.
    pub name: String,
    /// Location tag, e.g. `"Radiology/CT room"`.
    pub location: String,
    /// Nominal power (kW).
    pub nominal_kw: f32,
    /// Manipulation capability.
    pub manipulation: ManipulationType,
    /// Upper bound of the standby state (kW).
    pub standby_kw: f32,
    /// Upper bound of the base-load state (kW); also the idle fill level.
    pub base_load_kw: f32,
    /// Remaining power fraction while capped (0.0, 1.0].
    pub cap_factor: f32,
    /// Maximum compensation period (minutes).
    pub max_period_min: u32,
}
