//! Facility device model: state derivation, profile synthesis and equipment.

pub mod equipment;
/// Duty-cycle replay onto detected activations.
pub mod profile;
/// Operating-state classification of power traces.
pub mod state;
pub mod types;

// Re-export the main types for convenience
pub use equipment::Equipment;
pub use types::{EquipmentSpec, ManipulationType, OperatingState};
