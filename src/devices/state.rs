//! Operating-state derivation from a power trace.

use super::types::OperatingState;

/// Classifies every sample of `power_kw` into an [`OperatingState`].
///
/// The scan is chronological and looks back exactly one sample:
/// - a sample above `base_load_kw` is `CycleStart` when its predecessor was
///   at or below `base_load_kw`, otherwise `CycleRunning`;
/// - a sample at or below `standby_kw` is `Standby`;
/// - everything else is `Base`.
///
/// The first sample has no predecessor and is `CycleStart` whenever it is
/// above base load.
///
/// # Examples
///
/// ```
/// use loadshift_sim::devices::state::derive_states;
/// use loadshift_sim::devices::types::OperatingState::*;
///
/// let states = derive_states(&[0.0, 1.0, 5.0, 5.0, 1.0], 0.0, 1.0);
/// assert_eq!(states, vec![Standby, Base, CycleStart, CycleRunning, Base]);
/// ```
pub fn derive_states(power_kw: &[f32], standby_kw: f32, base_load_kw: f32) -> Vec<OperatingState> {
    let mut states = Vec::with_capacity(power_kw.len());
    let mut previous: Option<f32> = None;

    for &p in power_kw {
        let state = if p > base_load_kw {
            match previous {
                Some(prev) if prev > base_load_kw => OperatingState::CycleRunning,
                _ => OperatingState::CycleStart,
            }
        } else if p <= standby_kw {
            OperatingState::Standby
        } else {
            OperatingState::Base
        };
        states.push(state);
        previous = Some(p);
    }

    states
}
