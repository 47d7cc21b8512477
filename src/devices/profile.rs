//! Duty-cycle profile synthesis.

use super::types::OperatingState;

/// Replays `cycle_kw` onto every detected activation and returns `P_in`.
///
/// `states` is rewritten in place so it matches the synthesized profile:
/// - a `CycleStart` with at least `cycle_kw.len()` samples left becomes one
///   full replay (`CycleStart` followed by `CycleRunning`);
/// - a `CycleStart` too close to the end of the horizon, and any
///   `CycleRunning` sample not covered by a replay, is rolled back to `Base`;
/// - every `Base` sample draws `base_load_kw`;
/// - `Standby` samples draw nothing.
///
/// # Examples
///
/// ```
/// use loadshift_sim::devices::profile::synthesize;
/// use loadshift_sim::devices::state::derive_states;
///
/// let raw = [1.0, 4.8, 5.3, 1.0, 1.0];
/// let mut states = derive_states(&raw, 0.0, 1.0);
/// let p_in = synthesize(&mut states, &[5.0, 5.0, 5.0], 1.0);
/// assert_eq!(p_in, vec![1.0, 5.0, 5.0, 5.0, 1.0]);
/// ```
pub fn synthesize(states: &mut [OperatingState], cycle_kw: &[f32], base_load_kw: f32) -> Vec<f32> {
    let n = states.len();
    let m = cycle_kw.len();
    let mut p_in = vec![0.0_f32; n];

    let mut j = 0;
    while j < n {
        match states[j] {
            OperatingState::CycleStart if m > 0 && n - j >= m => {
                for (k, &kw) in cycle_kw.iter().enumerate() {
                    states[j + k] = if k == 0 {
                        OperatingState::CycleStart
                    } else {
                        OperatingState::CycleRunning
                    };
                    p_in[j + k] = kw;
                }
                j += m;
                continue;
            }
            OperatingState::CycleStart | OperatingState::CycleRunning => {
                states[j] = OperatingState::Base;
                p_in[j] = base_load_kw;
            }
            OperatingState::Base => p_in[j] = base_load_kw,
            OperatingState::Standby => {}
        }
        j += 1;
    }

    p_in
}
