//! Seeded synthetic traces for the built-in demo facility.
//!
//! Scenarios without measured CSV data get their PV production and device
//! reference traces from these generators. The same seed always yields the
//! same traces.

use chrono::Timelike;
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::sim::clock::TimeAxis;
use crate::sim::types::TimeSeries;

/// Generates Gaussian noise with the given standard deviation.
///
/// Uses the Box-Muller transform. Returns 0.0 if `std_dev <= 0.0`.
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f32) -> f32 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f32 = rng.random::<f32>().clamp(1e-6, 1.0);
    let u2: f32 = rng.random::<f32>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos();
    z0 * std_dev
}

/// Fraction of peak irradiance at `hour` (fractional hour of day).
///
/// Half-cosine bell between sunrise and sunset, zero outside.
///
/// # Examples
///
/// ```
/// use loadshift_sim::synthetic::daylight_frac;
///
/// assert_eq!(daylight_frac(3.0, 6.0, 18.0), 0.0);
/// assert!((daylight_frac(12.0, 6.0, 18.0) - 1.0).abs() < 1e-6);
/// ```
pub fn daylight_frac(hour: f32, sunrise_hour: f32, sunset_hour: f32) -> f32 {
    if hour < sunrise_hour || hour >= sunset_hour || sunset_hour <= sunrise_hour {
        return 0.0;
    }
    let x = (hour - sunrise_hour) / (sunset_hour - sunrise_hour);
    (std::f32::consts::PI * (x - 0.5)).cos().max(0.0)
}

fn hour_of_day(axis: &TimeAxis, index: usize) -> f32 {
    let ts = axis.timestamp(index);
    ts.hour() as f32 + ts.minute() as f32 / 60.0
}

/// Parameters of the synthetic PV plant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PvShape {
    /// Output under clear sky at solar noon (kW).
    pub peak_kw: f32,
    pub sunrise_hour: f32,
    pub sunset_hour: f32,
    /// Relative standard deviation of the cloud noise.
    pub cloud_noise_std: f32,
}

/// PV production on `axis`: half-cosine daylight profile with
/// multiplicative cloud noise, never negative.
pub fn pv_profile(axis: &TimeAxis, shape: &PvShape, seed: u64) -> TimeSeries {
    let mut rng = StdRng::seed_from_u64(seed);
    let values = axis
        .iter()
        .map(|(i, _)| {
            let frac = daylight_frac(hour_of_day(axis, i), shape.sunrise_hour, shape.sunset_hour);
            if frac <= 0.0 {
                return 0.0;
            }
            let noise_mult = 1.0 + gaussian_noise(&mut rng, shape.cloud_noise_std);
            (shape.peak_kw * frac * noise_mult).max(0.0)
        })
        .collect();
    TimeSeries::new(*axis, values)
}

/// Shape of a synthetic device trace.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceShape<'a> {
    /// Duty cycle replayed at every activation (kW per step).
    pub cycle_kw: &'a [f32],
    pub base_load_kw: f32,
    pub standby_kw: f32,
    /// Activations per 24 hours.
    pub activations_per_day: usize,
    /// Fixed activation start times (hour of day), repeated every day.
    /// Replaces the random slots when not empty.
    pub start_hours: &'a [f32],
    /// Absolute measurement noise (kW).
    pub noise_std: f32,
}

/// Measured-looking trace of a cycling device.
///
/// Activations start at `start_hours` when given. Otherwise each day is cut
/// into `activations_per_day` equal slots and one activation starts at a
/// random step inside each slot. Every activation is followed by at least
/// one idle sample. Idle samples sit just below the base load and never
/// under the standby level; active samples sit just above the duty cycle,
/// so state derivation recovers every activation.
pub fn device_profile(axis: &TimeAxis, shape: &DeviceShape<'_>, seed: u64) -> TimeSeries {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = axis.len();
    let mut values: Vec<f32> = (0..n)
        .map(|_| {
            (shape.base_load_kw - gaussian_noise(&mut rng, shape.noise_std).abs())
                .max(shape.standby_kw)
        })
        .collect();

    let m = shape.cycle_kw.len();
    if m == 0 {
        return TimeSeries::new(*axis, values);
    }

    let starts = if shape.start_hours.is_empty() {
        slot_starts(axis, shape.activations_per_day, m, &mut rng)
    } else {
        scheduled_starts(axis, shape.start_hours)
    };

    let mut free_from = 0;
    for start in starts {
        if start < free_from || start + m >= n {
            continue;
        }
        for (k, kw) in shape.cycle_kw.iter().enumerate() {
            values[start + k] = kw + gaussian_noise(&mut rng, shape.noise_std).abs();
        }
        free_from = start + m + 1;
    }

    TimeSeries::new(*axis, values)
}

/// One random start per slot of `24 h / per_day`.
fn slot_starts(axis: &TimeAxis, per_day: usize, m: usize, rng: &mut StdRng) -> Vec<usize> {
    let n = axis.len();
    if per_day == 0 {
        return Vec::new();
    }
    let steps_per_day = axis.steps_for_minutes(24 * 60).max(1);
    let slot_len = steps_per_day / per_day;
    if slot_len <= m {
        return Vec::new();
    }

    let mut starts = Vec::new();
    let mut slot_start = 0;
    while slot_start + m < n {
        let latest = (slot_start + slot_len - m - 1).min(n - m - 1);
        starts.push(rng.random_range(slot_start..=latest));
        slot_start += slot_len;
    }
    starts
}

/// Steps whose interval contains one of `hours`, on every day of the axis.
fn scheduled_starts(axis: &TimeAxis, hours: &[f32]) -> Vec<usize> {
    let step = axis.step_minutes();
    let targets: Vec<u32> = hours
        .iter()
        .map(|h| (h * 60.0).round().max(0.0) as u32)
        .collect();
    axis.iter()
        .filter(|(_, ts)| {
            let minute = ts.hour() * 60 + ts.minute();
            targets.iter().any(|t| (minute..minute + step).contains(t))
        })
        .map(|(i, _)| i)
        .collect()
}

/// Flat trace of a fixed load with measurement noise, never negative.
pub fn fixed_profile(axis: &TimeAxis, kw: f32, noise_std: f32, seed: u64) -> TimeSeries {
    let mut rng = StdRng::seed_from_u64(seed);
    let values = (0..axis.len())
        .map(|_| (kw + gaussian_noise(&mut rng, noise_std)).max(0.0))
        .collect();
    TimeSeries::new(*axis, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::OperatingState;
    use crate::devices::state::derive_states;
    use chrono::NaiveDate;

    fn day(step_minutes: u32) -> TimeAxis {
        let start = NaiveDate::from_ymd_opt(2020, 6, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid timestamp");
        TimeAxis::new(start, step_minutes, (24 * 60 / step_minutes) as usize)
    }

    fn shape() -> PvShape {
        PvShape {
            peak_kw: 100.0,
            sunrise_hour: 6.0,
            sunset_hour: 20.0,
            cloud_noise_std: 0.05,
        }
    }

    #[test]
    fn noise_zero_std_is_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(gaussian_noise(&mut rng, 0.0), 0.0);
        assert_eq!(gaussian_noise(&mut rng, -1.0), 0.0);
    }

    #[test]
    fn pv_is_zero_at_night_and_peaks_midday() {
        let axis = day(15);
        let pv = pv_profile(&axis, &shape(), 42);
        let values = pv.values();
        // 03:00 and 22:00
        assert_eq!(values[12], 0.0);
        assert_eq!(values[88], 0.0);
        // 13:00 is solar noon
        assert!(values[52] > 80.0);
        assert!(values.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn pv_is_deterministic_per_seed() {
        let axis = day(15);
        assert_eq!(pv_profile(&axis, &shape(), 7), pv_profile(&axis, &shape(), 7));
        assert_ne!(pv_profile(&axis, &shape(), 7), pv_profile(&axis, &shape(), 8));
    }

    #[test]
    fn device_activations_are_detected() {
        let axis = day(1);
        let cycle = vec![10.0; 30];
        let device = DeviceShape {
            cycle_kw: &cycle,
            base_load_kw: 2.0,
            standby_kw: 0.0,
            activations_per_day: 4,
            start_hours: &[],
            noise_std: 0.1,
        };
        let trace = device_profile(&axis, &device, 3);
        let states = derive_states(trace.values(), 0.0, 2.0);
        let starts = states
            .iter()
            .filter(|s| **s == OperatingState::CycleStart)
            .count();
        assert_eq!(starts, 4);
        let running = states
            .iter()
            .filter(|s| **s == OperatingState::CycleRunning)
            .count();
        assert_eq!(running, 4 * 29);
    }

    #[test]
    fn device_idle_stays_within_base_band() {
        let axis = day(1);
        let cycle = vec![10.0; 30];
        let device = DeviceShape {
            cycle_kw: &cycle,
            base_load_kw: 2.0,
            standby_kw: 0.5,
            activations_per_day: 0,
            start_hours: &[],
            noise_std: 1.0,
        };
        let trace = device_profile(&axis, &device, 3);
        assert!(trace.values().iter().all(|v| (0.5..=2.0).contains(v)));
    }

    #[test]
    fn cycle_longer_than_slot_yields_no_activation() {
        let axis = day(60);
        let cycle = vec![10.0; 8];
        let device = DeviceShape {
            cycle_kw: &cycle,
            base_load_kw: 2.0,
            standby_kw: 0.0,
            activations_per_day: 4,
            start_hours: &[],
            noise_std: 0.0,
        };
        let trace = device_profile(&axis, &device, 3);
        assert!(trace.values().iter().all(|v| *v == 2.0));
    }

    #[test]
    fn scheduled_activations_start_on_the_hour() {
        let axis = day(1);
        let cycle = vec![10.0; 30];
        let device = DeviceShape {
            cycle_kw: &cycle,
            base_load_kw: 2.0,
            standby_kw: 0.0,
            activations_per_day: 4,
            start_hours: &[7.0, 13.5, 13.75],
            noise_std: 0.1,
        };
        let trace = device_profile(&axis, &device, 3);
        let states = derive_states(trace.values(), 0.0, 2.0);
        let starts: Vec<usize> = states
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == OperatingState::CycleStart)
            .map(|(i, _)| i)
            .collect();
        // 13:45 falls inside the 13:30 run and is dropped
        assert_eq!(starts, vec![7 * 60, 13 * 60 + 30]);
    }

    #[test]
    fn fixed_profile_is_non_negative() {
        let axis = day(15);
        let trace = fixed_profile(&axis, 0.1, 1.0, 9);
        assert!(trace.values().iter().all(|v| *v >= 0.0));
        assert_eq!(trace.len(), 96);
    }
}
