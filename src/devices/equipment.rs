//! Equipment model: reference trace, synthesized profile and manipulations.

use crate::error::{ConfigurationError, Infeasible};
use crate::sim::clock::TimeAxis;
use crate::sim::types::TimeSeries;

use super::profile::synthesize;
use super::state::derive_states;
use super::types::{EquipmentSpec, ManipulationType, OperatingState};

/// Per-timestep fields of a controllable device.
#[derive(Debug, Clone, PartialEq)]
struct ControlledProfile {
    state: Vec<OperatingState>,
    p_in: Vec<f32>,
    p_out: Vec<f32>,
    controllable: Vec<bool>,
}

/// One device of the facility catalogue.
///
/// Controllable devices synthesize their input profile `P_in` once at
/// construction. Shift and cap only ever write the output profile `P_out`,
/// the controllable flags and the re-derived operating state. Fixed devices
/// (`ManipulationType::None`) keep nothing but their reference trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Equipment {
    spec: EquipmentSpec,
    reference: TimeSeries,
    cycle: TimeSeries,
    period_steps: usize,
    controlled: Option<ControlledProfile>,
}

impl Equipment {
    /// Builds a device and synthesizes its profile.
    ///
    /// # Arguments
    ///
    /// * `spec` - Identity, capability and thresholds
    /// * `reference` - Measured power trace over the full horizon
    /// * `cycle` - Canonical duty cycle of one activation
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` when the thresholds are inconsistent,
    /// the duty cycle is empty, uses a different step than the reference, or
    /// is not shorter than the horizon. Fixed devices only check thresholds.
    pub fn new(
        spec: EquipmentSpec,
        reference: TimeSeries,
        cycle: TimeSeries,
    ) -> Result<Self, ConfigurationError> {
        validate_thresholds(&spec)?;

        if spec.manipulation.is_fixed() {
            return Ok(Self::fixed_unchecked(spec, reference));
        }

        if cycle.is_empty() {
            return Err(ConfigurationError::EmptySeries {
                series: format!("{} duty cycle", spec.name),
            });
        }
        let profile_minutes = reference.axis().step_minutes();
        let cycle_minutes = cycle.axis().step_minutes();
        if profile_minutes != cycle_minutes {
            return Err(ConfigurationError::StepMismatch {
                device: spec.name.clone(),
                profile_minutes,
                cycle_minutes,
            });
        }
        if cycle.len() >= reference.len() {
            return Err(ConfigurationError::CycleTooLong {
                device: spec.name.clone(),
                cycle_len: cycle.len(),
                horizon: reference.len(),
            });
        }

        let mut state = derive_states(reference.values(), spec.standby_kw, spec.base_load_kw);
        let p_in = synthesize(&mut state, cycle.values(), spec.base_load_kw);
        let p_out = p_in.clone();
        let controllable = vec![true; p_in.len()];
        let period_steps = reference.axis().steps_for_minutes(spec.max_period_min);

        Ok(Self {
            spec,
            reference,
            cycle,
            period_steps,
            controlled: Some(ControlledProfile {
                state,
                p_in,
                p_out,
                controllable,
            }),
        })
    }

    /// Builds a fixed, non-controllable device from its reference trace.
    ///
    /// # Errors
    ///
    /// Returns `InvalidThreshold` for inconsistent thresholds.
    pub fn fixed(spec: EquipmentSpec, reference: TimeSeries) -> Result<Self, ConfigurationError> {
        validate_thresholds(&spec)?;
        Ok(Self::fixed_unchecked(
            EquipmentSpec {
                manipulation: ManipulationType::None,
                ..spec
            },
            reference,
        ))
    }

    fn fixed_unchecked(spec: EquipmentSpec, reference: TimeSeries) -> Self {
        let cycle = TimeSeries::new(reference.axis().with_len(0), Vec::new());
        Self {
            spec,
            reference,
            cycle,
            period_steps: 0,
            controlled: None,
        }
    }

    pub fn spec(&self) -> &EquipmentSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn manipulation(&self) -> ManipulationType {
        self.spec.manipulation
    }

    pub fn is_fixed(&self) -> bool {
        self.controlled.is_none()
    }

    pub fn axis(&self) -> &TimeAxis {
        self.reference.axis()
    }

    /// Measured reference trace.
    pub fn reference(&self) -> &TimeSeries {
        &self.reference
    }

    /// Duty cycle length in steps (0 for fixed devices).
    pub fn cycle_len(&self) -> usize {
        self.cycle.len()
    }

    /// Maximum compensation period in steps.
    pub fn period_steps(&self) -> usize {
        self.period_steps
    }

    /// Power this device contributes to the facility load.
    ///
    /// `P_out` for controllable devices, the reference trace for fixed ones.
    pub fn output_kw(&self) -> &[f32] {
        match &self.controlled {
            Some(profile) => &profile.p_out,
            None => self.reference.values(),
        }
    }

    pub fn p_in(&self) -> Option<&[f32]> {
        self.controlled.as_ref().map(|p| p.p_in.as_slice())
    }

    pub fn p_out(&self) -> Option<&[f32]> {
        self.controlled.as_ref().map(|p| p.p_out.as_slice())
    }

    pub fn states(&self) -> Option<&[OperatingState]> {
        self.controlled.as_ref().map(|p| p.state.as_slice())
    }

    pub fn controllable(&self) -> Option<&[bool]> {
        self.controlled.as_ref().map(|p| p.controllable.as_slice())
    }

    pub fn state_at(&self, index: usize) -> Option<OperatingState> {
        self.controlled
            .as_ref()
            .and_then(|p| p.state.get(index).copied())
    }

    /// `false` for fixed devices, out-of-range indices and manipulated samples.
    pub fn is_controllable_at(&self, index: usize) -> bool {
        self.controlled
            .as_ref()
            .and_then(|p| p.controllable.get(index).copied())
            .unwrap_or(false)
    }

    /// Number of leading samples from `clock` that may legally be capped.
    ///
    /// Counts at most one duty cycle of samples that are active, still
    /// controllable and stay above base load once scaled by `factor`.
    pub fn cappable_prefix(&self, clock: usize, factor: f32) -> usize {
        let Some(profile) = &self.controlled else {
            return 0;
        };
        let base = self.spec.base_load_kw;
        (clock..profile.p_in.len())
            .take(self.cycle.len())
            .take_while(|&i| {
                profile.state[i].is_active()
                    && profile.controllable[i]
                    && profile.p_in[i] * factor > base
            })
            .count()
    }

    /// Moves the activation starting at `clock` forward by `step` samples.
    ///
    /// The vacated window falls back to base load. The destination receives
    /// the input profile of the activation and is locked against further
    /// manipulation. A destination that reaches into another activation of
    /// this device is rejected, so the shift never overwrites running power.
    ///
    /// # Errors
    ///
    /// Returns the first failing precondition as an [`Infeasible`] reason;
    /// the device is left untouched in that case.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use loadshift_sim::devices::equipment::Equipment;
    /// use loadshift_sim::devices::types::{EquipmentSpec, ManipulationType};
    /// use loadshift_sim::sim::clock::TimeAxis;
    /// use loadshift_sim::sim::types::TimeSeries;
    ///
    /// let start = NaiveDate::from_ymd_opt(2020, 6, 1)
    ///     .and_then(|d| d.and_hms_opt(10, 0, 0))
    ///     .unwrap();
    /// let spec = EquipmentSpec {
    ///     name: "Dryer".into(),
    ///     location: "Laundry".into(),
    ///     nominal_kw: 5.0,
    ///     manipulation: ManipulationType::Shift,
    ///     standby_kw: 0.0,
    ///     base_load_kw: 1.0,
    ///     cap_factor: 0.8,
    ///     max_period_min: 4,
    /// };
    /// let reference = TimeSeries::new(TimeAxis::new(start, 1, 6), vec![5.0, 5.0, 1.0, 1.0, 1.0, 1.0]);
    /// let cycle = TimeSeries::new(TimeAxis::new(start, 1, 2), vec![5.0, 5.0]);
    /// let mut dryer = Equipment::new(spec, reference, cycle).unwrap();
    ///
    /// let out = dryer.shift(0, 3).unwrap();
    /// assert_eq!(out, &[1.0, 1.0, 1.0, 5.0, 5.0, 1.0]);
    /// ```
    pub fn shift(&mut self, clock: usize, step: usize) -> Result<&[f32], Infeasible> {
        let duration = self.cycle.len();
        let standby = self.spec.standby_kw;
        let base = self.spec.base_load_kw;
        let profile = self.controlled.as_mut().ok_or(Infeasible::FixedLoad)?;
        let n = profile.p_out.len();

        if profile.state.get(clock) != Some(&OperatingState::CycleStart) {
            return Err(Infeasible::NotAtCycleStart);
        }
        if !profile.controllable[clock] {
            return Err(Infeasible::AlreadyManipulated);
        }
        let source_end = clock + duration;
        if source_end > n {
            return Err(Infeasible::OutOfHorizon);
        }
        if !profile.controllable[clock..source_end].iter().all(|c| *c) {
            return Err(Infeasible::AlreadyManipulated);
        }

        let dest = clock + step;
        let dest_end = dest + duration;
        if dest_end > n {
            return Err(Infeasible::OutOfHorizon);
        }
        if profile.state[dest..dest_end].contains(&OperatingState::CycleStart) {
            return Err(Infeasible::OverlapsNextCycle);
        }
        if !profile.controllable[dest..dest_end].iter().all(|c| *c) {
            return Err(Infeasible::DestinationOccupied);
        }
        if (dest..dest_end)
            .filter(|i| !(clock..source_end).contains(i))
            .any(|i| profile.state[i].is_active())
        {
            return Err(Infeasible::OverlapsNextCycle);
        }

        let replay = profile.p_in[clock..source_end].to_vec();
        profile.p_out[clock..source_end].fill(base);
        profile.p_out[dest..dest_end].copy_from_slice(&replay);
        profile.controllable[dest..dest_end].fill(false);
        profile.state = derive_states(&profile.p_out, standby, base);

        Ok(&profile.p_out)
    }

    /// Limits the activation at `clock` to `factor` of its input power for
    /// `duration` samples and adds the shed power back later.
    ///
    /// The compensation window starts `step` samples after the capped window
    /// ends. Both windows are locked against further manipulation, so the
    /// energy shed equals the energy added back.
    ///
    /// # Errors
    ///
    /// Returns the first failing precondition as an [`Infeasible`] reason;
    /// the device is left untouched in that case.
    pub fn cap(
        &mut self,
        clock: usize,
        duration: usize,
        step: usize,
        factor: f32,
    ) -> Result<&[f32], Infeasible> {
        let standby = self.spec.standby_kw;
        let base = self.spec.base_load_kw;
        let profile = self.controlled.as_mut().ok_or(Infeasible::FixedLoad)?;
        let n = profile.p_out.len();

        if profile.state.get(clock) != Some(&OperatingState::CycleStart) {
            return Err(Infeasible::NotAtCycleStart);
        }
        if !profile.controllable[clock] {
            return Err(Infeasible::AlreadyManipulated);
        }
        if duration == 0 {
            return Err(Infeasible::NotActiveDuringCap);
        }
        let end = clock + duration;
        if end > n {
            return Err(Infeasible::OutOfHorizon);
        }
        if !profile.controllable[clock..end].iter().all(|c| *c) {
            return Err(Infeasible::AlreadyManipulated);
        }
        if !profile.state[clock..end].iter().all(|s| s.is_active()) {
            return Err(Infeasible::NotActiveDuringCap);
        }
        if profile.p_in[clock..end].iter().any(|p| p * factor <= base) {
            return Err(Infeasible::BelowBaseLoadAfterCap);
        }

        let comp = end + step;
        let comp_end = comp + duration;
        if comp_end > n {
            return Err(Infeasible::OutOfHorizon);
        }
        if !profile.controllable[comp..comp_end].iter().all(|c| *c) {
            return Err(Infeasible::DestinationOccupied);
        }

        for k in 0..duration {
            let capped = profile.p_in[clock + k] * factor;
            let shed = profile.p_in[clock + k] - capped;
            profile.p_out[clock + k] = capped;
            profile.p_out[comp + k] += shed;
        }
        profile.controllable[clock..end].fill(false);
        profile.controllable[comp..comp_end].fill(false);
        profile.state = derive_states(&profile.p_out, standby, base);

        Ok(&profile.p_out)
    }
}

fn validate_thresholds(spec: &EquipmentSpec) -> Result<(), ConfigurationError> {
    let invalid = |message: &str| ConfigurationError::InvalidThreshold {
        device: spec.name.clone(),
        message: message.to_string(),
    };

    if spec.base_load_kw.is_nan() || spec.base_load_kw < 0.0 {
        return Err(invalid("base load must be >= 0"));
    }
    if spec.standby_kw > spec.base_load_kw {
        return Err(invalid("standby level must not exceed base load"));
    }
    if spec.cap_factor.is_nan() || spec.cap_factor <= 0.0 || spec.cap_factor > 1.0 {
        return Err(invalid("cap factor must be in (0, 1]"));
    }
    Ok(())
}
