//! Scenario assembly: from a validated [`ScenarioConfig`] to devices and target series.

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::{ConfigError, DeviceConfig, ScenarioConfig};
use crate::devices::{Equipment, EquipmentSpec};
use crate::error::ConfigurationError;
use crate::io::ingest::{IngestError, read_series_file, read_target_file};
use crate::sim::aggregate::LoadAggregate;
use crate::sim::clock::TimeAxis;
use crate::sim::kpi::SavingsFactors;
use crate::sim::target::CurtailmentTarget;
use crate::sim::types::TimeSeries;
use crate::synthetic::{DeviceShape, PvShape, device_profile, fixed_profile, pv_profile};

/// Failure while turning a configuration into a runnable scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("{}", join_errors(.0))]
    Invalid(Vec<ConfigError>),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Devices and target inputs on one shared time axis.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub axis: TimeAxis,
    /// Catalogue in configuration order.
    pub devices: Vec<Equipment>,
    /// PV production.
    pub pv: TimeSeries,
    /// Curtailment before any manipulation.
    pub reference_curtailment: TimeSeries,
    pub savings: SavingsFactors,
}

impl Scenario {
    /// Builds every device and the target series described by `cfg`.
    ///
    /// Measured CSV inputs are read and cut to the configured horizon;
    /// missing ones are synthesized from the configured seed.
    ///
    /// # Errors
    ///
    /// Returns `ScenarioError::Invalid` if validation fails, and an ingest or
    /// configuration error if an input cannot be read or does not fit.
    pub fn from_config(cfg: &ScenarioConfig) -> Result<Self, ScenarioError> {
        let errors = cfg.validate();
        if !errors.is_empty() {
            return Err(ScenarioError::Invalid(errors));
        }

        let sim = &cfg.simulation;
        let start = sim.start_time().ok_or_else(|| {
            ScenarioError::Invalid(vec![ConfigError {
                field: "simulation.start".into(),
                message: format!("cannot parse \"{}\"", sim.start),
            }])
        })?;
        let axis = TimeAxis::new(start, sim.step_minutes, sim.horizon_steps);

        let devices = cfg
            .devices
            .iter()
            .enumerate()
            .map(|(i, d)| build_device(cfg, &axis, i, d))
            .collect::<Result<Vec<_>, _>>()?;

        let (pv, reference_curtailment) = match &cfg.target.csv {
            Some(path) => read_target_file(&cfg.resolve(path), &cfg.input, sim.step_minutes)?,
            None => synthetic_target(cfg, &axis, &devices)?,
        };

        info!(
            devices = devices.len(),
            steps = axis.len(),
            step_minutes = axis.step_minutes(),
            pv_kwh = pv.energy_kwh(),
            "scenario loaded"
        );

        Ok(Self {
            axis,
            devices,
            pv,
            reference_curtailment,
            savings: cfg.savings.factors(),
        })
    }

    /// Sums the catalogue and derives the curtailment target.
    ///
    /// # Errors
    ///
    /// Returns `HorizonMismatch` if a device or the target series does not
    /// cover the scenario axis.
    pub fn prepare(&self) -> Result<(LoadAggregate, CurtailmentTarget), ConfigurationError> {
        let aggregate = LoadAggregate::new(self.axis, &self.devices)?;
        let target = CurtailmentTarget::new(&self.pv, &self.reference_curtailment, &aggregate)?;
        debug!(
            fixed = aggregate.fixed().len(),
            variable = aggregate.variable().len(),
            reference_curtailment_kwh = target.reference_curtailment_kwh(),
            "facility aggregated"
        );
        Ok((aggregate, target))
    }
}

fn read_profile(
    cfg: &ScenarioConfig,
    path: &Path,
    name: &str,
    axis: &TimeAxis,
) -> Result<TimeSeries, ScenarioError> {
    let series = read_series_file(&cfg.resolve(path), name, &cfg.input, axis.step_minutes())?;
    Ok(series.window(name, axis)?)
}

fn build_device(
    cfg: &ScenarioConfig,
    axis: &TimeAxis,
    index: usize,
    d: &DeviceConfig,
) -> Result<Equipment, ScenarioError> {
    let spec = EquipmentSpec {
        name: d.name.clone(),
        location: d.location.clone(),
        nominal_kw: d.nominal_kw,
        manipulation: d.manipulation,
        standby_kw: d.standby_kw,
        base_load_kw: d.base_load_kw,
        cap_factor: d.cap_factor,
        max_period_min: d.max_period_min,
    };
    let seed = cfg.simulation.seed.wrapping_add(index as u64 + 1);

    if d.manipulation.is_fixed() {
        let reference = match &d.profile_csv {
            Some(path) => read_profile(cfg, path, &d.name, axis)?,
            None => fixed_profile(axis, d.base_load_kw, d.noise_std, seed),
        };
        debug!(device = %d.name, "fixed load");
        return Ok(Equipment::fixed(spec, reference)?);
    }

    let cycle = match &d.cycle_csv {
        Some(path) => read_series_file(
            &cfg.resolve(path),
            &format!("{} duty cycle", d.name),
            &cfg.input,
            axis.step_minutes(),
        )?,
        None => {
            let values = d.duty_cycle(axis.step_minutes());
            TimeSeries::new(axis.with_len(values.len()), values)
        }
    };

    let reference = match &d.profile_csv {
        Some(path) => read_profile(cfg, path, &d.name, axis)?,
        None => device_profile(
            axis,
            &DeviceShape {
                cycle_kw: cycle.values(),
                base_load_kw: d.base_load_kw,
                standby_kw: d.standby_kw,
                activations_per_day: d.activations_per_day,
                start_hours: &d.start_hours,
                noise_std: d.noise_std,
            },
            seed,
        ),
    };

    let device = Equipment::new(spec, reference, cycle)?;
    debug!(
        device = device.name(),
        kind = %device.manipulation(),
        cycle_steps = device.cycle_len(),
        period_steps = device.period_steps(),
        "device built"
    );
    Ok(device)
}

/// Synthetic PV and the curtailment it causes on the unmanipulated facility.
fn synthetic_target(
    cfg: &ScenarioConfig,
    axis: &TimeAxis,
    devices: &[Equipment],
) -> Result<(TimeSeries, TimeSeries), ScenarioError> {
    let t = &cfg.target;
    let shape = PvShape {
        peak_kw: t.pv_peak_kw,
        sunrise_hour: t.sunrise_hour,
        sunset_hour: t.sunset_hour,
        cloud_noise_std: t.cloud_noise_std,
    };
    let pv = pv_profile(axis, &shape, cfg.simulation.seed);

    let aggregate = LoadAggregate::new(*axis, devices)?;
    let curtailment = pv
        .values()
        .iter()
        .zip(aggregate.reference_snapshot())
        .map(|(pv_kw, load_kw)| (pv_kw - load_kw - t.export_limit_kw).max(0.0))
        .collect();

    Ok((pv, TimeSeries::new(*axis, curtailment)))
}
