//! TOML-based scenario configuration and preset definitions.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::devices::ManipulationType;
use crate::io::ingest::CsvDialect;
use crate::sim::kpi::SavingsFactors;

/// Timestamp format of `simulation.start`.
pub const START_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Top-level scenario configuration parsed from TOML.
///
/// All sections have defaults. Load from TOML with
/// [`ScenarioConfig::from_toml_file`] or use [`ScenarioConfig::demo`] for the
/// built-in clinic facility.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Horizon, time step and random seed.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Layout of every CSV input.
    #[serde(default)]
    pub input: CsvDialect,
    /// PV production and reference curtailment.
    #[serde(default)]
    pub target: TargetConfig,
    /// Emission and cost factors.
    #[serde(default)]
    pub savings: SavingsConfig,
    /// Device catalogue, one `[[device]]` table per device.
    #[serde(default, rename = "device")]
    pub devices: Vec<DeviceConfig>,
    /// Directory relative CSV paths resolve against.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// Horizon, time step and random seed.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// First timestamp of the horizon (`YYYY-MM-DD HH:MM:SS`).
    pub start: String,
    /// Step length in minutes (must be > 0).
    pub step_minutes: u32,
    /// Number of timesteps (must be > 0).
    pub horizon_steps: usize,
    /// Master random seed for synthetic traces.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start: "2020-06-01 00:00:00".to_string(),
            step_minutes: 1,
            horizon_steps: 1440,
            seed: 42,
        }
    }
}

impl SimulationConfig {
    /// Parses [`SimulationConfig::start`].
    pub fn start_time(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.start, START_FORMAT).ok()
    }
}

/// PV production and reference curtailment.
///
/// With `csv` set, both series are read from the file. Otherwise PV is
/// synthesized and the reference curtailment is the PV surplus over the
/// facility's reference load and the export limit.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetConfig {
    /// Table of `timestamp, PV kW, curtailment kW`.
    pub csv: Option<PathBuf>,
    /// Synthetic PV peak (kW).
    pub pv_peak_kw: f32,
    /// Synthetic sunrise (hour of day).
    pub sunrise_hour: f32,
    /// Synthetic sunset (hour of day).
    pub sunset_hour: f32,
    /// Relative cloud noise of the synthetic PV.
    pub cloud_noise_std: f32,
    /// Power the site may feed into the grid before curtailing (kW).
    pub export_limit_kw: f32,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            csv: None,
            pv_peak_kw: 250.0,
            sunrise_hour: 5.5,
            sunset_hour: 21.5,
            cloud_noise_std: 0.05,
            export_limit_kw: 0.0,
        }
    }
}

/// Emission and cost factors for the savings report.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SavingsConfig {
    /// Grid outage: the avoided energy would come from a diesel generator.
    pub blackout: bool,
    /// Overrides the kg CO2 per kWh of the chosen supply.
    pub co2_kg_per_kwh: Option<f32>,
    /// Overrides the cost per kWh of the chosen supply.
    pub cost_per_kwh: Option<f32>,
}

impl SavingsConfig {
    /// Effective factors: grid or diesel defaults with overrides applied.
    pub fn factors(&self) -> SavingsFactors {
        let base = if self.blackout {
            SavingsFactors::diesel()
        } else {
            SavingsFactors::grid()
        };
        SavingsFactors {
            co2_kg_per_kwh: self.co2_kg_per_kwh.unwrap_or(base.co2_kg_per_kwh),
            cost_per_kwh: self.cost_per_kwh.unwrap_or(base.cost_per_kwh),
        }
    }
}

/// One device of the catalogue.
///
/// The reference trace comes from `profile_csv` when given, otherwise it is
/// synthesized from the duty cycle. The duty cycle is `cycle_csv`, an
/// explicit `cycle_kw` list, or a plateau of `plateau_kw` for
/// `cycle_minutes`, in that order.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfig {
    /// Unique display name.
    pub name: String,
    /// Location tag (`"Department/Room"`).
    pub location: String,
    /// Nominal power (kW).
    pub nominal_kw: f32,
    /// `"none"`, `"shift"`, `"cap"` or `"cap_and_shift"`.
    pub manipulation: ManipulationType,
    /// Idle draw and base-load threshold (kW).
    pub base_load_kw: f32,
    /// Standby threshold (kW).
    pub standby_kw: f32,
    /// Remaining power fraction while capped.
    pub cap_factor: f32,
    /// Maximum compensation period (minutes).
    pub max_period_min: u32,
    /// Measured reference trace.
    pub profile_csv: Option<PathBuf>,
    /// Measured duty cycle.
    pub cycle_csv: Option<PathBuf>,
    /// Duty cycle, one value per step (kW).
    pub cycle_kw: Vec<f32>,
    /// Plateau duty cycle power (kW).
    pub plateau_kw: f32,
    /// Plateau duty cycle length (minutes).
    pub cycle_minutes: u32,
    /// Synthetic activations per day.
    pub activations_per_day: usize,
    /// Synthetic activation start times (hour of day); overrides
    /// `activations_per_day` when set.
    pub start_hours: Vec<f32>,
    /// Synthetic measurement noise (kW).
    pub noise_std: f32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            location: String::new(),
            nominal_kw: 0.0,
            manipulation: ManipulationType::None,
            base_load_kw: 0.0,
            standby_kw: 0.0,
            cap_factor: 0.8,
            max_period_min: 30,
            profile_csv: None,
            cycle_csv: None,
            cycle_kw: Vec::new(),
            plateau_kw: 0.0,
            cycle_minutes: 0,
            activations_per_day: 4,
            start_hours: Vec::new(),
            noise_std: 0.02,
        }
    }
}

impl DeviceConfig {
    /// Duty cycle from `cycle_kw` or the plateau, sampled every `step_minutes`.
    ///
    /// Empty when the device has neither.
    pub fn duty_cycle(&self, step_minutes: u32) -> Vec<f32> {
        if !self.cycle_kw.is_empty() {
            return self.cycle_kw.clone();
        }
        if step_minutes == 0 {
            return Vec::new();
        }
        vec![self.plateau_kw; (self.cycle_minutes / step_minutes) as usize]
    }

    fn variable(
        name: &str,
        location: &str,
        nominal_kw: f32,
        manipulation: ManipulationType,
        cycle_minutes: u32,
        max_period_min: u32,
        base_load_kw: f32,
    ) -> Self {
        Self {
            name: name.to_string(),
            location: location.to_string(),
            nominal_kw,
            manipulation,
            base_load_kw,
            max_period_min,
            plateau_kw: nominal_kw,
            cycle_minutes,
            ..Self::default()
        }
    }

    fn fixed(name: &str, location: &str, kw: f32) -> Self {
        Self {
            name: name.to_string(),
            location: location.to_string(),
            nominal_kw: kw,
            base_load_kw: kw,
            noise_std: 0.01 * kw,
            ..Self::default()
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.step_minutes"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl ScenarioConfig {
    /// Returns the demo clinic: radiology, laundry, utility and theatre loads
    /// on one day of synthetic data at 1-minute resolution.
    pub fn demo() -> Self {
        use ManipulationType::{Cap, CapAndShift, Shift};

        Self {
            simulation: SimulationConfig::default(),
            input: CsvDialect::default(),
            target: TargetConfig::default(),
            savings: SavingsConfig::default(),
            devices: vec![
                DeviceConfig::variable(
                    "AC Administration",
                    "Administration/Offices",
                    5.88,
                    Cap,
                    20,
                    30,
                    1.68,
                ),
                DeviceConfig::variable("CT", "Radiology/CT room", 13.013, Shift, 10, 15, 3.4),
                DeviceConfig {
                    start_hours: vec![7.0, 13.0],
                    ..DeviceConfig::variable(
                        "Washing machines",
                        "Laundry/Washing room",
                        57.8,
                        Shift,
                        60,
                        90,
                        0.001,
                    )
                },
                DeviceConfig::variable("MRI", "Radiology/MRI room", 45.32, Shift, 30, 30, 17.3),
                DeviceConfig::variable("PET-CT", "Radiology/PET room", 17.171, Shift, 20, 30, 3.43),
                DeviceConfig::variable(
                    "Pump station",
                    "Utility Room/Pumps",
                    8.822,
                    Cap,
                    15,
                    20,
                    0.1,
                ),
                DeviceConfig::variable(
                    "Steam Generator",
                    "Utility Room/Boiler",
                    28.447,
                    Cap,
                    30,
                    20,
                    7.19,
                ),
                DeviceConfig::variable(
                    "AC Theater",
                    "Operation Theater/Theater 1",
                    14.7,
                    CapAndShift,
                    20,
                    20,
                    4.2,
                ),
                DeviceConfig::variable("X-Ray", "Radiology/X-Ray room", 1.31, Shift, 5, 30, 0.92),
                DeviceConfig::fixed(
                    "Administration Fixed Load",
                    "Administration/General",
                    13.516,
                ),
                DeviceConfig::fixed("Laundry Fixed Load", "Laundry/General", 9.6697),
                DeviceConfig::fixed(
                    "Operation Theater Fixed Load",
                    "Operation Theater/General",
                    66.098,
                ),
            ],
            base_dir: None,
        }
    }

    /// Returns the blackout preset: the demo clinic islanded on a diesel
    /// generator with a larger PV array, so savings use generator factors.
    pub fn blackout() -> Self {
        let demo = Self::demo();
        Self {
            target: TargetConfig {
                pv_peak_kw: 300.0,
                ..demo.target
            },
            savings: SavingsConfig {
                blackout: true,
                ..SavingsConfig::default()
            },
            ..demo
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["demo", "blackout"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "demo" => Ok(Self::demo()),
            "blackout" => Ok(Self::blackout()),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// Relative CSV paths in the file resolve against its directory.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "scenario".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        let mut cfg = Self::from_toml_str(&content)?;
        cfg.base_dir = path.parent().map(Path::to_path_buf);
        Ok(cfg)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Resolves a CSV path from the file against [`ScenarioConfig::base_dir`].
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if s.step_minutes == 0 {
            errors.push(ConfigError {
                field: "simulation.step_minutes".into(),
                message: "must be > 0".into(),
            });
        }
        if s.horizon_steps == 0 {
            errors.push(ConfigError {
                field: "simulation.horizon_steps".into(),
                message: "must be > 0".into(),
            });
        }
        if s.start_time().is_none() {
            errors.push(ConfigError {
                field: "simulation.start".into(),
                message: format!("expected \"YYYY-MM-DD HH:MM:SS\", got \"{}\"", s.start),
            });
        }

        let delimiter = self.input.delimiter;
        if !delimiter.is_ascii() {
            errors.push(ConfigError {
                field: "input.delimiter".into(),
                message: "must be a single ASCII character".into(),
            });
        }

        let t = &self.target;
        if t.csv.is_none() {
            if !(0.0..=24.0).contains(&t.sunrise_hour) || !(0.0..=24.0).contains(&t.sunset_hour) {
                errors.push(ConfigError {
                    field: "target.sunrise_hour".into(),
                    message: "sunrise and sunset must be in [0, 24]".into(),
                });
            } else if t.sunrise_hour >= t.sunset_hour {
                errors.push(ConfigError {
                    field: "target.sunrise_hour".into(),
                    message: "must be < target.sunset_hour".into(),
                });
            }
            if t.pv_peak_kw.is_nan() || t.pv_peak_kw < 0.0 {
                errors.push(ConfigError {
                    field: "target.pv_peak_kw".into(),
                    message: "must be >= 0".into(),
                });
            }
        }
        if t.export_limit_kw.is_nan() || t.export_limit_kw < 0.0 {
            errors.push(ConfigError {
                field: "target.export_limit_kw".into(),
                message: "must be >= 0".into(),
            });
        }

        let sv = &self.savings;
        if sv.co2_kg_per_kwh.is_some_and(|v| v.is_nan() || v < 0.0) {
            errors.push(ConfigError {
                field: "savings.co2_kg_per_kwh".into(),
                message: "must be >= 0".into(),
            });
        }
        if sv.cost_per_kwh.is_some_and(|v| v.is_nan() || v < 0.0) {
            errors.push(ConfigError {
                field: "savings.cost_per_kwh".into(),
                message: "must be >= 0".into(),
            });
        }

        let mut names = HashSet::new();
        for (i, d) in self.devices.iter().enumerate() {
            let field = |name: &str| format!("device[{i}].{name}");

            if d.name.trim().is_empty() {
                errors.push(ConfigError {
                    field: field("name"),
                    message: "must not be empty".into(),
                });
            } else if !names.insert(d.name.as_str()) {
                errors.push(ConfigError {
                    field: field("name"),
                    message: format!("duplicate device name \"{}\"", d.name),
                });
            }
            if d.base_load_kw.is_nan() || d.base_load_kw < 0.0 {
                errors.push(ConfigError {
                    field: field("base_load_kw"),
                    message: "must be >= 0".into(),
                });
            }
            if d.standby_kw.is_nan() || d.standby_kw > d.base_load_kw {
                errors.push(ConfigError {
                    field: field("standby_kw"),
                    message: "must be <= base_load_kw".into(),
                });
            }
            if d.noise_std.is_nan() || d.noise_std < 0.0 {
                errors.push(ConfigError {
                    field: field("noise_std"),
                    message: "must be >= 0".into(),
                });
            }
            if d.start_hours.iter().any(|h| !(0.0..24.0).contains(h)) {
                errors.push(ConfigError {
                    field: field("start_hours"),
                    message: "must be in [0.0, 24.0)".into(),
                });
            }

            if d.manipulation.is_fixed() {
                continue;
            }

            if !(d.cap_factor > 0.0 && d.cap_factor <= 1.0) {
                errors.push(ConfigError {
                    field: field("cap_factor"),
                    message: "must be in (0.0, 1.0]".into(),
                });
            }
            if d.cycle_csv.is_none() {
                let cycle = d.duty_cycle(s.step_minutes);
                match cycle.first() {
                    None => errors.push(ConfigError {
                        field: field("cycle_kw"),
                        message: "controllable devices need cycle_csv, cycle_kw or \
                                  plateau_kw with cycle_minutes"
                            .into(),
                    }),
                    Some(first) if d.profile_csv.is_none() && *first <= d.base_load_kw => {
                        errors.push(ConfigError {
                            field: field("cycle_kw"),
                            message: "first duty-cycle sample must exceed base_load_kw".into(),
                        });
                    }
                    Some(_) if cycle.len() >= s.horizon_steps => errors.push(ConfigError {
                        field: field("cycle_kw"),
                        message: "duty cycle must be shorter than simulation.horizon_steps"
                            .into(),
                    }),
                    Some(_) => {}
                }
            }
        }

        errors
    }
}
