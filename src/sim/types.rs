//! Core simulation types: time-indexed power series.

use chrono::NaiveDateTime;

use super::clock::TimeAxis;
use crate::error::ConfigurationError;

/// A power series sampled on a uniform [`TimeAxis`].
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use loadshift_sim::sim::clock::TimeAxis;
/// use loadshift_sim::sim::types::TimeSeries;
///
/// let start = NaiveDate::from_ymd_opt(2020, 6, 1)
///     .and_then(|d| d.and_hms_opt(0, 0, 0))
///     .unwrap();
/// let series = TimeSeries::new(TimeAxis::new(start, 30, 3), vec![2.0, 2.0, 0.0]);
/// assert_eq!(series.energy_kwh(), 2.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    axis: TimeAxis,
    values: Vec<f32>,
}

impl TimeSeries {
    /// Wraps `values` on `axis`.
    ///
    /// # Panics
    ///
    /// Panics if the axis length differs from `values.len()`.
    pub fn new(axis: TimeAxis, values: Vec<f32>) -> Self {
        assert_eq!(axis.len(), values.len(), "axis length must match values");
        Self { axis, values }
    }

    /// Builds a series from timestamped samples and checks the step is uniform.
    ///
    /// A single sample carries no step information, so `default_step_minutes`
    /// is used in that case.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if the series is empty, the step is not
    /// a positive whole number of minutes, or any step differs from the first.
    pub fn from_points(
        label: &str,
        points: &[(NaiveDateTime, f32)],
        default_step_minutes: u32,
    ) -> Result<Self, ConfigurationError> {
        let Some(&(start, _)) = points.first() else {
            return Err(ConfigurationError::EmptySeries {
                series: label.to_string(),
            });
        };

        let step_minutes = match points.get(1) {
            Some(&(second, _)) => {
                let minutes = (second - start).num_minutes();
                u32::try_from(minutes)
                    .ok()
                    .filter(|m| *m > 0)
                    .ok_or_else(|| ConfigurationError::NonUniformStep {
                        series: label.to_string(),
                        index: 1,
                    })?
            }
            None => default_step_minutes,
        };

        let axis = TimeAxis::new(start, step_minutes, points.len());
        for (index, (ts, _)) in points.iter().enumerate() {
            if *ts != axis.timestamp(index) {
                return Err(ConfigurationError::NonUniformStep {
                    series: label.to_string(),
                    index,
                });
            }
        }

        Ok(Self {
            axis,
            values: points.iter().map(|(_, v)| *v).collect(),
        })
    }

    pub fn axis(&self) -> &TimeAxis {
        &self.axis
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Energy content of the series in kWh.
    pub fn energy_kwh(&self) -> f32 {
        self.values.iter().sum::<f32>() * self.axis.dt_hours()
    }

    /// Cuts the series down to the window described by `horizon`.
    ///
    /// # Errors
    ///
    /// Returns `HorizonMismatch` if this series does not cover `horizon`.
    pub fn window(&self, label: &str, horizon: &TimeAxis) -> Result<Self, ConfigurationError> {
        if !self.axis.covers(horizon) {
            return Err(ConfigurationError::HorizonMismatch {
                series: label.to_string(),
            });
        }
        let first = self.axis.index_of(horizon.start()).unwrap_or(0);
        Ok(Self {
            axis: *horizon,
            values: self.values[first..first + horizon.len()].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 6, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid timestamp")
    }

    fn points(step: i64, n: usize) -> Vec<(NaiveDateTime, f32)> {
        (0..n)
            .map(|i| (t0() + Duration::minutes(step * i as i64), i as f32))
            .collect()
    }

    #[test]
    fn infers_step_from_points() {
        let series = TimeSeries::from_points("p", &points(5, 4), 1).expect("uniform");
        assert_eq!(series.axis().step_minutes(), 5);
        assert_eq!(series.values(), &[0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn single_point_uses_default_step() {
        let series = TimeSeries::from_points("c", &points(1, 1), 15).expect("one sample");
        assert_eq!(series.axis().step_minutes(), 15);
    }

    #[test]
    fn rejects_gap_in_series() {
        let mut pts = points(1, 5);
        pts[3].0 += Duration::minutes(1);
        let err = TimeSeries::from_points("p", &pts, 1);
        assert_eq!(
            err,
            Err(ConfigurationError::NonUniformStep {
                series: "p".to_string(),
                index: 3
            })
        );
    }

    #[test]
    fn rejects_empty_series() {
        assert!(matches!(
            TimeSeries::from_points("p", &[], 1),
            Err(ConfigurationError::EmptySeries { .. })
        ));
    }

    #[test]
    fn window_extracts_covered_range() {
        let series = TimeSeries::from_points("p", &points(1, 10), 1).expect("uniform");
        let horizon = TimeAxis::new(t0() + Duration::minutes(2), 1, 3);
        let cut = series.window("p", &horizon).expect("covered");
        assert_eq!(cut.values(), &[2.0, 3.0, 4.0]);

        let too_long = TimeAxis::new(t0() + Duration::minutes(8), 1, 3);
        assert!(series.window("p", &too_long).is_err());
    }
}
