use chrono::{Duration, NaiveDateTime};

/// Uniform time axis shared by every series of a simulation run.
///
/// The axis maps sample indices to wall-clock timestamps and converts
/// minute durations into step counts. All series in one run use the same
/// step length, a whole number of minutes.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use loadshift_sim::sim::clock::TimeAxis;
///
/// let start = NaiveDate::from_ymd_opt(2020, 6, 1)
///     .and_then(|d| d.and_hms_opt(10, 0, 0))
///     .unwrap();
/// let axis = TimeAxis::new(start, 1, 60);
///
/// assert_eq!(axis.steps_for_minutes(15), 15);
/// assert_eq!(axis.index_of(axis.timestamp(6)), Some(6));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeAxis {
    /// Timestamp of sample 0
    start: NaiveDateTime,
    /// Length of one step in minutes
    step_minutes: u32,
    /// Number of samples
    len: usize,
}

impl TimeAxis {
    /// Creates a new axis.
    ///
    /// # Arguments
    ///
    /// * `start` - Timestamp of the first sample
    /// * `step_minutes` - Step length in minutes (must be > 0)
    /// * `len` - Number of samples
    ///
    /// # Panics
    ///
    /// Panics if `step_minutes` is zero.
    pub fn new(start: NaiveDateTime, step_minutes: u32, len: usize) -> Self {
        assert!(step_minutes > 0, "step_minutes must be > 0");
        Self {
            start,
            step_minutes,
            len,
        }
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn step_minutes(&self) -> u32 {
        self.step_minutes
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Duration of one step in hours; multiplies kW into kWh.
    pub fn dt_hours(&self) -> f32 {
        self.step_minutes as f32 / 60.0
    }

    /// Timestamp of sample `index` (may lie past the end of the axis).
    pub fn timestamp(&self, index: usize) -> NaiveDateTime {
        self.start + Duration::minutes(i64::from(self.step_minutes) * index as i64)
    }

    /// Index of `ts` on this axis, if it falls exactly on a sample.
    pub fn index_of(&self, ts: NaiveDateTime) -> Option<usize> {
        let offset = (ts - self.start).num_minutes();
        let step = i64::from(self.step_minutes);
        if offset < 0 || offset % step != 0 {
            return None;
        }
        let index = (offset / step) as usize;
        (index < self.len).then_some(index)
    }

    /// Number of whole steps that fit into `minutes`.
    pub fn steps_for_minutes(&self, minutes: u32) -> usize {
        (minutes / self.step_minutes) as usize
    }

    /// Returns the same axis truncated or extended to `len` samples.
    pub fn with_len(&self, len: usize) -> Self {
        Self { len, ..*self }
    }

    /// Returns `true` when `other` lies within this axis on the same step grid.
    pub fn covers(&self, other: &TimeAxis) -> bool {
        if self.step_minutes != other.step_minutes || other.is_empty() {
            return false;
        }
        match self.index_of(other.start) {
            Some(first) => first + other.len <= self.len,
            None => false,
        }
    }

    /// Iterates `(index, timestamp)` pairs in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, NaiveDateTime)> {
        let axis = *self;
        (0..axis.len).map(move |i| (i, axis.timestamp(i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 6, 1)
            .and_then(|d| d.and_hms_opt(h, m, 0))
            .expect("valid timestamp")
    }

    #[test]
    fn timestamps_follow_step() {
        let axis = TimeAxis::new(at(10, 0), 15, 8);
        assert_eq!(axis.timestamp(0), at(10, 0));
        assert_eq!(axis.timestamp(3), at(10, 45));
        assert_eq!(axis.dt_hours(), 0.25);
    }

    #[test]
    fn index_of_rejects_off_grid_and_out_of_range() {
        let axis = TimeAxis::new(at(10, 0), 5, 4);
        assert_eq!(axis.index_of(at(10, 10)), Some(2));
        assert_eq!(axis.index_of(at(10, 12)), None);
        assert_eq!(axis.index_of(at(9, 55)), None);
        assert_eq!(axis.index_of(at(10, 20)), None);
    }

    #[test]
    fn minutes_convert_to_whole_steps() {
        let axis = TimeAxis::new(at(0, 0), 15, 96);
        assert_eq!(axis.steps_for_minutes(30), 2);
        assert_eq!(axis.steps_for_minutes(20), 1);
        assert_eq!(axis.steps_for_minutes(0), 0);
    }

    #[test]
    fn covers_requires_same_grid() {
        let day = TimeAxis::new(at(0, 0), 1, 1440);
        assert!(day.covers(&TimeAxis::new(at(10, 0), 1, 60)));
        assert!(!day.covers(&TimeAxis::new(at(23, 30), 1, 60)));
        assert!(!day.covers(&TimeAxis::new(at(10, 0), 5, 12)));
    }

    #[test]
    #[should_panic]
    fn zero_step_panics() {
        TimeAxis::new(at(0, 0), 0, 10);
    }
}
