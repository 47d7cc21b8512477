//! Feasibility search for shift and cap compensation windows.
//!
//! Both searches value a window by the curtailed PV energy it would absorb
//! and compare the best candidate against what the activation already
//! absorbs where it currently runs.

use crate::devices::Equipment;
use crate::error::Infeasible;

use super::aggregate::{LoadAggregate, Scope};
use super::target::CurtailmentTarget;

/// Capped window and compensation offset chosen by [`SearchContext::cap_comp_time`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapPlan {
    /// Steps between the end of the capped window and the compensation.
    pub offset: usize,
    /// Number of capped samples.
    pub duration: usize,
}

/// Read-only view of the facility state used while scanning one device.
#[derive(Debug, Clone, Copy)]
pub struct SearchContext<'a> {
    target: &'a CurtailmentTarget,
    aggregate: &'a LoadAggregate,
}

impl<'a> SearchContext<'a> {
    pub fn new(target: &'a CurtailmentTarget, aggregate: &'a LoadAggregate) -> Self {
        Self { target, aggregate }
    }

    /// PV left over after every other device has been served (kW).
    fn headroom_kw(&self, device: &Equipment, index: usize) -> f32 {
        let others = self.aggregate.total(Scope::All)[index] - device.output_kw()[index];
        (self.target.pv_kw()[index] - others).max(0.0)
    }

    /// Finds the shift offset that absorbs the most curtailment.
    ///
    /// The current value is the PV headroom the activation already uses over
    /// `[clock, clock + duration)`. Candidate offsets `0..=period` are valued
    /// by the live curtailment inside the shifted window; windows leaving the
    /// horizon are not evaluated.
    ///
    /// # Returns
    ///
    /// The earliest offset with the highest value.
    ///
    /// # Errors
    ///
    /// `NoBenefit` when no candidate carries curtailment, `AlreadyOptimal`
    /// when the current position is at least as good or the best offset is 0.
    pub fn shift_comp_time(
        &self,
        device: &Equipment,
        clock: usize,
        duration: usize,
        period: usize,
    ) -> Result<usize, Infeasible> {
        let dt = self.target.axis().dt_hours();
        let n = self.target.len();
        let curtailment = self.target.curtailment_kw();

        let current: f32 = (clock..(clock + duration).min(n))
            .map(|i| self.headroom_kw(device, i) * dt)
            .sum();

        let candidates = (0..=period)
            .take_while(|i| clock + i + duration <= n)
            .map(|i| {
                let start = clock + i;
                let value: f32 = curtailment[start..start + duration].iter().sum::<f32>() * dt;
                (i, value)
            });

        match decide(current, candidates)? {
            0 => Err(Infeasible::AlreadyOptimal),
            offset => Ok(offset),
        }
    }

    /// Finds the compensation offset for capping the activation at `clock`.
    ///
    /// The capped duration is the longest prefix (at most `duration`) of the
    /// activation that may legally be capped by `factor`. Each sample sheds
    /// `P_in * (1 - factor)`; a window is valued by the curtailment it can
    /// absorb, bounded sample-wise by the shed power. The current value is
    /// the PV headroom the shed power already uses inside the capped window.
    ///
    /// # Errors
    ///
    /// `AlreadyManipulated`, `NotActiveDuringCap` or `BelowBaseLoadAfterCap`
    /// when nothing can be capped; otherwise the same contract as
    /// [`SearchContext::shift_comp_time`], except that offset 0
    /// (compensation right after the capped window) is a valid result.
    pub fn cap_comp_time(
        &self,
        device: &Equipment,
        clock: usize,
        duration: usize,
        period: usize,
        factor: f32,
    ) -> Result<CapPlan, Infeasible> {
        let capped = device.cappable_prefix(clock, factor).min(duration);
        if capped == 0 {
            return Err(if !device.is_controllable_at(clock) {
                Infeasible::AlreadyManipulated
            } else if !device.state_at(clock).is_some_and(|s| s.is_active()) {
                Infeasible::NotActiveDuringCap
            } else {
                Infeasible::BelowBaseLoadAfterCap
            });
        }

        let Some(p_in) = device.p_in() else {
            return Err(Infeasible::FixedLoad);
        };
        let shed: Vec<f32> = p_in[clock..clock + capped]
            .iter()
            .map(|p| p * (1.0 - factor))
            .collect();

        let dt = self.target.axis().dt_hours();
        let n = self.target.len();
        let curtailment = self.target.curtailment_kw();

        let current: f32 = shed
            .iter()
            .enumerate()
            .map(|(k, s)| self.headroom_kw(device, clock + k).min(*s) * dt)
            .sum();

        let first = clock + capped;
        let candidates = (0..=period)
            .take_while(|i| first + i + capped <= n)
            .map(|i| {
                let start = first + i;
                let value: f32 = shed
                    .iter()
                    .zip(&curtailment[start..start + capped])
                    .map(|(s, c)| c.min(*s) * dt)
                    .sum();
                (i, value)
            });

        let offset = decide(current, candidates)?;
        Ok(CapPlan {
            offset,
            duration: capped,
        })
    }
}

/// Three-way decision shared by both searches.
fn decide(current: f32, candidates: impl Iterator<Item = (usize, f32)>) -> Result<usize, Infeasible> {
    let mut best: Option<(usize, f32)> = None;
    for (offset, value) in candidates {
        if best.is_none_or(|(_, b)| value > b) {
            best = Some((offset, value));
        }
    }

    match best {
        Some((_, value)) if value <= 0.0 => Err(Infeasible::NoBenefit),
        None => Err(Infeasible::NoBenefit),
        Some((_, value)) if current >= value => Err(Infeasible::AlreadyOptimal),
        Some((offset, _)) => Ok(offset),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::ManipulationType;
    use crate::sim::fixtures::{axis, device, fixed, series};

    /// Shift device at 10:00 next to a fixed load that eats all PV.
    fn setup(curtailment: &[(usize, f32)]) -> (Vec<Equipment>, LoadAggregate, CurtailmentTarget) {
        let devices = vec![
            device("dryer", ManipulationType::Shift, 30, &[0], vec![5.0; 5]),
            fixed("theatre", 30, 20.0),
        ];
        let aggregate = LoadAggregate::new(axis(30), &devices).expect("same axis");
        let mut reference = vec![0.0; 30];
        for &(i, kw) in curtailment {
            reference[i] = kw;
        }
        let target =
            CurtailmentTarget::new(&series(vec![20.0; 30]), &series(reference), &aggregate)
                .expect("covered");
        (devices, aggregate, target)
    }

    #[test]
    fn decide_picks_earliest_maximum() {
        let values = [(0, 1.0), (1, 3.0), (2, 3.0), (3, 2.0)];
        assert_eq!(decide(0.5, values.into_iter()), Ok(1));
    }

    #[test]
    fn decide_reasons() {
        assert_eq!(decide(0.0, std::iter::empty()), Err(Infeasible::NoBenefit));
        assert_eq!(
            decide(0.0, [(0, 0.0), (1, -1.0)].into_iter()),
            Err(Infeasible::NoBenefit)
        );
        assert_eq!(
            decide(2.0, [(0, 1.0), (1, 2.0)].into_iter()),
            Err(Infeasible::AlreadyOptimal)
        );
    }

    #[test]
    fn shift_finds_curtailment_window() {
        let window: Vec<(usize, f32)> = (6..=10).map(|i| (i, 8.0)).collect();
        let (devices, aggregate, target) = setup(&window);
        let ctx = SearchContext::new(&target, &aggregate);
        assert_eq!(ctx.shift_comp_time(&devices[0], 0, 5, 15), Ok(6));
    }

    #[test]
    fn shift_without_curtailment_has_no_benefit() {
        let (devices, aggregate, target) = setup(&[(25, 3.0)]);
        let ctx = SearchContext::new(&target, &aggregate);
        assert_eq!(
            ctx.shift_comp_time(&devices[0], 0, 5, 15),
            Err(Infeasible::NoBenefit)
        );
    }

    #[test]
    fn shift_at_best_offset_is_already_optimal() {
        let window: Vec<(usize, f32)> = (0..5).map(|i| (i, 8.0)).collect();
        let (devices, aggregate, target) = setup(&window);
        let ctx = SearchContext::new(&target, &aggregate);
        assert_eq!(
            ctx.shift_comp_time(&devices[0], 0, 5, 15),
            Err(Infeasible::AlreadyOptimal)
        );
    }

    #[test]
    fn shift_skips_windows_past_horizon() {
        let (devices, aggregate, target) = setup(&[(29, 8.0)]);
        let ctx = SearchContext::new(&target, &aggregate);
        // only offsets up to 25 fit; the window [25, 30) holds the curtailment
        assert_eq!(ctx.shift_comp_time(&devices[0], 0, 5, 40), Ok(25));
        assert_eq!(
            ctx.shift_comp_time(&devices[0], 0, 5, 20),
            Err(Infeasible::NoBenefit)
        );
    }

    #[test]
    fn cap_compensates_into_curtailment() {
        let devices = vec![
            device("chiller", ManipulationType::Cap, 30, &[0], vec![5.0; 5]),
            fixed("theatre", 30, 20.0),
        ];
        let aggregate = LoadAggregate::new(axis(30), &devices).expect("same axis");
        let mut reference = vec![0.0; 30];
        reference[8..13].fill(1.0);
        let target =
            CurtailmentTarget::new(&series(vec![20.0; 30]), &series(reference), &aggregate)
                .expect("covered");
        let ctx = SearchContext::new(&target, &aggregate);

        // shed is 2 kW per sample, compensation window starts 3 steps after the cap
        assert_eq!(
            ctx.cap_comp_time(&devices[0], 0, 5, 15, 0.6),
            Ok(CapPlan {
                offset: 3,
                duration: 5
            })
        );
    }

    #[test]
    fn cap_value_is_bounded_by_shed_energy() {
        // a one-sample 50 kW spike right after the cap absorbs no more than
        // 2 kW; five samples of 2 kW later absorb all shed energy
        let devices = vec![
            device("chiller", ManipulationType::Cap, 30, &[0], vec![5.0; 5]),
            fixed("theatre", 30, 20.0),
        ];
        let aggregate = LoadAggregate::new(axis(30), &devices).expect("same axis");
        let mut reference = vec![0.0; 30];
        reference[5] = 50.0;
        reference[12..17].fill(2.0);
        let target =
            CurtailmentTarget::new(&series(vec![20.0; 30]), &series(reference), &aggregate)
                .expect("covered");
        let ctx = SearchContext::new(&target, &aggregate);

        assert_eq!(
            ctx.cap_comp_time(&devices[0], 0, 5, 15, 0.6),
            Ok(CapPlan {
                offset: 7,
                duration: 5
            })
        );
    }

    #[test]
    fn cap_reports_why_nothing_can_be_capped() {
        let devices = vec![device("chiller", ManipulationType::Cap, 30, &[0], vec![5.0; 5])];
        let aggregate = LoadAggregate::new(axis(30), &devices).expect("same axis");
        let target =
            CurtailmentTarget::new(&series(vec![20.0; 30]), &series(vec![1.0; 30]), &aggregate)
                .expect("covered");
        let ctx = SearchContext::new(&target, &aggregate);

        assert_eq!(
            ctx.cap_comp_time(&devices[0], 0, 5, 15, 0.1),
            Err(Infeasible::BelowBaseLoadAfterCap)
        );
        assert_eq!(
            ctx.cap_comp_time(&devices[0], 10, 5, 15, 0.6),
            Err(Infeasible::NotActiveDuringCap)
        );
    }

    #[test]
    fn cap_with_free_headroom_is_already_optimal() {
        let devices = vec![device("chiller", ManipulationType::Cap, 30, &[0], vec![5.0; 5])];
        let aggregate = LoadAggregate::new(axis(30), &devices).expect("same axis");
        let target =
            CurtailmentTarget::new(&series(vec![20.0; 30]), &series(vec![4.0; 30]), &aggregate)
                .expect("covered");
        let ctx = SearchContext::new(&target, &aggregate);

        assert_eq!(
            ctx.cap_comp_time(&devices[0], 0, 5, 15, 0.6),
            Err(Infeasible::AlreadyOptimal)
        );
    }
}
