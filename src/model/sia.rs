use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::error::{ModelError, ModelResult};
use super::layout::{Compartment, StateLayout};

/// One mass-vaccination campaign: at `time`, move `coverage` of the eligible
/// population of strata `first_stratum..=last_stratum` (0-based) into `V`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub time: f64,
    pub first_stratum: usize,
    pub last_stratum: usize,
    pub coverage: f64,
}

impl Campaign {
    pub fn apply(&self, layout: &StateLayout, y: &mut [f64]) -> ModelResult<()> {
        apply_sia_in_place(layout, y, self.first_stratum, self.last_stratum, self.coverage)
    }
}

/// Campaigns ordered by trigger time, consumed front to back by a driver.
#[derive(Debug, Clone, Default)]
pub struct CampaignSchedule {
    campaigns: Vec<Campaign>,
    next: usize,
}

impl CampaignSchedule {
    pub fn new(mut campaigns: Vec<Campaign>) -> Self {
        campaigns.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { campaigns, next: 0 }
    }

    /// Check every campaign against `layout` up front so a bad entry fails
    /// before the run starts rather than halfway through it.
    pub fn validate(&self, layout: &StateLayout) -> ModelResult<()> {
        self.campaigns.iter().try_for_each(|c| {
            validate(layout, None, c.first_stratum, c.last_stratum, c.coverage)
        })
    }

    /// Drop campaigns scheduled before `t0`.
    pub fn skip_before(&mut self, t0: f64) {
        while let Some(c) = self.campaigns.get(self.next) {
            if c.time >= t0 {
                break;
            }
            warn!(time = c.time, t0, "campaign precedes the start of the run, skipped");
            self.next += 1;
        }
    }

    /// Campaigns due at or before `t` that have not fired yet.
    pub fn due(&mut self, t: f64) -> &[Campaign] {
        let start = self.next;
        while self.next < self.campaigns.len() && self.campaigns[self.next].time <= t {
            self.next += 1;
        }
        &self.campaigns[start..self.next]
    }

    pub fn remaining(&self) -> usize {
        self.campaigns.len() - self.next
    }
}

/// Return a copy of `y` after a campaign over strata `first..=last`.
pub fn apply_sia(
    layout: &StateLayout,
    y: &[f64],
    first_stratum: usize,
    last_stratum: usize,
    coverage: f64,
) -> ModelResult<Vec<f64>> {
    let mut out = y.to_vec();
    apply_sia_in_place(layout, &mut out, first_stratum, last_stratum, coverage)?;
    Ok(out)
}

/// In-place form of [`apply_sia`]. Nothing is written unless every argument
/// is valid.
pub fn apply_sia_in_place(
    layout: &StateLayout,
    y: &mut [f64],
    first_stratum: usize,
    last_stratum: usize,
    coverage: f64,
) -> ModelResult<()> {
    validate(layout, Some(y.len()), first_stratum, last_stratum, coverage)?;

    let kept = 1.0 - coverage;
    let mut moved_total = 0.0;
    for i in first_stratum..=last_stratum {
        let moved = coverage * layout.cohort_at(y, i).eligible();
        for c in Compartment::ALL.into_iter().filter(|c| c.is_vaccine_eligible()) {
            y[layout.base(c) + i] *= kept;
        }
        y[layout.base(Compartment::V) + i] += moved;
        moved_total += moved;
    }
    info!(first_stratum, last_stratum, coverage, moved = moved_total, "applied SIA");
    Ok(())
}

fn validate(
    layout: &StateLayout,
    len: Option<usize>,
    first_stratum: usize,
    last_stratum: usize,
    coverage: f64,
) -> ModelResult<()> {
    if let Some(found) = len {
        if found != layout.len() {
            return Err(ModelError::LengthMismatch {
                what: "state",
                expected: layout.len(),
                found,
            });
        }
    }
    if !(0.0..=1.0).contains(&coverage) {
        return Err(ModelError::InvalidCoverage(coverage));
    }
    layout.check_stratum(last_stratum)?;
    if first_stratum > last_stratum {
        return Err(ModelError::OutOfRange {
            what: "SIA first stratum",
            index: first_stratum as i64,
            len: last_stratum + 1,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(m: f64, s: f64, i: f64, v: f64) -> (StateLayout, Vec<f64>) {
        let layout = StateLayout::canonical(1);
        let mut y = vec![0.0; layout.len()];
        y[layout.base(Compartment::M)] = m;
        y[layout.base(Compartment::S)] = s;
        y[layout.base(Compartment::I)] = i;
        y[layout.base(Compartment::V)] = v;
        (layout, y)
    }

    #[test]
    fn half_coverage_scenario() {
        let (layout, y) = single(30.0, 50.0, 20.0, 0.0);
        let out = apply_sia(&layout, &y, 0, 0, 0.5).unwrap();
        assert_eq!(out[layout.base(Compartment::V)], 40.0);
        assert_eq!(out[layout.base(Compartment::S)], 25.0);
        assert_eq!(out[layout.base(Compartment::M)], 15.0);
        assert_eq!(out[layout.base(Compartment::I)], 20.0);
        // input is untouched
        assert_eq!(y[layout.base(Compartment::S)], 50.0);
    }

    #[test]
    fn nan_coverage_is_invalid() {
        let (layout, mut y) = single(1.0, 1.0, 0.0, 0.0);
        let before = y.clone();
        assert!(matches!(
            apply_sia_in_place(&layout, &mut y, 0, 0, f64::NAN),
            Err(ModelError::InvalidCoverage(_))
        ));
        assert_eq!(
            apply_sia_in_place(&layout, &mut y, 0, 0, 1.5),
            Err(ModelError::InvalidCoverage(1.5))
        );
        assert_eq!(y, before);
    }

    #[test]
    fn reversed_range_is_out_of_range() {
        let layout = StateLayout::canonical(3);
        let y = vec![1.0; layout.len()];
        assert!(matches!(
            apply_sia(&layout, &y, 2, 1, 0.5),
            Err(ModelError::OutOfRange { .. })
        ));
        assert!(matches!(
            apply_sia(&layout, &y, 0, 3, 0.5),
            Err(ModelError::OutOfRange { what: "stratum", index: 3, len: 3 })
        ));
    }

    #[test]
    fn schedule_fires_each_campaign_once_in_order() {
        let c = |time| Campaign { time, first_stratum: 0, last_stratum: 0, coverage: 0.1 };
        let mut sched = CampaignSchedule::new(vec![c(20.0), c(5.0), c(10.0), c(-1.0)]);
        sched.skip_before(0.0);
        assert_eq!(sched.remaining(), 3);
        assert!(sched.due(4.0).is_empty());
        let due: Vec<f64> = sched.due(10.0).iter().map(|c| c.time).collect();
        assert_eq!(due, vec![5.0, 10.0]);
        assert!(sched.due(10.0).is_empty());
        assert_eq!(sched.due(100.0).len(), 1);
        assert_eq!(sched.remaining(), 0);
    }

    #[test]
    fn schedule_validation_catches_bad_campaigns() {
        let layout = StateLayout::canonical(2);
        let ok = Campaign { time: 1.0, first_stratum: 0, last_stratum: 1, coverage: 0.9 };
        let bad = Campaign { last_stratum: 2, ..ok };
        CampaignSchedule::new(vec![ok]).validate(&layout).unwrap();
        assert!(CampaignSchedule::new(vec![ok, bad]).validate(&layout).is_err());
    }
}
