use tracing::debug;

use crate::math::ode::{rk4_step, Rk4Workspace};

use super::error::{ModelError, ModelResult};
use super::layout::{Compartment, ModelLayout, NUM_CLASSES};
use super::params::MspeirvParams;
use super::rates::rates_into;
use super::sia::CampaignSchedule;

#[derive(Debug, Clone)]
pub struct MspeirvState {
    pub y: Vec<f64>,
}

impl MspeirvState {
    pub fn new_zero(layout: &ModelLayout) -> Self {
        Self { y: vec![0.0; layout.state.len()] }
    }

    /// Everyone susceptible except `seeding_per_stratum[i]` infectious in
    /// stratum `i`, capped at the stratum's reference size.
    pub fn init_from_seeding(
        layout: &ModelLayout,
        params: &MspeirvParams,
        seeding_per_stratum: &[f64],
    ) -> Self {
        let mut s = Self::new_zero(layout);
        let st = &layout.state;
        for i in 0..st.num_stages() {
            let n = params.n[i].max(0.0);
            let seed = seeding_per_stratum.get(i).copied().unwrap_or(0.0).clamp(0.0, n);
            s.y[st.base(Compartment::S) + i] = n - seed;
            s.y[st.base(Compartment::I) + i] = seed;
        }
        s
    }

    pub fn totals(&self, layout: &ModelLayout) -> [f64; NUM_CLASSES] {
        compartment_totals(layout, &self.y)
    }
}

/// Sum of each compartment over all strata, in [`Compartment::ALL`] order.
pub fn compartment_totals(layout: &ModelLayout, y: &[f64]) -> [f64; NUM_CLASSES] {
    let st = &layout.state;
    let n = st.num_stages();
    Compartment::ALL.map(|c| y[st.base(c)..st.base(c) + n].iter().sum())
}

/// A parameter set with its layout resolved, plus a fixed-step reference
/// driver that interleaves integration with campaigns.
pub struct MspeirvModel {
    pub params: MspeirvParams,
    pub layout: ModelLayout,
    parms: Vec<f64>,
}

impl MspeirvModel {
    pub fn new(params: MspeirvParams) -> anyhow::Result<Self> {
        params.check()?;
        let named = params.to_named_vector()?;
        let layout = ModelLayout::canonical(&named)?;
        debug!(num_stages = params.num_stages, "model ready");
        Ok(Self { params, layout, parms: named.into_values() })
    }

    /// The flat parameter vector the rate function reads.
    pub fn parms(&self) -> &[f64] {
        &self.parms
    }

    pub fn deriv(&self, t: f64, y: &[f64], dy: &mut [f64]) -> ModelResult<()> {
        rates_into(&self.layout, t, y, &self.parms, dy)
    }

    /// Integrate from `t0` to `t_end` with step `dt`, applying each campaign
    /// once before the first step that starts at or after its time.
    ///
    /// Step times are `t0 + k * dt`, so a campaign on a step boundary fires
    /// at that boundary however many steps precede it.
    pub fn simulate(
        &self,
        state: &mut MspeirvState,
        t0: f64,
        t_end: f64,
        dt: f64,
        schedule: &mut CampaignSchedule,
    ) -> ModelResult<Vec<(f64, Vec<f64>)>> {
        for (what, value) in [("t0", t0), ("t_end", t_end)] {
            if !value.is_finite() {
                return Err(ModelError::InvalidTime { what, value });
            }
        }
        if !(dt.is_finite() && dt > 0.0) {
            return Err(ModelError::InvalidTime { what: "dt", value: dt });
        }
        schedule.validate(&self.layout.state)?;
        schedule.skip_before(t0);

        // Absorbs rounding in `t0 + k * dt` when matching campaign times.
        let slack = 1e-9 * dt;
        let mut ws = Rk4Workspace::new(state.y.len());
        let mut t = t0;
        let mut k: u64 = 0;
        let mut out = Vec::new();
        for c in schedule.due(t + slack) {
            c.apply(&self.layout.state, &mut state.y)?;
        }
        out.push((t, state.y.clone()));
        while t < t_end - 1e-12 {
            rk4_step(&mut state.y, t, dt, &mut ws, |tt, y, dy| self.deriv(tt, y, dy))?;
            k += 1;
            t = t0 + k as f64 * dt;
            for c in schedule.due(t + slack) {
                c.apply(&self.layout.state, &mut state.y)?;
            }
            out.push((t, state.y.clone()));
        }
        Ok(out)
    }
}
