use std::f64::consts::PI;

use super::error::{ModelError, ModelResult};
use super::layout::{Cohort, Compartment, ModelLayout};

/// Days per simulated year; sets the seasonal period and the routine
/// vaccination calendar.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Derivative of every state entry at time `t`.
pub fn rates(layout: &ModelLayout, t: f64, y: &[f64], parms: &[f64]) -> ModelResult<Vec<f64>> {
    let mut out = vec![0.0; layout.state.len()];
    rates_into(layout, t, y, parms, &mut out)?;
    Ok(out)
}

/// Allocation-free form of [`rates`]; `out` is fully overwritten on success
/// and untouched on error.
pub fn rates_into(
    layout: &ModelLayout,
    t: f64,
    y: &[f64],
    parms: &[f64],
    out: &mut [f64],
) -> ModelResult<()> {
    let st = &layout.state;
    let pl = &layout.params;
    st.check_len(y, "state")?;
    st.check_len(out, "output")?;
    if parms.len() != pl.len {
        return Err(ModelError::LengthMismatch {
            what: "parameter vector",
            expected: pl.len,
            found: parms.len(),
        });
    }
    let n = st.num_stages();

    // Resolve the routine coverage before touching `out`.
    let routine = match &pl.routine {
        Some(rv) => Some((rv.entry_stratum, routine_coverage(parms, rv.pv, rv.years, t)?)),
        None => None,
    };

    let n_total: f64 = y.iter().sum();
    let growth = (1.0 + parms[pl.db]).powf(t);
    let eps = parms[pl.eps];
    let seasonal = (2.0 * PI * t / DAYS_PER_YEAR).cos();
    let infectious = &y[st.base(Compartment::I)..st.base(Compartment::I) + n];

    for i in 0..n {
        let x = st.cohort_at(y, i);
        let local_n = x.total();
        let target_n = parms[pl.target_n + i];
        // Anchors density-dependent flows to the reference size; an empty
        // stratum has none.
        let anchor = if local_n > 0.0 { target_n / local_n } else { 0.0 };

        let b = parms[pl.b + i] * growth;
        let f = parms[pl.f + i] * growth * anchor;
        let mu = parms[pl.mu + i];
        let omega = parms[pl.omega + i];
        let sigma = parms[pl.sigma + i];
        let gamma = parms[pl.gamma + i];
        let theta = parms[pl.theta + i];
        let [delta1, delta2, delta3] = pl.delta.map(|d| parms[d + i]);

        let mut foi = 0.0;
        for (j, &i_j) in infectious.iter().enumerate() {
            let beta = parms[pl.beta + j * n + i];
            let alpha = parms[pl.alpha + j * n + i];
            foi += (1.0 + alpha * seasonal) * beta * i_j;
        }
        foi *= anchor;

        let out_rate = mu + theta;
        let mut d = Cohort {
            m: b * n_total - (omega + out_rate) * x.m,
            s: omega * x.m + delta3 * x.sp3 - (foi + out_rate + f) * x.s,
            sp1: f * x.s - (out_rate + delta1 + foi) * x.sp1,
            sp2: delta1 * x.sp1 - (out_rate + delta2 + foi) * x.sp2,
            sp3: delta2 * x.sp2 - (out_rate + delta3 + foi) * x.sp3,
            e: foi * (x.s + x.sp2 + x.sp3) - (sigma + out_rate) * x.e,
            ep: foi * x.sp1 - (sigma + out_rate) * x.ep,
            i: sigma * (x.e + x.ep) + eps * local_n - (gamma + out_rate) * x.i,
            r: gamma * x.i - out_rate * x.r,
            v: -out_rate * x.v,
        };

        if i > 0 {
            let pv = match routine {
                Some((entry, pv)) if entry == i => pv,
                _ => 0.0,
            };
            add_aging_inflow(&mut d, &st.cohort_at(y, i - 1), parms[pl.theta + i - 1], pv);
        }

        st.store_at(out, i, &d);
    }
    Ok(())
}

/// Inflow from the next-younger stratum aging at `theta`; a fraction `pv` of
/// every eligible compartment is diverted into `V` on the way.
pub(crate) fn add_aging_inflow(d: &mut Cohort, younger: &Cohort, theta: f64, pv: f64) {
    let kept = (1.0 - pv) * theta;
    d.m += kept * younger.m;
    d.s += kept * younger.s;
    d.sp1 += kept * younger.sp1;
    d.sp2 += kept * younger.sp2;
    d.sp3 += kept * younger.sp3;
    d.e += kept * younger.e;
    d.ep += kept * younger.ep;
    d.i += theta * younger.i;
    d.r += kept * younger.r;
    d.v += pv * theta * younger.eligible() + theta * younger.v;
}

fn routine_coverage(parms: &[f64], base: usize, years: usize, t: f64) -> ModelResult<f64> {
    let year = (t / DAYS_PER_YEAR).floor();
    if !(year >= 0.0 && year < years as f64) {
        return Err(ModelError::OutOfRange {
            what: "routine vaccination year",
            index: if year.is_finite() { year as i64 } else { i64::MIN },
            len: years,
        });
    }
    Ok(parms[base + year as usize])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::layout::StateLayout;
    use crate::model::params::MspeirvParams;

    fn layout_for(p: &MspeirvParams) -> (ModelLayout, Vec<f64>) {
        let named = p.to_named_vector().unwrap();
        let layout = ModelLayout::canonical(&named).unwrap();
        (layout, named.into_values())
    }

    fn set(st: &StateLayout, y: &mut [f64], c: Compartment, i: usize, v: f64) {
        y[st.index(c, i).unwrap()] = v;
    }

    fn get(st: &StateLayout, y: &[f64], c: Compartment, i: usize) -> f64 {
        y[st.index(c, i).unwrap()]
    }

    #[test]
    fn aging_only_scenario() {
        let mut p = MspeirvParams::zeros(2);
        p.theta[0] = 0.1;
        let (layout, parms) = layout_for(&p);
        let mut y = vec![0.0; layout.state.len()];
        set(&layout.state, &mut y, Compartment::S, 0, 100.0);

        let dy = rates(&layout, 0.0, &y, &parms).unwrap();
        assert!((get(&layout.state, &dy, Compartment::S, 0) + 10.0).abs() < 1e-12);
        assert!((get(&layout.state, &dy, Compartment::S, 1) - 10.0).abs() < 1e-12);
        let others: f64 = dy.iter().map(|v| v.abs()).sum::<f64>() - 20.0;
        assert!(others.abs() < 1e-12);
    }

    #[test]
    fn routine_coverage_indexes_calendar_year() {
        let parms = [0.0, 0.3, 0.6];
        assert_eq!(routine_coverage(&parms, 1, 2, 0.0).unwrap(), 0.3);
        assert_eq!(routine_coverage(&parms, 1, 2, 364.9).unwrap(), 0.3);
        assert_eq!(routine_coverage(&parms, 1, 2, 365.0).unwrap(), 0.6);
        assert!(matches!(
            routine_coverage(&parms, 1, 2, 730.0),
            Err(ModelError::OutOfRange { index: 2, len: 2, .. })
        ));
        assert!(routine_coverage(&parms, 1, 2, -1.0).is_err());
    }

    #[test]
    fn empty_stratum_has_no_density_dependent_flow() {
        let mut p = MspeirvParams::zeros(2);
        p.beta = vec![vec![1.0, 1.0], vec![1.0, 1.0]];
        p.f = vec![0.5, 0.5];
        p.n = vec![100.0, 100.0];
        let (layout, parms) = layout_for(&p);
        let mut y = vec![0.0; layout.state.len()];
        set(&layout.state, &mut y, Compartment::I, 0, 5.0);
        set(&layout.state, &mut y, Compartment::S, 0, 95.0);

        let dy = rates(&layout, 10.0, &y, &parms).unwrap();
        assert!(dy.iter().all(|v| v.is_finite()));
        for c in Compartment::ALL {
            assert_eq!(get(&layout.state, &dy, c, 1), 0.0);
        }
    }

    #[test]
    fn seasonal_forcing_peaks_at_year_start() {
        let mut p = MspeirvParams::zeros(1);
        p.beta = vec![vec![0.01]];
        p.alpha = vec![vec![0.5]];
        p.n = vec![100.0];
        let (layout, parms) = layout_for(&p);
        let mut y = vec![0.0; layout.state.len()];
        set(&layout.state, &mut y, Compartment::S, 0, 90.0);
        set(&layout.state, &mut y, Compartment::I, 0, 10.0);

        let de = |t: f64| get(&layout.state, &rates(&layout, t, &y, &parms).unwrap(), Compartment::E, 0);
        // foi = (1 + 0.5 cos) * 0.01 * 10 * 100/100
        assert!((de(0.0) - 1.5 * 0.1 * 90.0).abs() < 1e-9);
        assert!((de(182.5) - 0.5 * 0.1 * 90.0).abs() < 1e-9);
    }

    #[test]
    fn exposure_and_pregnancy_entry_follow_reference_size() {
        // localN = 500; reference N of 1000 doubles both flows, 500 leaves them as is.
        let flows = |target: f64| {
            let mut p = MspeirvParams::zeros(1);
            p.beta = vec![vec![0.001]];
            p.f = vec![0.01];
            p.n = vec![target];
            let (layout, parms) = layout_for(&p);
            let mut y = vec![0.0; layout.state.len()];
            set(&layout.state, &mut y, Compartment::S, 0, 490.0);
            set(&layout.state, &mut y, Compartment::I, 0, 10.0);
            let dy = rates(&layout, 0.0, &y, &parms).unwrap();
            (
                get(&layout.state, &dy, Compartment::E, 0),
                get(&layout.state, &dy, Compartment::SP1, 0),
            )
        };

        let (de, dsp1) = flows(1000.0);
        assert!((de - 9.8).abs() < 1e-9);
        assert!((dsp1 - 9.8).abs() < 1e-9);

        let (de_unscaled, dsp1_unscaled) = flows(500.0);
        assert!((de_unscaled - 4.9).abs() < 1e-9);
        assert!((dsp1_unscaled - 4.9).abs() < 1e-9);
    }

    #[test]
    fn bad_lengths_leave_output_untouched() {
        let p = MspeirvParams::zeros(2);
        let (layout, parms) = layout_for(&p);
        let y = vec![0.0; layout.state.len()];
        let mut out = vec![7.0; layout.state.len()];
        let err = rates_into(&layout, 0.0, &y, &parms[1..], &mut out).unwrap_err();
        assert!(matches!(err, ModelError::LengthMismatch { what: "parameter vector", .. }));
        assert!(out.iter().all(|v| *v == 7.0));
        assert!(rates(&layout, 0.0, &y[1..], &parms).is_err());
    }
}
