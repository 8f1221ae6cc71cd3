use std::fmt::Write;

use mspeirv::model::layout::{Compartment, ModelLayout};
use mspeirv::{rates, MspeirvParams};

/// Two strata with every flow switched on, routine vaccination entering at
/// stratum 1.
fn params() -> MspeirvParams {
    let mut p = MspeirvParams::zeros(2);
    p.sim_type = 1;
    p.rv_stratum = Some(1);
    p.pv = vec![0.5];
    p.eps = 1e-6;
    p.b = vec![0.001, 0.0];
    p.mu = vec![0.0001, 0.0002];
    p.theta = vec![0.01, 0.0];
    p.sigma = vec![0.1, 0.1];
    p.gamma = vec![0.2, 0.2];
    p.omega = vec![0.05, 0.0];
    p.delta1 = vec![0.0, 0.03];
    p.delta2 = vec![0.0, 0.03];
    p.delta3 = vec![0.0, 0.03];
    p.f = vec![0.0, 0.002];
    p.n = vec![100.0, 400.0];
    p.beta = vec![vec![0.002, 0.001], vec![0.001, 0.003]];
    p.alpha = vec![vec![0.1, 0.1], vec![0.1, 0.1]];
    p
}

fn state(layout: &ModelLayout) -> Vec<f64> {
    let st = &layout.state;
    let mut y = vec![0.0; st.len()];
    let entries = [
        (Compartment::M, 0, 10.0),
        (Compartment::S, 0, 80.0),
        (Compartment::E, 0, 5.0),
        (Compartment::I, 0, 5.0),
        (Compartment::S, 1, 300.0),
        (Compartment::SP1, 1, 20.0),
        (Compartment::SP2, 1, 20.0),
        (Compartment::SP3, 1, 20.0),
        (Compartment::E, 1, 10.0),
        (Compartment::I, 1, 10.0),
        (Compartment::R, 1, 20.0),
    ];
    for (c, i, v) in entries {
        y[st.index(c, i).unwrap()] = v;
    }
    y
}

#[test]
fn rate_table_two_strata() {
    let p = params();
    p.check().expect("params valid");
    let named = p.to_named_vector().expect("named params");
    let layout = ModelLayout::canonical(&named).expect("layout");
    let parms = named.into_values();
    let y = state(&layout);

    let dy = rates(&layout, 0.0, &y, &parms).expect("rates");

    let mut table = String::new();
    writeln!(table, "compartment,stratum1,stratum2").unwrap();
    for c in Compartment::ALL {
        let d0 = dy[layout.state.index(c, 0).unwrap()];
        let d1 = dy[layout.state.index(c, 1).unwrap()];
        writeln!(table, "{},{:.4},{:.4}", c.prefix(), d0, d1).unwrap();
    }
    insta::assert_snapshot!(table);
}
