use serde::{Deserialize, Serialize};

use super::error::ModelResult;
use super::layout::{DEFAULT_ROUTINE_ENTRY_STRATUM, NUM_CLASSES};
use super::named::NamedVector;

/// Typed parameter set, as read from a JSON file. Converted into the named
/// parameter vector the rate function works on with [`MspeirvParams::to_named_vector`].
///
/// All rates are per day; `beta` and `alpha` are indexed `[source][destination]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MspeirvParams {
    pub num_stages: usize,
    /// 0 = no routine vaccination.
    #[serde(default)]
    pub sim_type: u32,
    /// Secular trend of births and pregnancy entry; rates scale by (1+db)^t.
    #[serde(default)]
    pub db: f64,
    /// External introductions, per capita.
    #[serde(default)]
    pub eps: f64,

    pub b: Vec<f64>,
    pub mu: Vec<f64>,
    pub theta: Vec<f64>,
    pub sigma: Vec<f64>,
    pub gamma: Vec<f64>,
    pub omega: Vec<f64>,
    pub delta1: Vec<f64>,
    pub delta2: Vec<f64>,
    pub delta3: Vec<f64>,
    pub f: Vec<f64>,
    /// Reference population per stratum.
    pub n: Vec<f64>,

    pub beta: Vec<Vec<f64>>,
    pub alpha: Vec<Vec<f64>>,

    /// Routine coverage per simulation year.
    #[serde(default)]
    pub pv: Vec<f64>,
    #[serde(default)]
    pub rv_stratum: Option<usize>,
}

impl MspeirvParams {
    /// All-zero rates for `num_stages` strata, no routine vaccination.
    pub fn zeros(num_stages: usize) -> Self {
        let z = vec![0.0; num_stages];
        let zm = vec![vec![0.0; num_stages]; num_stages];
        Self {
            num_stages,
            sim_type: 0,
            db: 0.0,
            eps: 0.0,
            b: z.clone(),
            mu: z.clone(),
            theta: z.clone(),
            sigma: z.clone(),
            gamma: z.clone(),
            omega: z.clone(),
            delta1: z.clone(),
            delta2: z.clone(),
            delta3: z.clone(),
            f: z.clone(),
            n: z,
            beta: zm.clone(),
            alpha: zm,
            pv: Vec::new(),
            rv_stratum: None,
        }
    }

    pub fn routine_vaccination(&self) -> bool {
        self.sim_type != 0
    }

    fn per_stratum(&self) -> [(&'static str, &Vec<f64>); 11] {
        [
            ("b", &self.b),
            ("mu", &self.mu),
            ("theta", &self.theta),
            ("sigma", &self.sigma),
            ("gamma", &self.gamma),
            ("omega", &self.omega),
            ("1delta", &self.delta1),
            ("2delta", &self.delta2),
            ("3delta", &self.delta3),
            ("f", &self.f),
            ("N", &self.n),
        ]
    }

    pub fn check(&self) -> anyhow::Result<()> {
        let n = self.num_stages;
        anyhow::ensure!(n >= 1, "num_stages must be >= 1");
        for (name, v) in self.per_stratum() {
            anyhow::ensure!(v.len() == n, "{name}.len {} != num_stages {n}", v.len());
            anyhow::ensure!(
                v.iter().all(|x| x.is_finite() && *x >= 0.0),
                "{name} must be finite and >= 0"
            );
        }
        for (name, m) in [("beta", &self.beta), ("alpha", &self.alpha)] {
            anyhow::ensure!(m.len() == n, "{name} rows != num_stages");
            anyhow::ensure!(
                m.iter().all(|r| r.len() == n),
                "{name} must be square num_stages x num_stages"
            );
            anyhow::ensure!(
                m.iter().flatten().all(|x| x.is_finite()),
                "{name} must be finite"
            );
        }
        anyhow::ensure!(
            self.beta.iter().flatten().all(|x| *x >= 0.0),
            "beta must be >= 0"
        );
        anyhow::ensure!(self.db.is_finite() && self.db > -1.0, "db must be > -1");
        anyhow::ensure!(self.eps.is_finite() && self.eps >= 0.0, "eps must be >= 0");
        anyhow::ensure!(
            self.pv.iter().all(|p| (0.0..=1.0).contains(p)),
            "pv entries must lie in [0, 1]"
        );
        if self.routine_vaccination() {
            anyhow::ensure!(!self.pv.is_empty(), "routine vaccination needs at least one pv year");
            let entry = self.rv_stratum.unwrap_or(DEFAULT_ROUTINE_ENTRY_STRATUM);
            anyhow::ensure!(entry < n, "rv_stratum {entry} >= num_stages {n}");
            anyhow::ensure!(entry > 0, "rv_stratum must be > 0, stratum 0 has no aging inflow");
        }
        Ok(())
    }

    /// Flatten into the named parameter vector: per-stratum entries
    /// `{name}1..{name}n`, matrices `{name}1..{name}n²` with entry `j*n + i`
    /// holding `[j][i]`, then the scalars.
    pub fn to_named_vector(&self) -> ModelResult<NamedVector> {
        let mut pairs: Vec<(String, f64)> = Vec::new();
        for (name, v) in self.per_stratum() {
            pairs.extend(v.iter().enumerate().map(|(k, x)| (format!("{name}{}", k + 1), *x)));
        }
        for (name, m) in [("beta", &self.beta), ("alpha", &self.alpha)] {
            pairs.extend(
                m.iter()
                    .flatten()
                    .enumerate()
                    .map(|(k, x)| (format!("{name}{}", k + 1), *x)),
            );
        }
        pairs.extend(self.pv.iter().enumerate().map(|(k, x)| (format!("pv{}", k + 1), *x)));
        pairs.push(("num_stages".into(), self.num_stages as f64));
        pairs.push(("num_classes".into(), NUM_CLASSES as f64));
        pairs.push(("sim_type".into(), f64::from(self.sim_type)));
        pairs.push(("db".into(), self.db));
        pairs.push(("eps".into(), self.eps));
        if let Some(entry) = self.rv_stratum {
            pairs.push(("rv_stratum".into(), entry as f64));
        }
        NamedVector::from_pairs(pairs)
    }
}
