use tracing::debug;

use super::error::{ModelError, ModelResult};
use super::named::{block_len, resolve_block, NamedVector};

pub const NUM_CLASSES: usize = 10;

/// First stratum eligible for routine vaccination when the parameter vector
/// does not name one (the 9-10 month cohort in the usual monthly binning).
pub const DEFAULT_ROUTINE_ENTRY_STRATUM: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compartment {
    M,
    S,
    SP1,
    SP2,
    SP3,
    E,
    EP,
    I,
    R,
    V,
}

impl Compartment {
    pub const ALL: [Compartment; NUM_CLASSES] = [
        Compartment::M,
        Compartment::S,
        Compartment::SP1,
        Compartment::SP2,
        Compartment::SP3,
        Compartment::E,
        Compartment::EP,
        Compartment::I,
        Compartment::R,
        Compartment::V,
    ];

    /// Prefix of the state entries of this compartment; entry `k` (1-based
    /// stratum) is named `{prefix}{k}`.
    pub fn prefix(self) -> &'static str {
        match self {
            Compartment::M => "M",
            Compartment::S => "S",
            Compartment::SP1 => "1SP",
            Compartment::SP2 => "2SP",
            Compartment::SP3 => "3SP",
            Compartment::E => "E",
            Compartment::EP => "EP",
            Compartment::I => "I",
            Compartment::R => "R",
            Compartment::V => "V",
        }
    }

    /// Everything except `I` and `V` can be moved into `V` by vaccination.
    pub fn is_vaccine_eligible(self) -> bool {
        !matches!(self, Compartment::I | Compartment::V)
    }
}

/// The ten compartment values of one stratum. Also used for the ten
/// derivatives of one stratum.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Cohort {
    pub m: f64,
    pub s: f64,
    pub sp1: f64,
    pub sp2: f64,
    pub sp3: f64,
    pub e: f64,
    pub ep: f64,
    pub i: f64,
    pub r: f64,
    pub v: f64,
}

impl Cohort {
    pub fn get(&self, c: Compartment) -> f64 {
        match c {
            Compartment::M => self.m,
            Compartment::S => self.s,
            Compartment::SP1 => self.sp1,
            Compartment::SP2 => self.sp2,
            Compartment::SP3 => self.sp3,
            Compartment::E => self.e,
            Compartment::EP => self.ep,
            Compartment::I => self.i,
            Compartment::R => self.r,
            Compartment::V => self.v,
        }
    }

    pub fn total(&self) -> f64 {
        self.eligible() + self.i + self.v
    }

    /// Mass a vaccination can reach: all but `I` and `V`.
    pub fn eligible(&self) -> f64 {
        self.m + self.s + self.sp1 + self.sp2 + self.sp3 + self.e + self.ep + self.r
    }
}

/// Offsets of the ten compartment blocks inside a state vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateLayout {
    num_stages: usize,
    bases: [usize; NUM_CLASSES],
}

impl StateLayout {
    /// Resolve every compartment block of `names` once.
    pub fn resolve(names: &NamedVector, num_stages: usize) -> ModelResult<Self> {
        let expected = NUM_CLASSES * num_stages;
        if names.len() != expected {
            return Err(ModelError::LengthMismatch {
                what: "state vector",
                expected,
                found: names.len(),
            });
        }
        let mut bases = [0; NUM_CLASSES];
        for c in Compartment::ALL {
            bases[c as usize] = resolve_block(names, c.prefix(), num_stages)?;
        }
        debug!(num_stages, ?bases, "resolved state layout");
        Ok(Self { num_stages, bases })
    }

    /// Layout of a state vector built from [`StateLayout::canonical_names`].
    pub fn canonical(num_stages: usize) -> Self {
        let mut bases = [0; NUM_CLASSES];
        for (k, c) in Compartment::ALL.into_iter().enumerate() {
            bases[c as usize] = k * num_stages;
        }
        Self { num_stages, bases }
    }

    pub fn canonical_names(num_stages: usize) -> Vec<String> {
        Compartment::ALL
            .into_iter()
            .flat_map(|c| (1..=num_stages).map(move |k| format!("{}{}", c.prefix(), k)))
            .collect()
    }

    pub fn num_stages(&self) -> usize {
        self.num_stages
    }

    pub fn len(&self) -> usize {
        NUM_CLASSES * self.num_stages
    }

    pub fn is_empty(&self) -> bool {
        self.num_stages == 0
    }

    pub fn base(&self, c: Compartment) -> usize {
        self.bases[c as usize]
    }

    /// Flat offset of `(compartment, stratum)`.
    pub fn index(&self, c: Compartment, stratum: usize) -> ModelResult<usize> {
        self.check_stratum(stratum)?;
        Ok(self.base(c) + stratum)
    }

    pub fn cohort(&self, y: &[f64], stratum: usize) -> ModelResult<Cohort> {
        self.check_len(y, "state")?;
        self.check_stratum(stratum)?;
        Ok(self.cohort_at(y, stratum))
    }

    pub(crate) fn check_stratum(&self, stratum: usize) -> ModelResult<()> {
        if stratum >= self.num_stages {
            return Err(ModelError::OutOfRange {
                what: "stratum",
                index: stratum as i64,
                len: self.num_stages,
            });
        }
        Ok(())
    }

    pub(crate) fn check_len(&self, y: &[f64], what: &'static str) -> ModelResult<()> {
        if y.len() != self.len() {
            return Err(ModelError::LengthMismatch {
                what,
                expected: self.len(),
                found: y.len(),
            });
        }
        Ok(())
    }

    /// Callers have checked `y.len()` and `stratum`.
    pub(crate) fn cohort_at(&self, y: &[f64], stratum: usize) -> Cohort {
        let at = |c: Compartment| y[self.bases[c as usize] + stratum];
        Cohort {
            m: at(Compartment::M),
            s: at(Compartment::S),
            sp1: at(Compartment::SP1),
            sp2: at(Compartment::SP2),
            sp3: at(Compartment::SP3),
            e: at(Compartment::E),
            ep: at(Compartment::EP),
            i: at(Compartment::I),
            r: at(Compartment::R),
            v: at(Compartment::V),
        }
    }

    pub(crate) fn store_at(&self, out: &mut [f64], stratum: usize, values: &Cohort) {
        for c in Compartment::ALL {
            out[self.bases[c as usize] + stratum] = values.get(c);
        }
    }
}

/// Routine vaccination settings resolved from the parameter vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutineLayout {
    pub entry_stratum: usize,
    pub pv: usize,
    pub years: usize,
}

/// Offsets of every parameter the rate function reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamLayout {
    pub num_stages: usize,
    pub len: usize,
    pub b: usize,
    pub mu: usize,
    pub theta: usize,
    pub sigma: usize,
    pub gamma: usize,
    pub omega: usize,
    pub delta: [usize; 3],
    pub f: usize,
    pub target_n: usize,
    pub beta: usize,
    pub alpha: usize,
    pub eps: usize,
    pub db: usize,
    pub routine: Option<RoutineLayout>,
}

impl ParamLayout {
    pub fn resolve(params: &NamedVector) -> ModelResult<Self> {
        let num_stages = read_count(params, "num_stages")?;
        if num_stages == 0 {
            return Err(ModelError::InvalidScalar {
                name: "num_stages".into(),
                value: 0.0,
            });
        }
        let num_classes = read_count(params, "num_classes")?;
        if num_classes != NUM_CLASSES {
            return Err(ModelError::ClassCount { found: num_classes });
        }

        let stratum = |prefix: &str| resolve_block(params, prefix, num_stages);
        let matrix = |prefix: &str| resolve_block(params, prefix, num_stages * num_stages);

        let routine = if params.get("sim_type")? != 0.0 {
            let entry_stratum = if params.contains("rv_stratum") {
                read_count(params, "rv_stratum")?
            } else {
                DEFAULT_ROUTINE_ENTRY_STRATUM
            };
            // Stratum 0 has no aging inflow to divert.
            if entry_stratum == 0 || entry_stratum >= num_stages {
                return Err(ModelError::OutOfRange {
                    what: "rv_stratum",
                    index: entry_stratum as i64,
                    len: num_stages,
                });
            }
            Some(RoutineLayout {
                entry_stratum,
                pv: params.resolve("pv1")?,
                years: block_len(params, "pv")?,
            })
        } else {
            None
        };

        let layout = Self {
            num_stages,
            len: params.len(),
            b: stratum("b")?,
            mu: stratum("mu")?,
            theta: stratum("theta")?,
            sigma: stratum("sigma")?,
            gamma: stratum("gamma")?,
            omega: stratum("omega")?,
            delta: [stratum("1delta")?, stratum("2delta")?, stratum("3delta")?],
            f: stratum("f")?,
            target_n: stratum("N")?,
            beta: matrix("beta")?,
            alpha: matrix("alpha")?,
            eps: params.resolve("eps")?,
            db: params.resolve("db")?,
            routine,
        };
        debug!(num_stages, routine = ?layout.routine, "resolved parameter layout");
        Ok(layout)
    }
}

fn read_count(params: &NamedVector, name: &str) -> ModelResult<usize> {
    let value = params.get(name)?;
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
        return Err(ModelError::InvalidScalar {
            name: name.to_string(),
            value,
        });
    }
    Ok(value as usize)
}

/// State and parameter offsets for one run, resolved once and shared by the
/// rate function and the SIA operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelLayout {
    pub state: StateLayout,
    pub params: ParamLayout,
}

impl ModelLayout {
    pub fn resolve(state_names: &NamedVector, params: &NamedVector) -> ModelResult<Self> {
        let params = ParamLayout::resolve(params)?;
        let state = StateLayout::resolve(state_names, params.num_stages)?;
        Ok(Self { state, params })
    }

    /// Resolve the parameters against a state vector in canonical order.
    pub fn canonical(params: &NamedVector) -> ModelResult<Self> {
        let params = ParamLayout::resolve(params)?;
        let state = StateLayout::canonical(params.num_stages);
        Ok(Self { state, params })
    }

    pub fn num_stages(&self) -> usize {
        self.params.num_stages
    }
}
