use std::collections::HashMap;

use super::error::{ModelError, ModelResult};

/// A flat vector of reals whose entries carry unique names.
///
/// State and parameter vectors are both handed over in this form; the layout
/// types resolve the names they need once and then work on raw offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedVector {
    names: Vec<String>,
    values: Vec<f64>,
    index: HashMap<String, usize>,
}

impl NamedVector {
    pub fn new(names: Vec<String>, values: Vec<f64>) -> ModelResult<Self> {
        if names.len() != values.len() {
            return Err(ModelError::LengthMismatch {
                what: "values",
                expected: names.len(),
                found: values.len(),
            });
        }
        let mut index = HashMap::with_capacity(names.len());
        for (pos, name) in names.iter().enumerate() {
            if index.insert(name.clone(), pos).is_some() {
                return Err(ModelError::DuplicateName { name: name.clone() });
            }
        }
        Ok(Self { names, values, index })
    }

    pub fn from_pairs<I, S>(pairs: I) -> ModelResult<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let (names, values): (Vec<String>, Vec<f64>) =
            pairs.into_iter().map(|(n, v)| (n.into(), v)).unzip();
        Self::new(names, values)
    }

    /// Offset of `name` in the vector.
    pub fn resolve(&self, name: &str) -> ModelResult<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| ModelError::UnknownName { name: name.to_string() })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> ModelResult<f64> {
        self.resolve(name).map(|i| self.values[i])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

/// Resolve `{prefix}1 .. {prefix}{count}` and require the entries to be
/// contiguous and ascending. Returns the offset of the first one.
pub(crate) fn resolve_block(
    vector: &NamedVector,
    prefix: &str,
    count: usize,
) -> ModelResult<usize> {
    let first = format!("{prefix}1");
    let base = vector.resolve(&first)?;
    for k in 2..=count {
        let name = format!("{prefix}{k}");
        let found = vector.resolve(&name)?;
        let expected = base + k - 1;
        if found != expected {
            return Err(ModelError::Misaligned { name, expected, found });
        }
    }
    Ok(base)
}

/// Length of the contiguous run `{prefix}1, {prefix}2, ...` present in `vector`.
pub(crate) fn block_len(vector: &NamedVector, prefix: &str) -> ModelResult<usize> {
    let base = vector.resolve(&format!("{prefix}1"))?;
    let mut len = 1;
    loop {
        let name = format!("{prefix}{}", len + 1);
        match vector.resolve(&name) {
            Ok(found) if found == base + len => len += 1,
            Ok(found) => {
                return Err(ModelError::Misaligned {
                    name,
                    expected: base + len,
                    found,
                })
            }
            Err(_) => return Ok(len),
        }
    }
}
