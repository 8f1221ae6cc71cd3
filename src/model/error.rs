/// Errors raised by layout resolution, the rate function and the SIA operator.
///
/// All of them are caller or layout errors: nothing here is retried, and no
/// operation leaves a partially written output behind when it returns one.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("unknown name '{name}'")]
    UnknownName { name: String },
    #[error("duplicate name '{name}'")]
    DuplicateName { name: String },
    #[error("'{name}' sits at offset {found}, expected {expected} (block not contiguous)")]
    Misaligned {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("{what} index {index} out of range (len {len})")]
    OutOfRange {
        what: &'static str,
        index: i64,
        len: usize,
    },
    #[error("coverage {0} outside [0, 1]")]
    InvalidCoverage(f64),
    #[error("{what} has length {found}, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("num_classes is {found}, this model has 10 compartments")]
    ClassCount { found: usize },
    #[error("scalar '{name}' = {value} is not a non-negative integer")]
    InvalidScalar { name: String, value: f64 },
    #[error("{what} = {value} is not a usable integration setting")]
    InvalidTime { what: &'static str, value: f64 },
}

pub type ModelResult<T> = Result<T, ModelError>;
