use thiserror::Error;

/// Typed failures raised by the dataset layer.
///
/// They travel inside `anyhow::Error` like every other failure in this crate;
/// callers that need to react to a specific case can `downcast_ref::<DatasetError>()`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DatasetError {
    #[error("Index {index} is out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Got {paths} image paths but {labels} labels")]
    LengthMismatch { paths: usize, labels: usize },

    #[error("Label {label} is not part of the class vocabulary")]
    UnknownClass { label: String },

    #[error("Class {label} appears more than once in the class names")]
    DuplicateClass { label: String },

    #[error("Normalizer changed the tensor shape from {expected:?} to {actual:?}")]
    ShapeMismatch { expected: Vec<i64>, actual: Vec<i64> },

    #[error("Target size must be positive (got {width}x{height})")]
    InvalidTargetSize { width: u32, height: u32 },

    #[error("Decoding settings were already initialized with different values")]
    AlreadyInitialized,
}
