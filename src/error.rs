use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TopologyError>;

/// Everything that can stop a config-generation run.
///
/// Every variant is fatal: the pipeline validates the whole options record
/// before it writes anything, so a caller seeing one of these can fix the
/// input and re-run without cleaning up partial output.
#[derive(Error, Debug)]
pub enum TopologyError {
    /// A required option was absent (or zero where a positive value is required).
    #[error("--{0} argument is required")]
    MissingArgument(&'static str),

    /// An option was present but outside its valid range.
    #[error("invalid --{option} value: {reason}")]
    InvalidArgument { option: &'static str, reason: String },

    /// The splice specification does not follow the `splices[:recurrence]` grammar.
    #[error("invalid --splice-indexes argument {spec:?}: {reason}")]
    MalformedSpecification { spec: String, reason: String },

    /// A splice list is not strictly ascending.
    #[error("elements of --splice-indexes must be strictly ascending, got {field:?} in {spec:?}")]
    OrderingViolation { spec: String, field: String },

    /// A recurrence list contains zero or mixes signs, so it would not be computable.
    #[error("invalid recurrence indexes {field:?} in {spec:?}: must be non-zero and all of one sign")]
    SignViolation { spec: String, field: String },

    /// A width does not split evenly into its block partition.
    #[error("divisibility violation: {what}")]
    DivisibilityViolation { what: String },

    /// The builder was asked for a layer the plan does not contain.
    #[error("layer {index} is out of range (network has {num_layers} hidden layers)")]
    LayerOutOfRange { index: usize, num_layers: usize },

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize network plan: {0}")]
    Json(#[from] serde_json::Error),
}

impl TopologyError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TopologyError::Io { path: path.into(), source }
    }
}
