//! Error types for postfire

use thiserror::Error;

/// Broad category of an [`Error`].
///
/// Callers use this to decide whether to skip a criterion, substitute a
/// default or abort the analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Degenerate numeric domain (zero-width scale, empty region)
    Domain,
    /// Invalid configuration (weights, reclassification rules, parameters)
    Config,
    /// Inputs violate a call precondition (grid mismatch, missing layer)
    Precondition,
    /// Reading or writing raster data failed
    Io,
    /// Anything else
    Internal,
}

/// Main error type for postfire operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Grid mismatch: expected {expected}, got {found}")]
    GridMismatch { expected: String, found: String },

    #[error("Degenerate scale for {what}: min = max = {value}")]
    DegenerateScale { what: &'static str, value: f64 },

    #[error("Region contains no valid pixels")]
    EmptyRegion,

    #[error("Invalid weight vector: {0}")]
    InvalidWeights(String),

    #[error("Reclassification rules leave values unmatched: {0}")]
    UnreachableReclass(String),

    #[error("No input layer for criterion '{0}'")]
    MissingCriterion(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("{pipeline}/{stage}{}: {source}", .criterion.as_ref().map(|c| format!(" [{c}]")).unwrap_or_default())]
    Stage {
        pipeline: String,
        stage: &'static str,
        criterion: Option<String>,
        #[source]
        source: Box<Error>,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Category of this error, looking through stage wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DegenerateScale { .. } | Error::EmptyRegion => ErrorKind::Domain,
            Error::InvalidWeights(_)
            | Error::UnreachableReclass(_)
            | Error::InvalidParameter { .. } => ErrorKind::Config,
            Error::GridMismatch { .. }
            | Error::InvalidDimensions { .. }
            | Error::IndexOutOfBounds { .. }
            | Error::MissingCriterion(_) => ErrorKind::Precondition,
            Error::Io(_) | Error::UnsupportedDataType(_) => ErrorKind::Io,
            Error::Stage { source, .. } => source.kind(),
            Error::Other(_) => ErrorKind::Internal,
        }
    }

    /// Innermost error beneath any stage wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn invalid_parameter(name: &'static str, value: impl ToString, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Attach pipeline/stage/criterion context to a failing result.
pub trait StageContext<T> {
    fn stage(self, pipeline: &str, stage: &'static str, criterion: Option<&str>) -> Result<T>;
}

impl<T> StageContext<T> for Result<T> {
    fn stage(self, pipeline: &str, stage: &'static str, criterion: Option<&str>) -> Result<T> {
        self.map_err(|source| Error::Stage {
            pipeline: pipeline.to_string(),
            stage,
            criterion: criterion.map(str::to_string),
            source: Box::new(source),
        })
    }
}

/// Result type alias for postfire operations
pub type Result<T> = std::result::Result<T, Error>;
