//! Error type shared by every structural edit and by evaluation.

use thiserror::Error;

use crate::ids::{OutputIndex, OwnerId};

/// Coarse classification callers can branch on.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    OutOfRange,
    /// The exclusive update guard is held elsewhere. Non-fatal: retry or skip.
    Busy,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnimError {
    #[error("layer {0} not found")]
    LayerNotFound(usize),
    #[error("strip {strip} not found on layer {layer}")]
    StripNotFound { layer: usize, strip: usize },
    #[error("output with stable index {0} not found")]
    OutputNotFound(OutputIndex),
    #[error("no animation binding for {0}")]
    BindingNotFound(OwnerId),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("{what} {value} is outside [{min}, {max}]")]
    OutOfRange {
        what: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    #[error("binding of {0} is being updated elsewhere")]
    Busy(OwnerId),
}

impl AnimError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnimError::LayerNotFound(_)
            | AnimError::StripNotFound { .. }
            | AnimError::OutputNotFound(_)
            | AnimError::BindingNotFound(_) => ErrorKind::NotFound,
            AnimError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            AnimError::OutOfRange { .. } => ErrorKind::OutOfRange,
            AnimError::Busy(_) => ErrorKind::Busy,
        }
    }
}

pub type Result<T, E = AnimError> = std::result::Result<T, E>;
