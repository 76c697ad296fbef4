use std::fmt;

use crate::controller::CntrlId;

/// Errors raised while composing a topology. All of them are fatal to the
/// build; the composer is deterministic, so retrying with the same inputs
/// reproduces the same failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    /// A size, count or associativity that the composer cannot work with.
    InvalidConfig(String),
    /// Two externally supplied controllers carry the same global id.
    DuplicateId(CntrlId),
    /// The device side of the hierarchy contributed no controllers at all.
    EmptyTopology { level: &'static str },
}

impl fmt::Display for ComposeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComposeError::InvalidConfig(what) => {
                write!(f, "invalid configuration: {}", what)
            }
            ComposeError::DuplicateId(id) => {
                write!(f, "duplicate controller id {} in external system", id)
            }
            ComposeError::EmptyTopology { level } => {
                write!(f, "level '{}' produced an empty topology", level)
            }
        }
    }
}

impl std::error::Error for ComposeError {}

pub type ComposeResult<T> = Result<T, ComposeError>;
