use thiserror::Error;

use crate::env::Pos;

/// Contract violations raised synchronously by the core engine
///
/// None of these are transient: the engine performs no I/O, so nothing is
/// retried internally and validation failures surface straight to the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    /// A construction or configuration value is out of range
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// An action index outside the four-element action space
    #[error("invalid action index {0}, the action space has 4 actions")]
    InvalidAction(usize),

    /// A coordinate outside the grid bounds was passed to a query
    #[error("state {0:?} is outside the grid bounds")]
    InvalidState(Pos),
}

pub type Result<T> = std::result::Result<T, GridError>;
