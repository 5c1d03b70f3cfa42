//! Fatal setup errors. Everything else the scheduler encounters is a clamp
//! condition, handled in place without producing a `Result`.

use std::fmt;

use crate::ids::Dsq;

/// Errors that can only occur during `init()`. A real attachment must treat
/// any of these as fatal and not partially attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// The runtime refused to create one of the two named dispatch queues.
    DsqCreateFailed(Dsq),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::DsqCreateFailed(dsq) => {
                write!(f, "failed to create dispatch queue {dsq:?}")
            }
        }
    }
}

impl std::error::Error for InitError {}
