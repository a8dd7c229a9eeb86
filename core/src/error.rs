//! Failure causes carried by an `ErrorEnvelope`.
//!
//! # Design
//! Both ways a call can fail end up in the same envelope. The cause only
//! records which path produced it and the message the caller sees; the
//! response, config, and request handle live on the envelope itself.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureCause {
    /// The transport returned a response but the caller's status predicate
    /// refused it.
    #[error("Request failed with status code {status}")]
    ValidationRejected { status: u16 },

    /// The transport itself reported failure: an error status it treats as
    /// failure, or a network problem before any response arrived.
    #[error("{message}")]
    Transport {
        message: String,
        name: Option<String>,
    },
}

impl FailureCause {
    /// Transport-native error name, if the transport reported one.
    pub fn code(&self) -> Option<&str> {
        match self {
            FailureCause::ValidationRejected { .. } => None,
            FailureCause::Transport { name, .. } => name.as_deref(),
        }
    }
}
