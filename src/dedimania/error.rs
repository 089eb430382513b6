use thiserror::Error;

use crate::network::TransportError;
use crate::server::Fault;

/// A reply lacks a member that is needed to make sense of it.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("missing field '{0}'")]
pub struct MissingField(pub &'static str);

/// Possible errors of a call to the ranking service.
#[derive(Error, Debug)]
pub enum CallError {
    /// The request did not reach the service, or got no answer in time.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The service rejected the call.
    #[error("remote {0}")]
    Fault(#[from] Fault),

    /// The reply is missing expected members.
    #[error("incomplete reply: {0}")]
    Incomplete(#[from] MissingField),

    /// The reply was empty, could not be parsed, or had
    /// fewer elements than calls were sent.
    #[error("unreadable reply")]
    Unreadable,
}

impl CallError {
    pub fn is_fault(&self) -> bool {
        matches!(self, CallError::Fault(_))
    }
}
