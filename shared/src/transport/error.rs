use thiserror::Error;

/// The transport refused or failed to send a datagram
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Transport failed to send datagram. The remote host may be unreachable")]
pub struct SendError;

/// The transport failed while receiving
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Transport failed to receive datagram")]
pub struct RecvError;
