use thiserror::Error;

use crate::messages::error::{MessageError, MessageKindsError};

/// Errors that can occur during protocol operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Protocol is locked and cannot be modified
    #[error("Protocol is already locked and cannot be modified. Protocol.lock() has been called and no further changes are allowed")]
    AlreadyLocked,

    /// Message could not be encoded or decoded
    #[error("Message error: {0}")]
    Message(#[from] MessageError),
}

impl From<MessageKindsError> for ProtocolError {
    fn from(error: MessageKindsError) -> Self {
        ProtocolError::Message(error.into())
    }
}
