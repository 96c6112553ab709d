use thiserror::Error;

use crate::{
    messages::message_kinds::{ChannelMode, MessageKind},
    metavoxels::error::MetavoxelError,
    types::HostType,
};

/// Errors that can occur during message kind lookups
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageKindsError {
    /// Message kind not found in the dispatch table
    #[error("Message kind {kind:?} not found in registry. Message kind must be registered with Protocol via add_message()")]
    MessageKindNotFound { kind: MessageKind },

    /// Message arrived on, or was sent to, the wrong channel
    #[error("Message kind {kind:?} must travel on the {expected:?} channel")]
    WrongChannel {
        kind: MessageKind,
        expected: ChannelMode,
    },

    /// The sending host is not allowed to send this kind
    #[error("Message kind {kind:?} may not be sent by the {sender:?}. Check Protocol configuration")]
    DirectionNotAllowed { kind: MessageKind, sender: HostType },
}

/// General message-level errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    /// Message kinds error
    #[error("Message kinds error: {0}")]
    MessageKinds(#[from] MessageKindsError),

    /// Message body could not be decoded
    #[error("Message decode error: {0}")]
    Decode(#[from] MetavoxelError),
}
