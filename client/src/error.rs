use thiserror::Error;

use metavoxel_shared::{MetavoxelError, ProtocolError, SendError, SequencerError};

use crate::{receive_record::ReceiveRecordError, system::NodeId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The session was torn down; nothing more can be sent or received
    #[error("Session is closed")]
    SessionClosed,

    #[error("No session attached to node {node:?}")]
    NoSuchSession { node: NodeId },

    #[error("A session is already attached to node {node:?}. Detach it first")]
    SessionExists { node: NodeId },

    /// The Server has not been heard from within the disconnection timeout
    #[error("Server timed out")]
    TimedOut,

    #[error("Sequencer error: {0}")]
    Sequencer(#[from] SequencerError),

    #[error("Metavoxel error: {0}")]
    Metavoxel(#[from] MetavoxelError),

    #[error("Receive record error: {0}")]
    Record(#[from] ReceiveRecordError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Send error: {0}")]
    Send(#[from] SendError),
}
