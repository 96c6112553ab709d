use thiserror::Error;

use metavoxel_shared::{MetavoxelError, ProtocolError, SendError, SequencerError};

use crate::ClientKey;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServerError {
    #[error("No client connected with key {client:?}")]
    NoSuchClient { client: ClientKey },

    #[error("A client is already connected with key {client:?}")]
    ClientExists { client: ClientKey },

    #[error("Sequencer error: {0}")]
    Sequencer(#[from] SequencerError),

    #[error("Metavoxel error: {0}")]
    Metavoxel(#[from] MetavoxelError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Send error: {0}")]
    Send(#[from] SendError),
}
