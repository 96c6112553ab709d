pub mod error;

pub use error::{RecvError, SendError};

/// Outgoing half of an unreliable datagram transport
pub trait PacketSender: Send + Sync {
    /// Sends one datagram to the remote host
    fn send(&self, payload: &[u8]) -> Result<(), SendError>;
}

/// Incoming half of an unreliable datagram transport
pub trait PacketReceiver: Send + Sync {
    /// Returns the next datagram, or `None` when nothing is waiting
    fn receive(&mut self) -> Result<Option<&[u8]>, RecvError>;
}
