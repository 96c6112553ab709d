use thiserror::Error;

use crate::types::{PacketIndex, StreamOffset};

/// Errors that can occur while sending or receiving through a
/// `DatagramSequencer`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequencerError {
    /// The sequencer has been closed; nothing can be sent or received
    #[error("Sequencer is closed")]
    Closed,

    /// Datagram is shorter than its own header
    #[error("Datagram of {length} bytes is too short to hold a packet header")]
    DatagramTooShort { length: usize },

    /// Datagram header (or fragment marker) could not be parsed
    #[error("Malformed datagram header: {reason}")]
    MalformedHeader { reason: &'static str },

    /// Packet body could not be parsed into sections
    #[error("Malformed body in packet {packet_index}")]
    MalformedBody { packet_index: PacketIndex },

    /// Reliable fragment lies too far ahead of the next expected offset
    #[error("Reliable fragment at offset {offset} is beyond the receive window (next expected offset {expected})")]
    StreamWindowExceeded {
        offset: StreamOffset,
        expected: StreamOffset,
    },

    /// Datagram claims more fragments than this side accepts
    #[error("Packet {packet_index} claims {count} fragments, more than the maximum of {max}")]
    FragmentCountExceeded {
        packet_index: PacketIndex,
        count: u8,
        max: u8,
    },

    /// A logical packet would need more datagrams than allowed
    #[error("Packet body of {bytes} bytes does not fit in {max} datagrams")]
    PacketTooLarge { bytes: usize, max: u8 },

    /// Packet was already received
    #[error("Duplicate packet {packet_index}")]
    DuplicatePacket { packet_index: PacketIndex },

    /// Packet is too old to be acknowledged any more
    #[error("Stale packet {packet_index}")]
    StalePacket { packet_index: PacketIndex },
}
