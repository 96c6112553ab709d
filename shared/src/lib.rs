//! # Metavoxel Shared
//! Common functionality shared between metavoxel-server & metavoxel-client
//! crates: the datagram sequencer, the metavoxel tree with its diff, merge
//! and delta codec, and the wire messages exchanged by sessions.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use metavoxel_serde::{
    BitReader, BitWrite, BitWriter, ConstBitLength, DeltaSerde, Serde, SerdeErr, StreamWriter,
    UnsignedInteger, UnsignedVariableInteger, MTU_SIZE_BITS, MTU_SIZE_BYTES,
};

mod backends;
mod connection;
mod messages;
mod protocol;
mod sequence_list;
mod sequencer;
mod transport;
mod types;
mod wrapping_number;

pub mod metavoxels;

pub use backends::{Instant, Timer};
pub use connection::{
    ack_manager::{AckManager, ReceiptStatus, ACK_BITFIELD_SIZE},
    connection_config::ConnectionConfig,
    packet_notifiable::PacketNotifiable,
    packet_type::PacketType,
    rtt::RttEstimator,
    standard_header::StandardHeader,
};
pub use messages::{
    error::{MessageError, MessageKindsError},
    message::{ClientStateMessage, MetavoxelMessage, SnapshotMessage, StateMessage},
    message_kinds::{ChannelDirection, ChannelMode, MessageKind, MessageKinds, MessageSettings},
};
pub use metavoxels::{
    attribute::AttributeValue,
    cube::{Cube, Region},
    data::MetavoxelData,
    diff::{diff, merge},
    edit::{EditMessage, NodePath, NodeReplacement, RegionEdit},
    error::{MetavoxelError, StructuralError},
    node::{InternalNode, MetavoxelNode, NodeRef},
    visitor::{MetavoxelInfo, MetavoxelVisitor, VisitAction},
    MAX_DEPTH,
};
pub use protocol::{Protocol, ProtocolError};
pub use sequence_list::{SequenceError, SequenceList};
pub use sequencer::{
    datagram_sequencer::{
        DatagramSequencer, Incoming, PacketNotification, ReceivedUnreliable, SentPacket,
    },
    error::SequencerError,
    packet_body::{PacketBody, ReliableSection, UnreliablePayload},
};
pub use transport::{PacketReceiver, PacketSender, RecvError, SendError};
pub use types::{HostType, PacketIndex, StreamOffset};
pub use wrapping_number::{sequence_greater_than, sequence_less_than};
