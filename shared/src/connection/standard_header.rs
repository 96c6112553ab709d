use metavoxel_serde::{BitReader, BitWrite, ConstBitLength, Serde, SerdeErr};

use crate::{types::PacketIndex, PacketType};

/// Header written at the front of every datagram.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StandardHeader {
    pub packet_type: PacketType,
    pub sender_packet_index: PacketIndex,
    /// Highest packet index the sender has received from us
    pub sender_ack_index: PacketIndex,
    /// Bit `n` is set when packet `sender_ack_index - (n + 1)` was received
    pub sender_ack_bitfield: u32,
}

impl StandardHeader {
    pub fn new(
        packet_type: PacketType,
        sender_packet_index: PacketIndex,
        sender_ack_index: PacketIndex,
        sender_ack_bitfield: u32,
    ) -> Self {
        Self {
            packet_type,
            sender_packet_index,
            sender_ack_index,
            sender_ack_bitfield,
        }
    }

    /// Largest size a header can take on the wire.
    pub fn max_bit_length() -> u32 {
        PacketType::Disconnect.bit_length()
            + <PacketIndex as ConstBitLength>::const_bit_length() * 2
            + <u32 as ConstBitLength>::const_bit_length()
    }
}

impl Serde for StandardHeader {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.packet_type.ser(writer);
        self.sender_packet_index.ser(writer);
        self.sender_ack_index.ser(writer);
        self.sender_ack_bitfield.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let packet_type = PacketType::de(reader)?;
        let sender_packet_index = PacketIndex::de(reader)?;
        let sender_ack_index = PacketIndex::de(reader)?;
        let sender_ack_bitfield = u32::de(reader)?;

        Ok(Self {
            packet_type,
            sender_packet_index,
            sender_ack_index,
            sender_ack_bitfield,
        })
    }

    fn bit_length(&self) -> u32 {
        self.packet_type.bit_length()
            + self.sender_packet_index.bit_length()
            + self.sender_ack_index.bit_length()
            + self.sender_ack_bitfield.bit_length()
    }
}
