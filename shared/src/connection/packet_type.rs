// An enum representing the different types of packets that can be
// sent/received

use metavoxel_serde::{BitReader, BitWrite, ConstBitLength, Serde, SerdeErr, UnsignedInteger};

#[derive(Copy, Debug, Clone, Eq, PartialEq)]
pub enum PacketType {
    // A packet carrying reliable stream fragments and/or an unreliable payload
    Data,
    // A packet sent to maintain the connection by preventing a timeout, and
    // to keep acknowledgments flowing when there is nothing else to send
    Heartbeat,
    // Sent once by a side that is tearing the session down
    Disconnect,
}

// Most packets should be Data, so lets compress this a bit more.
impl Serde for PacketType {
    fn ser(&self, writer: &mut dyn BitWrite) {
        let is_data = *self == PacketType::Data;
        is_data.ser(writer);

        if is_data {
            return;
        }

        let index: u8 = match self {
            PacketType::Data | PacketType::Heartbeat => 0,
            PacketType::Disconnect => 1,
        };

        UnsignedInteger::<2>::new(index).ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let is_data = bool::de(reader)?;
        if is_data {
            return Ok(PacketType::Data);
        }

        match UnsignedInteger::<2>::de(reader)?.get() {
            0 => Ok(PacketType::Heartbeat),
            1 => Ok(PacketType::Disconnect),
            // Malformed or malicious packets could send unused indices
            _ => Err(SerdeErr),
        }
    }

    fn bit_length(&self) -> u32 {
        let is_data = *self == PacketType::Data;
        if is_data {
            return is_data.bit_length();
        }
        is_data.bit_length() + <UnsignedInteger<2> as ConstBitLength>::const_bit_length()
    }
}
