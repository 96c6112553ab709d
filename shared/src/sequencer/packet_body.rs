use metavoxel_serde::{
    BitReader, BitWrite, ConstBitLength, Serde, SerdeErr, StreamWriter, UnsignedVariableInteger,
};

use crate::types::{PacketIndex, StreamOffset};

/// A slice of the outgoing reliable stream
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReliableSection {
    pub offset: StreamOffset,
    pub bytes: Box<[u8]>,
}

impl ReliableSection {
    /// Bits taken on the wire by the section header of a slice of `length`
    /// bytes (continue bit and kind bit included)
    pub fn overhead_bits(length: usize) -> u32 {
        2 + <StreamOffset as ConstBitLength>::const_bit_length()
            + UnsignedVariableInteger::<7>::new(length as u64).bit_length()
    }
}

/// Payload delivered at most once, tagged with the packet index of the
/// baseline its encoding references (if any)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnreliablePayload {
    pub baseline: Option<PacketIndex>,
    pub payload: Box<[u8]>,
}

/// Everything carried by one logical packet.
///
/// Each section is preceded by a continue bit and a kind bit (`true` for a
/// reliable stream slice, `false` for the unreliable payload); a cleared
/// continue bit ends the body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PacketBody {
    pub reliable: Vec<ReliableSection>,
    pub unreliable: Option<UnreliablePayload>,
}

impl PacketBody {
    pub fn is_empty(&self) -> bool {
        self.reliable.is_empty() && self.unreliable.is_none()
    }

    pub fn to_bytes(&self) -> Box<[u8]> {
        let mut writer = StreamWriter::new();
        self.ser(&mut writer);
        writer.to_bytes()
    }

    pub fn ser(&self, writer: &mut dyn BitWrite) {
        for section in &self.reliable {
            writer.write_bit(true);
            writer.write_bit(true);
            section.offset.ser(writer);
            section.bytes.ser(writer);
        }

        if let Some(section) = &self.unreliable {
            writer.write_bit(true);
            writer.write_bit(false);
            section.baseline.ser(writer);
            section.payload.ser(writer);
        }

        writer.write_bit(false);
    }

    pub fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let mut body = Self::default();

        while reader.read_bit()? {
            if reader.read_bit()? {
                let offset = StreamOffset::de(reader)?;
                let bytes = Box::<[u8]>::de(reader)?;
                body.reliable.push(ReliableSection { offset, bytes });
            } else {
                if body.unreliable.is_some() {
                    // only one unreliable payload per packet
                    return Err(SerdeErr);
                }
                let baseline = Option::<PacketIndex>::de(reader)?;
                let payload = Box::<[u8]>::de(reader)?;
                body.unreliable = Some(UnreliablePayload { baseline, payload });
            }
        }

        Ok(body)
    }
}
