use crate::{BitReader, BitWrite, Serde, SerdeErr};

/// Serialization relative to a reference value both ends already agree on.
///
/// When a reference is present, a single "unchanged" bit is written first and
/// the full value only follows if it differs. Without a reference the full
/// value is always written, with no leading bit.
pub trait DeltaSerde: Serde {
    fn ser_delta(&self, reference: Option<&Self>, writer: &mut dyn BitWrite) {
        if let Some(reference) = reference {
            let unchanged = reference == self;
            writer.write_bit(unchanged);
            if unchanged {
                return;
            }
        }
        self.ser(writer);
    }

    fn de_delta(reference: Option<&Self>, reader: &mut BitReader) -> Result<Self, SerdeErr> {
        if let Some(reference) = reference {
            if reader.read_bit()? {
                return Ok(reference.clone());
            }
        }
        Self::de(reader)
    }

    fn delta_bit_length(&self, reference: Option<&Self>) -> u32 {
        match reference {
            Some(reference) if reference == self => 1,
            Some(_) => 1 + self.bit_length(),
            None => self.bit_length(),
        }
    }
}

impl DeltaSerde for bool {}
impl DeltaSerde for u8 {}
impl DeltaSerde for u16 {}
impl DeltaSerde for u32 {}
impl DeltaSerde for u64 {}
impl DeltaSerde for i32 {}
impl DeltaSerde for f32 {}
impl<T: Serde> DeltaSerde for Option<T> {}
