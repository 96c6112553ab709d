use metavoxel_serde::{BitReader, BitWrite, DeltaSerde, Serde, SerdeErr};

/// The value stored in a metavoxel: a packed RGBA color, or nothing.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct AttributeValue(Option<u32>);

impl AttributeValue {
    pub const EMPTY: Self = Self(None);

    pub fn new(value: u32) -> Self {
        Self(Some(value))
    }

    pub fn from_rgba(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self::new(u32::from_be_bytes([red, green, blue, alpha]))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn get(&self) -> Option<u32> {
        self.0
    }
}

impl From<Option<u32>> for AttributeValue {
    fn from(value: Option<u32>) -> Self {
        Self(value)
    }
}

impl Serde for AttributeValue {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.0.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self(Option::<u32>::de(reader)?))
    }

    fn bit_length(&self) -> u32 {
        self.0.bit_length()
    }
}

impl DeltaSerde for AttributeValue {}
