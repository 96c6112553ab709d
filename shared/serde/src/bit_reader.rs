use crate::SerdeErr;

pub struct BitReader<'b> {
    scratch: u8,
    scratch_index: u8,
    buffer: &'b [u8],
    buffer_index: usize,
}

impl<'b> BitReader<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self {
            scratch: 0,
            scratch_index: 0,
            buffer,
            buffer_index: 0,
        }
    }

    pub fn read_bit(&mut self) -> Result<bool, SerdeErr> {
        if self.scratch_index == 0 {
            let Some(byte) = self.buffer.get(self.buffer_index) else {
                return Err(SerdeErr);
            };
            self.scratch = *byte;
            self.buffer_index += 1;
            self.scratch_index = 8;
        }

        let value = self.scratch & 1;
        self.scratch >>= 1;
        self.scratch_index -= 1;

        Ok(value != 0)
    }

    pub fn read_byte(&mut self) -> Result<u8, SerdeErr> {
        let mut output = 0;
        for index in 0..8 {
            if self.read_bit()? {
                output |= 1 << index;
            }
        }
        Ok(output)
    }

    pub fn read_bytes(&mut self, length: usize) -> Result<Box<[u8]>, SerdeErr> {
        if (length as u64) * 8 > self.bits_remaining() as u64 {
            return Err(SerdeErr);
        }
        let mut output = Vec::with_capacity(length);
        for _ in 0..length {
            output.push(self.read_byte()?);
        }
        Ok(output.into_boxed_slice())
    }

    /// Bits not yet consumed, including the zero padding of the final byte.
    pub fn bits_remaining(&self) -> u32 {
        let unread_bytes = self.buffer.len() - self.buffer_index;
        (unread_bytes as u32) * 8 + self.scratch_index as u32
    }
}
