use std::{collections::HashMap, hash::Hash};

use crate::{BitReader, BitWrite, Serde, SerdeErr, UnsignedVariableInteger};

/// Writes objects that may appear more than once in a stream (shared subtrees,
/// for example) so that each distinct object is encoded only once.
///
/// The first time a key is seen a `false` marker bit is written followed by the
/// caller's encoding; afterwards a `true` marker and the object's index are
/// written instead. Indices are assigned in the order objects finish encoding,
/// so an object that contains other shared objects gets its index after them.
pub struct SharedObjectWriter<K: Eq + Hash> {
    indices: HashMap<K, u64>,
}

impl<K: Eq + Hash> Default for SharedObjectWriter<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> SharedObjectWriter<K> {
    pub fn new() -> Self {
        Self {
            indices: HashMap::new(),
        }
    }

    pub fn write<F>(&mut self, key: K, writer: &mut dyn BitWrite, encode: F)
    where
        F: FnOnce(&mut Self, &mut dyn BitWrite),
    {
        if let Some(index) = self.indices.get(&key) {
            writer.write_bit(true);
            UnsignedVariableInteger::<7>::new(*index).ser(writer);
            return;
        }

        writer.write_bit(false);
        encode(self, writer);
        let index = self.indices.len() as u64;
        self.indices.insert(key, index);
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Counterpart of [`SharedObjectWriter`]. Objects must be cheap to clone
/// (typically an `Arc`).
pub struct SharedObjectReader<T: Clone> {
    objects: Vec<T>,
}

impl<T: Clone> Default for SharedObjectReader<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> SharedObjectReader<T> {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
        }
    }

    pub fn read<E, F>(&mut self, reader: &mut BitReader, decode: F) -> Result<T, E>
    where
        E: From<SerdeErr>,
        F: FnOnce(&mut Self, &mut BitReader) -> Result<T, E>,
    {
        if reader.read_bit()? {
            let index = UnsignedVariableInteger::<7>::de(reader)?.get();
            let object = usize::try_from(index)
                .ok()
                .and_then(|index| self.objects.get(index))
                .ok_or(SerdeErr)?;
            return Ok(object.clone());
        }

        let object = decode(self, reader)?;
        self.objects.push(object.clone());
        Ok(object)
    }
}
