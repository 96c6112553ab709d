use std::collections::{BTreeMap, VecDeque};

use crate::{sequencer::error::SequencerError, types::StreamOffset};

/// Incoming side of the reliable stream. Fragments may arrive in any order
/// and more than once; stream bytes are released strictly in order and split
/// back into the frames the sender pushed.
pub struct ReliableStreamReceiver {
    max_window_bytes: u32,
    // Next stream offset expected
    next_offset: StreamOffset,
    // Fragments received ahead of `next_offset`
    buffered: BTreeMap<StreamOffset, Box<[u8]>>,
    // In-order bytes not yet forming a complete frame
    pending: Vec<u8>,
    frames: VecDeque<Box<[u8]>>,
}

impl ReliableStreamReceiver {
    pub fn new(max_window_bytes: u32) -> Self {
        Self {
            max_window_bytes,
            next_offset: 0,
            buffered: BTreeMap::new(),
            pending: Vec::new(),
            frames: VecDeque::new(),
        }
    }

    pub fn next_offset(&self) -> StreamOffset {
        self.next_offset
    }

    /// Checks that a fragment can be accepted, without changing any state.
    pub fn check_fragment(&self, offset: StreamOffset, length: usize) -> Result<(), SequencerError> {
        let ahead = offset.wrapping_sub(self.next_offset);
        let behind = self.next_offset.wrapping_sub(offset);
        if behind <= self.max_window_bytes {
            // already (at least partially) delivered
            return Ok(());
        }
        if u64::from(ahead) + length as u64 > u64::from(self.max_window_bytes) {
            return Err(SequencerError::StreamWindowExceeded {
                offset,
                expected: self.next_offset,
            });
        }
        Ok(())
    }

    pub fn receive_fragment(&mut self, offset: StreamOffset, bytes: Box<[u8]>) {
        let behind = self.next_offset.wrapping_sub(offset);
        if behind <= self.max_window_bytes {
            // Overlaps already delivered bytes: keep only the new tail
            let skip = behind as usize;
            if skip >= bytes.len() {
                return;
            }
            self.deliver(&bytes[skip..]);
        } else if !self.buffered.contains_key(&offset) {
            self.buffered.insert(offset, bytes);
        }

        self.drain_buffered();
        self.split_frames();
    }

    fn deliver(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        self.next_offset = self.next_offset.wrapping_add(bytes.len() as u32);
    }

    fn drain_buffered(&mut self) {
        loop {
            let next_offset = self.next_offset;
            let Some((&offset, _)) = self.buffered.iter().find(|(offset, _)| {
                next_offset.wrapping_sub(**offset) <= self.max_window_bytes
            }) else {
                return;
            };
            let Some(bytes) = self.buffered.remove(&offset) else {
                return;
            };
            let skip = next_offset.wrapping_sub(offset) as usize;
            if skip < bytes.len() {
                self.deliver(&bytes[skip..]);
            }
        }
    }

    fn split_frames(&mut self) {
        let mut start = 0;
        while self.pending.len() - start >= 4 {
            let mut prefix = [0u8; 4];
            prefix.copy_from_slice(&self.pending[start..start + 4]);
            let length = u32::from_le_bytes(prefix) as usize;
            if self.pending.len() - start - 4 < length {
                break;
            }
            let frame = self.pending[start + 4..start + 4 + length].to_vec();
            self.frames.push_back(frame.into_boxed_slice());
            start += 4 + length;
        }
        self.pending.drain(..start);
    }

    /// Complete frames, in the order they were sent
    pub fn take_frames(&mut self) -> Vec<Box<[u8]>> {
        self.frames.drain(..).collect()
    }
}
