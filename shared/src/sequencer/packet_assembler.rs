use std::collections::HashMap;

use log::debug;

use crate::{
    sequence_greater_than, sequence_less_than, sequencer::error::SequencerError,
    types::PacketIndex,
};

struct IncompletePacket {
    received: u8,
    fragments: Vec<Option<Box<[u8]>>>,
}

/// Collects the datagrams of logical packets that were split over several
/// datagrams, handing back the packet body once every fragment is present.
/// Incomplete packets that fall too far behind the newest one seen are
/// discarded.
pub struct PacketAssembler {
    max_fragments: u8,
    window: u16,
    incomplete: HashMap<PacketIndex, IncompletePacket>,
    newest: Option<PacketIndex>,
}

impl PacketAssembler {
    pub fn new(max_fragments: u8, window: u16) -> Self {
        Self {
            max_fragments,
            window,
            incomplete: HashMap::new(),
            newest: None,
        }
    }

    /// Checks a fragment marker without changing any state.
    pub fn check_fragment(
        &self,
        packet_index: PacketIndex,
        fragment_index: u8,
        fragment_count: u8,
    ) -> Result<(), SequencerError> {
        if fragment_count > self.max_fragments {
            return Err(SequencerError::FragmentCountExceeded {
                packet_index,
                count: fragment_count,
                max: self.max_fragments,
            });
        }
        if fragment_count < 2 || fragment_index >= fragment_count {
            return Err(SequencerError::MalformedHeader {
                reason: "fragment index out of range",
            });
        }
        if let Some(packet) = self.incomplete.get(&packet_index) {
            if packet.fragments.len() != usize::from(fragment_count) {
                return Err(SequencerError::MalformedHeader {
                    reason: "fragment count changed between datagrams",
                });
            }
        }
        Ok(())
    }

    /// Attempt to receive one fragment of a packet
    ///
    /// Returns Ok(None) if more fragments are needed, Ok(Some(body)) once the
    /// packet is complete, or Err if the fragment marker is invalid
    pub fn try_receive(
        &mut self,
        packet_index: PacketIndex,
        fragment_index: u8,
        fragment_count: u8,
        bytes: Box<[u8]>,
    ) -> Result<Option<Box<[u8]>>, SequencerError> {
        self.check_fragment(packet_index, fragment_index, fragment_count)?;
        self.advance_newest(packet_index);

        let packet = self
            .incomplete
            .entry(packet_index)
            .or_insert_with(|| IncompletePacket {
                received: 0,
                fragments: vec![None; usize::from(fragment_count)],
            });

        let slot = &mut packet.fragments[usize::from(fragment_index)];
        if slot.is_some() {
            return Ok(None);
        }
        *slot = Some(bytes);
        packet.received += 1;

        if packet.received != fragment_count {
            return Ok(None);
        }

        // we have received all fragments! put it all together
        let Some(packet) = self.incomplete.remove(&packet_index) else {
            return Ok(None);
        };
        let body: Vec<u8> = packet
            .fragments
            .into_iter()
            .flatten()
            .flat_map(|fragment| fragment.into_vec())
            .collect();
        Ok(Some(body.into_boxed_slice()))
    }

    /// Forgets any partial state for a packet (used once it is known to be a
    /// duplicate or stale)
    pub fn discard(&mut self, packet_index: PacketIndex) {
        self.incomplete.remove(&packet_index);
    }

    pub fn incomplete_count(&self) -> usize {
        self.incomplete.len()
    }

    fn advance_newest(&mut self, packet_index: PacketIndex) {
        match self.newest {
            Some(newest) if !sequence_greater_than(packet_index, newest) => return,
            _ => self.newest = Some(packet_index),
        }

        let oldest_kept = packet_index.wrapping_sub(self.window);
        self.incomplete.retain(|index, _| {
            let keep = !sequence_less_than(*index, oldest_kept);
            if !keep {
                debug!("discarding incomplete packet {}", index);
            }
            keep
        });
    }
}

#[cfg(test)]
mod tests {
    use super::PacketAssembler;
    use crate::sequencer::error::SequencerError;

    fn bytes(data: &[u8]) -> Box<[u8]> {
        data.to_vec().into_boxed_slice()
    }

    #[test]
    fn fragments_reassemble_in_index_order() {
        let mut assembler = PacketAssembler::new(8, 32);
        assert_eq!(assembler.try_receive(5, 2, 3, bytes(&[5, 6])), Ok(None));
        assert_eq!(assembler.try_receive(5, 0, 3, bytes(&[1, 2])), Ok(None));
        assert_eq!(assembler.try_receive(5, 0, 3, bytes(&[1, 2])), Ok(None));
        assert_eq!(
            assembler.try_receive(5, 1, 3, bytes(&[3, 4])),
            Ok(Some(bytes(&[1, 2, 3, 4, 5, 6])))
        );
        assert_eq!(assembler.incomplete_count(), 0);
    }

    #[test]
    fn too_many_fragments_is_rejected() {
        let mut assembler = PacketAssembler::new(4, 32);
        assert_eq!(
            assembler.try_receive(1, 0, 5, bytes(&[0])),
            Err(SequencerError::FragmentCountExceeded {
                packet_index: 1,
                count: 5,
                max: 4
            })
        );
    }

    #[test]
    fn old_incomplete_packets_are_discarded() {
        let mut assembler = PacketAssembler::new(4, 32);
        assembler.try_receive(1, 0, 2, bytes(&[0])).unwrap();
        assembler.try_receive(40, 0, 2, bytes(&[0])).unwrap();
        assert_eq!(assembler.incomplete_count(), 1);
    }
}
