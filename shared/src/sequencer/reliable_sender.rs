use std::collections::{BTreeMap, HashMap, VecDeque};

use log::trace;

use crate::{
    sequencer::packet_body::ReliableSection,
    types::{PacketIndex, StreamOffset},
    Instant, PacketNotifiable,
};

struct InFlightFragment {
    length: u32,
    last_sent: Instant,
}

/// Outgoing side of the reliable stream.
///
/// Frames are appended to an unbounded byte stream which is sliced into
/// fragments as packets are written. A fragment stays in flight until any
/// packet carrying it is acknowledged; if that takes longer than
/// `rtt * rtt_resend_factor` it is sent again. Once acknowledged, later
/// acknowledgments of other packets carrying the same fragment are no-ops.
pub struct ReliableStreamSender {
    rtt_resend_factor: f32,
    // Bytes from `buffer_start` up to the end of the stream
    buffer: VecDeque<u8>,
    buffer_start: StreamOffset,
    // First byte never sent
    next_offset: StreamOffset,
    // End of the stream
    written_offset: StreamOffset,
    in_flight: BTreeMap<StreamOffset, InFlightFragment>,
    sent_packets: HashMap<PacketIndex, Vec<StreamOffset>>,
}

impl ReliableStreamSender {
    pub fn new(rtt_resend_factor: f32) -> Self {
        Self {
            rtt_resend_factor,
            buffer: VecDeque::new(),
            buffer_start: 0,
            next_offset: 0,
            written_offset: 0,
            in_flight: BTreeMap::new(),
            sent_packets: HashMap::new(),
        }
    }

    /// Appends one frame (little-endian `u32` length prefix, then data).
    /// Returns the stream offset just past the frame.
    pub fn push_frame(&mut self, data: &[u8]) -> StreamOffset {
        let length = data.len() as u32;
        self.buffer.extend(length.to_le_bytes());
        self.buffer.extend(data.iter().copied());
        self.written_offset = self.written_offset.wrapping_add(4 + length);
        self.written_offset
    }

    /// Offset up to which every byte has been acknowledged.
    pub fn acked_offset(&self) -> StreamOffset {
        match self.in_flight.keys().next() {
            Some(offset) => *offset,
            None => self.next_offset,
        }
    }

    pub fn written_offset(&self) -> StreamOffset {
        self.written_offset
    }

    pub fn has_unsent(&self) -> bool {
        self.next_offset != self.written_offset
    }

    fn is_due(&self, fragment: &InFlightFragment, now: &Instant, rtt_millis: f32) -> bool {
        let elapsed_millis = fragment.last_sent.elapsed(now).as_secs_f32() * 1000.0;
        elapsed_millis >= rtt_millis * self.rtt_resend_factor
    }

    fn slice(&self, offset: StreamOffset, length: u32) -> Box<[u8]> {
        let start = offset.wrapping_sub(self.buffer_start) as usize;
        self.buffer
            .range(start..start + length as usize)
            .copied()
            .collect()
    }

    /// Fills up to `budget_bits` of a packet with due resends (oldest first)
    /// followed by new stream bytes, and remembers which fragments
    /// `packet_index` carries.
    pub fn write_sections(
        &mut self,
        now: &Instant,
        rtt_millis: f32,
        packet_index: PacketIndex,
        budget_bits: u32,
    ) -> Vec<ReliableSection> {
        let mut sections = Vec::new();
        let mut carried = Vec::new();
        let mut used_bits: u32 = 0;

        // Resends
        let due: Vec<StreamOffset> = self
            .in_flight
            .iter()
            .filter(|(_, fragment)| self.is_due(fragment, now, rtt_millis))
            .map(|(offset, _)| *offset)
            .collect();
        for offset in due {
            let Some(fragment) = self.in_flight.get(&offset) else {
                continue;
            };
            let length = fragment.length;
            let cost = ReliableSection::overhead_bits(length as usize) + length * 8;
            if used_bits + cost > budget_bits {
                break;
            }
            used_bits += cost;

            sections.push(ReliableSection {
                offset,
                bytes: self.slice(offset, length),
            });
            carried.push(offset);
            if let Some(fragment) = self.in_flight.get_mut(&offset) {
                fragment.last_sent = *now;
            }
            trace!("resending reliable fragment at offset {}", offset);
        }

        // New data
        while self.has_unsent() {
            let unsent = self.written_offset.wrapping_sub(self.next_offset);
            let free_bits = budget_bits.saturating_sub(used_bits);
            let overhead = ReliableSection::overhead_bits(unsent as usize);
            if free_bits <= overhead {
                break;
            }
            let length = unsent.min((free_bits - overhead) / 8);
            if length == 0 {
                break;
            }
            used_bits += ReliableSection::overhead_bits(length as usize) + length * 8;

            let offset = self.next_offset;
            sections.push(ReliableSection {
                offset,
                bytes: self.slice(offset, length),
            });
            carried.push(offset);
            self.in_flight.insert(
                offset,
                InFlightFragment {
                    length,
                    last_sent: *now,
                },
            );
            self.next_offset = self.next_offset.wrapping_add(length);
        }

        if !carried.is_empty() {
            self.sent_packets.insert(packet_index, carried);
        }

        sections
    }

    fn trim_acknowledged(&mut self) {
        let acked = self.acked_offset();
        let trim = acked.wrapping_sub(self.buffer_start) as usize;
        self.buffer.drain(..trim.min(self.buffer.len()));
        self.buffer_start = acked;
    }
}

impl PacketNotifiable for ReliableStreamSender {
    fn notify_packet_delivered(&mut self, packet_index: PacketIndex) {
        let Some(offsets) = self.sent_packets.remove(&packet_index) else {
            return;
        };
        for offset in offsets {
            self.in_flight.remove(&offset);
        }
        self.trim_acknowledged();
    }

    fn notify_packet_dropped(&mut self, packet_index: PacketIndex) {
        // Resends are driven by timeout alone
        self.sent_packets.remove(&packet_index);
    }
}
