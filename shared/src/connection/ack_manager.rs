use std::collections::HashMap;

use log::trace;

use crate::{
    connection::rtt::RttEstimator, sequence_greater_than, sequence_less_than,
    types::PacketIndex, Instant, PacketNotifiable, PacketType, StandardHeader,
};

/// Number of earlier packets acknowledged through the bitfield.
pub const ACK_BITFIELD_SIZE: u16 = 32;

/// Sent data packets are given up on (reported dropped) once this many newer
/// packets have been sent, even if the remote host never answers.
const SENT_PACKET_HORIZON: u16 = 256;

/// Outcome of recording an incoming packet index
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReceiptStatus {
    New,
    Duplicate,
    /// Too far behind the newest packet to be tracked any more
    Stale,
}

/// Keeps track of sent & received packets, and contains ack information that
/// is copied into the standard header on each outgoing packet
pub struct AckManager {
    // Index of the next outgoing packet
    next_packet_index: PacketIndex,
    // Data packets which have been sent but not yet acknowledged
    sent_packets: HashMap<PacketIndex, Instant>,
    // Most recent packet index received from the remote host
    last_recv_packet_index: Option<PacketIndex>,
    // Receipt of the 32 packets before `last_recv_packet_index`
    recv_bitfield: u32,
    rtt: RttEstimator,
}

impl AckManager {
    pub fn new(rtt: RttEstimator) -> Self {
        Self {
            next_packet_index: 0,
            sent_packets: HashMap::new(),
            last_recv_packet_index: None,
            recv_bitfield: 0,
            rtt,
        }
    }

    /// Get the index of the next outgoing packet
    pub fn next_sender_packet_index(&self) -> PacketIndex {
        self.next_packet_index
    }

    pub fn rtt_millis(&self) -> f32 {
        self.rtt.rtt_millis()
    }

    pub fn has_unacknowledged(&self) -> bool {
        !self.sent_packets.is_empty()
    }

    /// Whether `packet_index` would be accepted as a new packet right now.
    pub fn receipt_status(&self, packet_index: PacketIndex) -> ReceiptStatus {
        let Some(last) = self.last_recv_packet_index else {
            return ReceiptStatus::New;
        };
        if packet_index == last {
            return ReceiptStatus::Duplicate;
        }
        if sequence_greater_than(packet_index, last) {
            return ReceiptStatus::New;
        }
        let behind = last.wrapping_sub(packet_index);
        if behind > ACK_BITFIELD_SIZE {
            return ReceiptStatus::Stale;
        }
        if self.recv_bitfield & (1 << (behind - 1)) != 0 {
            ReceiptStatus::Duplicate
        } else {
            ReceiptStatus::New
        }
    }

    /// Records that a complete packet has been received, so that it is
    /// acknowledged in the following outgoing headers.
    pub fn record_received(&mut self, packet_index: PacketIndex) -> ReceiptStatus {
        let status = self.receipt_status(packet_index);
        if status != ReceiptStatus::New {
            return status;
        }

        match self.last_recv_packet_index {
            None => {
                self.last_recv_packet_index = Some(packet_index);
                self.recv_bitfield = 0;
            }
            Some(last) if sequence_greater_than(packet_index, last) => {
                let shift = u32::from(packet_index.wrapping_sub(last));
                // The previous newest packet becomes bit `shift - 1`
                self.recv_bitfield = if shift > u32::from(ACK_BITFIELD_SIZE) {
                    0
                } else {
                    let widened = ((u64::from(self.recv_bitfield) << 1) | 1) << (shift - 1);
                    widened as u32
                };
                self.last_recv_packet_index = Some(packet_index);
            }
            Some(last) => {
                let behind = last.wrapping_sub(packet_index);
                self.recv_bitfield |= 1 << (behind - 1);
            }
        }

        ReceiptStatus::New
    }

    /// Process an incoming header, notifying every acknowledged data packet
    /// as delivered (once) and every packet that fell out of the
    /// acknowledgment window as dropped.
    pub fn process_incoming_header(
        &mut self,
        now: &Instant,
        header: &StandardHeader,
        packet_notifiables: &mut [&mut dyn PacketNotifiable],
    ) {
        let sender_ack_index = header.sender_ack_index;
        let mut sender_ack_bitfield = header.sender_ack_bitfield;

        self.notify_delivered(now, sender_ack_index, packet_notifiables);

        for offset in 1..=ACK_BITFIELD_SIZE {
            if sender_ack_bitfield & 1 == 1 {
                let sent_packet_index = sender_ack_index.wrapping_sub(offset);
                self.notify_delivered(now, sent_packet_index, packet_notifiables);
            }
            sender_ack_bitfield >>= 1;
        }

        // Anything the remote can no longer acknowledge is lost
        let window_start = sender_ack_index.wrapping_sub(ACK_BITFIELD_SIZE);
        self.drop_sent_before(window_start, packet_notifiables);
    }

    fn notify_delivered(
        &mut self,
        now: &Instant,
        packet_index: PacketIndex,
        packet_notifiables: &mut [&mut dyn PacketNotifiable],
    ) {
        let Some(sent_at) = self.sent_packets.remove(&packet_index) else {
            return;
        };
        self.rtt.record_sample(sent_at.elapsed(now));
        trace!("packet {} delivered", packet_index);
        for notifiable in packet_notifiables.iter_mut() {
            notifiable.notify_packet_delivered(packet_index);
        }
    }

    fn drop_sent_before(
        &mut self,
        oldest_kept: PacketIndex,
        packet_notifiables: &mut [&mut dyn PacketNotifiable],
    ) {
        let mut dropped: Vec<PacketIndex> = self
            .sent_packets
            .keys()
            .copied()
            .filter(|index| sequence_less_than(*index, oldest_kept))
            .collect();
        dropped.sort_by(|a, b| {
            if sequence_less_than(*a, *b) {
                std::cmp::Ordering::Less
            } else {
                std::cmp::Ordering::Greater
            }
        });

        for packet_index in dropped {
            self.sent_packets.remove(&packet_index);
            trace!("packet {} dropped", packet_index);
            for notifiable in packet_notifiables.iter_mut() {
                notifiable.notify_packet_dropped(packet_index);
            }
        }
    }

    /// Builds the header for the next outgoing packet and advances the
    /// outgoing packet index. Data packets are tracked until acknowledged.
    pub fn next_outgoing_packet_header(
        &mut self,
        now: &Instant,
        packet_type: PacketType,
        packet_notifiables: &mut [&mut dyn PacketNotifiable],
    ) -> StandardHeader {
        let packet_index = self.next_packet_index;
        self.next_packet_index = self.next_packet_index.wrapping_add(1);

        let horizon = packet_index.wrapping_sub(SENT_PACKET_HORIZON);
        self.drop_sent_before(horizon, packet_notifiables);

        if packet_type == PacketType::Data {
            self.sent_packets.insert(packet_index, *now);
        }

        StandardHeader::new(
            packet_type,
            packet_index,
            self.last_recv_packet_index.unwrap_or(u16::MAX),
            self.recv_bitfield,
        )
    }
}
