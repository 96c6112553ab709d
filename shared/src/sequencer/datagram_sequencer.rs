use std::collections::VecDeque;

use log::{info, trace, warn};
use metavoxel_serde::{BitReader, BitWrite, BitWriter, Serde};

use crate::{
    connection::{
        ack_manager::{AckManager, ReceiptStatus},
        rtt::RttEstimator,
    },
    sequencer::{
        error::SequencerError,
        packet_assembler::PacketAssembler,
        packet_body::{PacketBody, ReliableSection, UnreliablePayload},
        reliable_receiver::ReliableStreamReceiver,
        reliable_sender::ReliableStreamSender,
    },
    types::{PacketIndex, StreamOffset},
    ConnectionConfig, Instant, PacketNotifiable, PacketType, StandardHeader, Timer,
};

// fragment marker, fragment index, fragment count
const FRAGMENT_MARKER_BITS: u32 = 1 + 8 + 8;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum SequencerState {
    Active,
    Closed,
}

/// The datagrams making up one outgoing logical packet
#[derive(Clone, Debug)]
pub struct SentPacket {
    pub packet_index: PacketIndex,
    pub datagrams: Vec<Box<[u8]>>,
}

/// What a received datagram amounted to
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Incoming {
    /// A complete packet was received and processed
    Packet(PacketIndex),
    /// One datagram of a multi-datagram packet; the rest is still missing
    Partial(PacketIndex),
    /// The remote host closed the session
    Disconnect,
}

/// An unreliable payload as it arrived, with the index of the packet that
/// carried it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceivedUnreliable {
    pub packet_index: PacketIndex,
    pub baseline: Option<PacketIndex>,
    pub payload: Box<[u8]>,
}

/// Fate of an outgoing data packet
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PacketNotification {
    Delivered(PacketIndex),
    Dropped(PacketIndex),
}

#[derive(Default)]
struct NotificationQueue {
    queue: VecDeque<PacketNotification>,
}

impl PacketNotifiable for NotificationQueue {
    fn notify_packet_delivered(&mut self, packet_index: PacketIndex) {
        self.queue.push_back(PacketNotification::Delivered(packet_index));
    }

    fn notify_packet_dropped(&mut self, packet_index: PacketIndex) {
        self.queue.push_back(PacketNotification::Dropped(packet_index));
    }
}

struct ParsedDatagram {
    header: StandardHeader,
    fragment: Option<(u8, u8)>,
    body: Box<[u8]>,
}

/// Multiplexes one reliable byte stream and per-packet unreliable payloads
/// over an unreliable datagram transport.
///
/// Each logical packet gets the next wrapping packet index and may span
/// several datagrams. Every datagram header acknowledges the packets
/// received from the remote host, which drives reliable retransmission,
/// round trip estimation and the delivered/dropped notifications handed to
/// the owner.
pub struct DatagramSequencer {
    config: ConnectionConfig,
    state: SequencerState,
    ack_manager: AckManager,
    reliable_sender: ReliableStreamSender,
    reliable_receiver: ReliableStreamReceiver,
    assembler: PacketAssembler,
    notifications: NotificationQueue,
    unreliable: VecDeque<ReceivedUnreliable>,
    heartbeat_timer: Timer,
    timeout_timer: Timer,
}

impl DatagramSequencer {
    pub fn new(config: &ConnectionConfig, now: &Instant) -> Self {
        Self {
            config: config.clone(),
            state: SequencerState::Active,
            ack_manager: AckManager::new(RttEstimator::new(
                config.rtt_initial_estimate,
                config.rtt_smoothing_factor,
            )),
            reliable_sender: ReliableStreamSender::new(config.rtt_resend_factor),
            reliable_receiver: ReliableStreamReceiver::new(config.max_reliable_window_bytes),
            assembler: PacketAssembler::new(
                config.max_fragments_per_packet,
                config.incomplete_packet_window,
            ),
            notifications: NotificationQueue::default(),
            unreliable: VecDeque::new(),
            heartbeat_timer: Timer::new(config.heartbeat_interval, now),
            timeout_timer: Timer::new(config.disconnection_timeout_duration, now),
        }
    }

    // State

    pub fn is_closed(&self) -> bool {
        self.state == SequencerState::Closed
    }

    /// Closes the sequencer for good. Anything in flight or not yet taken by
    /// the owner is dropped.
    pub fn close(&mut self) {
        if self.is_closed() {
            return;
        }
        info!("closing sequencer");
        self.state = SequencerState::Closed;
        self.reliable_sender = ReliableStreamSender::new(self.config.rtt_resend_factor);
        self.reliable_receiver = ReliableStreamReceiver::new(self.config.max_reliable_window_bytes);
        self.assembler = PacketAssembler::new(
            self.config.max_fragments_per_packet,
            self.config.incomplete_packet_window,
        );
        self.notifications.queue.clear();
        self.unreliable.clear();
    }

    fn check_open(&self) -> Result<(), SequencerError> {
        if self.is_closed() {
            return Err(SequencerError::Closed);
        }
        Ok(())
    }

    pub fn rtt_millis(&self) -> f32 {
        self.ack_manager.rtt_millis()
    }

    /// Index the next outgoing packet will carry
    pub fn next_packet_index(&self) -> PacketIndex {
        self.ack_manager.next_sender_packet_index()
    }

    /// Offset up to which the outgoing reliable stream is acknowledged
    pub fn acked_stream_offset(&self) -> StreamOffset {
        self.reliable_sender.acked_offset()
    }

    /// Offset just past the last reliable frame queued
    pub fn written_stream_offset(&self) -> StreamOffset {
        self.reliable_sender.written_offset()
    }

    pub fn should_send_heartbeat(&self, now: &Instant) -> bool {
        !self.is_closed() && self.heartbeat_timer.ringing(now)
    }

    /// Whether nothing has been heard from the remote host for longer than
    /// the disconnection timeout
    pub fn timed_out(&self, now: &Instant) -> bool {
        self.timeout_timer.ringing(now)
    }

    // Outgoing

    /// Queues a frame on the reliable stream. Returns the stream offset just
    /// past it; the frame is delivered once `acked_stream_offset` reaches it.
    pub fn send_reliable(&mut self, data: &[u8]) -> Result<StreamOffset, SequencerError> {
        self.check_open()?;
        Ok(self.reliable_sender.push_frame(data))
    }

    fn body_bits_per_datagram(&self, fragmented: bool) -> u32 {
        let header_bits = StandardHeader::new(PacketType::Data, 0, 0, 0).bit_length();
        let marker_bits = if fragmented { FRAGMENT_MARKER_BITS } else { 1 };
        (self.config.max_datagram_bytes as u32 * 8).saturating_sub(header_bits + marker_bits)
    }

    fn datagrams_needed(&self, body_bytes: usize) -> usize {
        if body_bytes as u32 * 8 <= self.body_bits_per_datagram(false) {
            return 1;
        }
        let chunk_bytes = (self.body_bits_per_datagram(true) / 8).max(1) as usize;
        body_bytes.div_ceil(chunk_bytes)
    }

    /// Writes the next packet: due reliable resends, then new reliable
    /// stream bytes, then `unreliable` if given. The packet is split over
    /// several datagrams when it does not fit in one.
    pub fn send_packet(
        &mut self,
        now: &Instant,
        unreliable: Option<UnreliablePayload>,
    ) -> Result<SentPacket, SequencerError> {
        self.check_open()?;

        let budget_bits = self.config.max_reliable_bytes_per_packet as u32 * 8;
        let unreliable_bits = unreliable.as_ref().map_or(0, |payload| {
            2 + payload.baseline.bit_length() + payload.payload.bit_length()
        });
        let worst_case_bytes = (budget_bits + unreliable_bits + 1).div_ceil(8) as usize;
        if self.datagrams_needed(worst_case_bytes) > usize::from(self.config.max_fragments_per_packet) {
            return Err(SequencerError::PacketTooLarge {
                bytes: worst_case_bytes,
                max: self.config.max_fragments_per_packet,
            });
        }

        let packet_index = self.next_packet_index();
        let reliable = self.reliable_sender.write_sections(
            now,
            self.ack_manager.rtt_millis(),
            packet_index,
            budget_bits,
        );
        let body = PacketBody {
            reliable,
            unreliable,
        };

        let header = self.ack_manager.next_outgoing_packet_header(
            now,
            PacketType::Data,
            &mut [&mut self.reliable_sender, &mut self.notifications],
        );
        self.heartbeat_timer.reset(now);

        let body_bytes = body.to_bytes();
        let datagrams = self.split_into_datagrams(&header, &body_bytes);
        trace!(
            "sent packet {} ({} reliable sections, {} datagrams)",
            packet_index,
            body.reliable.len(),
            datagrams.len()
        );

        Ok(SentPacket {
            packet_index,
            datagrams,
        })
    }

    fn split_into_datagrams(&self, header: &StandardHeader, body: &[u8]) -> Vec<Box<[u8]>> {
        if body.len() as u32 * 8 <= self.body_bits_per_datagram(false) {
            let mut writer = BitWriter::with_max_bytes(self.config.max_datagram_bytes);
            header.ser(&mut writer);
            writer.write_bit(false);
            writer.write_bytes(body);
            return vec![writer.to_bytes()];
        }

        let chunk_bytes = (self.body_bits_per_datagram(true) / 8).max(1) as usize;
        let chunks: Vec<&[u8]> = body.chunks(chunk_bytes).collect();
        let fragment_count = chunks.len() as u8;
        chunks
            .into_iter()
            .enumerate()
            .map(|(fragment_index, chunk)| {
                let mut writer = BitWriter::with_max_bytes(self.config.max_datagram_bytes);
                header.ser(&mut writer);
                writer.write_bit(true);
                (fragment_index as u8).ser(&mut writer);
                fragment_count.ser(&mut writer);
                writer.write_bytes(chunk);
                writer.to_bytes()
            })
            .collect()
    }

    /// Header-only packet that keeps acknowledgments flowing and the remote
    /// host's timeout from firing
    pub fn send_heartbeat(&mut self, now: &Instant) -> Result<SentPacket, SequencerError> {
        self.check_open()?;
        let header = self.ack_manager.next_outgoing_packet_header(
            now,
            PacketType::Heartbeat,
            &mut [&mut self.reliable_sender, &mut self.notifications],
        );
        self.heartbeat_timer.reset(now);

        let mut writer = BitWriter::with_max_bytes(self.config.max_datagram_bytes);
        header.ser(&mut writer);
        Ok(SentPacket {
            packet_index: header.sender_packet_index,
            datagrams: vec![writer.to_bytes()],
        })
    }

    /// Builds a disconnect datagram and closes the sequencer
    pub fn send_disconnect(&mut self, now: &Instant) -> Result<Box<[u8]>, SequencerError> {
        self.check_open()?;
        let header = self.ack_manager.next_outgoing_packet_header(
            now,
            PacketType::Disconnect,
            &mut [],
        );
        let mut writer = BitWriter::with_max_bytes(self.config.max_datagram_bytes);
        header.ser(&mut writer);
        self.close();
        Ok(writer.to_bytes())
    }

    // Incoming

    fn parse_datagram(&self, bytes: &[u8]) -> Result<ParsedDatagram, SequencerError> {
        let mut reader = BitReader::new(bytes);
        let header = StandardHeader::de(&mut reader).map_err(|_| {
            if (bytes.len() as u32) * 8 < StandardHeader::max_bit_length() - 2 {
                SequencerError::DatagramTooShort {
                    length: bytes.len(),
                }
            } else {
                SequencerError::MalformedHeader {
                    reason: "invalid packet type",
                }
            }
        })?;

        if header.packet_type != PacketType::Data {
            return Ok(ParsedDatagram {
                header,
                fragment: None,
                body: Box::new([]),
            });
        }

        let malformed = |_| SequencerError::MalformedHeader {
            reason: "truncated fragment marker",
        };
        let fragment = if bool::de(&mut reader).map_err(malformed)? {
            let fragment_index = u8::de(&mut reader).map_err(malformed)?;
            let fragment_count = u8::de(&mut reader).map_err(malformed)?;
            Some((fragment_index, fragment_count))
        } else {
            None
        };

        let body_bytes = (reader.bits_remaining() / 8) as usize;
        let body = reader.read_bytes(body_bytes).map_err(malformed)?;

        Ok(ParsedDatagram {
            header,
            fragment,
            body,
        })
    }

    fn parse_body(
        &self,
        packet_index: PacketIndex,
        body: &[u8],
    ) -> Result<PacketBody, SequencerError> {
        let mut reader = BitReader::new(body);
        let body = PacketBody::de(&mut reader)
            .map_err(|_| SequencerError::MalformedBody { packet_index })?;
        for ReliableSection { offset, bytes } in &body.reliable {
            self.reliable_receiver.check_fragment(*offset, bytes.len())?;
        }
        Ok(body)
    }

    /// Processes one datagram from the remote host.
    ///
    /// Malformed, duplicate and stale datagrams are rejected with an error
    /// and leave the sequencer untouched.
    pub fn receive_datagram(
        &mut self,
        now: &Instant,
        bytes: &[u8],
    ) -> Result<Incoming, SequencerError> {
        self.check_open()?;

        let parsed = self.parse_datagram(bytes).map_err(|error| {
            warn!("dropping datagram: {}", error);
            error
        })?;
        let header = parsed.header;
        let packet_index = header.sender_packet_index;

        if header.packet_type == PacketType::Disconnect {
            info!("remote host disconnected");
            return Ok(Incoming::Disconnect);
        }

        match self.ack_manager.receipt_status(packet_index) {
            ReceiptStatus::New => {}
            ReceiptStatus::Duplicate => {
                self.assembler.discard(packet_index);
                return Err(SequencerError::DuplicatePacket { packet_index });
            }
            ReceiptStatus::Stale => {
                self.assembler.discard(packet_index);
                return Err(SequencerError::StalePacket { packet_index });
            }
        }

        let complete_body = match parsed.fragment {
            None if header.packet_type == PacketType::Data => {
                Some(self.parse_body(packet_index, &parsed.body)?)
            }
            None => None,
            Some((fragment_index, fragment_count)) => {
                self.assembler
                    .check_fragment(packet_index, fragment_index, fragment_count)?;
                None
            }
        };

        // The datagram is well formed from here on
        self.timeout_timer.reset(now);
        self.ack_manager.process_incoming_header(
            now,
            &header,
            &mut [&mut self.reliable_sender, &mut self.notifications],
        );

        let body = match (complete_body, parsed.fragment) {
            (Some(body), _) => body,
            (None, Some((fragment_index, fragment_count))) => {
                let Some(assembled) = self.assembler.try_receive(
                    packet_index,
                    fragment_index,
                    fragment_count,
                    parsed.body,
                )?
                else {
                    return Ok(Incoming::Partial(packet_index));
                };
                self.parse_body(packet_index, &assembled).map_err(|error| {
                    warn!("dropping packet {}: {}", packet_index, error);
                    error
                })?
            }
            (None, None) => {
                // heartbeat
                self.ack_manager.record_received(packet_index);
                return Ok(Incoming::Packet(packet_index));
            }
        };

        self.ack_manager.record_received(packet_index);

        for section in body.reliable {
            self.reliable_receiver
                .receive_fragment(section.offset, section.bytes);
        }
        if let Some(UnreliablePayload { baseline, payload }) = body.unreliable {
            self.unreliable.push_back(ReceivedUnreliable {
                packet_index,
                baseline,
                payload,
            });
        }

        trace!("received packet {}", packet_index);
        Ok(Incoming::Packet(packet_index))
    }

    /// Complete reliable frames, in the order the remote host sent them
    pub fn receive_messages(&mut self) -> Vec<Box<[u8]>> {
        self.reliable_receiver.take_frames()
    }

    /// Unreliable payloads in arrival order
    pub fn take_unreliable(&mut self) -> Vec<ReceivedUnreliable> {
        self.unreliable.drain(..).collect()
    }

    /// Delivered/dropped notifications for outgoing data packets, oldest first
    pub fn take_notifications(&mut self) -> Vec<PacketNotification> {
        self.notifications.queue.drain(..).collect()
    }
}
