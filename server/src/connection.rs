use log::{debug, trace, warn};

use metavoxel_shared::{
    sequence_greater_than, sequence_less_than, ConnectionConfig, DatagramSequencer, Instant, MetavoxelData,
    PacketIndex, PacketSender, SendError, SentPacket, SequenceList, SequencerError,
};

/// Identifies one connected Client
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, PartialOrd, Ord)]
pub struct ClientKey(pub u64);

/// Everything the Server tracks about one Client
pub struct Connection {
    pub client_key: ClientKey,
    pub sequencer: DatagramSequencer,
    sender: Box<dyn PacketSender>,
    /// Newest state update the Client reports having applied
    applied: Option<PacketIndex>,
    /// Tree as sent in each recent state update, by packet index
    send_records: SequenceList<MetavoxelData>,
    updates_since_full: u16,
    /// Snapshot still streaming on the reliable channel, by the packet
    /// index it was recorded under
    snapshot: Option<PacketIndex>,
}

impl Connection {
    pub fn new(
        client_key: ClientKey,
        connection_config: &ConnectionConfig,
        sender: Box<dyn PacketSender>,
        now: &Instant,
    ) -> Self {
        Self {
            client_key,
            sequencer: DatagramSequencer::new(connection_config, now),
            sender,
            applied: None,
            send_records: SequenceList::new(),
            updates_since_full: 0,
            snapshot: None,
        }
    }

    pub fn applied(&self) -> Option<PacketIndex> {
        self.applied
    }

    pub fn send_record_count(&self) -> usize {
        self.send_records.len()
    }

    /// The snapshot the Client has not yet reported applying, if any
    pub fn pending_snapshot(&self) -> Option<PacketIndex> {
        self.snapshot
    }

    /// Takes note of the Client's newest applied state. Reports that arrive
    /// out of order are ignored. Records older than the applied state can no
    /// longer be chosen as a baseline and are dropped.
    pub fn update_applied(&mut self, applied: Option<PacketIndex>) {
        let Some(applied) = applied else {
            return;
        };
        if let Some(current) = self.applied {
            if !sequence_greater_than(applied, current) {
                return;
            }
        }
        trace!("client {:?} applied state {}", self.client_key, applied);
        self.applied = Some(applied);
        self.send_records.prune_before(&applied);
        if let Some(snapshot) = self.snapshot {
            if !sequence_less_than(applied, snapshot) {
                debug!("client {:?} applied snapshot {}", self.client_key, snapshot);
                self.snapshot = None;
            }
        }
    }

    /// The baseline for the next state update: the record of the Client's
    /// applied state, unless a full refresh is due or that record is gone.
    pub fn baseline(&self, full_update_interval: u16) -> Option<(PacketIndex, &MetavoxelData)> {
        if self.full_update_due(full_update_interval) {
            return None;
        }
        self.applied_record()
    }

    pub fn full_update_due(&self, full_update_interval: u16) -> bool {
        self.updates_since_full >= full_update_interval
    }

    /// The record of the Client's applied state, whether or not a full
    /// refresh is due
    pub fn applied_record(&self) -> Option<(PacketIndex, &MetavoxelData)> {
        let applied = self.applied?;
        self.send_records
            .get_scan_from_back(&applied)
            .map(|record| (applied, record))
    }

    /// Puts off a full refresh that did not fit in a packet
    pub fn defer_full_update(&mut self) {
        self.updates_since_full = 0;
    }

    /// Remembers a snapshot queued on the reliable stream in `packet_index`.
    /// Its record is kept until the Client reports applying it.
    pub fn record_snapshot(
        &mut self,
        packet_index: PacketIndex,
        data: MetavoxelData,
        send_record_window: u16,
    ) {
        self.snapshot = Some(packet_index);
        self.record_sent(packet_index, data, true, send_record_window);
    }

    /// Remembers what went out in `packet_index`
    pub fn record_sent(
        &mut self,
        packet_index: PacketIndex,
        data: MetavoxelData,
        full: bool,
        send_record_window: u16,
    ) {
        if full {
            self.updates_since_full = 0;
        } else {
            self.updates_since_full = self.updates_since_full.saturating_add(1);
        }
        if self
            .send_records
            .try_insert_scan_from_back(packet_index, data)
            .is_err()
        {
            warn!("state for packet {} recorded twice", packet_index);
        }
        let mut horizon = packet_index.wrapping_sub(send_record_window);
        if let Some(snapshot) = self.snapshot {
            if sequence_less_than(snapshot, horizon) {
                horizon = snapshot;
            }
        }
        self.send_records.prune_before(&horizon);
    }

    /// Hands every datagram of `packet` to the transport
    pub fn send(&self, packet: &SentPacket) -> Result<(), SendError> {
        for datagram in &packet.datagrams {
            self.sender.send(datagram)?;
        }
        Ok(())
    }

    /// Builds the disconnect datagram, sends it and closes the sequencer
    pub fn send_disconnect(&mut self, now: &Instant) -> Result<(), SequencerError> {
        let datagram = self.sequencer.send_disconnect(now)?;
        if let Err(error) = self.sender.send(&datagram) {
            warn!(
                "failed to send disconnect to client {:?}: {}",
                self.client_key, error
            );
        }
        Ok(())
    }
}
