use std::collections::VecDeque;

use log::{debug, info, trace, warn};

use metavoxel_shared::{
    sequence_greater_than, sequence_less_than, ChannelMode, ClientStateMessage, DatagramSequencer,
    EditMessage, HostType, Incoming, Instant, MetavoxelData, MetavoxelError, MetavoxelMessage,
    MetavoxelVisitor, PacketIndex, PacketNotification, PacketSender, Protocol, ReceivedUnreliable,
    SequenceList, StreamOffset, UnreliablePayload,
};

use crate::{
    events::ClientEvents, receive_record::ReceiveRecordBuffer, ClientConfig, ClientError,
};

/// A local edit the Server may not have merged yet
struct PendingEdit {
    edit: EditMessage,
    /// Offset just past the edit on the outgoing reliable stream
    end_offset: StreamOffset,
    /// First server packet sent after the Server held the edit
    confirmed_after: Option<PacketIndex>,
}

/// One session with a Server: keeps a local copy of the Server's tree up to
/// date from state updates, and applies local edits to it immediately while
/// streaming them to the Server.
///
/// The local copy is the last state decoded from the Server with every
/// local edit the Server has not yet reflected applied on top, so an edit
/// never disappears while the update carrying it is still in flight.
pub struct MetavoxelClient {
    config: ClientConfig,
    protocol: Protocol,
    sender: Box<dyn PacketSender>,
    sequencer: DatagramSequencer,
    closed: bool,
    // Tree
    data: MetavoxelData,
    confirmed: MetavoxelData,
    records: ReceiveRecordBuffer,
    last_applied: Option<PacketIndex>,
    pending_edits: VecDeque<PendingEdit>,
    // Outgoing packet index -> applied index it advertised
    advertised: SequenceList<Option<PacketIndex>>,
    // Events
    events: ClientEvents,
}

impl MetavoxelClient {
    /// Create a new session. `sender` carries datagrams to the Server.
    pub fn new<P: Into<Protocol>>(
        config: ClientConfig,
        protocol: P,
        sender: Box<dyn PacketSender>,
        now: &Instant,
    ) -> Self {
        let sequencer = DatagramSequencer::new(&config.connection, now);
        let data = MetavoxelData::new(config.root_size);
        let mut events = ClientEvents::new();
        events.push_attached();
        info!("metavoxel session attached");

        Self {
            config,
            protocol: protocol.into(),
            sender,
            sequencer,
            closed: false,
            confirmed: data.clone(),
            data,
            records: ReceiveRecordBuffer::new(),
            last_applied: None,
            pending_edits: VecDeque::new(),
            advertised: SequenceList::new(),
            events,
        }
    }

    // Accessors

    /// The local view: Server state plus unconfirmed local edits
    pub fn data(&self) -> &MetavoxelData {
        &self.data
    }

    /// The last state decoded from the Server
    pub fn confirmed(&self) -> &MetavoxelData {
        &self.confirmed
    }

    /// Index of the newest server packet whose state has been applied
    pub fn last_applied(&self) -> Option<PacketIndex> {
        self.last_applied
    }

    pub fn pending_edit_count(&self) -> usize {
        self.pending_edits.len()
    }

    pub fn receive_records(&self) -> &ReceiveRecordBuffer {
        &self.records
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn rtt_millis(&self) -> f32 {
        self.sequencer.rtt_millis()
    }

    /// Drains everything that happened since the last call
    pub fn take_events(&mut self) -> ClientEvents {
        std::mem::take(&mut self.events)
    }

    fn check_open(&self) -> Result<(), ClientError> {
        if self.closed {
            return Err(ClientError::SessionClosed);
        }
        Ok(())
    }

    // Local edits

    /// Applies `edit` to the local view right away and queues it for the
    /// Server. On error nothing has changed.
    pub fn apply_edit(&mut self, edit: EditMessage) -> Result<(), ClientError> {
        self.check_open()?;

        let edited = edit.apply(&self.data).map_err(MetavoxelError::from)?;
        let bytes = self.protocol.encode(
            HostType::Client,
            ChannelMode::Reliable,
            &MetavoxelMessage::Edit(edit.clone()),
        )?;
        let end_offset = self.sequencer.send_reliable(&bytes)?;

        debug!("applied local edit, stream offset {}", end_offset);
        self.data = edited;
        self.pending_edits.push_back(PendingEdit {
            edit: edit.clone(),
            end_offset,
            confirmed_after: None,
        });
        self.events.push_edit_applied(edit);
        Ok(())
    }

    // Tick

    /// Sends one packet advertising the newest applied state along with any
    /// queued or due edit bytes, then shows `visitor` the local view.
    pub fn simulate(
        &mut self,
        now: &Instant,
        visitor: &mut dyn MetavoxelVisitor,
    ) -> Result<(), ClientError> {
        self.check_open()?;
        self.process_notifications();

        if self.sequencer.timed_out(now) {
            warn!("server timed out, closing session");
            self.events.push_error(ClientError::TimedOut);
            self.teardown();
        } else {
            self.send_state(now)?;
        }

        self.data.guide(visitor);
        Ok(())
    }

    fn send_state(&mut self, now: &Instant) -> Result<(), ClientError> {
        let applied = self.last_applied;
        let payload = self.protocol.encode(
            HostType::Client,
            ChannelMode::Unreliable,
            &MetavoxelMessage::ClientState(ClientStateMessage { applied }),
        )?;
        let packet = self.sequencer.send_packet(
            now,
            Some(UnreliablePayload {
                baseline: None,
                payload,
            }),
        )?;

        if self
            .advertised
            .try_insert_scan_from_back(packet.packet_index, applied)
            .is_err()
        {
            warn!("packet index {} sent twice", packet.packet_index);
        }

        for datagram in &packet.datagrams {
            if let Err(error) = self.sender.send(datagram) {
                warn!("failed to send packet {}: {}", packet.packet_index, error);
                self.events.push_error(error.into());
                break;
            }
        }
        Ok(())
    }

    fn process_notifications(&mut self) {
        for notification in self.sequencer.take_notifications() {
            match notification {
                PacketNotification::Delivered(packet_index) => {
                    let Some(advertised) = self.advertised.remove_scan_from_front(&packet_index)
                    else {
                        continue;
                    };
                    // The Server now knows this state was applied and never
                    // picks an older baseline again
                    if let Some(applied) = advertised {
                        self.records.prune_before(applied);
                    }
                }
                PacketNotification::Dropped(packet_index) => {
                    self.advertised.remove_scan_from_front(&packet_index);
                }
            }
        }
    }

    // Incoming

    /// Processes one datagram from the Server. A datagram the sequencer
    /// rejects is returned as an error and changes nothing; faults in the
    /// messages it carries are logged and reported as events.
    pub fn receive_packet(&mut self, now: &Instant, bytes: &[u8]) -> Result<(), ClientError> {
        self.check_open()?;

        let packet_index = match self.sequencer.receive_datagram(now, bytes)? {
            Incoming::Disconnect => {
                info!("server closed the session");
                self.teardown();
                return Ok(());
            }
            Incoming::Packet(packet_index) | Incoming::Partial(packet_index) => packet_index,
        };

        self.confirm_pending_edits(packet_index);
        self.process_notifications();

        for frame in self.sequencer.receive_messages() {
            self.receive_frame(&frame);
        }
        for unreliable in self.sequencer.take_unreliable() {
            self.receive_unreliable(unreliable);
        }
        Ok(())
    }

    /// Every pending edit whose bytes the Server has now acknowledged is
    /// reflected in every state it sends from `packet_index` on
    fn confirm_pending_edits(&mut self, packet_index: PacketIndex) {
        let acked_offset = self.sequencer.acked_stream_offset();
        for pending in self.pending_edits.iter_mut() {
            if pending.end_offset > acked_offset {
                break;
            }
            if pending.confirmed_after.is_none() {
                pending.confirmed_after = Some(packet_index);
            }
        }
        if let Some(last_applied) = self.last_applied {
            self.drop_confirmed_edits(last_applied);
        }
    }

    fn drop_confirmed_edits(&mut self, applied: PacketIndex) {
        while let Some(pending) = self.pending_edits.front() {
            match pending.confirmed_after {
                Some(confirmed_after) if !sequence_less_than(applied, confirmed_after) => {
                    trace!("edit at offset {} confirmed", pending.end_offset);
                    self.pending_edits.pop_front();
                }
                _ => break,
            }
        }
    }

    fn receive_frame(&mut self, frame: &[u8]) {
        let message = match self
            .protocol
            .decode(HostType::Server, ChannelMode::Reliable, frame)
        {
            Ok(message) => message,
            Err(error) => {
                warn!("dropping reliable message: {}", error);
                self.events.push_error(error.into());
                return;
            }
        };
        let edit = match message {
            MetavoxelMessage::Edit(edit) => edit,
            MetavoxelMessage::Snapshot(snapshot) => {
                debug!(
                    "snapshot of packet {} ({} bytes)",
                    snapshot.packet_index,
                    snapshot.data.len()
                );
                if let Err(error) = self.apply_state(snapshot.packet_index, None, &snapshot.data) {
                    self.events.push_error(error);
                }
                return;
            }
            _ => return,
        };

        match edit.apply(&self.data) {
            Ok(edited) => {
                debug!("applied relayed edit");
                self.data = edited;
            }
            Err(error) => {
                warn!("rejected relayed edit: {}", error);
                self.events
                    .push_error(MetavoxelError::from(error).into());
            }
        }
    }

    fn receive_unreliable(&mut self, unreliable: ReceivedUnreliable) {
        let ReceivedUnreliable {
            packet_index,
            baseline,
            payload,
        } = unreliable;

        let message = match self
            .protocol
            .decode(HostType::Server, ChannelMode::Unreliable, &payload)
        {
            Ok(message) => message,
            Err(error) => {
                warn!("dropping state of packet {}: {}", packet_index, error);
                self.events.push_error(error.into());
                return;
            }
        };
        let MetavoxelMessage::State(state) = message else {
            return;
        };

        if let Err(error) = self.apply_state(packet_index, baseline, &state.delta) {
            self.events.push_error(error);
        }
    }

    fn apply_state(
        &mut self,
        packet_index: PacketIndex,
        baseline: Option<PacketIndex>,
        delta: &[u8],
    ) -> Result<(), ClientError> {
        if let Some(last_applied) = self.last_applied {
            if !sequence_greater_than(packet_index, last_applied) {
                debug!(
                    "discarding stale state {} (applied {})",
                    packet_index, last_applied
                );
                return Ok(());
            }
        }

        let reference = match baseline {
            None => None,
            Some(baseline) => Some(self.records.find(baseline).map_err(|error| {
                warn!(
                    "no baseline {} for state of packet {}: {}",
                    baseline, packet_index, error
                );
                error
            })?),
        };
        let max_depth = self.config.max_depth.min(self.protocol.max_depth);
        let decoded = MetavoxelData::from_delta_bytes(reference, delta, max_depth).map_err(
            |error| {
                warn!("rejected state of packet {}: {}", packet_index, error);
                error
            },
        )?;

        self.records.record(packet_index, decoded.clone())?;
        self.last_applied = Some(packet_index);
        self.confirmed = decoded;
        self.drop_confirmed_edits(packet_index);
        self.rebuild_data();

        trace!("applied state of packet {}", packet_index);
        self.events.push_data_received(packet_index);
        Ok(())
    }

    fn rebuild_data(&mut self) {
        let mut data = self.confirmed.clone();
        for pending in &self.pending_edits {
            match pending.edit.apply(&data) {
                Ok(edited) => data = edited,
                Err(error) => warn!("could not reapply local edit: {}", error),
            }
        }
        self.data = data;
    }

    // Teardown

    /// Tears the session down without telling the Server, which notices
    /// through its timeout. Every later call fails with `SessionClosed`.
    pub fn close(&mut self) -> Result<(), ClientError> {
        self.check_open()?;
        self.teardown();
        Ok(())
    }

    /// Tells the Server the session is over, then tears it down
    pub fn disconnect(&mut self, now: &Instant) -> Result<(), ClientError> {
        self.check_open()?;
        let datagram = self.sequencer.send_disconnect(now)?;
        if let Err(error) = self.sender.send(&datagram) {
            warn!("failed to send disconnect: {}", error);
        }
        self.teardown();
        Ok(())
    }

    fn teardown(&mut self) {
        if self.closed {
            return;
        }
        info!("metavoxel session closed");
        self.closed = true;
        self.sequencer.close();
        self.records.clear();
        self.pending_edits.clear();
        self.advertised.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use metavoxel_shared::{
        AttributeValue, EditMessage, Instant, MetavoxelInfo, PacketSender, Protocol, Region,
        RegionEdit, SendError, VisitAction,
    };

    use super::MetavoxelClient;
    use crate::{
        events::{AttachedEvent, EditAppliedEvent},
        ClientConfig, ClientError,
    };

    #[derive(Clone, Default)]
    struct Outbox(Arc<Mutex<Vec<Box<[u8]>>>>);

    impl PacketSender for Outbox {
        fn send(&self, payload: &[u8]) -> Result<(), SendError> {
            self.0.lock().unwrap().push(payload.into());
            Ok(())
        }
    }

    fn client() -> (MetavoxelClient, Outbox) {
        let outbox = Outbox::default();
        let client = MetavoxelClient::new(
            ClientConfig::default(),
            Protocol::default(),
            Box::new(outbox.clone()),
            &Instant::now(),
        );
        (client, outbox)
    }

    fn fill(value: u32) -> EditMessage {
        EditMessage::SetRegion(RegionEdit::new(
            Region::new([0.0; 3], [8.0; 3]),
            1.0,
            AttributeValue::new(value),
        ))
    }

    fn ignore(_: &MetavoxelInfo) -> VisitAction {
        VisitAction::Descend
    }

    #[test]
    fn local_edit_is_visible_at_once() {
        let (mut client, outbox) = client();
        client.apply_edit(fill(4)).unwrap();

        assert_eq!(client.data().value_at([1.0; 3]), AttributeValue::new(4));
        assert_eq!(client.confirmed().value_at([1.0; 3]), AttributeValue::EMPTY);
        assert_eq!(client.pending_edit_count(), 1);
        // nothing goes out until the next tick
        assert!(outbox.0.lock().unwrap().is_empty());

        let mut events = client.take_events();
        assert!(events.has::<AttachedEvent>());
        assert_eq!(events.read::<EditAppliedEvent>().count(), 1);
    }

    #[test]
    fn simulate_sends_and_visits() {
        let (mut client, outbox) = client();
        client.apply_edit(fill(4)).unwrap();

        let mut leaves = 0;
        let mut count = |info: &MetavoxelInfo| {
            if info.is_leaf {
                leaves += 1;
            }
            VisitAction::Descend
        };
        client.simulate(&Instant::now(), &mut count).unwrap();

        assert!(leaves > 0);
        assert_eq!(outbox.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn invalid_edit_changes_nothing() {
        let (mut client, _) = client();
        let before = client.data().clone();
        let invalid = EditMessage::SetRegion(RegionEdit::new(
            Region::new([0.0; 3], [1.0; 3]),
            0.0,
            AttributeValue::new(1),
        ));

        assert!(matches!(
            client.apply_edit(invalid),
            Err(ClientError::Metavoxel(_))
        ));
        assert!(client.data().ptr_eq(&before));
        assert_eq!(client.pending_edit_count(), 0);
    }

    #[test]
    fn closed_session_refuses_everything() {
        let (mut client, _) = client();
        client.close().unwrap();

        assert_eq!(client.close(), Err(ClientError::SessionClosed));
        assert_eq!(client.apply_edit(fill(1)), Err(ClientError::SessionClosed));
        assert_eq!(
            client.simulate(&Instant::now(), &mut ignore),
            Err(ClientError::SessionClosed)
        );
        assert_eq!(
            client.receive_packet(&Instant::now(), &[0; 16]),
            Err(ClientError::SessionClosed)
        );
    }

    #[test]
    fn starts_empty_at_configured_size() {
        let (client, _) = client();
        assert_eq!(client.data().size(), 16.0);
        assert!(client.last_applied().is_none());
        assert!(client.receive_records().is_empty());
    }
}
