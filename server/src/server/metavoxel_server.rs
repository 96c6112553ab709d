use std::collections::HashMap;

use log::{debug, info, trace, warn};

use metavoxel_shared::{
    ChannelMode, EditMessage, HostType, Incoming, Instant, MetavoxelData, MetavoxelError,
    MetavoxelMessage, PacketIndex, PacketSender, Protocol, SequencerError, SnapshotMessage,
    StateMessage, UnreliablePayload,
};

use crate::{
    connection::{ClientKey, Connection},
    events::Events,
    ServerConfig, ServerError,
};

/// Holds the authoritative tree and keeps every connected Client's copy of
/// it up to date.
///
/// Each state update is encoded against the last update the Client says it
/// has applied, so only what changed since then goes on the wire. Edits
/// from Clients arrive on the reliable stream, are merged in the order they
/// were sent and relayed to every other Client.
pub struct MetavoxelServer {
    config: ServerConfig,
    protocol: Protocol,
    data: MetavoxelData,
    connections: HashMap<ClientKey, Connection>,
    incoming_events: Events,
}

impl MetavoxelServer {
    /// Create a new MetavoxelServer
    pub fn new<P: Into<Protocol>>(config: ServerConfig, protocol: P) -> Self {
        let data = MetavoxelData::new(config.root_size);
        Self {
            config,
            protocol: protocol.into(),
            data,
            connections: HashMap::new(),
            incoming_events: Events::new(),
        }
    }

    /// The authoritative tree
    pub fn data(&self) -> &MetavoxelData {
        &self.data
    }

    pub fn client_keys(&self) -> impl Iterator<Item = &ClientKey> {
        self.connections.keys()
    }

    pub fn client_count(&self) -> usize {
        self.connections.len()
    }

    pub fn connection(&self, client_key: &ClientKey) -> Option<&Connection> {
        self.connections.get(client_key)
    }

    /// Returns every event since the last call and resets the buffer
    pub fn take_events(&mut self) -> Events {
        std::mem::take(&mut self.incoming_events)
    }

    // Connections

    /// Starts a session with a Client whose datagrams go out through `sender`
    pub fn connect(
        &mut self,
        client_key: ClientKey,
        sender: Box<dyn PacketSender>,
        now: &Instant,
    ) -> Result<(), ServerError> {
        if self.connections.contains_key(&client_key) {
            return Err(ServerError::ClientExists { client: client_key });
        }
        info!("client {:?} connected", client_key);
        let connection = Connection::new(client_key, &self.config.connection, sender, now);
        self.connections.insert(client_key, connection);
        self.incoming_events.push_connection(&client_key);
        Ok(())
    }

    /// Tells the Client the session is over and forgets it
    pub fn disconnect(&mut self, client_key: &ClientKey, now: &Instant) -> Result<(), ServerError> {
        let mut connection = self
            .connections
            .remove(client_key)
            .ok_or(ServerError::NoSuchClient { client: *client_key })?;
        if !connection.sequencer.is_closed() {
            connection.send_disconnect(now)?;
        }
        info!("client {:?} disconnected", client_key);
        self.incoming_events.push_disconnection(client_key);
        Ok(())
    }

    // Edits

    /// Applies an edit made on the Server itself and relays it to every
    /// Client. On error nothing has changed.
    pub fn apply_edit(&mut self, edit: EditMessage) -> Result<(), ServerError> {
        let edited = edit.apply(&self.data).map_err(MetavoxelError::from)?;
        self.relay_edit(None, &edit)?;
        self.data = edited;
        Ok(())
    }

    fn relay_edit(&mut self, origin: Option<&ClientKey>, edit: &EditMessage) -> Result<(), ServerError> {
        let bytes = self.protocol.encode(
            HostType::Server,
            ChannelMode::Reliable,
            &MetavoxelMessage::Edit(edit.clone()),
        )?;
        for (client_key, connection) in self.connections.iter_mut() {
            if Some(client_key) == origin || connection.sequencer.is_closed() {
                continue;
            }
            connection.sequencer.send_reliable(&bytes)?;
        }
        Ok(())
    }

    // Incoming

    /// Processes one datagram from a Client. A datagram the sequencer
    /// rejects is returned as an error and changes nothing; faults in the
    /// messages it carries are logged and reported as events.
    pub fn receive_packet(
        &mut self,
        client_key: &ClientKey,
        now: &Instant,
        bytes: &[u8],
    ) -> Result<(), ServerError> {
        let connection = self
            .connections
            .get_mut(client_key)
            .ok_or(ServerError::NoSuchClient { client: *client_key })?;

        if connection.sequencer.receive_datagram(now, bytes)? == Incoming::Disconnect {
            self.connections.remove(client_key);
            info!("client {:?} closed the session", client_key);
            self.incoming_events.push_disconnection(client_key);
            return Ok(());
        }
        let frames = connection.sequencer.receive_messages();
        let unreliable = connection.sequencer.take_unreliable();

        for received in unreliable {
            match self
                .protocol
                .decode(HostType::Client, ChannelMode::Unreliable, &received.payload)
            {
                Ok(MetavoxelMessage::ClientState(state)) => connection.update_applied(state.applied),
                Ok(message) => trace!("ignoring unreliable {:?} message", message.kind()),
                Err(error) => {
                    warn!("dropping message from client {:?}: {}", client_key, error);
                    self.incoming_events.push_error(client_key, error.into());
                }
            }
        }

        for frame in frames {
            self.receive_frame(client_key, &frame);
        }
        Ok(())
    }

    fn receive_frame(&mut self, client_key: &ClientKey, frame: &[u8]) {
        let edit = match self
            .protocol
            .decode(HostType::Client, ChannelMode::Reliable, frame)
        {
            Ok(MetavoxelMessage::Edit(edit)) => edit,
            Ok(message) => {
                trace!("ignoring reliable {:?} message", message.kind());
                return;
            }
            Err(error) => {
                warn!("dropping edit from client {:?}: {}", client_key, error);
                self.incoming_events.push_error(client_key, error.into());
                return;
            }
        };

        let edited = match edit.apply(&self.data) {
            Ok(edited) => edited,
            Err(error) => {
                warn!("rejected edit from client {:?}: {}", client_key, error);
                self.incoming_events
                    .push_error(client_key, MetavoxelError::from(error).into());
                return;
            }
        };
        debug!("merged edit from client {:?}", client_key);
        self.data = edited;
        if let Err(error) = self.relay_edit(Some(client_key), &edit) {
            warn!("failed to relay edit: {}", error);
            self.incoming_events.push_error(client_key, error);
        }
        self.incoming_events.push_edit(client_key, edit);
    }

    // Outgoing

    /// Sends every Client one packet carrying the current tree, encoded
    /// against the Client's applied state where possible, along with any
    /// relayed edits. Clients that have gone quiet past the timeout are
    /// dropped.
    pub fn send_updates(&mut self, now: &Instant) {
        let timed_out: Vec<ClientKey> = self
            .connections
            .values()
            .filter(|connection| connection.sequencer.timed_out(now))
            .map(|connection| connection.client_key)
            .collect();
        for client_key in timed_out {
            warn!("client {:?} timed out", client_key);
            self.connections.remove(&client_key);
            self.incoming_events.push_disconnection(&client_key);
        }

        let mut failures = Vec::new();
        for (client_key, connection) in self.connections.iter_mut() {
            if let Err(error) = Self::send_update(
                &self.config,
                &self.protocol,
                &self.data,
                connection,
                now,
            ) {
                warn!("failed to update client {:?}: {}", client_key, error);
                failures.push((*client_key, error));
            }
        }
        for (client_key, error) in failures {
            self.incoming_events.push_error(&client_key, error);
        }
    }

    fn send_update(
        config: &ServerConfig,
        protocol: &Protocol,
        data: &MetavoxelData,
        connection: &mut Connection,
        now: &Instant,
    ) -> Result<(), ServerError> {
        if let Some(snapshot) = connection.pending_snapshot() {
            // keep the snapshot's bytes moving until the Client applies it
            let packet = connection.sequencer.send_packet(now, None)?;
            trace!(
                "packet {} to client {:?} while snapshot {} is pending",
                packet.packet_index,
                connection.client_key,
                snapshot
            );
            connection.send(&packet)?;
            return Ok(());
        }

        let full_due = connection.full_update_due(config.full_update_interval);
        let payload = Self::encode_state(
            protocol,
            data,
            connection.baseline(config.full_update_interval),
        )?;
        if Self::try_send_state(config, data, connection, now, payload)? {
            return Ok(());
        }

        // a refresh that does not fit waits; a delta against the applied
        // state may still do
        if full_due && connection.applied_record().is_some() {
            let payload = Self::encode_state(protocol, data, connection.applied_record())?;
            if Self::try_send_state(config, data, connection, now, payload)? {
                connection.defer_full_update();
                return Ok(());
            }
        }

        Self::send_snapshot(config, protocol, data, connection, now)
    }

    fn encode_state(
        protocol: &Protocol,
        data: &MetavoxelData,
        baseline: Option<(PacketIndex, &MetavoxelData)>,
    ) -> Result<UnreliablePayload, ServerError> {
        let delta = data.to_delta_bytes(baseline.map(|(_, reference)| reference));
        let payload = protocol.encode(
            HostType::Server,
            ChannelMode::Unreliable,
            &MetavoxelMessage::State(StateMessage { delta }),
        )?;
        Ok(UnreliablePayload {
            baseline: baseline.map(|(index, _)| index),
            payload,
        })
    }

    /// Sends one state packet. Returns false, with nothing sent, when the
    /// packet would need more datagrams than a packet may span.
    fn try_send_state(
        config: &ServerConfig,
        data: &MetavoxelData,
        connection: &mut Connection,
        now: &Instant,
        payload: UnreliablePayload,
    ) -> Result<bool, ServerError> {
        let baseline = payload.baseline;
        let packet = match connection.sequencer.send_packet(now, Some(payload)) {
            Ok(packet) => packet,
            Err(SequencerError::PacketTooLarge { bytes, max }) => {
                debug!(
                    "state for client {:?} against {:?} needs {} bytes, more than {} datagrams",
                    connection.client_key, baseline, bytes, max
                );
                return Ok(false);
            }
            Err(error) => return Err(error.into()),
        };
        trace!(
            "state packet {} to client {:?} against {:?}",
            packet.packet_index,
            connection.client_key,
            baseline
        );
        connection.record_sent(
            packet.packet_index,
            data.clone(),
            baseline.is_none(),
            config.send_record_window,
        );
        connection.send(&packet)?;
        Ok(true)
    }

    /// Queues the whole tree on the reliable stream, tagged with the index
    /// of the packet that starts carrying it. No state packets go to the
    /// Client until it reports applying the snapshot.
    fn send_snapshot(
        config: &ServerConfig,
        protocol: &Protocol,
        data: &MetavoxelData,
        connection: &mut Connection,
        now: &Instant,
    ) -> Result<(), ServerError> {
        let packet_index = connection.sequencer.next_packet_index();
        let bytes = protocol.encode(
            HostType::Server,
            ChannelMode::Reliable,
            &MetavoxelMessage::Snapshot(SnapshotMessage {
                packet_index,
                data: data.to_delta_bytes(None),
            }),
        )?;
        connection.sequencer.send_reliable(&bytes)?;
        let packet = connection.sequencer.send_packet(now, None)?;
        debug!(
            "snapshot of {} bytes to client {:?} in packet {}",
            bytes.len(),
            connection.client_key,
            packet.packet_index
        );
        connection.record_snapshot(packet.packet_index, data.clone(), config.send_record_window);
        connection.send(&packet)?;
        Ok(())
    }
}
