use std::collections::HashMap;

use log::{info, warn};

use metavoxel_shared::{EditMessage, Instant, MetavoxelVisitor, PacketSender, Protocol};

use crate::{events::ClientEvents, ClientConfig, ClientError, MetavoxelClient};

/// Identifies the Server node a session talks to
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Every metavoxel session of one process, one per Server node
pub struct MetavoxelSystem {
    config: ClientConfig,
    protocol: Protocol,
    clients: HashMap<NodeId, MetavoxelClient>,
}

impl MetavoxelSystem {
    pub fn new<P: Into<Protocol>>(config: ClientConfig, protocol: P) -> Self {
        Self {
            config,
            protocol: protocol.into(),
            clients: HashMap::new(),
        }
    }

    /// Starts a session with `node`, whose datagrams go out through `sender`
    pub fn attach_client(
        &mut self,
        node: NodeId,
        sender: Box<dyn PacketSender>,
        now: &Instant,
    ) -> Result<(), ClientError> {
        if self.clients.contains_key(&node) {
            return Err(ClientError::SessionExists { node });
        }
        info!("attaching client to node {:?}", node);
        let client = MetavoxelClient::new(self.config.clone(), self.protocol.clone(), sender, now);
        self.clients.insert(node, client);
        Ok(())
    }

    /// Tears the session with `node` down and forgets it
    pub fn detach_client(&mut self, node: NodeId) -> Result<(), ClientError> {
        let mut client = self
            .clients
            .remove(&node)
            .ok_or(ClientError::NoSuchSession { node })?;
        if !client.is_closed() {
            client.close()?;
        }
        info!("detached client from node {:?}", node);
        Ok(())
    }

    pub fn client(&self, node: NodeId) -> Option<&MetavoxelClient> {
        self.clients.get(&node)
    }

    pub fn client_mut(&mut self, node: NodeId) -> Option<&mut MetavoxelClient> {
        self.clients.get_mut(&node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.clients.keys()
    }

    fn session(&mut self, node: NodeId) -> Result<&mut MetavoxelClient, ClientError> {
        self.clients
            .get_mut(&node)
            .ok_or(ClientError::NoSuchSession { node })
    }

    pub fn apply_edit(&mut self, node: NodeId, edit: EditMessage) -> Result<(), ClientError> {
        self.session(node)?.apply_edit(edit)
    }

    /// Applies `edit` to every open session. Sessions that reject it are
    /// skipped; the first rejection is returned once all have been tried.
    pub fn apply_edit_all(&mut self, edit: &EditMessage) -> Result<(), ClientError> {
        let mut first_error = None;
        for (node, client) in self.clients.iter_mut() {
            if client.is_closed() {
                continue;
            }
            if let Err(error) = client.apply_edit(edit.clone()) {
                warn!("node {:?} rejected edit: {}", node, error);
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    pub fn receive_packet(
        &mut self,
        node: NodeId,
        now: &Instant,
        bytes: &[u8],
    ) -> Result<(), ClientError> {
        self.session(node)?.receive_packet(now, bytes)
    }

    /// Ticks every open session, showing `visitor` each local view in turn
    pub fn simulate(&mut self, now: &Instant, visitor: &mut dyn MetavoxelVisitor) {
        for (node, client) in self.clients.iter_mut() {
            if client.is_closed() {
                continue;
            }
            if let Err(error) = client.simulate(now, visitor) {
                warn!("node {:?} failed to simulate: {}", node, error);
            }
        }
    }

    /// Drains the events of every session that has any
    pub fn take_events(&mut self) -> Vec<(NodeId, ClientEvents)> {
        let mut events: Vec<(NodeId, ClientEvents)> = self
            .clients
            .iter_mut()
            .map(|(node, client)| (*node, client.take_events()))
            .filter(|(_, events)| !events.is_empty())
            .collect();
        events.sort_by_key(|(node, _)| *node);
        events
    }
}
