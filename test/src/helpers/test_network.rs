use log::debug;

use metavoxel_client::{ClientConfig, MetavoxelClient};
use metavoxel_server::{ClientKey, MetavoxelServer, ServerConfig};
use metavoxel_shared::{
    AttributeValue, EditMessage, Instant, MetavoxelInfo, PacketReceiver, Protocol, Region,
    RegionEdit, VisitAction,
};

use crate::local_socket::{LinkConditioner, LinkHandle, LocalSocketPair};

/// Simulated time between two ticks of a [`TestNetwork`]
pub const TICK_MILLIS: u32 = 50;

/// A `SetRegion` edit painting the box from `minimum` to `maximum`
pub fn region_edit(minimum: [f32; 3], maximum: [f32; 3], value: u32) -> EditMessage {
    EditMessage::SetRegion(RegionEdit::new(
        Region::new(minimum, maximum),
        1.0,
        AttributeValue::new(value),
    ))
}

/// One client session wired to the server through a [`LocalSocketPair`]
pub struct TestClient {
    pub key: ClientKey,
    pub client: MetavoxelClient,
    receiver: Box<dyn PacketReceiver>,
    server_receiver: Box<dyn PacketReceiver>,
    /// Server to client direction
    pub to_client: LinkHandle,
    /// Client to server direction
    pub to_server: LinkHandle,
}

/// A server and its clients, driven together on simulated time
pub struct TestNetwork {
    pub server: MetavoxelServer,
    pub clients: Vec<TestClient>,
    pub now: Instant,
    client_config: ClientConfig,
    protocol: Protocol,
    next_key: u64,
}

impl TestNetwork {
    pub fn new() -> Self {
        Self::with_configs(ServerConfig::default(), ClientConfig::default())
    }

    pub fn with_configs(server_config: ServerConfig, client_config: ClientConfig) -> Self {
        let protocol = Protocol::builder().build();
        Self {
            server: MetavoxelServer::new(server_config, protocol.clone()),
            clients: Vec::new(),
            now: Instant::now(),
            client_config,
            protocol,
            next_key: 0,
        }
    }

    /// Connects a client over perfect links, returning its position in
    /// `clients`
    pub fn add_client(&mut self) -> usize {
        self.add_client_with(LinkConditioner::perfect(), LinkConditioner::perfect())
    }

    pub fn add_client_with(
        &mut self,
        to_client: LinkConditioner,
        to_server: LinkConditioner,
    ) -> usize {
        let pair = LocalSocketPair::with_conditioners(to_client, to_server);
        let key = ClientKey(self.next_key);
        self.next_key += 1;

        self.server
            .connect(key, pair.server_sender, &self.now)
            .unwrap_or_else(|error| panic!("connecting {:?}: {}", key, error));
        let client = MetavoxelClient::new(
            self.client_config.clone(),
            self.protocol.clone(),
            pair.client_sender,
            &self.now,
        );

        self.clients.push(TestClient {
            key,
            client,
            receiver: pair.client_receiver,
            server_receiver: pair.server_receiver,
            to_client: pair.to_client,
            to_server: pair.to_server,
        });
        self.clients.len() - 1
    }

    pub fn client(&self, index: usize) -> &MetavoxelClient {
        &self.clients[index].client
    }

    pub fn client_mut(&mut self, index: usize) -> &mut MetavoxelClient {
        &mut self.clients[index].client
    }

    pub fn advance(&mut self, millis: u32) {
        self.now.add_millis(millis);
    }

    /// Every client sends its packet for this tick
    pub fn simulate_clients(&mut self) {
        let mut ignore = |_: &MetavoxelInfo| VisitAction::Prune;
        for test_client in &mut self.clients {
            if test_client.client.is_closed() {
                continue;
            }
            if let Err(error) = test_client.client.simulate(&self.now, &mut ignore) {
                debug!("client {:?} simulate: {}", test_client.key, error);
            }
        }
    }

    /// Hands the server everything waiting on the client to server links
    pub fn deliver_to_server(&mut self) {
        for test_client in &mut self.clients {
            while let Ok(Some(payload)) = test_client.server_receiver.receive() {
                if let Err(error) = self
                    .server
                    .receive_packet(&test_client.key, &self.now, payload)
                {
                    debug!("server dropped datagram: {}", error);
                }
            }
        }
    }

    /// Hands each client everything waiting on its server to client link
    pub fn deliver_to_clients(&mut self) {
        for test_client in &mut self.clients {
            while let Ok(Some(payload)) = test_client.receiver.receive() {
                if let Err(error) = test_client.client.receive_packet(&self.now, payload) {
                    debug!("client {:?} dropped datagram: {}", test_client.key, error);
                }
            }
        }
    }

    /// One round: clients send, the server takes their packets and answers,
    /// clients take the answers, then time moves on
    pub fn tick(&mut self) {
        self.simulate_clients();
        self.deliver_to_server();
        self.server.send_updates(&self.now);
        self.deliver_to_clients();
        self.advance(TICK_MILLIS);
    }

    pub fn tick_n(&mut self, count: usize) {
        for _ in 0..count {
            self.tick();
        }
    }

    /// Whether every open client's local view matches the server's tree
    pub fn converged(&self) -> bool {
        self.clients
            .iter()
            .filter(|test_client| !test_client.client.is_closed())
            .all(|test_client| test_client.client.data().same_content(self.server.data()))
    }
}

impl Default for TestNetwork {
    fn default() -> Self {
        Self::new()
    }
}
