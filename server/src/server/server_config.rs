use std::default::Default;

use metavoxel_shared::{ConnectionConfig, MAX_DEPTH};

/// Contains Config properties which will be used by the Server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Used to configure the connections with Clients
    pub connection: ConnectionConfig,
    /// Every this many state updates a Client gets the whole tree instead of
    /// a delta, whatever baseline it has advertised
    pub full_update_interval: u16,
    /// How many of the most recent state updates to a Client are kept as
    /// possible baselines. A Client advertising an older one gets the whole
    /// tree.
    pub send_record_window: u16,
    /// Edge length of the root cube of the authoritative tree
    pub root_size: f32,
    /// Deepest tree accepted in a Client edit
    pub max_depth: u8,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            full_update_interval: 64,
            send_record_window: 128,
            root_size: 16.0,
            max_depth: MAX_DEPTH,
        }
    }
}
