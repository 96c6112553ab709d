use std::default::Default;

use metavoxel_shared::{ConnectionConfig, MAX_DEPTH};

/// Contains Config properties which will be used by a Client
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Used to configure the connection with the Server
    pub connection: ConnectionConfig,
    /// Edge length of the root cube of the local tree until the first state
    /// update from the Server replaces it
    pub root_size: f32,
    /// Deepest tree accepted in a state update. Deeper trees are rejected
    /// before they touch the local copy.
    pub max_depth: u8,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            root_size: 16.0,
            max_depth: MAX_DEPTH,
        }
    }
}
