//! # Metavoxel Server
//! Holds the authoritative sparse voxel octree and keeps connected clients
//! in sync with it: differential state updates over the unreliable channel,
//! client edits merged and relayed over the reliable stream.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

mod connection;
mod error;
mod events;
mod server;

pub use connection::{ClientKey, Connection};
pub use error::ServerError;
pub use events::{ConnectEvent, DisconnectEvent, EditEvent, ErrorEvent, Event, Events};
pub use server::{MetavoxelServer, ServerConfig};
