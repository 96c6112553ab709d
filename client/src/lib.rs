//! # Metavoxel Client
//! Keeps a local copy of a server's sparse voxel octree in sync over an
//! unreliable datagram transport. Local edits apply at once and stream to
//! the server reliably; state updates arrive unreliably, each encoded
//! against a tree the client is known to hold.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

mod client;
mod client_config;
mod error;
mod events;
mod point_visitor;
mod receive_record;
mod system;

pub use client::MetavoxelClient;
pub use client_config::ClientConfig;
pub use error::ClientError;
pub use events::{
    AttachedEvent, ClientEvent, ClientEvents, DataReceivedEvent, EditAppliedEvent, ErrorEvent,
};
pub use point_visitor::{Point, PointVisitor};
pub use receive_record::{ReceiveRecordBuffer, ReceiveRecordError};
pub use system::{MetavoxelSystem, NodeId};
