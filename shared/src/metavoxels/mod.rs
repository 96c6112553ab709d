pub mod attribute;
pub mod codec;
pub mod cube;
pub mod data;
pub mod diff;
pub mod edit;
pub mod error;
pub mod node;
pub mod visitor;

/// Deepest level a node may sit at below the root.
pub const MAX_DEPTH: u8 = 16;
