use metavoxel_serde::SerdeErr;
use thiserror::Error;

/// A tree shape or edit that cannot be applied. Detected before anything is
/// merged, so the tree it was aimed at is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    /// An internal node must have at least one present child
    #[error("Internal node at depth {depth} has no children")]
    EmptyInternalNode { depth: u8 },

    /// A node lies deeper than the configured limit
    #[error("Node at depth {depth} exceeds the maximum depth of {max_depth}")]
    DepthExceeded { depth: u8, max_depth: u8 },

    /// A replacement tried to remove the root
    #[error("Cannot replace the root node with nothing")]
    RootRemoved,

    /// A replacement path is longer than the maximum depth
    #[error("Replacement path of length {length} exceeds the maximum depth of {max_depth}")]
    PathTooDeep { length: usize, max_depth: u8 },

    /// A path step is not an octant index (0-7)
    #[error("Invalid octant {octant} in replacement path")]
    InvalidOctant { octant: u8 },

    /// Region edits need a positive, finite granularity
    #[error("Region edit granularity must be positive and finite")]
    InvalidGranularity,

    /// Region bounds must be finite with minimum <= maximum on every axis
    #[error("Region edit bounds are not a valid box")]
    InvalidRegion,
}

/// Errors that can occur while decoding or applying metavoxel data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetavoxelError {
    #[error("Structural error: {0}")]
    Structural(#[from] StructuralError),

    #[error("Decode error: {0}")]
    Decode(#[from] SerdeErr),
}
