use crate::metavoxels::{attribute::AttributeValue, cube::Cube};

/// What a visitor sees of one region of the tree
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MetavoxelInfo {
    pub cube: Cube,
    pub value: AttributeValue,
    pub is_leaf: bool,
    pub depth: u8,
}

/// Returned by a visitor for each region it is shown
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VisitAction {
    /// Visit the region's children as well
    Descend,
    /// Skip everything below this region
    Prune,
}

/// Read-only traversal of a metavoxel tree.
///
/// Regions are visited parent before children, children in octant order
/// 0 to 7. Internal regions are always visited; leaf regions only when they
/// hold a value. Absent children are visited as leaves holding the value
/// they inherit.
pub trait MetavoxelVisitor {
    fn visit(&mut self, info: &MetavoxelInfo) -> VisitAction;
}

impl<F> MetavoxelVisitor for F
where
    F: FnMut(&MetavoxelInfo) -> VisitAction,
{
    fn visit(&mut self, info: &MetavoxelInfo) -> VisitAction {
        self(info)
    }
}
