use crate::metavoxels::{
    attribute::AttributeValue,
    cube::Cube,
    node::{MetavoxelNode, NodeRef},
    visitor::{MetavoxelInfo, MetavoxelVisitor, VisitAction},
};

/// One version of a metavoxel tree: the edge length of the root cube
/// (anchored at the origin) and the root node.
///
/// Cloning is O(1) and shares every node, which is how snapshots are kept.
#[derive(Clone, Debug)]
pub struct MetavoxelData {
    size: f32,
    root: NodeRef,
}

impl MetavoxelData {
    /// An empty tree
    pub fn new(size: f32) -> Self {
        Self::with_root(size, MetavoxelNode::leaf(AttributeValue::EMPTY))
    }

    pub fn with_root(size: f32, root: NodeRef) -> Self {
        Self { size, root }
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    pub fn root_cube(&self) -> Cube {
        Cube::new([0.0; 3], self.size)
    }

    /// Whether both versions share the same root node
    pub fn ptr_eq(&self, other: &Self) -> bool {
        std::sync::Arc::ptr_eq(&self.root, &other.root)
    }

    /// Value at `point`; empty outside the root cube
    pub fn value_at(&self, point: [f32; 3]) -> AttributeValue {
        let mut cube = self.root_cube();
        if !cube.contains_point(point) {
            return AttributeValue::EMPTY;
        }

        let mut node = &self.root;
        loop {
            let Some(internal) = node.as_internal() else {
                return node.value();
            };
            let octant = cube.octant_of(point);
            cube = cube.child(octant);
            match internal.child(octant) {
                Some(child) => node = child,
                None => return internal.value(),
            }
        }
    }

    /// Walks the tree, handing each region to `visitor`
    pub fn guide(&self, visitor: &mut dyn MetavoxelVisitor) {
        Self::guide_node(&self.root, self.root_cube(), 0, visitor);
    }

    fn guide_node(node: &NodeRef, cube: Cube, depth: u8, visitor: &mut dyn MetavoxelVisitor) {
        match node.as_internal() {
            None => {
                let value = node.value();
                if !value.is_empty() {
                    visitor.visit(&MetavoxelInfo {
                        cube,
                        value,
                        is_leaf: true,
                        depth,
                    });
                }
            }
            Some(internal) => {
                let action = visitor.visit(&MetavoxelInfo {
                    cube,
                    value: internal.value(),
                    is_leaf: false,
                    depth,
                });
                if action == VisitAction::Prune {
                    return;
                }
                for (octant, child) in node.expanded_children().iter().enumerate() {
                    Self::guide_node(child, cube.child(octant), depth + 1, visitor);
                }
            }
        }
    }

    /// Every non-empty leaf region, in traversal order, with regions of
    /// equal value merged where a subtree is uniform. Two trees with the same
    /// content produce the same list whatever their internal layout.
    pub fn leaf_regions(&self) -> Vec<(Cube, AttributeValue)> {
        let mut regions = Vec::new();
        Self::collect_leaves(&self.canonical_root(), self.root_cube(), &mut regions);
        regions
    }

    fn collect_leaves(node: &NodeRef, cube: Cube, regions: &mut Vec<(Cube, AttributeValue)>) {
        if node.is_leaf() {
            if !node.value().is_empty() {
                regions.push((cube, node.value()));
            }
            return;
        }
        for (octant, child) in node.expanded_children().iter().enumerate() {
            Self::collect_leaves(child, cube.child(octant), regions);
        }
    }

    /// The root rebuilt in canonical form (see [`MetavoxelNode::internal`])
    pub fn canonical_root(&self) -> NodeRef {
        Self::canonicalize(&self.root)
    }

    fn canonicalize(node: &NodeRef) -> NodeRef {
        let Some(internal) = node.as_internal() else {
            return node.clone();
        };
        let children = node
            .expanded_children()
            .map(|child| Some(Self::canonicalize(&child)));
        let canonical = MetavoxelNode::internal(internal.value(), children);
        if MetavoxelNode::same_as(&canonical, node) {
            return node.clone();
        }
        canonical
    }

    /// Same content, regardless of how the trees are laid out internally
    pub fn same_content(&self, other: &Self) -> bool {
        self.size == other.size
            && MetavoxelNode::same_as(&self.canonical_root(), &other.canonical_root())
    }
}
