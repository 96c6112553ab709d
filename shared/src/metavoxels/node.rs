use std::sync::Arc;

use crate::metavoxels::{attribute::AttributeValue, error::StructuralError};

/// Shared handle to an immutable node
pub type NodeRef = Arc<MetavoxelNode>;

/// A node of the metavoxel tree. Nodes are never mutated once built: an edit
/// produces new nodes along the path from the root and shares every other
/// subtree with the tree it was applied to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetavoxelNode {
    Leaf(AttributeValue),
    Internal(InternalNode),
}

/// A subdivided cube. An absent child means the octant uniformly holds
/// `value`. At least one child is always present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InternalNode {
    value: AttributeValue,
    children: [Option<NodeRef>; 8],
}

impl InternalNode {
    pub fn try_new(
        value: AttributeValue,
        children: [Option<NodeRef>; 8],
    ) -> Result<Self, StructuralError> {
        if children.iter().all(Option::is_none) {
            return Err(StructuralError::EmptyInternalNode { depth: 0 });
        }
        Ok(Self { value, children })
    }

    pub fn value(&self) -> AttributeValue {
        self.value
    }

    pub fn children(&self) -> &[Option<NodeRef>; 8] {
        &self.children
    }

    pub fn child(&self, octant: usize) -> Option<&NodeRef> {
        self.children.get(octant).and_then(Option::as_ref)
    }

    /// Bit `i` set when child `i` is present
    pub fn child_mask(&self) -> u8 {
        self.children
            .iter()
            .enumerate()
            .filter(|(_, child)| child.is_some())
            .fold(0, |mask, (octant, _)| mask | (1 << octant))
    }
}

impl MetavoxelNode {
    pub fn leaf(value: AttributeValue) -> NodeRef {
        Arc::new(MetavoxelNode::Leaf(value))
    }

    /// Builds an internal node in canonical form: children that are leaves
    /// holding `value` are dropped (absent children inherit it), and a node
    /// left without children, or whose eight children are equal leaves,
    /// collapses into a single leaf.
    pub fn internal(value: AttributeValue, children: [Option<NodeRef>; 8]) -> NodeRef {
        let children = children.map(|child| match child {
            Some(node) if node.as_leaf() == Some(value) => None,
            other => other,
        });

        if children.iter().all(Option::is_none) {
            return Self::leaf(value);
        }

        if let Some(Some(first)) = children.first() {
            if let Some(shared) = first.as_leaf() {
                if children
                    .iter()
                    .all(|child| child.as_ref().and_then(|node| node.as_leaf()) == Some(shared))
                {
                    return first.clone();
                }
            }
        }

        Arc::new(MetavoxelNode::Internal(InternalNode { value, children }))
    }

    /// Builds an internal node exactly as given, only collapsing it into a
    /// leaf when no child is present.
    pub fn internal_exact(value: AttributeValue, children: [Option<NodeRef>; 8]) -> NodeRef {
        match InternalNode::try_new(value, children) {
            Ok(internal) => Arc::new(MetavoxelNode::Internal(internal)),
            Err(_) => Self::leaf(value),
        }
    }

    pub fn value(&self) -> AttributeValue {
        match self {
            MetavoxelNode::Leaf(value) => *value,
            MetavoxelNode::Internal(internal) => internal.value,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, MetavoxelNode::Leaf(_))
    }

    pub fn as_leaf(&self) -> Option<AttributeValue> {
        match self {
            MetavoxelNode::Leaf(value) => Some(*value),
            MetavoxelNode::Internal(_) => None,
        }
    }

    pub fn as_internal(&self) -> Option<&InternalNode> {
        match self {
            MetavoxelNode::Leaf(_) => None,
            MetavoxelNode::Internal(internal) => Some(internal),
        }
    }

    /// The eight children of this node as they apply to their octants:
    /// present children as they are, absent ones (and all octants of a
    /// leaf) as leaves holding the inherited value.
    pub fn expanded_children(&self) -> [NodeRef; 8] {
        match self {
            MetavoxelNode::Leaf(value) => {
                let leaf = Self::leaf(*value);
                std::array::from_fn(|_| leaf.clone())
            }
            MetavoxelNode::Internal(internal) => {
                let mut inherited: Option<NodeRef> = None;
                std::array::from_fn(|octant| match internal.child(octant) {
                    Some(child) => child.clone(),
                    None => inherited
                        .get_or_insert_with(|| Self::leaf(internal.value))
                        .clone(),
                })
            }
        }
    }

    /// Number of levels below this node
    pub fn height(&self) -> u8 {
        match self {
            MetavoxelNode::Leaf(_) => 0,
            MetavoxelNode::Internal(internal) => {
                1 + internal
                    .children
                    .iter()
                    .flatten()
                    .map(|child| child.height())
                    .max()
                    .unwrap_or(0)
            }
        }
    }

    /// Structural equality that short-circuits on shared subtrees.
    pub fn same_as(a: &NodeRef, b: &NodeRef) -> bool {
        if Arc::ptr_eq(a, b) {
            return true;
        }
        match (a.as_ref(), b.as_ref()) {
            (MetavoxelNode::Leaf(a), MetavoxelNode::Leaf(b)) => a == b,
            (MetavoxelNode::Internal(a), MetavoxelNode::Internal(b)) => {
                a.value == b.value
                    && a.children.iter().zip(b.children.iter()).all(|pair| match pair {
                        (Some(a), Some(b)) => Self::same_as(a, b),
                        (None, None) => true,
                        _ => false,
                    })
            }
            _ => false,
        }
    }
}
