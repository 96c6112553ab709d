use std::sync::Arc;

use crate::metavoxels::{
    data::MetavoxelData,
    edit::{EditMessage, NodePath, NodeReplacement},
    error::StructuralError,
    node::{MetavoxelNode, NodeRef},
    MAX_DEPTH,
};

/// Computes the replacements that turn `old` into `new`. Both versions must
/// share the same root size.
///
/// Subtrees shared between the two versions are skipped without being
/// walked, so diffing a tree against a recent edit of itself only visits the
/// edited paths.
pub fn diff(old: &MetavoxelData, new: &MetavoxelData) -> EditMessage {
    let mut replacements = Vec::new();
    let mut path = NodePath::root();
    diff_node(Some(old.root()), Some(new.root()), &mut path, &mut replacements);
    EditMessage::Replace(replacements)
}

fn diff_node(
    old: Option<&NodeRef>,
    new: Option<&NodeRef>,
    path: &mut NodePath,
    replacements: &mut Vec<NodeReplacement>,
) {
    let (old, new) = match (old, new) {
        (None, None) => return,
        (Some(old), Some(new)) => (old, new),
        (_, new) => {
            replacements.push(NodeReplacement {
                path: path.clone(),
                node: new.cloned(),
            });
            return;
        }
    };

    if Arc::ptr_eq(old, new) {
        return;
    }

    match (old.as_internal(), new.as_internal()) {
        (Some(old_internal), Some(new_internal)) if old_internal.value() == new_internal.value() => {
            for octant in 0..8 {
                path.push(octant as u8);
                diff_node(
                    old_internal.child(octant),
                    new_internal.child(octant),
                    path,
                    replacements,
                );
                path.pop();
            }
        }
        (None, None) if old.value() == new.value() => {}
        _ => replacements.push(NodeReplacement {
            path: path.clone(),
            node: Some(new.clone()),
        }),
    }
}

/// Applies `edit` to `base`, returning the new version. `base` is left as
/// it was; the result shares every subtree the edit does not touch.
///
/// Every replacement is checked before any is applied, so on error nothing
/// has been built.
pub fn merge(base: &MetavoxelData, edit: &EditMessage) -> Result<MetavoxelData, StructuralError> {
    let replacements = match edit {
        EditMessage::SetRegion(region_edit) => return region_edit.apply(base),
        EditMessage::Replace(replacements) => replacements,
    };

    for replacement in replacements {
        check_replacement(replacement)?;
    }

    let mut root = base.root().clone();
    for replacement in replacements {
        root = replace_at(&root, replacement.path.octants(), replacement.node.as_ref())
            .ok_or(StructuralError::RootRemoved)?;
    }
    Ok(MetavoxelData::with_root(base.size(), root))
}

fn check_replacement(replacement: &NodeReplacement) -> Result<(), StructuralError> {
    let octants = replacement.path.octants();
    if octants.len() > usize::from(MAX_DEPTH) {
        return Err(StructuralError::PathTooDeep {
            length: octants.len(),
            max_depth: MAX_DEPTH,
        });
    }
    if let Some(octant) = octants.iter().find(|octant| **octant > 7) {
        return Err(StructuralError::InvalidOctant { octant: *octant });
    }

    match &replacement.node {
        None if octants.is_empty() => Err(StructuralError::RootRemoved),
        Some(node) => {
            let depth = octants.len() + usize::from(node.height());
            if depth > usize::from(MAX_DEPTH) {
                return Err(StructuralError::DepthExceeded {
                    depth: u8::try_from(depth).unwrap_or(u8::MAX),
                    max_depth: MAX_DEPTH,
                });
            }
            Ok(())
        }
        None => Ok(()),
    }
}

/// Rebuilds the path down to `octants`, splitting any leaf on the way so
/// its new children inherit its value. `None` means the node itself is gone.
fn replace_at(node: &NodeRef, octants: &[u8], replacement: Option<&NodeRef>) -> Option<NodeRef> {
    let Some((first, rest)) = octants.split_first() else {
        return replacement.cloned();
    };
    let octant = usize::from(*first);

    let (value, mut children) = match node.as_internal() {
        Some(internal) => (internal.value(), internal.children().clone()),
        None => (node.value(), Default::default()),
    };
    let current = children[octant]
        .clone()
        .unwrap_or_else(|| MetavoxelNode::leaf(value));
    children[octant] = replace_at(&current, rest, replacement);

    Some(MetavoxelNode::internal_exact(value, children))
}
