use std::sync::Arc;

use metavoxel_serde::{
    BitReader, BitWrite, DeltaSerde, Serde, SharedObjectReader, SharedObjectWriter, StreamWriter,
};

use crate::metavoxels::{
    attribute::AttributeValue,
    data::MetavoxelData,
    error::{MetavoxelError, StructuralError},
    node::{MetavoxelNode, NodeRef},
};

/// Shared nodes are keyed by address; every node written in one message is
/// kept alive by the tree (or edit) being written, so addresses are unique.
pub(crate) type NodeWriteTable = SharedObjectWriter<usize>;
pub(crate) type NodeReadTable = SharedObjectReader<(NodeRef, u8)>;

// Full encoding: value, internal flag, then for internal nodes the mask of
// present children followed by each present child. Nodes seen earlier in the
// same message are written as a back-reference instead.

pub(crate) fn write_full_node(node: &NodeRef, writer: &mut dyn BitWrite, table: &mut NodeWriteTable) {
    table.write(Arc::as_ptr(node) as usize, writer, |table, writer| {
        node.value().ser(writer);
        match node.as_internal() {
            None => writer.write_bit(false),
            Some(internal) => {
                writer.write_bit(true);
                internal.child_mask().ser(writer);
                for child in internal.children().iter().flatten() {
                    write_full_node(child, writer, table);
                }
            }
        }
    });
}

/// Reads a fully encoded node sitting at `depth`, returning it with its
/// height.
pub(crate) fn read_full_node(
    reader: &mut BitReader,
    table: &mut NodeReadTable,
    depth: u8,
    max_depth: u8,
) -> Result<(NodeRef, u8), MetavoxelError> {
    let (node, height) = table.read::<MetavoxelError, _>(reader, |table, reader| {
        let value = AttributeValue::de(reader)?;
        if !bool::de(reader)? {
            return Ok((MetavoxelNode::leaf(value), 0));
        }
        if depth >= max_depth {
            return Err(StructuralError::DepthExceeded {
                depth: depth + 1,
                max_depth,
            }
            .into());
        }

        let mask = u8::de(reader)?;
        if mask == 0 {
            return Err(StructuralError::EmptyInternalNode { depth }.into());
        }

        let mut children: [Option<NodeRef>; 8] = Default::default();
        let mut height = 0;
        for (octant, child) in children.iter_mut().enumerate() {
            if mask & (1 << octant) != 0 {
                let (node, child_height) = read_full_node(reader, table, depth + 1, max_depth)?;
                height = height.max(child_height + 1);
                *child = Some(node);
            }
        }
        Ok((MetavoxelNode::internal_exact(value, children), height))
    })?;

    // A back-reference may place a subtree deeper than where it was first read
    if u16::from(depth) + u16::from(height) > u16::from(max_depth) {
        return Err(StructuralError::DepthExceeded {
            depth: depth.saturating_add(height),
            max_depth,
        }
        .into());
    }

    Ok((node, height))
}

// Differential encoding against a reference node both ends hold: one
// "unchanged" bit per subtree identical to the reference, then either a
// patch (both internal: value delta, child mask, children against the
// reference's children) or a full encoding. Without a reference the node is
// written in full with no leading bit.

fn write_delta_node(
    node: &NodeRef,
    reference: Option<&NodeRef>,
    writer: &mut dyn BitWrite,
    table: &mut NodeWriteTable,
) {
    let Some(reference) = reference else {
        write_full_node(node, writer, table);
        return;
    };

    let unchanged = Arc::ptr_eq(node, reference)
        || (node.is_leaf() && reference.is_leaf() && node.value() == reference.value());
    writer.write_bit(unchanged);
    if unchanged {
        return;
    }

    match (node.as_internal(), reference.as_internal()) {
        (Some(internal), Some(reference_internal)) => {
            writer.write_bit(true);
            internal
                .value()
                .ser_delta(Some(&reference_internal.value()), writer);
            internal.child_mask().ser(writer);
            for octant in 0..8 {
                if let Some(child) = internal.child(octant) {
                    write_delta_node(child, reference_internal.child(octant), writer, table);
                }
            }
        }
        _ => {
            writer.write_bit(false);
            write_full_node(node, writer, table);
        }
    }
}

fn read_delta_node(
    reference: Option<&NodeRef>,
    reader: &mut BitReader,
    table: &mut NodeReadTable,
    depth: u8,
    max_depth: u8,
) -> Result<NodeRef, MetavoxelError> {
    let Some(reference) = reference else {
        return Ok(read_full_node(reader, table, depth, max_depth)?.0);
    };

    if bool::de(reader)? {
        return Ok(reference.clone());
    }

    if !bool::de(reader)? {
        return Ok(read_full_node(reader, table, depth, max_depth)?.0);
    }

    // patch
    let Some(reference_internal) = reference.as_internal() else {
        return Err(metavoxel_serde::SerdeErr.into());
    };
    if depth >= max_depth {
        return Err(StructuralError::DepthExceeded {
            depth: depth + 1,
            max_depth,
        }
        .into());
    }
    let value = AttributeValue::de_delta(Some(&reference_internal.value()), reader)?;
    let mask = u8::de(reader)?;
    if mask == 0 {
        return Err(StructuralError::EmptyInternalNode { depth }.into());
    }

    let mut children: [Option<NodeRef>; 8] = Default::default();
    for (octant, child) in children.iter_mut().enumerate() {
        if mask & (1 << octant) != 0 {
            *child = Some(read_delta_node(
                reference_internal.child(octant),
                reader,
                table,
                depth + 1,
                max_depth,
            )?);
        }
    }
    Ok(MetavoxelNode::internal_exact(value, children))
}

impl MetavoxelData {
    /// Writes this tree relative to `reference`, or in full when there is
    /// none. The reader must use the very same reference.
    pub fn write_delta(&self, reference: Option<&MetavoxelData>, writer: &mut dyn BitWrite) {
        let reference_size = reference.map(MetavoxelData::size);
        self.size().ser_delta(reference_size.as_ref(), writer);
        let mut table = NodeWriteTable::new();
        write_delta_node(
            self.root(),
            reference.map(MetavoxelData::root),
            writer,
            &mut table,
        );
    }

    /// Reads a tree written by [`MetavoxelData::write_delta`]. Unchanged
    /// subtrees are shared with `reference`. Malformed shapes are rejected.
    pub fn read_delta(
        reference: Option<&MetavoxelData>,
        reader: &mut BitReader,
        max_depth: u8,
    ) -> Result<MetavoxelData, MetavoxelError> {
        let reference_size = reference.map(MetavoxelData::size);
        let size = f32::de_delta(reference_size.as_ref(), reader)?;
        let mut table = NodeReadTable::new();
        let root = read_delta_node(
            reference.map(MetavoxelData::root),
            reader,
            &mut table,
            0,
            max_depth,
        )?;
        Ok(MetavoxelData::with_root(size, root))
    }

    pub fn write_full(&self, writer: &mut dyn BitWrite) {
        self.write_delta(None, writer);
    }

    pub fn read_full(reader: &mut BitReader, max_depth: u8) -> Result<MetavoxelData, MetavoxelError> {
        Self::read_delta(None, reader, max_depth)
    }

    pub fn to_delta_bytes(&self, reference: Option<&MetavoxelData>) -> Box<[u8]> {
        let mut writer = StreamWriter::new();
        self.write_delta(reference, &mut writer);
        writer.to_bytes()
    }

    pub fn from_delta_bytes(
        reference: Option<&MetavoxelData>,
        bytes: &[u8],
        max_depth: u8,
    ) -> Result<MetavoxelData, MetavoxelError> {
        let mut reader = BitReader::new(bytes);
        Self::read_delta(reference, &mut reader, max_depth)
    }
}
