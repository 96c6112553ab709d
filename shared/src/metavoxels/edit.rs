use metavoxel_serde::{
    BitCounter, BitReader, BitWrite, Serde, SerdeErr, UnsignedInteger, UnsignedVariableInteger,
};

use crate::metavoxels::{
    attribute::AttributeValue,
    codec::{read_full_node, write_full_node, NodeReadTable, NodeWriteTable},
    cube::{Cube, Region},
    data::MetavoxelData,
    diff,
    error::{MetavoxelError, StructuralError},
    node::{MetavoxelNode, NodeRef},
    MAX_DEPTH,
};

/// Octant indices leading from the root to a node. The empty path is the
/// root itself.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<u8>);

impl NodePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new(octants: Vec<u8>) -> Result<Self, StructuralError> {
        if let Some(octant) = octants.iter().find(|octant| **octant > 7) {
            return Err(StructuralError::InvalidOctant { octant: *octant });
        }
        if octants.len() > usize::from(MAX_DEPTH) {
            return Err(StructuralError::PathTooDeep {
                length: octants.len(),
                max_depth: MAX_DEPTH,
            });
        }
        Ok(Self(octants))
    }

    pub fn octants(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn push(&mut self, octant: u8) {
        self.0.push(octant);
    }

    pub(crate) fn pop(&mut self) {
        self.0.pop();
    }
}

/// Puts `node` at `path`, or clears it back to the inherited value when
/// `node` is `None`.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeReplacement {
    pub path: NodePath,
    pub node: Option<NodeRef>,
}

/// Sets every point inside `region` to `value`, subdividing no finer than
/// `granularity`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegionEdit {
    pub region: Region,
    pub granularity: f32,
    pub value: AttributeValue,
}

impl RegionEdit {
    pub fn new(region: Region, granularity: f32, value: AttributeValue) -> Self {
        Self {
            region,
            granularity,
            value,
        }
    }

    pub fn validate(&self) -> Result<(), StructuralError> {
        if !self.granularity.is_finite() || self.granularity <= 0.0 {
            return Err(StructuralError::InvalidGranularity);
        }
        if !self.region.is_valid() {
            return Err(StructuralError::InvalidRegion);
        }
        Ok(())
    }

    /// Returns a new version of `data` with this edit applied. Subtrees the
    /// region does not touch are shared with `data`.
    pub fn apply(&self, data: &MetavoxelData) -> Result<MetavoxelData, StructuralError> {
        self.validate()?;
        let fill = MetavoxelNode::leaf(self.value);
        let root = self.apply_node(data.root(), data.root_cube(), 0, &fill);
        Ok(MetavoxelData::with_root(data.size(), root))
    }

    fn apply_node(&self, node: &NodeRef, cube: Cube, depth: u8, fill: &NodeRef) -> NodeRef {
        if !self.region.intersects(&cube) {
            return node.clone();
        }
        if self.region.contains_cube(&cube) {
            return fill.clone();
        }
        if cube.size <= self.granularity || depth >= MAX_DEPTH {
            if self.region.contains_point(cube.center()) {
                return fill.clone();
            }
            return node.clone();
        }

        let children = node.expanded_children();
        let edited: [NodeRef; 8] = std::array::from_fn(|octant| {
            self.apply_node(&children[octant], cube.child(octant), depth + 1, fill)
        });

        if children
            .iter()
            .zip(edited.iter())
            .all(|(old, new)| std::sync::Arc::ptr_eq(old, new))
        {
            return node.clone();
        }

        MetavoxelNode::internal(node.value(), edited.map(Some))
    }
}

/// A change to a metavoxel tree, as sent on the reliable stream.
#[derive(Clone, Debug, PartialEq)]
pub enum EditMessage {
    SetRegion(RegionEdit),
    Replace(Vec<NodeReplacement>),
}

impl EditMessage {
    pub fn is_empty(&self) -> bool {
        matches!(self, EditMessage::Replace(replacements) if replacements.is_empty())
    }

    pub fn apply(&self, data: &MetavoxelData) -> Result<MetavoxelData, StructuralError> {
        diff::merge(data, self)
    }

    /// Reads an edit, rejecting paths and subtrees deeper than `max_depth`.
    pub fn read(reader: &mut BitReader, max_depth: u8) -> Result<Self, MetavoxelError> {
        if !bool::de(reader)? {
            let minimum = read_point(reader)?;
            let maximum = read_point(reader)?;
            let granularity = f32::de(reader)?;
            let value = AttributeValue::de(reader)?;
            return Ok(EditMessage::SetRegion(RegionEdit::new(
                Region::new(minimum, maximum),
                granularity,
                value,
            )));
        }

        let count = UnsignedVariableInteger::<7>::de(reader)?.get();
        let mut table = NodeReadTable::new();
        let mut replacements = Vec::new();
        for _ in 0..count {
            let length = UnsignedInteger::<5>::de(reader)?.get() as usize;
            if length > usize::from(max_depth) {
                return Err(StructuralError::PathTooDeep { length, max_depth }.into());
            }
            let mut path = NodePath::root();
            for _ in 0..length {
                path.push(UnsignedInteger::<3>::de(reader)?.get() as u8);
            }

            let node = if bool::de(reader)? {
                let depth = length as u8;
                Some(read_full_node(reader, &mut table, depth, max_depth)?.0)
            } else {
                None
            };
            replacements.push(NodeReplacement { path, node });
        }
        Ok(EditMessage::Replace(replacements))
    }
}

fn read_point(reader: &mut BitReader) -> Result<[f32; 3], SerdeErr> {
    Ok([f32::de(reader)?, f32::de(reader)?, f32::de(reader)?])
}

impl Serde for EditMessage {
    fn ser(&self, writer: &mut dyn BitWrite) {
        match self {
            EditMessage::SetRegion(edit) => {
                writer.write_bit(false);
                for coordinate in edit.region.minimum.iter().chain(edit.region.maximum.iter()) {
                    coordinate.ser(writer);
                }
                edit.granularity.ser(writer);
                edit.value.ser(writer);
            }
            EditMessage::Replace(replacements) => {
                writer.write_bit(true);
                UnsignedVariableInteger::<7>::new(replacements.len() as u64).ser(writer);
                let mut table = NodeWriteTable::new();
                for replacement in replacements {
                    let octants = replacement.path.octants();
                    UnsignedInteger::<5>::new(octants.len() as u64).ser(writer);
                    for octant in octants {
                        UnsignedInteger::<3>::new(u64::from(*octant)).ser(writer);
                    }
                    match &replacement.node {
                        Some(node) => {
                            writer.write_bit(true);
                            write_full_node(node, writer, &mut table);
                        }
                        None => writer.write_bit(false),
                    }
                }
            }
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Self::read(reader, MAX_DEPTH).map_err(|_| SerdeErr)
    }

    fn bit_length(&self) -> u32 {
        let mut counter = BitCounter::new(0, 0, u32::MAX);
        self.ser(&mut counter);
        counter.bits_needed()
    }
}
