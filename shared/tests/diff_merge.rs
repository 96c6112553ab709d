//! Property tests for the metavoxel tree: diffing and merging, and the
//! differential codec, across arbitrary sequences of region edits.

use metavoxel_shared::{
    diff, merge, AttributeValue, MetavoxelData, MetavoxelNode, Region, RegionEdit, MAX_DEPTH,
};
use proptest::prelude::*;

fn arb_region_edit() -> impl Strategy<Value = RegionEdit> {
    (
        prop::array::uniform3(0u8..16),
        prop::array::uniform3(1u8..8),
        0u32..4,
        prop_oneof![Just(1.0f32), Just(2.0f32), Just(0.5f32)],
    )
        .prop_map(|(minimum, extent, value, granularity)| {
            let minimum = minimum.map(f32::from);
            let maximum = [
                minimum[0] + f32::from(extent[0]),
                minimum[1] + f32::from(extent[1]),
                minimum[2] + f32::from(extent[2]),
            ];
            let value = if value == 0 {
                AttributeValue::EMPTY
            } else {
                AttributeValue::new(value)
            };
            RegionEdit::new(Region::new(minimum, maximum), granularity, value)
        })
}

fn build(base: &MetavoxelData, edits: &[RegionEdit]) -> MetavoxelData {
    edits.iter().fold(base.clone(), |data, edit| {
        edit.apply(&data).expect("generated edits are valid")
    })
}

proptest! {
    #[test]
    fn merge_of_diff_reproduces_target(
        old_edits in prop::collection::vec(arb_region_edit(), 0..6),
        new_edits in prop::collection::vec(arb_region_edit(), 0..6),
    ) {
        let old = build(&MetavoxelData::new(16.0), &old_edits);
        let new = build(&old, &new_edits);

        let edit = diff(&old, &new);
        let merged = merge(&old, &edit).unwrap();
        prop_assert!(MetavoxelNode::same_as(merged.root(), new.root()));
    }

    #[test]
    fn merge_of_diff_between_unrelated_trees(
        old_edits in prop::collection::vec(arb_region_edit(), 0..6),
        new_edits in prop::collection::vec(arb_region_edit(), 0..6),
    ) {
        let old = build(&MetavoxelData::new(16.0), &old_edits);
        let new = build(&MetavoxelData::new(16.0), &new_edits);

        let merged = merge(&old, &diff(&old, &new)).unwrap();
        prop_assert!(merged.same_content(&new));
    }

    #[test]
    fn no_op_diff_shares_base(
        edits in prop::collection::vec(arb_region_edit(), 0..6),
    ) {
        let data = build(&MetavoxelData::new(16.0), &edits);
        let edit = diff(&data, &data);
        prop_assert!(edit.is_empty());
        prop_assert!(merge(&data, &edit).unwrap().ptr_eq(&data));
    }

    #[test]
    fn delta_decodes_against_reference(
        old_edits in prop::collection::vec(arb_region_edit(), 0..6),
        new_edits in prop::collection::vec(arb_region_edit(), 0..6),
    ) {
        let old = build(&MetavoxelData::new(16.0), &old_edits);
        let new = build(&old, &new_edits);

        let delta = new.to_delta_bytes(Some(&old));
        let decoded = MetavoxelData::from_delta_bytes(Some(&old), &delta, MAX_DEPTH).unwrap();
        prop_assert!(MetavoxelNode::same_as(decoded.root(), new.root()));

        let full = new.to_delta_bytes(None);
        let decoded = MetavoxelData::from_delta_bytes(None, &full, MAX_DEPTH).unwrap();
        prop_assert!(MetavoxelNode::same_as(decoded.root(), new.root()));
    }
}
