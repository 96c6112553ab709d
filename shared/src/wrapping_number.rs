use crate::types::PacketIndex;

/// Whether packet `newer` comes after packet `older`. Indices wrap at
/// `u16::MAX`, so an index up to half the range ahead counts as newer and
/// anything further ahead is taken to be an old index from before the wrap.
pub fn sequence_greater_than(newer: PacketIndex, older: PacketIndex) -> bool {
    let ahead = newer.wrapping_sub(older);
    ahead != 0 && ahead <= 32768
}

/// Whether packet `older` comes before packet `newer`
pub fn sequence_less_than(older: PacketIndex, newer: PacketIndex) -> bool {
    sequence_greater_than(newer, older)
}
