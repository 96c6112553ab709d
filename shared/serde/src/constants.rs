/// Default maximum size of a single datagram, in bytes. Chosen to stay below
/// the smallest MTU seen on common paths after IP/UDP headers.
pub const MTU_SIZE_BYTES: usize = 430;
pub const MTU_SIZE_BITS: u32 = (MTU_SIZE_BYTES * 8) as u32;
