use thiserror::Error;

/// Returned when a value cannot be read back from a bit stream, either
/// because the stream ran out of bits or because a tag was invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Failed to deserialize value from bit stream. Data is truncated or malformed")]
pub struct SerdeErr;
