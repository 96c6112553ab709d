pub mod helpers;
pub mod local_socket;

pub use helpers::*;
pub use local_socket::{LinkConditioner, LinkHandle, LocalSocketPair};
