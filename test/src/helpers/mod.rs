mod test_network;

pub use test_network::{region_edit, TestClient, TestNetwork, TICK_MILLIS};
