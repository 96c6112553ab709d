use std::{default::Default, time::Duration};

use metavoxel_serde::MTU_SIZE_BYTES;

/// Contains Config properties which will be used by a Server or Client
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Largest datagram the transport accepts, in bytes
    pub max_datagram_bytes: usize,
    /// Most reliable stream bytes (including section overhead) put into one
    /// packet
    pub max_reliable_bytes_per_packet: usize,
    /// Round trip estimate used until the first acknowledgment arrives
    pub rtt_initial_estimate: Duration,
    /// Weight of each new sample in the smoothed round trip estimate
    pub rtt_smoothing_factor: f32,
    /// An unacknowledged reliable fragment is resent once it has gone
    /// `rtt * rtt_resend_factor` without acknowledgment
    pub rtt_resend_factor: f32,
    /// A logical packet may be split over at most this many datagrams
    pub max_fragments_per_packet: u8,
    /// Incomplete multi-datagram packets this many packets behind the newest
    /// one seen are discarded
    pub incomplete_packet_window: u16,
    /// Most out-of-order reliable stream bytes buffered ahead of the next
    /// expected offset
    pub max_reliable_window_bytes: u32,
    /// The duration to wait before sending a heartbeat message to a remote
    /// host, if the host has not already sent another message within that
    /// time
    pub heartbeat_interval: Duration,
    /// The duration to wait for communication from a remote host before
    /// initiating a disconnect
    pub disconnection_timeout_duration: Duration,
}

impl ConnectionConfig {
    /// Creates a new ConnectionConfig, used to initialize a Connection
    pub fn new(
        disconnection_timeout_duration: Duration,
        heartbeat_interval: Duration,
    ) -> Self {
        Self {
            disconnection_timeout_duration,
            heartbeat_interval,
            ..Self::default()
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_datagram_bytes: MTU_SIZE_BYTES,
            max_reliable_bytes_per_packet: MTU_SIZE_BYTES - 16,
            rtt_initial_estimate: Duration::from_millis(200),
            rtt_smoothing_factor: 0.1,
            rtt_resend_factor: 1.5,
            max_fragments_per_packet: 64,
            incomplete_packet_window: 32,
            max_reliable_window_bytes: 1 << 20,
            heartbeat_interval: Duration::from_secs(4),
            disconnection_timeout_duration: Duration::from_secs(10),
        }
    }
}
