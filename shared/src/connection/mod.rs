pub mod ack_manager;
pub mod connection_config;
pub mod packet_notifiable;
pub mod packet_type;
pub mod rtt;
pub mod standard_header;
