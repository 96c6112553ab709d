pub mod datagram_sequencer;
pub mod error;
pub mod packet_assembler;
pub mod packet_body;
pub mod reliable_receiver;
pub mod reliable_sender;
