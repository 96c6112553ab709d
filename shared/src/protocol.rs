use metavoxel_serde::BitReader;

use crate::{
    messages::{
        message::MetavoxelMessage,
        message_kinds::{ChannelDirection, ChannelMode, MessageKind, MessageKinds, MessageSettings},
    },
    metavoxels::MAX_DEPTH,
    types::HostType,
};

pub mod error;
pub use error::ProtocolError;

/// The dispatch table shared by both ends of a session: which message kinds
/// exist, the channel each travels on and who may send it, plus the deepest
/// tree accepted from the wire. Built once, then handed by value to each
/// session.
#[derive(Clone, Debug)]
pub struct Protocol {
    pub message_kinds: MessageKinds,
    /// Trees and edits reaching deeper than this are rejected on receipt
    pub max_depth: u8,
    locked: bool,
}

impl Default for Protocol {
    fn default() -> Self {
        let mut message_kinds = MessageKinds::new();
        message_kinds.add_message(
            MessageKind::Edit,
            MessageSettings::new(ChannelMode::Reliable, ChannelDirection::Bidirectional),
        );
        message_kinds.add_message(
            MessageKind::ClientState,
            MessageSettings::new(ChannelMode::Unreliable, ChannelDirection::ClientToServer),
        );
        message_kinds.add_message(
            MessageKind::State,
            MessageSettings::new(ChannelMode::Unreliable, ChannelDirection::ServerToClient),
        );
        message_kinds.add_message(
            MessageKind::Snapshot,
            MessageSettings::new(ChannelMode::Reliable, ChannelDirection::ServerToClient),
        );

        Self {
            message_kinds,
            max_depth: MAX_DEPTH,
            locked: false,
        }
    }
}

impl Protocol {
    pub fn builder() -> Self {
        Self::default()
    }

    pub fn add_message(
        &mut self,
        kind: MessageKind,
        mode: ChannelMode,
        direction: ChannelDirection,
    ) -> &mut Self {
        self.check_lock();
        self.message_kinds
            .add_message(kind, MessageSettings::new(mode, direction));
        self
    }

    pub fn remove_message(&mut self, kind: MessageKind) -> &mut Self {
        self.check_lock();
        self.message_kinds.remove_message(kind);
        self
    }

    pub fn max_depth(&mut self, max_depth: u8) -> &mut Self {
        self.check_lock();
        self.max_depth = max_depth.min(MAX_DEPTH);
        self
    }

    // Non-panicking builder methods

    pub fn try_add_message(
        &mut self,
        kind: MessageKind,
        mode: ChannelMode,
        direction: ChannelDirection,
    ) -> Result<&mut Self, ProtocolError> {
        self.try_check_lock()?;
        self.message_kinds
            .add_message(kind, MessageSettings::new(mode, direction));
        Ok(self)
    }

    pub fn try_max_depth(&mut self, max_depth: u8) -> Result<&mut Self, ProtocolError> {
        self.try_check_lock()?;
        self.max_depth = max_depth.min(MAX_DEPTH);
        Ok(self)
    }

    pub fn try_lock(&mut self) -> Result<(), ProtocolError> {
        self.try_check_lock()?;
        self.locked = true;
        Ok(())
    }

    pub fn lock(&mut self) {
        self.check_lock();
        self.locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Checks if protocol is locked without panicking
    pub fn try_check_lock(&self) -> Result<(), ProtocolError> {
        if self.locked {
            Err(ProtocolError::AlreadyLocked)
        } else {
            Ok(())
        }
    }

    /// Checks if protocol is locked
    ///
    /// # Panics
    ///
    /// Panics if the protocol has already been locked.
    pub fn check_lock(&self) {
        if self.locked {
            panic!("Protocol already locked!");
        }
    }

    /// Takes the configured protocol out of the builder, locked
    pub fn build(&mut self) -> Self {
        let mut protocol = std::mem::take(self);
        protocol.locked = true;
        protocol
    }

    // Dispatch

    /// Encodes `message` for sending by `sender` on a channel of `mode`.
    pub fn encode(
        &self,
        sender: HostType,
        mode: ChannelMode,
        message: &MetavoxelMessage,
    ) -> Result<Box<[u8]>, ProtocolError> {
        self.message_kinds.check(message.kind(), mode, sender)?;
        Ok(message.to_bytes())
    }

    /// Decodes a message received from `sender` on a channel of `mode`.
    /// Kinds the table does not allow there are rejected before their body
    /// is read.
    pub fn decode(
        &self,
        sender: HostType,
        mode: ChannelMode,
        bytes: &[u8],
    ) -> Result<MetavoxelMessage, ProtocolError> {
        let mut reader = BitReader::new(bytes);
        let kind = MetavoxelMessage::read_kind(&mut reader)?;
        self.message_kinds.check(kind, mode, sender)?;
        Ok(MetavoxelMessage::read_body(
            kind,
            &mut reader,
            self.max_depth,
        )?)
    }
}
