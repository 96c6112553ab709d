use std::collections::HashMap;

use metavoxel_serde::{BitReader, BitWrite, ConstBitLength, Serde, SerdeErr, UnsignedInteger};

use crate::{messages::error::MessageKindsError, types::HostType};

/// The kinds of message exchanged by metavoxel sessions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Edit,
    ClientState,
    State,
    Snapshot,
}

impl MessageKind {
    fn to_index(self) -> u64 {
        match self {
            MessageKind::Edit => 0,
            MessageKind::ClientState => 1,
            MessageKind::State => 2,
            MessageKind::Snapshot => 3,
        }
    }
}

impl Serde for MessageKind {
    fn ser(&self, writer: &mut dyn BitWrite) {
        UnsignedInteger::<3>::new(self.to_index()).ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        match UnsignedInteger::<3>::de(reader)?.get() {
            0 => Ok(MessageKind::Edit),
            1 => Ok(MessageKind::ClientState),
            2 => Ok(MessageKind::State),
            3 => Ok(MessageKind::Snapshot),
            _ => Err(SerdeErr),
        }
    }

    fn bit_length(&self) -> u32 {
        <Self as ConstBitLength>::const_bit_length()
    }
}

impl ConstBitLength for MessageKind {
    fn const_bit_length() -> u32 {
        3
    }
}

/// Which half of a sequencer a message kind travels on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelMode {
    /// Framed on the ordered reliable stream
    Reliable,
    /// Carried as a packet's unreliable payload
    Unreliable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelDirection {
    ClientToServer,
    ServerToClient,
    Bidirectional,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageSettings {
    pub mode: ChannelMode,
    pub direction: ChannelDirection,
}

impl MessageSettings {
    pub fn new(mode: ChannelMode, direction: ChannelDirection) -> Self {
        Self { mode, direction }
    }

    pub fn can_send_to_server(&self) -> bool {
        matches!(
            self.direction,
            ChannelDirection::ClientToServer | ChannelDirection::Bidirectional
        )
    }

    pub fn can_send_to_client(&self) -> bool {
        matches!(
            self.direction,
            ChannelDirection::ServerToClient | ChannelDirection::Bidirectional
        )
    }

    /// Whether a host of type `sender` may send this kind
    pub fn can_be_sent_by(&self, sender: HostType) -> bool {
        match sender {
            HostType::Client => self.can_send_to_server(),
            HostType::Server => self.can_send_to_client(),
        }
    }
}

/// Dispatch table: the channel and direction allowed for each message kind
#[derive(Clone, Debug, Default)]
pub struct MessageKinds {
    settings: HashMap<MessageKind, MessageSettings>,
}

impl MessageKinds {
    pub fn new() -> Self {
        Self {
            settings: HashMap::new(),
        }
    }

    pub fn add_message(&mut self, kind: MessageKind, settings: MessageSettings) {
        self.settings.insert(kind, settings);
    }

    pub fn remove_message(&mut self, kind: MessageKind) {
        self.settings.remove(&kind);
    }

    pub fn settings(&self, kind: MessageKind) -> Result<&MessageSettings, MessageKindsError> {
        self.settings
            .get(&kind)
            .ok_or(MessageKindsError::MessageKindNotFound { kind })
    }

    /// Checks that `sender` may send `kind` on a channel of `mode`.
    pub fn check(
        &self,
        kind: MessageKind,
        mode: ChannelMode,
        sender: HostType,
    ) -> Result<(), MessageKindsError> {
        let settings = self.settings(kind)?;
        if settings.mode != mode {
            return Err(MessageKindsError::WrongChannel {
                kind,
                expected: settings.mode,
            });
        }
        if !settings.can_be_sent_by(sender) {
            return Err(MessageKindsError::DirectionNotAllowed { kind, sender });
        }
        Ok(())
    }
}
