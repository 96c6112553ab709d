use metavoxel_serde::{BitReader, BitWrite, Serde, SerdeErr, StreamWriter};

use crate::{
    messages::{error::MessageError, message_kinds::MessageKind},
    metavoxels::edit::EditMessage,
    types::PacketIndex,
};

/// Sent by the client with every packet: the index of the newest server
/// packet whose state it has applied, which the server may use as a
/// baseline from then on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientStateMessage {
    pub applied: Option<PacketIndex>,
}

impl Serde for ClientStateMessage {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.applied.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            applied: Option::<PacketIndex>::de(reader)?,
        })
    }

    fn bit_length(&self) -> u32 {
        self.applied.bit_length()
    }
}

/// A server state update. `delta` is a tree encoded against the baseline
/// named by the packet that carries it, or in full when there is none.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateMessage {
    pub delta: Box<[u8]>,
}

impl Serde for StateMessage {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.delta.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            delta: Box::<[u8]>::de(reader)?,
        })
    }

    fn bit_length(&self) -> u32 {
        self.delta.bit_length()
    }
}

/// A whole tree sent on the reliable stream when a state update would not
/// fit in one packet. `packet_index` is the index of the packet that starts
/// carrying it, so the client can record it and use it as a baseline like
/// any other state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotMessage {
    pub packet_index: PacketIndex,
    pub data: Box<[u8]>,
}

impl Serde for SnapshotMessage {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.packet_index.ser(writer);
        self.data.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            packet_index: PacketIndex::de(reader)?,
            data: Box::<[u8]>::de(reader)?,
        })
    }

    fn bit_length(&self) -> u32 {
        self.packet_index.bit_length() + self.data.bit_length()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum MetavoxelMessage {
    Edit(EditMessage),
    ClientState(ClientStateMessage),
    State(StateMessage),
    Snapshot(SnapshotMessage),
}

impl MetavoxelMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            MetavoxelMessage::Edit(_) => MessageKind::Edit,
            MetavoxelMessage::ClientState(_) => MessageKind::ClientState,
            MetavoxelMessage::State(_) => MessageKind::State,
            MetavoxelMessage::Snapshot(_) => MessageKind::Snapshot,
        }
    }

    pub fn write(&self, writer: &mut dyn BitWrite) {
        self.kind().ser(writer);
        match self {
            MetavoxelMessage::Edit(edit) => edit.ser(writer),
            MetavoxelMessage::ClientState(state) => state.ser(writer),
            MetavoxelMessage::State(state) => state.ser(writer),
            MetavoxelMessage::Snapshot(snapshot) => snapshot.ser(writer),
        }
    }

    pub fn to_bytes(&self) -> Box<[u8]> {
        let mut writer = StreamWriter::new();
        self.write(&mut writer);
        writer.to_bytes()
    }

    /// Reads the kind tag only
    pub fn read_kind(reader: &mut BitReader) -> Result<MessageKind, MessageError> {
        MessageKind::de(reader).map_err(|error| MessageError::Decode(error.into()))
    }

    /// Reads the body of a message of `kind`. Edits deeper than `max_depth`
    /// are rejected.
    pub fn read_body(
        kind: MessageKind,
        reader: &mut BitReader,
        max_depth: u8,
    ) -> Result<Self, MessageError> {
        let decode = |error: SerdeErr| MessageError::Decode(error.into());
        match kind {
            MessageKind::Edit => Ok(MetavoxelMessage::Edit(EditMessage::read(reader, max_depth)?)),
            MessageKind::ClientState => Ok(MetavoxelMessage::ClientState(
                ClientStateMessage::de(reader).map_err(decode)?,
            )),
            MessageKind::State => Ok(MetavoxelMessage::State(
                StateMessage::de(reader).map_err(decode)?,
            )),
            MessageKind::Snapshot => Ok(MetavoxelMessage::Snapshot(
                SnapshotMessage::de(reader).map_err(decode)?,
            )),
        }
    }
}
