use std::vec::IntoIter;

use metavoxel_shared::{EditMessage, PacketIndex};

use crate::ClientError;

pub struct ClientEvents {
    attached: bool,
    edits: Vec<EditMessage>,
    data_received: Vec<PacketIndex>,
    errors: Vec<ClientError>,
    empty: bool,
}

impl Default for ClientEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientEvents {
    pub(crate) fn new() -> Self {
        Self {
            attached: false,
            edits: Vec::new(),
            data_received: Vec::new(),
            errors: Vec::new(),
            empty: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn read<V: ClientEvent>(&mut self) -> V::Iter {
        V::iter(self)
    }

    pub fn has<V: ClientEvent>(&self) -> bool {
        V::has(self)
    }

    pub(crate) fn push_attached(&mut self) {
        self.attached = true;
        self.empty = false;
    }

    pub(crate) fn push_edit_applied(&mut self, edit: EditMessage) {
        self.edits.push(edit);
        self.empty = false;
    }

    pub(crate) fn push_data_received(&mut self, packet_index: PacketIndex) {
        self.data_received.push(packet_index);
        self.empty = false;
    }

    pub(crate) fn push_error(&mut self, error: ClientError) {
        self.errors.push(error);
        self.empty = false;
    }
}

// Event Trait
pub trait ClientEvent {
    type Iter;

    fn iter(events: &mut ClientEvents) -> Self::Iter;

    fn has(events: &ClientEvents) -> bool;
}

// Attached Event
pub struct AttachedEvent;
impl ClientEvent for AttachedEvent {
    type Iter = std::option::IntoIter<()>;

    fn iter(events: &mut ClientEvents) -> Self::Iter {
        let attached = std::mem::take(&mut events.attached);
        attached.then_some(()).into_iter()
    }

    fn has(events: &ClientEvents) -> bool {
        events.attached
    }
}

// Edit Applied Event
pub struct EditAppliedEvent;
impl ClientEvent for EditAppliedEvent {
    type Iter = IntoIter<EditMessage>;

    fn iter(events: &mut ClientEvents) -> Self::Iter {
        let list = std::mem::take(&mut events.edits);
        IntoIterator::into_iter(list)
    }

    fn has(events: &ClientEvents) -> bool {
        !events.edits.is_empty()
    }
}

// Data Received Event
pub struct DataReceivedEvent;
impl ClientEvent for DataReceivedEvent {
    type Iter = IntoIter<PacketIndex>;

    fn iter(events: &mut ClientEvents) -> Self::Iter {
        let list = std::mem::take(&mut events.data_received);
        IntoIterator::into_iter(list)
    }

    fn has(events: &ClientEvents) -> bool {
        !events.data_received.is_empty()
    }
}

// Error Event
pub struct ErrorEvent;
impl ClientEvent for ErrorEvent {
    type Iter = IntoIter<ClientError>;

    fn iter(events: &mut ClientEvents) -> Self::Iter {
        let list = std::mem::take(&mut events.errors);
        IntoIterator::into_iter(list)
    }

    fn has(events: &ClientEvents) -> bool {
        !events.errors.is_empty()
    }
}
