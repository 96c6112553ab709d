use std::vec::IntoIter;

use metavoxel_shared::EditMessage;

use crate::{ClientKey, ServerError};

pub struct Events {
    connections: Vec<ClientKey>,
    disconnections: Vec<ClientKey>,
    edits: Vec<(ClientKey, EditMessage)>,
    errors: Vec<(ClientKey, ServerError)>,
    empty: bool,
}

impl Default for Events {
    fn default() -> Self {
        Self::new()
    }
}

impl Events {
    pub(crate) fn new() -> Self {
        Self {
            connections: Vec::new(),
            disconnections: Vec::new(),
            edits: Vec::new(),
            errors: Vec::new(),
            empty: true,
        }
    }

    // Public

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn read<V: Event>(&mut self) -> V::Iter {
        V::iter(self)
    }

    pub fn has<V: Event>(&self) -> bool {
        V::has(self)
    }

    // Crate-public

    pub(crate) fn push_connection(&mut self, client_key: &ClientKey) {
        self.connections.push(*client_key);
        self.empty = false;
    }

    pub(crate) fn push_disconnection(&mut self, client_key: &ClientKey) {
        self.disconnections.push(*client_key);
        self.empty = false;
    }

    pub(crate) fn push_edit(&mut self, client_key: &ClientKey, edit: EditMessage) {
        self.edits.push((*client_key, edit));
        self.empty = false;
    }

    pub(crate) fn push_error(&mut self, client_key: &ClientKey, error: ServerError) {
        self.errors.push((*client_key, error));
        self.empty = false;
    }
}

// Event Trait
pub trait Event {
    type Iter;

    fn iter(events: &mut Events) -> Self::Iter;

    fn has(events: &Events) -> bool;
}

// Connect Event
pub struct ConnectEvent;
impl Event for ConnectEvent {
    type Iter = IntoIter<ClientKey>;

    fn iter(events: &mut Events) -> Self::Iter {
        let list = std::mem::take(&mut events.connections);
        IntoIterator::into_iter(list)
    }

    fn has(events: &Events) -> bool {
        !events.connections.is_empty()
    }
}

// Disconnect Event
pub struct DisconnectEvent;
impl Event for DisconnectEvent {
    type Iter = IntoIter<ClientKey>;

    fn iter(events: &mut Events) -> Self::Iter {
        let list = std::mem::take(&mut events.disconnections);
        IntoIterator::into_iter(list)
    }

    fn has(events: &Events) -> bool {
        !events.disconnections.is_empty()
    }
}

// Edit Event
pub struct EditEvent;
impl Event for EditEvent {
    type Iter = IntoIter<(ClientKey, EditMessage)>;

    fn iter(events: &mut Events) -> Self::Iter {
        let list = std::mem::take(&mut events.edits);
        IntoIterator::into_iter(list)
    }

    fn has(events: &Events) -> bool {
        !events.edits.is_empty()
    }
}

// Error Event
pub struct ErrorEvent;
impl Event for ErrorEvent {
    type Iter = IntoIter<(ClientKey, ServerError)>;

    fn iter(events: &mut Events) -> Self::Iter {
        let list = std::mem::take(&mut events.errors);
        IntoIterator::into_iter(list)
    }

    fn has(events: &Events) -> bool {
        !events.errors.is_empty()
    }
}
