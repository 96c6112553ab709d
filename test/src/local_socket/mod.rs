//! In-memory transport for E2E testing
//! Routes datagrams between server and client without network I/O, through
//! a conditioner that can drop, reorder or hold them

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use metavoxel_shared::{PacketReceiver, PacketSender, RecvError, SendError};

/// Decides the fate of each datagram put on a link
pub struct LinkConditioner {
    drop_rate: f32,
    reorder_rate: f32,
    rng: fastrand::Rng,
}

impl LinkConditioner {
    /// Every datagram arrives, in order
    pub fn perfect() -> Self {
        Self::new(0.0, 0.0, 0)
    }

    /// Drops a `drop_rate` share of datagrams
    pub fn lossy(drop_rate: f32, seed: u64) -> Self {
        Self::new(drop_rate, 0.0, seed)
    }

    /// Drops a `drop_rate` share of datagrams and swaps a `reorder_rate`
    /// share with the datagram queued before them
    pub fn new(drop_rate: f32, reorder_rate: f32, seed: u64) -> Self {
        Self {
            drop_rate,
            reorder_rate,
            rng: fastrand::Rng::with_seed(seed),
        }
    }
}

impl Default for LinkConditioner {
    fn default() -> Self {
        Self::perfect()
    }
}

struct Link {
    queue: VecDeque<Box<[u8]>>,
    held: Vec<Box<[u8]>>,
    holding: bool,
    drop_next: usize,
    conditioner: LinkConditioner,
    sent: usize,
    dropped: usize,
}

impl Link {
    fn new(conditioner: LinkConditioner) -> Self {
        Self {
            queue: VecDeque::new(),
            held: Vec::new(),
            holding: false,
            drop_next: 0,
            conditioner,
            sent: 0,
            dropped: 0,
        }
    }

    fn push(&mut self, payload: Box<[u8]>) {
        self.sent += 1;
        if self.drop_next > 0 {
            self.drop_next -= 1;
            self.dropped += 1;
            return;
        }
        if self.holding {
            self.held.push(payload);
            return;
        }
        if self.conditioner.rng.f32() < self.conditioner.drop_rate {
            self.dropped += 1;
            return;
        }
        if !self.queue.is_empty() && self.conditioner.rng.f32() < self.conditioner.reorder_rate {
            let last = self.queue.len() - 1;
            self.queue.insert(last, payload);
            return;
        }
        self.queue.push_back(payload);
    }
}

/// Test-side control over one direction of a socket pair
#[derive(Clone)]
pub struct LinkHandle {
    link: Arc<Mutex<Link>>,
}

impl LinkHandle {
    fn new(conditioner: LinkConditioner) -> Self {
        Self {
            link: Arc::new(Mutex::new(Link::new(conditioner))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Link> {
        self.link.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_conditioner(&self, conditioner: LinkConditioner) {
        self.lock().conditioner = conditioner;
    }

    /// Datagrams sent from now on are kept aside until taken or released
    pub fn hold(&self) {
        self.lock().holding = true;
    }

    /// Takes every held datagram, oldest first, and stops holding
    pub fn take_held(&self) -> Vec<Box<[u8]>> {
        let mut link = self.lock();
        link.holding = false;
        std::mem::take(&mut link.held)
    }

    /// Queues every held datagram for delivery in the order sent and stops
    /// holding
    pub fn release(&self) {
        let mut link = self.lock();
        link.holding = false;
        let held = std::mem::take(&mut link.held);
        link.queue.extend(held);
    }

    /// Puts a datagram straight onto the receiving end
    pub fn inject(&self, payload: Box<[u8]>) {
        self.lock().queue.push_back(payload);
    }

    /// The next `count` datagrams sent are lost
    pub fn drop_next(&self, count: usize) {
        self.lock().drop_next += count;
    }

    /// Datagrams waiting at the receiving end
    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn sent_count(&self) -> usize {
        self.lock().sent
    }

    pub fn dropped_count(&self) -> usize {
        self.lock().dropped
    }
}

struct LocalSender {
    link: LinkHandle,
}

impl PacketSender for LocalSender {
    fn send(&self, payload: &[u8]) -> Result<(), SendError> {
        self.link.lock().push(payload.into());
        Ok(())
    }
}

struct LocalReceiver {
    link: LinkHandle,
    last_payload: Option<Box<[u8]>>,
}

impl PacketReceiver for LocalReceiver {
    fn receive(&mut self) -> Result<Option<&[u8]>, RecvError> {
        let next = self.link.lock().queue.pop_front();
        self.last_payload = next;
        Ok(self.last_payload.as_deref())
    }
}

/// Pair of connected server and client endpoints for E2E testing
pub struct LocalSocketPair {
    pub server_sender: Box<dyn PacketSender>,
    pub server_receiver: Box<dyn PacketReceiver>,
    pub client_sender: Box<dyn PacketSender>,
    pub client_receiver: Box<dyn PacketReceiver>,
    /// Server to client direction
    pub to_client: LinkHandle,
    /// Client to server direction
    pub to_server: LinkHandle,
}

impl LocalSocketPair {
    pub fn new() -> Self {
        Self::with_conditioners(LinkConditioner::perfect(), LinkConditioner::perfect())
    }

    pub fn with_conditioners(to_client: LinkConditioner, to_server: LinkConditioner) -> Self {
        let to_client = LinkHandle::new(to_client);
        let to_server = LinkHandle::new(to_server);

        Self {
            server_sender: Box::new(LocalSender {
                link: to_client.clone(),
            }),
            server_receiver: Box::new(LocalReceiver {
                link: to_server.clone(),
                last_payload: None,
            }),
            client_sender: Box::new(LocalSender {
                link: to_server.clone(),
            }),
            client_receiver: Box::new(LocalReceiver {
                link: to_client.clone(),
                last_payload: None,
            }),
            to_client,
            to_server,
        }
    }
}

impl Default for LocalSocketPair {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{LinkConditioner, LocalSocketPair};

    #[test]
    fn datagrams_arrive_in_order() {
        let mut pair = LocalSocketPair::new();
        pair.client_sender.send(&[1]).unwrap();
        pair.client_sender.send(&[2]).unwrap();

        assert_eq!(pair.server_receiver.receive().unwrap(), Some(&[1u8][..]));
        assert_eq!(pair.server_receiver.receive().unwrap(), Some(&[2u8][..]));
        assert_eq!(pair.server_receiver.receive().unwrap(), None);
    }

    #[test]
    fn held_datagrams_can_be_taken() {
        let mut pair = LocalSocketPair::new();
        pair.to_client.hold();
        pair.server_sender.send(&[1]).unwrap();
        pair.server_sender.send(&[2]).unwrap();
        assert_eq!(pair.client_receiver.receive().unwrap(), None);

        let held = pair.to_client.take_held();
        assert_eq!(held.len(), 2);
        pair.to_client.inject(held[1].clone());
        assert_eq!(pair.client_receiver.receive().unwrap(), Some(&[2u8][..]));
    }

    #[test]
    fn full_loss_drops_everything() {
        let mut pair = LocalSocketPair::with_conditioners(
            LinkConditioner::lossy(1.0, 7),
            LinkConditioner::perfect(),
        );
        for _ in 0..10 {
            pair.server_sender.send(&[0]).unwrap();
        }
        assert_eq!(pair.to_client.dropped_count(), 10);
        assert_eq!(pair.client_receiver.receive().unwrap(), None);
    }

    #[test]
    fn drop_next_is_counted() {
        let pair = LocalSocketPair::new();
        pair.to_server.drop_next(1);
        pair.client_sender.send(&[1]).unwrap();
        pair.client_sender.send(&[2]).unwrap();
        assert_eq!(pair.to_server.pending(), 1);
        assert_eq!(pair.to_server.sent_count(), 2);
    }
}
