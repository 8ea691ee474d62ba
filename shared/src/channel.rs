use std::collections::VecDeque;
use std::sync::Arc;

use log::warn;
use parking_lot::Mutex;

use crate::packet::PacketKind;
use crate::types::PeerId;

/// One inbound message as surfaced by the networking layer: who sent it, what
/// packet kind it carries, and the raw payload bytes.
#[derive(Clone, Debug)]
pub struct MessageEnvelope {
    pub sender: PeerId,
    pub kind: PacketKind,
    pub payload: Vec<u8>,
}

/// The fixed contract of the out-of-scope networking transport. Reliable
/// sends are delivered at-least-once with resend-until-ack; unreliable sends
/// are best-effort and may arrive out of order.
pub trait MessageChannel: Send {
    fn send_reliable(&mut self, peer: PeerId, kind: PacketKind, payload: Vec<u8>);
    fn send_unreliable(&mut self, peer: PeerId, kind: PacketKind, payload: Vec<u8>);
    fn send_reliable_broadcast(&mut self, kind: PacketKind, payload: Vec<u8>);
    fn drain_received(&mut self) -> Vec<MessageEnvelope>;
}

/// Channel handle shared between the transcoder system and the owning
/// client/server object.
pub type SharedMessageChannel = Arc<Mutex<dyn MessageChannel>>;

type Inbox = Arc<Mutex<VecDeque<MessageEnvelope>>>;

/// In-process channel endpoint delivering into connected peers' inboxes.
/// Used by tests and single-process client/server harnesses; a real transport
/// adapter delivers through [`MemoryChannel::enqueue_inbound`] the same way.
pub struct MemoryChannel {
    local_peer: PeerId,
    inbox: Inbox,
    remotes: Vec<(PeerId, Inbox)>,
}

impl MemoryChannel {
    pub fn new(local_peer: PeerId) -> Self {
        Self {
            local_peer,
            inbox: Arc::new(Mutex::new(VecDeque::new())),
            remotes: Vec::new(),
        }
    }

    pub fn local_peer(&self) -> PeerId {
        self.local_peer
    }

    /// Wires two endpoints together so each can deliver into the other.
    pub fn connect(a: &mut MemoryChannel, b: &mut MemoryChannel) {
        a.remotes.push((b.local_peer, Arc::clone(&b.inbox)));
        b.remotes.push((a.local_peer, Arc::clone(&a.inbox)));
    }

    /// Receive-side delivery entry point. Tests use it to script arbitrary
    /// arrival orders.
    pub fn enqueue_inbound(&self, envelope: MessageEnvelope) {
        self.inbox.lock().push_back(envelope);
    }

    pub fn into_shared(self) -> SharedMessageChannel {
        Arc::new(Mutex::new(self))
    }

    fn deliver(&self, peer: PeerId, kind: PacketKind, payload: Vec<u8>) {
        let Some((_, inbox)) = self.remotes.iter().find(|(remote, _)| *remote == peer) else {
            warn!("attempted to send {kind:?} to unconnected {peer}");
            return;
        };
        inbox.lock().push_back(MessageEnvelope {
            sender: self.local_peer,
            kind,
            payload,
        });
    }
}

impl MessageChannel for MemoryChannel {
    fn send_reliable(&mut self, peer: PeerId, kind: PacketKind, payload: Vec<u8>) {
        self.deliver(peer, kind, payload);
    }

    fn send_unreliable(&mut self, peer: PeerId, kind: PacketKind, payload: Vec<u8>) {
        // the in-process link is lossless, so best-effort delivery degenerates
        // to reliable delivery
        self.deliver(peer, kind, payload);
    }

    fn send_reliable_broadcast(&mut self, kind: PacketKind, payload: Vec<u8>) {
        for (peer, _) in self.remotes.clone() {
            self.deliver(peer, kind, payload.clone());
        }
    }

    fn drain_received(&mut self) -> Vec<MessageEnvelope> {
        self.inbox.lock().drain(..).collect()
    }
}
