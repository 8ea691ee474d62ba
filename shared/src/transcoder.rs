use std::marker::PhantomData;

use log::warn;
use rewind_ecs::{
    read, read_write, EcsContext, EntitySink, EntitySubscriptionRegistration, System,
    SystemRegistration,
};

use crate::channel::{MessageChannel, SharedMessageChannel};
use crate::components::{NetworkId, PacketComponent};
use crate::packet::{encode_addressed, split_addressed, Packet, PacketKind, WireError};
use crate::types::PeerId;

/// Where outbound packets go: a client sends to its server peer, the server
/// broadcasts to every connected client.
pub enum TranscoderDirection {
    ToPeer(PeerId),
    Broadcast,
}

/// The boundary system between the message channel and the ECS. Each tick it
/// clears last tick's received queues, decodes inbound envelopes into the
/// matching entity's `PacketComponent`, and flushes every outgoing queue
/// through the channel. Runs in phase 0 so gameplay systems in later phases
/// see a consistent received set.
pub struct PacketTranscoderSystem {
    channel: SharedMessageChannel,
    direction: TranscoderDirection,
    routes: Vec<Box<dyn PacketRoute>>,
}

impl PacketTranscoderSystem {
    pub fn new(channel: SharedMessageChannel, direction: TranscoderDirection) -> Self {
        Self {
            channel,
            direction,
            routes: Vec::new(),
        }
    }

    /// Registers a packet type for routing. Entities receive and send `P`
    /// through a `PacketComponent<P>` next to their `NetworkId`.
    pub fn register_route<P: Packet>(&mut self) {
        self.routes.push(Box::new(TypedPacketRoute::<P>::new()));
    }

    /// One subscription per route: every networked entity carrying the
    /// route's packet component.
    pub fn registration(&self) -> SystemRegistration {
        let subscriptions = self
            .routes
            .iter()
            .map(|route| route.subscription())
            .collect();
        SystemRegistration::new(subscriptions, 0)
    }
}

impl System for PacketTranscoderSystem {
    fn tick(&mut self, ctx: &EcsContext, _delta_time: f32) {
        for route in &self.routes {
            route.clear_received(ctx);
        }

        let envelopes = { self.channel.lock().drain_received() };
        for envelope in envelopes {
            let Some(route) = self
                .routes
                .iter()
                .find(|route| route.kind() == envelope.kind)
            else {
                warn!(
                    "received packet of unrouted kind {:?} from {}",
                    envelope.kind, envelope.sender
                );
                continue;
            };

            // network input is untrusted: malformed payloads are dropped, not
            // propagated
            match split_addressed(&envelope.payload) {
                Err(error) => {
                    warn!("dropping packet from {}: {error}", envelope.sender);
                }
                Ok((uid, body)) => match route.deliver(ctx, uid, body) {
                    Ok(true) => {}
                    Ok(false) => {
                        warn!(
                            "no networked entity with uid {uid} for {:?} packet from {}",
                            envelope.kind, envelope.sender
                        );
                    }
                    Err(error) => {
                        warn!("dropping packet from {}: {error}", envelope.sender);
                    }
                },
            }
        }

        let mut channel = self.channel.lock();
        for route in &self.routes {
            route.flush(ctx, &mut *channel, &self.direction);
        }
    }
}

/// Type-erased per-packet-kind route, one per registered packet type.
trait PacketRoute: Send {
    fn kind(&self) -> PacketKind;
    fn subscription(&self) -> EntitySubscriptionRegistration;
    fn clear_received(&self, ctx: &EcsContext);
    /// Delivers decoded bytes to the entity with the given uid. Returns
    /// `Ok(false)` when no subscribed entity carries that uid.
    fn deliver(&self, ctx: &EcsContext, uid: u64, payload: &[u8]) -> Result<bool, WireError>;
    fn flush(
        &self,
        ctx: &EcsContext,
        channel: &mut dyn MessageChannel,
        direction: &TranscoderDirection,
    );
}

struct TypedPacketRoute<P: Packet> {
    sink: EntitySink,
    _packet: PhantomData<fn() -> P>,
}

impl<P: Packet> TypedPacketRoute<P> {
    fn new() -> Self {
        Self {
            sink: EntitySink::new(),
            _packet: PhantomData,
        }
    }
}

impl<P: Packet> PacketRoute for TypedPacketRoute<P> {
    fn kind(&self) -> PacketKind {
        P::KIND
    }

    fn subscription(&self) -> EntitySubscriptionRegistration {
        EntitySubscriptionRegistration::new(
            vec![read::<NetworkId>(), read_write::<PacketComponent<P>>()],
            self.sink.clone(),
        )
    }

    fn clear_received(&self, ctx: &EcsContext) {
        let packets = ctx.array::<PacketComponent<P>>();
        let mut packets = packets.write();
        for entity in self.sink.entities() {
            if let Some(component) = packets.get_mut(entity) {
                component.clear_received();
            }
        }
    }

    fn deliver(&self, ctx: &EcsContext, uid: u64, payload: &[u8]) -> Result<bool, WireError> {
        let packet = crate::packet::decode::<P>(payload)?;

        let network_ids = ctx.array::<NetworkId>();
        let network_ids = network_ids.read();
        let target = self
            .sink
            .entities()
            .into_iter()
            .find(|&entity| network_ids.get(entity).map(|id| id.uid) == Some(uid));
        drop(network_ids);

        let Some(entity) = target else {
            return Ok(false);
        };

        let packets = ctx.array::<PacketComponent<P>>();
        let mut packets = packets.write();
        if let Some(component) = packets.get_mut(entity) {
            component.push_received(packet);
        }
        Ok(true)
    }

    fn flush(
        &self,
        ctx: &EcsContext,
        channel: &mut dyn MessageChannel,
        direction: &TranscoderDirection,
    ) {
        let network_ids = ctx.array::<NetworkId>();
        let packets = ctx.array::<PacketComponent<P>>();

        for entity in self.sink.entities() {
            let Some(uid) = network_ids.read().get(entity).map(|id| id.uid) else {
                continue;
            };

            let outgoing = packets
                .write()
                .get_mut(entity)
                .map(|component| component.drain_outgoing())
                .unwrap_or_default();

            for packet in outgoing {
                match encode_addressed(uid, &packet) {
                    Ok(bytes) => match direction {
                        TranscoderDirection::ToPeer(peer) => {
                            channel.send_reliable(*peer, P::KIND, bytes);
                        }
                        TranscoderDirection::Broadcast => {
                            channel.send_reliable_broadcast(P::KIND, bytes);
                        }
                    },
                    Err(error) => {
                        warn!("failed to flush outgoing packet for uid {uid}: {error}");
                    }
                }
            }
        }
    }
}
