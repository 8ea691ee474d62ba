//! Shared harness for the cross-crate integration tests: one server and one
//! client wired over an in-memory channel pair.

use std::sync::Arc;

use glam::Vec3;
use parking_lot::Mutex;
use rewind_client::{InputSource, PlayerInput, ReplayClient, ScriptedInput};
use rewind_ecs::{EcsContext, Entity};
use rewind_server::ReplayServer;
use rewind_shared::{KinematicCharacterController, MemoryChannel, PeerId};

pub const FIXED_TIMESTEP: f32 = 1.0 / 60.0;
pub const SERVER_PEER: PeerId = PeerId(0);
pub const CLIENT_PEER: PeerId = PeerId(1);

/// Input source handle the test keeps while the client owns the boxed side.
pub struct SharedInput(pub Arc<Mutex<ScriptedInput>>);

impl InputSource for SharedInput {
    fn sample(&mut self) -> PlayerInput {
        self.0.lock().sample()
    }
}

pub struct Duplex {
    pub server: ReplayServer,
    pub client: ReplayClient,
    pub input: Arc<Mutex<ScriptedInput>>,
    pub server_player: Entity,
    pub client_player: Entity,
}

impl Duplex {
    /// Wires a fresh server/client pair. The server's controller may differ
    /// from the client's (e.g. carry a blocking plane the client does not
    /// know about) to provoke genuine prediction errors.
    pub fn new(
        client_controller: KinematicCharacterController,
        server_controller: KinematicCharacterController,
        spawn_position: Vec3,
    ) -> Self {
        let mut server_endpoint = MemoryChannel::new(SERVER_PEER);
        let mut client_endpoint = MemoryChannel::new(CLIENT_PEER);
        MemoryChannel::connect(&mut server_endpoint, &mut client_endpoint);

        let server = ReplayServer::new(
            EcsContext::with_worker_threads(2),
            server_endpoint.into_shared(),
            server_controller,
        );
        let server_player = server.spawn_player(CLIENT_PEER, spawn_position);

        let input = Arc::new(Mutex::new(ScriptedInput::new()));
        let mut client = ReplayClient::new(
            EcsContext::with_worker_threads(2),
            client_endpoint.into_shared(),
            SERVER_PEER,
            Box::new(SharedInput(Arc::clone(&input))),
            client_controller,
            FIXED_TIMESTEP,
        );
        let client_player = client.spawn_local_player(CLIENT_PEER.0, spawn_position);

        Self {
            server,
            client,
            input,
            server_player,
            client_player,
        }
    }

    /// One frame of the whole loop: the client simulates and sends, then the
    /// server consumes and echoes.
    pub fn frame(&self) {
        self.client.tick(FIXED_TIMESTEP);
        self.server.tick(FIXED_TIMESTEP);
    }

    pub fn run_frames(&self, frames: usize) {
        for _ in 0..frames {
            self.frame();
        }
    }
}
