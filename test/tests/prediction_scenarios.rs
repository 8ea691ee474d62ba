//! End-to-end prediction scenarios over an in-memory channel pair: clean
//! confirmation, server-side divergence with rollback, and burst draining of
//! delayed acknowledgements.

use glam::Vec3;
use rewind_client::PlayerInput;
use rewind_shared::KinematicCharacterController;
use rewind_test::Duplex;

const FORWARD: PlayerInput = PlayerInput {
    delta_action: [0, 0, 1],
    walking: false,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn matching_simulations_confirm_without_correction() {
    init_logging();

    let duplex = Duplex::new(
        KinematicCharacterController::default(),
        KinematicCharacterController::default(),
        Vec3::ZERO,
    );
    duplex.input.lock().push_repeated(FORWARD, 10);

    duplex.run_frames(30);

    // confirmations kept pace with simulation, minus channel latency
    let approved = duplex.client.simulation_tick_approved();
    let simulated = duplex.client.simulation_tick();
    assert!(approved >= 0, "no tick was ever approved");
    assert!(simulated - approved <= 6, "confirmations fell behind: approved {approved}, simulated {simulated}");

    // the prediction held: both endpoints agree on where the player is
    let predicted = duplex.client.predicted_position().unwrap();
    let authoritative = duplex
        .server
        .authoritative_position(duplex.server_player)
        .unwrap();
    assert!(
        predicted.distance(authoritative) < 1.0e-3,
        "client at {predicted:?}, server at {authoritative:?}"
    );
    assert!(predicted.z > 0.5, "the player never moved");
}

#[test]
fn server_side_wall_snaps_the_client_and_replays_to_convergence() {
    init_logging();

    // the server knows about a wall at z = 0.5 the client does not simulate
    let duplex = Duplex::new(
        KinematicCharacterController::default(),
        KinematicCharacterController {
            blocking_plane_z: Some(0.5),
            ..Default::default()
        },
        Vec3::ZERO,
    );
    duplex.input.lock().push_repeated(FORWARD, 12);

    duplex.run_frames(60);

    let authoritative = duplex
        .server
        .authoritative_position(duplex.server_player)
        .unwrap();
    assert!(
        (authoritative.z - 0.5).abs() < 1.0e-4,
        "server should have clamped at the wall, got {authoritative:?}"
    );

    // after rollback and replay the client has converged onto the wall
    let predicted = duplex.client.predicted_position().unwrap();
    assert!(
        predicted.distance(authoritative) < 1.0e-3,
        "client at {predicted:?} never converged onto server at {authoritative:?}"
    );

    let approved = duplex.client.simulation_tick_approved();
    assert!(
        approved >= 12,
        "every wall-era tick should have been confirmed eventually, approved only {approved}"
    );
}

#[test]
fn burst_of_delayed_acknowledgements_drains_in_one_frame() {
    init_logging();

    let duplex = Duplex::new(
        KinematicCharacterController::default(),
        KinematicCharacterController::default(),
        Vec3::ZERO,
    );
    duplex.input.lock().push_repeated(FORWARD, 20);

    // the server stalls while the client keeps simulating ahead
    for _ in 0..6 {
        duplex.client.tick(rewind_test::FIXED_TIMESTEP);
    }
    assert_eq!(duplex.client.simulation_tick_approved(), -1);

    // the server catches up and its echoes arrive as one burst
    duplex.server.tick(rewind_test::FIXED_TIMESTEP);
    duplex.server.tick(rewind_test::FIXED_TIMESTEP);
    duplex.client.tick(rewind_test::FIXED_TIMESTEP);

    let approved = duplex.client.simulation_tick_approved();
    assert!(
        approved >= 3,
        "a burst of echoes should confirm several ticks in one frame, approved {approved}"
    );
}
