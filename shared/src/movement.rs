use glam::{Quat, Vec3};

pub const RUN_SPEED: f32 = 4.0;
pub const WALK_SPEED: f32 = 2.0;
pub const JUMP_SPEED: f32 = 5.0;

/// Derives the horizontal velocity from the orientation and the discrete
/// movement deltas (right, up, forward), and sets the vertical velocity on a
/// jump delta. Pure arithmetic over its inputs; the prediction protocol's
/// replay determinism depends on that.
pub fn compute_velocity(rotation: Quat, delta_action: [i8; 3], walking: bool, velocity: &mut Vec3) {
    let [right, up, forward] = delta_action;

    if right == 0 && forward == 0 {
        velocity.x = 0.0;
        velocity.z = 0.0;
    } else {
        let mut direction = rotation * Vec3::new(f32::from(right), 0.0, f32::from(forward));
        direction.y = 0.0;
        let direction = direction.normalize_or_zero();

        let speed = if walking { WALK_SPEED } else { RUN_SPEED };
        velocity.x = direction.x * speed;
        velocity.z = direction.z * speed;
    }

    if up > 0 {
        velocity.y = JUMP_SPEED;
    }
}

/// The narrow seam to the out-of-scope physics service: advances one entity's
/// kinematic state by one fixed step.
pub trait CharacterController: Send + Sync {
    fn step(&self, delta_time: f32, position: &mut Vec3, velocity: &mut Vec3);
    fn is_grounded(&self, position: Vec3) -> bool;
}

/// Deterministic kinematic integrator: gravity, a ground plane, and an
/// optional blocking plane normal to +z standing in for level geometry.
#[derive(Clone, Copy, Debug)]
pub struct KinematicCharacterController {
    pub gravity: f32,
    pub ground_height: f32,
    pub blocking_plane_z: Option<f32>,
}

impl Default for KinematicCharacterController {
    fn default() -> Self {
        Self {
            gravity: 9.81,
            ground_height: 0.0,
            blocking_plane_z: None,
        }
    }
}

impl CharacterController for KinematicCharacterController {
    fn step(&self, delta_time: f32, position: &mut Vec3, velocity: &mut Vec3) {
        velocity.y -= self.gravity * delta_time;
        *position += *velocity * delta_time;

        if let Some(plane_z) = self.blocking_plane_z {
            if position.z > plane_z {
                position.z = plane_z;
            }
        }

        if position.y <= self.ground_height {
            position.y = self.ground_height;
            velocity.y = 0.0;
        }
    }

    fn is_grounded(&self, position: Vec3) -> bool {
        position.y <= self.ground_height + 1.0e-4
    }
}

#[cfg(test)]
mod tests {
    use glam::{Quat, Vec3};

    use super::{compute_velocity, CharacterController, KinematicCharacterController, RUN_SPEED, WALK_SPEED};

    #[test]
    fn forward_input_moves_along_the_facing_direction() {
        let mut velocity = Vec3::ZERO;
        compute_velocity(Quat::IDENTITY, [0, 0, 1], false, &mut velocity);

        assert!((velocity.z - RUN_SPEED).abs() < 1.0e-6);
        assert_eq!(velocity.x, 0.0);
    }

    #[test]
    fn walking_halves_the_speed() {
        let mut velocity = Vec3::ZERO;
        compute_velocity(Quat::IDENTITY, [1, 0, 0], true, &mut velocity);

        assert!((velocity.x - WALK_SPEED).abs() < 1.0e-6);
    }

    #[test]
    fn no_horizontal_input_zeroes_horizontal_velocity_only() {
        let mut velocity = Vec3::new(3.0, -2.0, 4.0);
        compute_velocity(Quat::IDENTITY, [0, 0, 0], false, &mut velocity);

        assert_eq!(velocity.x, 0.0);
        assert_eq!(velocity.z, 0.0);
        assert_eq!(velocity.y, -2.0);
    }

    #[test]
    fn controller_step_is_deterministic() {
        let controller = KinematicCharacterController::default();

        let mut position_a = Vec3::new(0.0, 0.0, 0.0);
        let mut velocity_a = Vec3::new(1.0, 0.0, 2.0);
        let mut position_b = position_a;
        let mut velocity_b = velocity_a;

        for _ in 0..60 {
            controller.step(1.0 / 60.0, &mut position_a, &mut velocity_a);
            controller.step(1.0 / 60.0, &mut position_b, &mut velocity_b);
        }

        assert_eq!(position_a, position_b);
        assert_eq!(velocity_a, velocity_b);
    }

    #[test]
    fn blocking_plane_clamps_forward_motion() {
        let controller = KinematicCharacterController {
            blocking_plane_z: Some(1.0),
            ..Default::default()
        };

        let mut position = Vec3::ZERO;
        let mut velocity = Vec3::new(0.0, 0.0, 100.0);
        controller.step(1.0 / 60.0, &mut position, &mut velocity);

        assert_eq!(position.z, 1.0);
    }

    #[test]
    fn ground_plane_stops_falling() {
        let controller = KinematicCharacterController::default();

        let mut position = Vec3::new(0.0, 0.5, 0.0);
        let mut velocity = Vec3::ZERO;
        for _ in 0..120 {
            controller.step(1.0 / 60.0, &mut position, &mut velocity);
        }

        assert_eq!(position.y, 0.0);
        assert_eq!(velocity.y, 0.0);
        assert!(controller.is_grounded(position));
    }
}
