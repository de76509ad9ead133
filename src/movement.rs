//! Locomotion velocity: acceleration limits, wall sliding, strafe damping.

use tracing::warn;

use crate::{contact::ContactState, controller::Ctx, prelude::*};

/// Flattened forward (`-Z`) and right (`+X`) axes of a yaw rotation.
pub fn ground_basis(rotation: Quat) -> (Vec3, Vec3) {
    let forward = (rotation * Vec3::NEG_Z).with_y(0.0).normalize_or_zero();
    let right = (rotation * Vec3::X).with_y(0.0).normalize_or_zero();
    (forward, right)
}

/// Removes the part of `velocity` that pushes into the wall.
pub(crate) fn strip_into_wall(velocity: Vec3, wall_normal: Vec3) -> Vec3 {
    let into = velocity.dot(wall_normal);
    if into < 0.0 {
        velocity - wall_normal * into
    } else {
        velocity
    }
}

/// Forward input for this tick after applying the mid-air rule.
pub(crate) fn effective_move_axis(contact: &ContactState, ctx: &Ctx) -> f32 {
    if !contact.grounded && !ctx.cfg.move_midair {
        0.0
    } else {
        ctx.input.move_axis()
    }
}

/// Integrates the locomotion velocity for one tick.
///
/// Returns whether the character is sliding down a wall; the caller picks friction from that.
pub(crate) fn integrate(
    velocity: &mut Vec3,
    rotation: Quat,
    contact: &ContactState,
    ctx: &Ctx,
) -> bool {
    let cfg = &ctx.cfg;
    let move_axis = effective_move_axis(contact, ctx);
    let (forward, right) = ground_basis(rotation);

    let wall_sliding = !contact.grounded && contact.on_wall && move_axis != 0.0;

    let mut desired = forward * cfg.max_speed * move_axis;
    if wall_sliding {
        desired = strip_into_wall(desired, contact.wall_normal);
    }

    let (accel, brake) = if contact.grounded {
        (cfg.accel, cfg.brake)
    } else {
        (cfg.air_accel * cfg.mid_air_dampen, cfg.air_brake)
    };
    let target = if move_axis != 0.0 { desired } else { Vec3::ZERO };
    let rate = if target != Vec3::ZERO { accel } else { brake };

    let mut horizontal = velocity.with_y(0.0);
    horizontal += (target - horizontal).clamp_length_max(rate * ctx.dt);

    if cfg.strafe_damping {
        let side_damp = if contact.grounded {
            cfg.side_damp_ground
        } else {
            cfg.side_damp_air
        };
        let forward_speed = horizontal.dot(forward);
        let side_speed = horizontal.dot(right) * (-side_damp * ctx.dt).exp();
        horizontal = forward * forward_speed + right * side_speed;
    }

    horizontal = horizontal.clamp_length_max(cfg.max_speed);

    let mut vertical = velocity.y;
    if wall_sliding {
        vertical = vertical.max(cfg.wall_slide_max_fall_speed);
        horizontal = strip_into_wall(horizontal, contact.wall_normal);
    }

    *velocity = horizontal.with_y(vertical);
    validate_velocity(velocity);
    wall_sliding
}

pub(crate) fn validate_velocity(velocity: &mut Vec3) {
    for i in 0..3 {
        if !velocity[i].is_finite() {
            warn!("velocity[{i}] is not finite: {}, setting to 0", velocity[i]);
            velocity[i] = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::AccumulatedInput;

    const DT: f32 = 1.0 / 60.0;

    fn ctx(movement: Vec2) -> Ctx {
        Ctx {
            cfg: CharacterController::default(),
            input: AccumulatedInput {
                movement,
                jump: false,
            },
            dt: DT,
        }
    }

    fn grounded() -> ContactState {
        ContactState {
            grounded: true,
            ..default()
        }
    }

    fn wall(normal: Vec3) -> ContactState {
        ContactState {
            on_wall: true,
            wall_normal: normal,
            wall_accumulator: normal,
            ..default()
        }
    }

    #[test]
    fn accelerates_linearly_without_overshoot() {
        let ctx = ctx(Vec2::Y);
        let mut velocity = Vec3::ZERO;
        let mut previous = 0.0;
        for frame in 1..=120 {
            integrate(&mut velocity, Quat::IDENTITY, &grounded(), &ctx);
            let speed = velocity.with_y(0.0).length();
            let expected = (ctx.cfg.accel * DT * frame as f32).min(ctx.cfg.max_speed);
            assert!((speed - expected).abs() < 1e-3, "frame {frame}: {speed} vs {expected}");
            assert!(speed >= previous);
            assert!(speed <= ctx.cfg.max_speed + 1e-4);
            previous = speed;
        }
        // Forward is -Z
        assert!(velocity.z < 0.0);
        assert!(velocity.x.abs() < 1e-4);
    }

    #[test]
    fn brakes_to_rest_without_input() {
        let ctx = ctx(Vec2::ZERO);
        let mut velocity = vec3(3.0, -1.0, -2.0);
        for _ in 0..60 {
            integrate(&mut velocity, Quat::IDENTITY, &grounded(), &ctx);
        }
        assert_eq!(velocity.x, 0.0);
        assert_eq!(velocity.z, 0.0);
        assert_eq!(velocity.y, -1.0);
    }

    #[test]
    fn speed_is_capped() {
        let ctx = ctx(Vec2::Y);
        let rotations = [0.0_f32, 0.7, 2.0, -1.3];
        for yaw in rotations {
            let mut velocity = vec3(40.0, 3.0, -25.0);
            let rotation = Quat::from_rotation_y(yaw);
            for contact in [grounded(), ContactState::default(), wall(Vec3::X)] {
                integrate(&mut velocity, rotation, &contact, &ctx);
                assert!(velocity.with_y(0.0).length() <= ctx.cfg.max_speed + 1e-4);
            }
        }
    }

    #[test]
    fn side_velocity_decays() {
        let ctx = ctx(Vec2::ZERO);
        let mut velocity = vec3(2.0, 0.0, 0.0);
        integrate(&mut velocity, Quat::IDENTITY, &ContactState::default(), &ctx);
        let braked = 2.0 - ctx.cfg.air_brake * DT;
        let expected = braked * (-ctx.cfg.side_damp_air * DT).exp();
        assert!((velocity.x - expected).abs() < 1e-4);
    }

    #[test]
    fn wall_slide_caps_fall_speed() {
        let ctx = ctx(Vec2::Y);
        let mut velocity = vec3(0.0, -20.0, 0.0);
        // Facing -Z, wall in front with its normal pointing back at us
        let sliding = integrate(&mut velocity, Quat::IDENTITY, &wall(Vec3::Z), &ctx);
        assert!(sliding);
        assert_eq!(velocity.y, ctx.cfg.wall_slide_max_fall_speed);
        assert!(velocity.z >= 0.0, "no velocity into the wall: {velocity}");
    }

    #[test]
    fn wall_slide_keeps_slower_falls() {
        let ctx = ctx(Vec2::Y);
        let mut velocity = vec3(0.0, -1.0, 0.0);
        integrate(&mut velocity, Quat::IDENTITY, &wall(Vec3::Z), &ctx);
        assert_eq!(velocity.y, -1.0);
    }

    #[test]
    fn no_wall_slide_without_input() {
        let ctx = ctx(Vec2::ZERO);
        let mut velocity = vec3(0.0, -20.0, 0.0);
        let sliding = integrate(&mut velocity, Quat::IDENTITY, &wall(Vec3::Z), &ctx);
        assert!(!sliding);
        assert_eq!(velocity.y, -20.0);
    }

    #[test]
    fn wall_slide_redirects_along_wall() {
        let ctx = ctx(Vec2::Y);
        let mut velocity = Vec3::ZERO;
        // Facing diagonally into a wall whose normal is +Z
        let rotation = Quat::from_rotation_y(core::f32::consts::FRAC_PI_4);
        for _ in 0..30 {
            integrate(&mut velocity, rotation, &wall(Vec3::Z), &ctx);
            assert!(velocity.z >= -1e-5);
        }
        assert!(velocity.x.abs() > 0.0);
    }

    #[test]
    fn midair_input_ignored_when_disabled() {
        let mut ctx = ctx(Vec2::Y);
        ctx.cfg.move_midair = false;
        ctx.cfg.strafe_damping = false;
        ctx.cfg.air_brake = 0.0;
        let mut velocity = vec3(1.0, 2.0, 0.0);
        integrate(&mut velocity, Quat::IDENTITY, &ContactState::default(), &ctx);
        assert_eq!(velocity, vec3(1.0, 2.0, 0.0));
    }

    #[test]
    fn non_finite_velocity_is_zeroed() {
        let ctx = ctx(Vec2::ZERO);
        let mut velocity = vec3(0.0, f32::NAN, 0.0);
        integrate(&mut velocity, Quat::IDENTITY, &grounded(), &ctx);
        assert_eq!(velocity, Vec3::ZERO);
    }
}
