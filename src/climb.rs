//! Wall climbing, jumping and turning.

use tracing::debug;

use crate::{contact::ContactState, controller::Ctx, prelude::*};

/// Persistent climbing state of a character.
#[derive(Component, Clone, Copy, Reflect, Default, Debug, PartialEq)]
#[reflect(Component)]
pub struct ClimbState {
    pub climbing: bool,
    /// Climbing cannot start again until this reaches zero. Set by wall jumps.
    pub exit_cooldown_remaining: f32,
    /// Keeps the climb going (and the climb animation playing) through short contact gaps.
    pub anim_grace_remaining: f32,
    /// Jump input level of the previous tick, for edge detection.
    pub jump_was_pressed: bool,
}

impl ClimbState {
    pub(crate) fn tick(&mut self, dt: f32) {
        self.exit_cooldown_remaining = (self.exit_cooldown_remaining - dt).max(0.0);
        self.anim_grace_remaining = (self.anim_grace_remaining - dt).max(0.0);
    }

    /// Touching the ground always ends a climb.
    pub(crate) fn land(&mut self) {
        if self.climbing {
            debug!("landed while climbing");
        }
        self.climbing = false;
        self.anim_grace_remaining = 0.0;
    }
}

/// What happened to the jump input this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum JumpOutcome {
    None,
    Jump,
    WallJump,
}

/// Rotates the body around the vertical axis from the turn input.
pub(crate) fn turn(rotation: &mut Quat, ctx: &Ctx) {
    let yaw = -ctx.input.turn_axis() * ctx.cfg.turn_speed * ctx.dt;
    if yaw != 0.0 {
        *rotation = (Quat::from_rotation_y(yaw) * *rotation).normalize();
    }
}

/// Decides whether the character climbs this tick. Returns the new `climbing` flag.
pub(crate) fn update_climbing(
    climb: &mut ClimbState,
    contact: &ContactState,
    move_axis: f32,
    ctx: &Ctx,
) -> bool {
    let cfg = &ctx.cfg;
    let wall_confident =
        contact.on_wall && contact.wall_confidence() >= cfg.wall_climb_min_normal;
    let can_attempt =
        !contact.grounded && move_axis > 0.0 && climb.exit_cooldown_remaining <= 0.0;
    let holds = can_attempt && wall_confident;

    if !climb.climbing {
        if holds {
            debug!(confidence = contact.wall_confidence(), "started climbing");
            climb.climbing = true;
            climb.anim_grace_remaining = cfg.anim_grace_seconds;
        }
        return climb.climbing;
    }

    if contact.grounded || move_axis <= 0.0 {
        debug!("stopped climbing");
        climb.climbing = false;
    } else if holds {
        climb.anim_grace_remaining = cfg.anim_grace_seconds;
    } else if climb.anim_grace_remaining <= 0.0 {
        debug!("lost the wall");
        climb.climbing = false;
    }
    climb.climbing
}

/// Velocity while attached to a wall: pulled into it, moving up at a constant rate.
pub(crate) fn climb_velocity(contact: &ContactState, ctx: &Ctx) -> Vec3 {
    let pull = contact.wall_accumulator.clamp_length_max(1.0);
    (-pull * ctx.cfg.stick_speed).with_y(ctx.cfg.climb_speed)
}

/// Applies edge-triggered jumps. Holding the button only ever jumps once.
pub(crate) fn handle_jump(
    velocity: &mut Vec3,
    climb: &mut ClimbState,
    contact: &ContactState,
    ctx: &Ctx,
) -> JumpOutcome {
    let pressed = ctx.input.jump && !climb.jump_was_pressed;
    climb.jump_was_pressed = ctx.input.jump;
    if !pressed {
        return JumpOutcome::None;
    }

    if climb.climbing {
        *velocity = contact.wall_normal * ctx.cfg.wall_jump_launch
            + Vec3::Y * ctx.cfg.jump_impulse;
        climb.climbing = false;
        climb.anim_grace_remaining = 0.0;
        climb.exit_cooldown_remaining = ctx.cfg.exit_cooldown;
        debug!("wall jump");
        JumpOutcome::WallJump
    } else if contact.grounded {
        velocity.y = ctx.cfg.jump_impulse;
        JumpOutcome::Jump
    } else {
        JumpOutcome::None
    }
}
