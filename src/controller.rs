use bevy_ecs::{intern::Interned, schedule::ScheduleLabel};
use tracing::trace;

use crate::{
    climb::{self, ClimbState},
    contact::{self, ContactSample, ContactState},
    input::AccumulatedInput,
    movement,
    prelude::*,
};

pub(super) fn plugin(schedule: Interned<dyn ScheduleLabel>) -> impl Fn(&mut App) {
    move |app: &mut App| {
        app.register_type::<ContactState>()
            .register_type::<ClimbState>()
            .add_systems(
                schedule,
                run_controller
                    .run_if(resource_exists::<Time<Physics>>)
                    .in_set(ClamberSystems::MoveCharacters),
            );
    }
}

/// Per-tick snapshot shared by every stage. Config changes made mid-tick are seen next tick.
#[derive(Debug)]
pub(crate) struct Ctx {
    pub(crate) cfg: CharacterController,
    pub(crate) input: AccumulatedInput,
    pub(crate) dt: f32,
}

fn run_controller(
    mut characters: Query<(
        Entity,
        &CharacterController,
        &CharacterControllerState,
        &AccumulatedInput,
        &mut ContactState,
        &mut ClimbState,
        &Position,
        &mut Rotation,
        &mut LinearVelocity,
        &mut Friction,
    )>,
    collisions: Collisions,
    time: Res<Time>,
    mut samples: Local<Vec<ContactSample>>,
) {
    for (
        entity,
        cfg,
        state,
        input,
        mut contact,
        mut climb,
        position,
        mut rotation,
        mut velocity,
        mut friction,
    ) in &mut characters
    {
        let ctx = Ctx {
            cfg: cfg.clone(),
            input: *input,
            dt: time.delta_secs(),
        };
        climb.tick(ctx.dt);

        contact::collect_samples(entity, &collisions, &mut samples);
        *contact = contact::classify_contacts(
            samples.iter(),
            state.feet_y(position.0),
            state.height,
            &ctx.cfg,
        );
        if contact.grounded {
            climb.land();
        }

        climb::turn(&mut rotation.0, &ctx);

        let climbing =
            climb::update_climbing(&mut climb, &contact, ctx.input.move_axis(), &ctx);
        let wall_sliding = if climbing {
            velocity.0 = climb::climb_velocity(&contact, &ctx);
            false
        } else {
            movement::integrate(&mut velocity.0, rotation.0, &contact, &ctx)
        };

        let jump = climb::handle_jump(&mut velocity.0, &mut climb, &contact, &ctx);
        trace!(
            ?entity,
            grounded = contact.grounded,
            on_wall = contact.on_wall,
            climbing = climb.climbing,
            ?jump,
            "character tick"
        );

        let target = body_friction(climb.climbing || wall_sliding, cfg);
        if *friction != target {
            *friction = target;
        }
    }
}

/// Friction of the body for this tick. While sliding, the `Min` combine rule keeps the touched
/// surface from raising it above `slide_friction`.
pub(crate) fn body_friction(sliding: bool, cfg: &CharacterController) -> Friction {
    if sliding {
        Friction::new(cfg.slide_friction).with_combine_rule(CoefficientCombine::Min)
    } else {
        Friction::new(cfg.friction)
    }
}
