#![doc = include_str!("../readme.md")]

/// Everything you need to get started with `bevy_clamber`
pub mod prelude {
    pub(crate) use {
        avian3d::prelude::*,
        bevy_app::prelude::*,
        bevy_derive::{Deref, DerefMut},
        bevy_ecs::prelude::*,
        bevy_enhanced_input::prelude::*,
        bevy_math::prelude::*,
        bevy_reflect::prelude::*,
        bevy_time::prelude::*,
        bevy_transform::prelude::*,
        bevy_utils::prelude::*,
    };

    pub use crate::{
        CharacterController, CharacterControllerState, ClamberPlugin, ClamberSystems,
        animation::{AnimationState, CharacterAnimations, CharacterAnimator, ClipTable},
        camera::{FollowCamera, FollowCameraOf, FollowCameraState, FollowCameraTarget},
        climb::ClimbState,
        contact::ContactState,
        input::{AccumulatedInput, CaptureCamera, Jump, Movement, RotateCamera, Zoom},
    };
}

use crate::{
    animation::CharacterAnimator, climb::ClimbState, contact::ContactState,
    input::AccumulatedInput, prelude::*,
};
use bevy_ecs::{
    intern::Interned, lifecycle::HookContext, schedule::ScheduleLabel, world::DeferredWorld,
};
use tracing::warn;

pub mod animation;
pub mod camera;
pub mod climb;
pub mod contact;
mod controller;
pub mod input;
pub mod movement;
#[cfg(test)]
mod test_app;

/// Also requires you to add [`PhysicsPlugins`] and [`EnhancedInputPlugin`] to work properly.
/// Clip playback additionally needs Bevy's `AnimationPlugin`.
pub struct ClamberPlugin {
    schedule: Interned<dyn ScheduleLabel>,
}

impl ClamberPlugin {
    /// Create a new plugin in the given schedule. The default is [`FixedPostUpdate`].
    ///
    /// Must be the schedule [`PhysicsPlugins`] runs in: the controller reads the
    /// contacts of the step that just finished.
    pub fn new(schedule: impl ScheduleLabel) -> Self {
        Self {
            schedule: schedule.intern(),
        }
    }
}

impl Default for ClamberPlugin {
    fn default() -> Self {
        Self {
            schedule: FixedPostUpdate.intern(),
        }
    }
}

impl Plugin for ClamberPlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(
            self.schedule,
            (ClamberSystems::MoveCharacters, ClamberSystems::Animate)
                .chain()
                .after(PhysicsSystems::Last),
        )
        .register_type::<CharacterController>()
        .register_type::<CharacterControllerState>()
        .add_plugins((
            input::plugin,
            controller::plugin(self.schedule),
            animation::plugin(self.schedule),
            camera::plugin,
        ));
    }
}

/// System sets used by all fixed-step systems of `bevy_clamber`.
#[derive(SystemSet, Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum ClamberSystems {
    /// Contact classification, climbing, movement and jumping.
    MoveCharacters,
    /// Animation state selection and clip playback.
    Animate,
}

/// Tunables of a climbing character. Read once per tick; edit freely between ticks.
///
/// Timers are in seconds, speeds in meters per second, rates in meters per second squared.
#[derive(Component, Clone, Reflect, Debug)]
#[reflect(Component)]
#[require(
    AccumulatedInput,
    CharacterControllerState,
    ContactState,
    ClimbState,
    CharacterAnimator,
    TranslationInterpolation,
    RigidBody = RigidBody::Dynamic,
    Collider = Collider::capsule(0.35, 1.1),
    LockedAxes = LockedAxes::ROTATION_LOCKED,
    Friction = Friction::new(0.5),
    Mass = Mass(70.0),
    SleepingDisabled,
    Transform,
)]
#[component(on_add=CharacterController::on_add)]
pub struct CharacterController {
    /// Used by the animation ground probe. The character itself is always excluded.
    pub filter: SpatialQueryFilter,
    /// Contacts this far apart still count as touching.
    pub contact_tolerance: f32,
    pub ground_band_fraction: f32,
    pub ground_normal_min_y: f32,
    pub wall_normal_max_y: f32,
    pub max_speed: f32,
    pub accel: f32,
    pub brake: f32,
    pub air_accel: f32,
    pub air_brake: f32,
    pub mid_air_dampen: f32,
    /// Allow steering while airborne. When false, jumps are purely ballistic.
    pub move_midair: bool,
    pub strafe_damping: bool,
    pub side_damp_ground: f32,
    pub side_damp_air: f32,
    /// Negative. Vertical velocity is floored at this while sliding down a wall.
    pub wall_slide_max_fall_speed: f32,
    pub friction: f32,
    pub slide_friction: f32,
    /// Radians per second.
    pub turn_speed: f32,
    pub jump_impulse: f32,
    pub wall_jump_launch: f32,
    pub wall_climb_min_normal: f32,
    pub climb_speed: f32,
    pub stick_speed: f32,
    pub exit_cooldown: f32,
    pub anim_grace_seconds: f32,
    pub anim_air_min_time: f32,
    /// How far below the feet the animation ground probe reaches.
    pub anim_ground_probe: f32,
    pub move_speed_threshold: f32,
    pub fade_seconds: f32,
}

impl Default for CharacterController {
    fn default() -> Self {
        Self {
            filter: SpatialQueryFilter::default(),
            contact_tolerance: 0.02,
            ground_band_fraction: 0.25,
            ground_normal_min_y: 0.5,
            wall_normal_max_y: 0.3,
            max_speed: 6.0,
            accel: 30.0,
            brake: 40.0,
            air_accel: 12.0,
            air_brake: 2.0,
            mid_air_dampen: 0.6,
            move_midair: true,
            strafe_damping: true,
            side_damp_ground: 10.0,
            side_damp_air: 2.0,
            wall_slide_max_fall_speed: -3.0,
            friction: 0.5,
            slide_friction: 0.0,
            turn_speed: 2.5,
            jump_impulse: 6.5,
            wall_jump_launch: 6.0,
            wall_climb_min_normal: 0.5,
            climb_speed: 3.0,
            stick_speed: 1.5,
            exit_cooldown: 0.35,
            anim_grace_seconds: 0.15,
            anim_air_min_time: 0.1,
            anim_ground_probe: 0.2,
            move_speed_threshold: 0.2,
            fade_seconds: 0.2,
        }
    }
}

impl CharacterController {
    pub fn on_add(mut world: DeferredWorld, ctx: HookContext) {
        {
            let Some(mut controller) = world.get_mut::<Self>(ctx.entity) else {
                return;
            };
            controller.filter.excluded_entities.insert(ctx.entity);
        }

        let Some(collider) = world.entity(ctx.entity).get::<Collider>().cloned() else {
            return;
        };
        let aabb = collider.aabb(default(), Rotation::default());
        let height = aabb.max.y - aabb.min.y;
        if !height.is_finite() || height <= 0.0 {
            warn!(
                "character {} has a degenerate collider (height {height}), grounding will not work",
                ctx.entity
            );
        }

        let Some(mut state) = world.get_mut::<CharacterControllerState>(ctx.entity) else {
            return;
        };
        state.height = height;
    }
}

/// Body measurements taken when the controller is added.
#[derive(Component, Clone, Copy, Reflect, Default, Debug)]
#[reflect(Component)]
pub struct CharacterControllerState {
    /// Full collider height, cap to cap. The collider is assumed to be centered on the body.
    pub height: f32,
}

impl CharacterControllerState {
    /// World height of the bottom of the collider.
    pub fn feet_y(&self, position: Vec3) -> f32 {
        position.y - self.height / 2.0
    }
}
