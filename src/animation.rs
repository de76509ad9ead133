//! Picks an animation clip from the physical state and cross-fades to it.
//!
//! The application loads its clips, builds an `AnimationGraph`, and links the resulting
//! `AnimationPlayer` to the character with [`CharacterAnimations`]. Any clip may be missing;
//! selecting a state without a clip keeps the previous pose.

use bevy_animation::{AnimationPlayer, graph::AnimationNodeIndex, transition::AnimationTransitions};
use bevy_ecs::{intern::Interned, schedule::ScheduleLabel};
use core::time::Duration;
use tracing::{debug, warn};

use crate::{
    CharacterControllerState, climb::ClimbState, contact::ContactState, input::AccumulatedInput,
    prelude::*,
};

pub(super) fn plugin(schedule: Interned<dyn ScheduleLabel>) -> impl Fn(&mut App) {
    move |app: &mut App| {
        app.register_type::<CharacterAnimator>().add_systems(
            schedule,
            animate_characters
                .run_if(resource_exists::<Time<Physics>>)
                .in_set(ClamberSystems::Animate),
        );
    }
}

#[derive(Clone, Copy, Reflect, Debug, PartialEq, Eq, Hash)]
pub enum AnimationState {
    Idle,
    Move,
    InAir,
    Climb,
}

impl AnimationState {
    pub const ALL: [Self; 4] = [Self::Idle, Self::Move, Self::InAir, Self::Climb];

    const fn index(self) -> usize {
        match self {
            Self::Idle => 0,
            Self::Move => 1,
            Self::InAir => 2,
            Self::Climb => 3,
        }
    }
}

/// One optional animation graph node per [`AnimationState`].
#[derive(Clone, Copy, Default, Debug, PartialEq)]
pub struct ClipTable([Option<AnimationNodeIndex>; 4]);

impl ClipTable {
    pub fn with(mut self, state: AnimationState, node: AnimationNodeIndex) -> Self {
        self.set(state, node);
        self
    }

    pub fn set(&mut self, state: AnimationState, node: AnimationNodeIndex) {
        self.0[state.index()] = Some(node);
    }

    pub fn get(&self, state: AnimationState) -> Option<AnimationNodeIndex> {
        self.0[state.index()]
    }
}

/// Links a character to the entity holding its `AnimationPlayer` and `AnimationTransitions`.
#[derive(Component, Clone, Debug)]
pub struct CharacterAnimations {
    pub player: Entity,
    pub clips: ClipTable,
}

/// Animation selection state of a character.
#[derive(Component, Clone, Copy, Reflect, Default, Debug, PartialEq)]
#[reflect(Component)]
pub struct CharacterAnimator {
    /// `None` until the first selection, which cuts instead of blending.
    pub current: Option<AnimationState>,
    /// Time spent without ground under the feet.
    pub air_time: f32,
    /// Set once `air_time` exceeds the debounce window.
    pub air_latched: bool,
    /// Last non-zero forward input. Its sign sets the move clip's playback direction.
    pub last_move_axis: f32,
}

impl CharacterAnimator {
    /// Playback speed of the current clip: the move clip runs backwards when backing up.
    pub fn playback_speed(&self) -> f32 {
        match self.current {
            Some(AnimationState::Move) if self.last_move_axis < 0.0 => -1.0,
            _ => 1.0,
        }
    }
}

/// A clip switch requested by the selector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ClipTransition {
    pub(crate) from: Option<AnimationState>,
    pub(crate) to: AnimationState,
    pub(crate) fade: Duration,
    pub(crate) immediate: bool,
}

/// Evaluates the state priorities for one tick.
pub(crate) fn select_state(
    animator: &mut CharacterAnimator,
    climb: &ClimbState,
    grounded: bool,
    horizontal_speed: f32,
    cfg: &CharacterController,
    dt: f32,
) -> AnimationState {
    if climb.climbing || climb.anim_grace_remaining > 0.0 {
        animator.air_time = 0.0;
        animator.air_latched = false;
        return AnimationState::Climb;
    }

    if grounded {
        animator.air_time = 0.0;
        animator.air_latched = false;
    } else {
        animator.air_time += dt;
        if animator.air_time > cfg.anim_air_min_time {
            animator.air_latched = true;
        }
    }

    if animator.air_latched {
        AnimationState::InAir
    } else if horizontal_speed > cfg.move_speed_threshold {
        AnimationState::Move
    } else {
        AnimationState::Idle
    }
}

/// Records `target` as current and describes the switch, if it is one.
pub(crate) fn plan_transition(
    animator: &mut CharacterAnimator,
    target: AnimationState,
    cfg: &CharacterController,
) -> Option<ClipTransition> {
    let from = animator.current;
    if from == Some(target) {
        return None;
    }
    animator.current = Some(target);
    Some(ClipTransition {
        from,
        to: target,
        fade: Duration::try_from_secs_f32(cfg.fade_seconds.max(0.0)).unwrap_or_default(),
        immediate: from.is_none(),
    })
}

/// The switch to apply to a linked player this tick.
///
/// A player that has not started any clip yet, e.g. one from a glTF scene that finished
/// spawning after the character, is cut straight to the current state.
pub(crate) fn pending_transition(
    planned: Option<ClipTransition>,
    current: Option<AnimationState>,
    clips: &ClipTable,
    player_started: bool,
) -> Option<ClipTransition> {
    if player_started {
        return planned;
    }
    match planned {
        Some(transition) => Some(ClipTransition {
            immediate: true,
            ..transition
        }),
        None => current
            .filter(|&state| clips.get(state).is_some())
            .map(|to| ClipTransition {
                from: None,
                to,
                fade: Duration::ZERO,
                immediate: true,
            }),
    }
}

fn animate_characters(
    mut characters: Query<(
        Entity,
        &CharacterController,
        &CharacterControllerState,
        &ContactState,
        &ClimbState,
        &AccumulatedInput,
        &Position,
        &LinearVelocity,
        &mut CharacterAnimator,
        Option<&CharacterAnimations>,
    )>,
    mut players: Query<(&mut AnimationPlayer, &mut AnimationTransitions)>,
    spatial_query: SpatialQuery,
    time: Res<Time>,
) {
    for (
        entity,
        cfg,
        state,
        contact,
        climb,
        input,
        position,
        velocity,
        mut animator,
        animations,
    ) in &mut characters
    {
        let move_axis = input.move_axis();
        if move_axis != 0.0 {
            animator.last_move_axis = move_axis;
        }

        // The probe bridges single-tick contact gaps, e.g. when stepping down stairs
        let grounded = contact.grounded
            || spatial_query
                .cast_ray(
                    position.0,
                    Dir3::NEG_Y,
                    state.height / 2.0 + cfg.anim_ground_probe,
                    true,
                    &cfg.filter,
                )
                .is_some();
        let horizontal_speed = velocity.0.with_y(0.0).length();
        let target = select_state(
            &mut animator,
            climb,
            grounded,
            horizontal_speed,
            cfg,
            time.delta_secs(),
        );
        let planned = plan_transition(&mut animator, target, cfg);

        let Some(animations) = animations else {
            continue;
        };
        let Ok((mut player, mut transitions)) = players.get_mut(animations.player) else {
            debug!(
                "animation player {} of character {entity} is missing",
                animations.player
            );
            continue;
        };

        let transition = pending_transition(
            planned,
            animator.current,
            &animations.clips,
            transitions.get_main_animation().is_some(),
        );
        if let Some(transition) = transition {
            debug!(from = ?transition.from, to = ?transition.to, "animation state changed");
            match animations.clips.get(transition.to) {
                Some(node) => {
                    let fade = if transition.immediate {
                        player.stop_all();
                        Duration::ZERO
                    } else {
                        transition.fade
                    };
                    transitions.play(&mut player, node, fade).repeat();
                }
                None => warn!(
                    "character {entity} has no {:?} clip, keeping the previous pose",
                    transition.to
                ),
            }
        }

        let Some(node) = animator.current.and_then(|current| animations.clips.get(current))
        else {
            continue;
        };
        if let Some(active) = player.animation_mut(node) {
            active.set_speed(animator.playback_speed());
        }
    }
}
