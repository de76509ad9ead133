use crate::prelude::*;

pub(super) fn plugin(app: &mut App) {
    app.register_type::<AccumulatedInput>()
        .init_resource::<FixedTickTracker>()
        .add_observer(apply_movement)
        .add_observer(apply_jump)
        .add_systems(PreUpdate, reset_fixed_tick_tracker)
        .add_systems(FixedPreUpdate, mark_fixed_tick)
        .add_systems(
            RunFixedMainLoop,
            clear_accumulated_input
                .run_if(fixed_tick_ran)
                .in_set(RunFixedMainLoopSystems::AfterFixedMainLoop),
        );
}

/// Forward/back on `y`, turn right/left on `x`.
#[derive(Debug, InputAction)]
#[action_output(Vec2)]
pub struct Movement;

#[derive(Debug, InputAction)]
#[action_output(bool)]
pub struct Jump;

/// Pointer delta. Only orbits the camera while [`CaptureCamera`] is held.
#[derive(Debug, InputAction)]
#[action_output(Vec2)]
pub struct RotateCamera;

/// Scroll delta. Positive zooms in.
#[derive(Debug, InputAction)]
#[action_output(f32)]
pub struct Zoom;

#[derive(Debug, InputAction)]
#[action_output(bool)]
pub struct CaptureCamera;

/// Latest input levels since the last fixed tick. Cleared after every frame in which the
/// fixed loop ran, so a released key reads as released on the next tick.
#[derive(Component, Clone, Copy, Reflect, Default, Debug, PartialEq)]
#[reflect(Component)]
pub struct AccumulatedInput {
    pub movement: Vec2,
    pub jump: bool,
}

impl AccumulatedInput {
    pub fn move_axis(&self) -> f32 {
        self.movement.y.clamp(-1.0, 1.0)
    }

    pub fn turn_axis(&self) -> f32 {
        self.movement.x.clamp(-1.0, 1.0)
    }
}

fn apply_movement(
    movement: On<Fire<Movement>>,
    mut accumulated_inputs: Query<&mut AccumulatedInput>,
) {
    if let Ok(mut accumulated_input) = accumulated_inputs.get_mut(movement.context) {
        accumulated_input.movement = movement.value;
    }
}

fn apply_jump(jump: On<Fire<Jump>>, mut accumulated_inputs: Query<&mut AccumulatedInput>) {
    if let Ok(mut accumulated_input) = accumulated_inputs.get_mut(jump.context) {
        accumulated_input.jump = true;
    }
}

fn clear_accumulated_input(mut accumulated_inputs: Query<&mut AccumulatedInput>) {
    for mut accumulated_input in &mut accumulated_inputs {
        *accumulated_input = AccumulatedInput::default();
    }
}

/// Whether at least one fixed tick ran during the current frame.
#[derive(Resource, Debug, Deref, DerefMut, Default)]
pub(crate) struct FixedTickTracker(bool);

fn reset_fixed_tick_tracker(mut tracker: ResMut<FixedTickTracker>) {
    **tracker = false;
}

fn mark_fixed_tick(mut tracker: ResMut<FixedTickTracker>) {
    **tracker = true;
}

fn fixed_tick_ran(tracker: Res<FixedTickTracker>) -> bool {
    **tracker
}
