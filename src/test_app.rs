//! Headless app with physics, stepped one fixed tick per update.

use bevy::{
    asset::{AssetApp, AssetPlugin},
    mesh::Mesh,
    scene::ScenePlugin,
    time::TimeUpdateStrategy,
    transform::TransformPlugin,
};
use core::time::Duration;

use crate::prelude::*;

/// The default fixed timestep of 64 Hz.
const TICK: Duration = Duration::from_micros(15_625);

pub(crate) fn physics_app() -> App {
    let mut app = App::new();
    app.add_plugins((
        bevy::MinimalPlugins,
        TransformPlugin,
        AssetPlugin {
            watch_for_changes_override: Some(false),
            ..default()
        },
        ScenePlugin,
        PhysicsPlugins::default(),
        ClamberPlugin::default(),
    ))
    .init_asset::<Mesh>()
    .insert_resource(TimeUpdateStrategy::ManualDuration(TICK));
    app.finish();
    app.cleanup();
    app
}

pub(crate) fn run_ticks(app: &mut App, ticks: usize) {
    for _ in 0..ticks {
        app.update();
    }
}

/// A wide static slab whose top face is at `y = 0`.
pub(crate) fn spawn_ground(app: &mut App) -> Entity {
    app.world_mut()
        .spawn((
            RigidBody::Static,
            Collider::cuboid(40.0, 1.0, 40.0),
            Transform::from_xyz(0.0, -0.5, 0.0),
        ))
        .id()
}

pub(crate) fn spawn_character(app: &mut App, position: Vec3) -> Entity {
    app.world_mut()
        .spawn((
            CharacterController::default(),
            Transform::from_translation(position),
        ))
        .id()
}
