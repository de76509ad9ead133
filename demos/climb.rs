//! A small courtyard with walls to climb.
//!
//! W/S: move, A/D: turn, Space: jump, right mouse: orbit camera, wheel: zoom.
//!
//! The player is drawn as a capsule until the rigged model at [`MODEL_PATH`] has spawned. Its
//! first four animations are used as the idle, move, in-air and climb clips, in that order.

use avian3d::prelude::*;
use bevy::{animation::transition::AnimationTransitions, prelude::*, scene::SceneInstanceReady};
use bevy_clamber::prelude::*;
use bevy_enhanced_input::prelude::*;

fn main() -> AppExit {
    App::new()
        .add_plugins((
            DefaultPlugins,
            PhysicsPlugins::default(),
            EnhancedInputPlugin,
            ClamberPlugin::default(),
        ))
        .add_input_context::<PlayerInput>()
        .add_systems(Startup, (setup_player, setup_level))
        .run()
}

const MODEL_PATH: &str = "models/character.glb";

#[derive(Component, Default)]
struct PlayerInput;

/// The rigged model of a character, waiting for its scene to spawn.
#[derive(Component)]
struct Rig {
    character: Entity,
    graph: Handle<AnimationGraph>,
    clips: ClipTable,
}

fn setup_player(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut graphs: ResMut<Assets<AnimationGraph>>,
    asset_server: Res<AssetServer>,
) {
    let player = commands
        .spawn((
            Name::new("Player"),
            CharacterController::default(),
            Collider::capsule(0.35, 1.1),
            Transform::from_xyz(0.0, 2.0, 0.0),
            Mesh3d(meshes.add(Capsule3d::new(0.35, 1.1))),
            MeshMaterial3d(materials.add(Color::srgb(0.8, 0.7, 0.6))),
            PlayerInput,
            actions!(PlayerInput[
                (
                    Action::<Movement>::new(),
                    DeadZone::default(),
                    Bindings::spawn((
                        Cardinal::wasd_keys(),
                        Axial::left_stick()
                    ))
                ),
                (
                    Action::<Jump>::new(),
                    bindings![KeyCode::Space, GamepadButton::South],
                ),
                (
                    Action::<RotateCamera>::new(),
                    Bindings::spawn((
                        Spawn(Binding::mouse_motion()),
                        Axial::right_stick().with((Scale::splat(40.0), DeadZone::default())),
                    ))
                ),
                (
                    Action::<CaptureCamera>::new(),
                    bindings![MouseButton::Right, GamepadButton::RightTrigger],
                ),
                (
                    Action::<Zoom>::new(),
                    Bindings::spawn(Spawn((Binding::mouse_wheel(), SwizzleAxis::YXZ))),
                ),
            ]),
        ))
        .id();

    let (graph, nodes) = AnimationGraph::from_clips(
        (0..AnimationState::ALL.len())
            .map(|i| asset_server.load(GltfAssetLabel::Animation(i).from_asset(MODEL_PATH))),
    );
    let clips = AnimationState::ALL
        .into_iter()
        .zip(nodes)
        .fold(ClipTable::default(), |clips, (state, node)| {
            clips.with(state, node)
        });
    commands
        .spawn((
            Name::new("Player model"),
            Rig {
                character: player,
                graph: graphs.add(graph),
                clips,
            },
            SceneRoot(asset_server.load(GltfAssetLabel::Scene(0).from_asset(MODEL_PATH))),
            // Model origin at the feet, collider centered on the body
            Transform::from_xyz(0.0, -0.9, 0.0),
            ChildOf(player),
        ))
        .observe(link_rig);

    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(0.0, 5.0, 8.0),
        FollowCameraOf(player),
    ));
}

/// Hands the model's `AnimationPlayer` to the controller and swaps the capsule for the model.
fn link_rig(
    ready: On<SceneInstanceReady>,
    mut commands: Commands,
    rigs: Query<&Rig>,
    children: Query<&Children>,
    players: Query<(), With<AnimationPlayer>>,
) {
    let Ok(rig) = rigs.get(ready.entity) else {
        return;
    };
    let Some(player) = children
        .iter_descendants(ready.entity)
        .find(|&entity| players.contains(entity))
    else {
        warn!("{MODEL_PATH} has no animation player, keeping the capsule");
        return;
    };

    commands.entity(player).insert((
        AnimationGraphHandle(rig.graph.clone()),
        AnimationTransitions::new(),
    ));
    commands
        .entity(rig.character)
        .insert(CharacterAnimations {
            player,
            clips: rig.clips,
        })
        .remove::<Mesh3d>();
}

struct Obstacle {
    name: &'static str,
    position: Vec3,
    size: Vec3,
}

const OBSTACLES: &[Obstacle] = &[
    Obstacle {
        name: "Ground",
        position: Vec3::new(0.0, -0.5, 0.0),
        size: Vec3::new(60.0, 1.0, 60.0),
    },
    Obstacle {
        name: "North wall",
        position: Vec3::new(0.0, 3.0, -10.0),
        size: Vec3::new(12.0, 6.0, 1.0),
    },
    Obstacle {
        name: "East tower",
        position: Vec3::new(10.0, 5.0, 0.0),
        size: Vec3::new(3.0, 10.0, 3.0),
    },
    Obstacle {
        name: "Low ledge",
        position: Vec3::new(-8.0, 1.0, 4.0),
        size: Vec3::new(4.0, 2.0, 4.0),
    },
];

fn setup_level(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        Transform::from_xyz(0.0, 1.0, 0.0).looking_at(vec3(1.0, -2.0, -2.0), Vec3::Y),
        DirectionalLight {
            shadows_enabled: true,
            ..default()
        },
    ));

    let material = materials.add(Color::srgb(0.5, 0.55, 0.6));
    for obstacle in OBSTACLES {
        let size = obstacle.size;
        if !size.is_finite() || size.min_element() <= 0.0 || !obstacle.position.is_finite() {
            warn!("skipping obstacle {:?} with invalid shape {size}", obstacle.name);
            continue;
        }
        commands.spawn((
            Name::new(obstacle.name),
            RigidBody::Static,
            Collider::cuboid(size.x, size.y, size.z),
            Transform::from_translation(obstacle.position),
            Mesh3d(meshes.add(Cuboid::from_size(size))),
            MeshMaterial3d(material.clone()),
        ));
    }
}
