//! Third-person orbit camera following a character.

use core::f32::consts::FRAC_PI_2;

use crate::{
    input::{CaptureCamera, RotateCamera, Zoom},
    prelude::*,
};

pub(super) fn plugin(app: &mut App) {
    app.register_type::<FollowCamera>()
        .register_type::<FollowCameraState>()
        .add_systems(
            RunFixedMainLoop,
            update_follow_camera.after(TransformEasingSystems::UpdateEasingTick),
        )
        .add_observer(rotate_camera)
        .add_observer(zoom_camera)
        .add_observer(capture_camera)
        .add_observer(release_camera);
}

/// Put this on a camera to make it follow the given character.
#[derive(Component, Clone, Copy)]
#[relationship(relationship_target = FollowCameraTarget)]
#[require(FollowCamera)]
pub struct FollowCameraOf(pub Entity);

#[derive(Component, Clone, Copy)]
#[relationship_target(relationship = FollowCameraOf)]
pub struct FollowCameraTarget(Entity);

impl FollowCameraTarget {
    pub fn get(self) -> Entity {
        self.0
    }
}

/// Camera tunables. Angles in radians; pitch is the camera's elevation above the target.
#[derive(Component, Clone, Copy, Reflect, Debug)]
#[reflect(Component)]
#[require(FollowCameraState, Transform)]
pub struct FollowCamera {
    pub min_distance: f32,
    pub max_distance: f32,
    /// Used when the initial camera pose gives no usable offset.
    pub default_distance: f32,
    pub min_pitch: f32,
    pub max_pitch: f32,
    /// World height of the ground the camera must not dip under.
    pub ground_height: f32,
    /// Above this height over the ground, [`Self::min_pitch_below`] replaces [`Self::min_pitch`].
    pub below_height_threshold: f32,
    pub min_pitch_below: f32,
    /// Radians per unit of pointer motion.
    pub yaw_sensitivity: f32,
    pub pitch_sensitivity: f32,
    /// Meters per unit of scroll.
    pub zoom_sensitivity: f32,
    /// Fraction of the remaining distance covered each frame.
    pub smoothing: f32,
    /// The camera aims this far above the character's origin.
    pub look_height: f32,
}

impl Default for FollowCamera {
    fn default() -> Self {
        Self {
            min_distance: 2.0,
            max_distance: 12.0,
            default_distance: 6.0,
            min_pitch: -0.1,
            max_pitch: 1.3,
            ground_height: 0.0,
            below_height_threshold: 2.0,
            min_pitch_below: -0.9,
            yaw_sensitivity: 0.005,
            pitch_sensitivity: 0.005,
            zoom_sensitivity: 0.5,
            smoothing: 0.15,
            look_height: 1.0,
        }
    }
}

impl FollowCamera {
    /// Lowest pitch allowed for a target at `target_y`.
    pub fn min_pitch_at(&self, target_y: f32) -> f32 {
        if target_y - self.ground_height > self.below_height_threshold {
            self.min_pitch_below
        } else {
            self.min_pitch
        }
    }

    fn lowest_pitch(&self) -> f32 {
        self.min_pitch.min(self.min_pitch_below)
    }
}

#[derive(Component, Clone, Copy, Reflect, Default, Debug, PartialEq)]
#[reflect(Component)]
pub struct FollowCameraState {
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    /// Set on the first update, from whatever pose the camera had then.
    pub initialized: bool,
    /// Pointer motion orbits the camera only while captured.
    pub captured: bool,
}

impl FollowCameraState {
    /// Adopts the existing camera-to-target offset so the first frame does not snap.
    pub fn initialize(&mut self, offset: Vec3, cfg: &FollowCamera) {
        let length = offset.length();
        if length.is_finite() && length > 1.0e-3 {
            self.distance = bounded(length, cfg.min_distance, cfg.max_distance);
            let pitch = (offset.y / length).clamp(-1.0, 1.0).asin();
            self.pitch = bounded(pitch, cfg.lowest_pitch(), cfg.max_pitch);
            self.yaw = offset.x.atan2(offset.z);
        } else {
            self.distance = bounded(cfg.default_distance, cfg.min_distance, cfg.max_distance);
            self.pitch = bounded(0.0, cfg.lowest_pitch(), cfg.max_pitch);
            self.yaw = 0.0;
        }
        self.initialized = true;
    }

    pub fn rotate(&mut self, delta: Vec2, cfg: &FollowCamera) {
        self.yaw -= delta.x * cfg.yaw_sensitivity;
        let pitch = bounded(
            self.pitch + delta.y * cfg.pitch_sensitivity,
            cfg.lowest_pitch(),
            cfg.max_pitch,
        );
        self.pitch = pitch.clamp(-FRAC_PI_2 + 0.01, FRAC_PI_2 - 0.01);
    }

    pub fn zoom(&mut self, scroll: f32, cfg: &FollowCamera) {
        self.distance = bounded(
            self.distance - scroll * cfg.zoom_sensitivity,
            cfg.min_distance,
            cfg.max_distance,
        );
    }

    /// Camera position relative to the target.
    pub fn offset(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        self.distance * vec3(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw)
    }
}

/// Limits `value` to `lo..=hi` without panicking on edited tunables: `hi` wins when the bounds
/// cross and NaN bounds are ignored.
fn bounded(value: f32, lo: f32, hi: f32) -> f32 {
    value.max(lo).min(hi)
}

/// Moves each follow camera one smoothing step toward its orbit position.
pub(crate) fn step_camera(
    camera: &mut Transform,
    state: &mut FollowCameraState,
    cfg: &FollowCamera,
    target: Vec3,
) {
    if !state.initialized {
        state.initialize(camera.translation - target, cfg);
    }
    state.pitch = bounded(state.pitch, cfg.min_pitch_at(target.y), cfg.max_pitch);

    let desired = target + state.offset();
    camera.translation = camera.translation.lerp(desired, cfg.smoothing);
    camera.look_at(target + Vec3::Y * cfg.look_height, Vec3::Y);
}

pub(crate) fn update_follow_camera(
    mut cameras: Query<
        (
            &mut Transform,
            &mut FollowCameraState,
            &FollowCamera,
            &FollowCameraOf,
        ),
        Without<CharacterController>,
    >,
    targets: Query<&Transform, With<CharacterController>>,
) {
    for (mut transform, mut state, cfg, camera_of) in &mut cameras {
        let Ok(target) = targets.get(camera_of.0) else {
            continue;
        };
        step_camera(&mut transform, &mut state, cfg, target.translation);
    }
}

fn camera_of(context: Entity, targets: &Query<&FollowCameraTarget>) -> Option<Entity> {
    targets.get(context).ok().map(|target| target.get())
}

fn rotate_camera(
    rotate: On<Fire<RotateCamera>>,
    targets: Query<&FollowCameraTarget>,
    mut cameras: Query<(&mut FollowCameraState, &FollowCamera)>,
) {
    let Some(camera) = camera_of(rotate.context, &targets) else {
        return;
    };
    let Ok((mut state, cfg)) = cameras.get_mut(camera) else {
        return;
    };
    if state.captured {
        state.rotate(rotate.value, cfg);
    }
}

fn zoom_camera(
    zoom: On<Fire<Zoom>>,
    targets: Query<&FollowCameraTarget>,
    mut cameras: Query<(&mut FollowCameraState, &FollowCamera)>,
) {
    let Some(camera) = camera_of(zoom.context, &targets) else {
        return;
    };
    if let Ok((mut state, cfg)) = cameras.get_mut(camera) {
        state.zoom(zoom.value, cfg);
    }
}

fn capture_camera(
    capture: On<Start<CaptureCamera>>,
    targets: Query<&FollowCameraTarget>,
    mut cameras: Query<&mut FollowCameraState>,
) {
    let Some(camera) = camera_of(capture.context, &targets) else {
        return;
    };
    if let Ok(mut state) = cameras.get_mut(camera) {
        state.captured = true;
    }
}

fn release_camera(
    release: On<Complete<CaptureCamera>>,
    targets: Query<&FollowCameraTarget>,
    mut cameras: Query<&mut FollowCameraState>,
) {
    let Some(camera) = camera_of(release.context, &targets) else {
        return;
    };
    if let Ok(mut state) = cameras.get_mut(camera) {
        state.captured = false;
    }
}
