//! Turns this step's contact manifolds into grounded / on-wall flags.

use crate::prelude::*;

/// Horizontal normals shorter than this (squared) carry no usable direction.
const MIN_HORIZONTAL_SQ: f32 = 1.0e-6;

/// What the character touched during the last physics step. Rebuilt from scratch every tick.
#[derive(Component, Clone, Copy, Reflect, Default, Debug, PartialEq)]
#[reflect(Component)]
pub struct ContactState {
    pub grounded: bool,
    pub on_wall: bool,
    /// Unit horizontal normal pointing out of the touched walls, or zero.
    pub wall_normal: Vec3,
    /// Sum of the horizontal directions of all wall contacts, before renormalization.
    pub wall_accumulator: Vec3,
}

impl ContactState {
    /// Length of the raw wall accumulator.
    ///
    /// Grows with the number of wall contacts and shrinks when they disagree, so it mixes
    /// contact count with alignment. Climbing gates on it anyway.
    pub fn wall_confidence(&self) -> f32 {
        self.wall_accumulator.length()
    }
}

/// A single touching point, normal oriented out of the touched surface toward the character.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactSample {
    pub point: Vec3,
    pub normal: Vec3,
    /// Positive when overlapping, negative when separated.
    pub penetration: f32,
}

/// Re-orients a manifold normal so that it points toward the character.
///
/// Manifold normals point from the first collider of a pair to the second.
pub(crate) fn orient_normal(normal: Vec3, character_is_first: bool) -> Vec3 {
    if character_is_first { -normal } else { normal }
}

/// Every manifold point of every pair involving `character`.
pub(crate) fn collect_samples(
    character: Entity,
    collisions: &Collisions,
    samples: &mut Vec<ContactSample>,
) {
    samples.clear();
    for pair in collisions.collisions_with(character) {
        let character_is_first = pair.collider1 == character;
        if !character_is_first && pair.collider2 != character {
            continue;
        }
        for manifold in &pair.manifolds {
            let normal = orient_normal(manifold.normal, character_is_first);
            samples.extend(manifold.points.iter().map(|point| ContactSample {
                point: point.point,
                normal,
                penetration: point.penetration,
            }));
        }
    }
}

/// Classifies contacts against a capsule whose bottom sits at `feet_y`.
pub fn classify_contacts<'a>(
    samples: impl IntoIterator<Item = &'a ContactSample>,
    feet_y: f32,
    height: f32,
    cfg: &CharacterController,
) -> ContactState {
    let band = cfg.ground_band_fraction * height;
    let mut state = ContactState::default();

    for sample in samples {
        if sample.penetration < -cfg.contact_tolerance {
            continue;
        }
        let normal = sample.normal;

        if sample.point.y - feet_y <= band && normal.y > cfg.ground_normal_min_y {
            state.grounded = true;
        }

        let horizontal = normal.with_y(0.0);
        if horizontal.length_squared() > MIN_HORIZONTAL_SQ
            && normal.y.abs() <= cfg.wall_normal_max_y
        {
            state.on_wall = true;
            state.wall_accumulator += horizontal.normalize();
        }
    }

    if state.on_wall {
        state.wall_normal = state.wall_accumulator.normalize_or_zero();
    } else {
        state.wall_accumulator = Vec3::ZERO;
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(point: Vec3, normal: Vec3) -> ContactSample {
        ContactSample {
            point,
            normal,
            penetration: 0.001,
        }
    }

    fn classify(samples: &[ContactSample]) -> ContactState {
        // Capsule spanning y = 0..2, ground band 0..0.5
        classify_contacts(samples, 0.0, 2.0, &CharacterController::default())
    }

    #[test]
    fn flat_ground_is_grounded() {
        let state = classify(&[sample(Vec3::ZERO, Vec3::Y)]);
        assert!(state.grounded);
        assert!(!state.on_wall);
        assert_eq!(state.wall_normal, Vec3::ZERO);
    }

    #[test]
    fn any_qualifying_contact_grounds() {
        let cfg = CharacterController::default();
        let steep = vec3(0.0, cfg.ground_normal_min_y - 0.1, 1.0).normalize();
        let state = classify(&[
            sample(vec3(0.0, 0.1, 0.0), steep),
            sample(vec3(0.0, 0.4, 0.0), vec3(0.0, 0.9, 0.1).normalize()),
        ]);
        assert!(state.grounded);
    }

    #[test]
    fn contact_above_band_does_not_ground() {
        let state = classify(&[sample(vec3(0.0, 1.2, 0.0), Vec3::Y)]);
        assert!(!state.grounded);
    }

    #[test]
    fn shallow_normal_does_not_ground() {
        let state = classify(&[sample(Vec3::ZERO, vec3(0.0, 0.4, 1.0).normalize())]);
        assert!(!state.grounded);
    }

    #[test]
    fn separated_contact_is_ignored() {
        let mut contact = sample(Vec3::ZERO, Vec3::Y);
        contact.penetration = -0.5;
        assert_eq!(classify(&[contact]), ContactState::default());
    }

    #[test]
    fn wall_normal_is_renormalized() {
        let state = classify(&[
            sample(vec3(-0.3, 1.0, 0.0), Vec3::X),
            sample(vec3(-0.3, 1.2, 0.0), Vec3::X),
        ]);
        assert!(state.on_wall);
        assert!(!state.grounded);
        assert!((state.wall_normal - Vec3::X).length() < 1e-5);
        assert!((state.wall_confidence() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn disagreeing_walls_lower_confidence() {
        let state = classify(&[
            sample(Vec3::ONE, Vec3::X),
            sample(Vec3::ONE, vec3(-1.0, 0.0, 0.2).normalize()),
        ]);
        assert!(state.on_wall);
        assert!(state.wall_confidence() < 0.5);
        assert!((state.wall_normal.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn tilted_wall_uses_horizontal_direction() {
        let state = classify(&[sample(Vec3::ONE, vec3(0.0, 0.2, -1.0).normalize())]);
        assert!(state.on_wall);
        assert!((state.wall_normal - Vec3::NEG_Z).length() < 1e-5);
        assert!((state.wall_confidence() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn ceiling_is_neither_ground_nor_wall() {
        let state = classify(&[sample(vec3(0.0, 2.0, 0.0), Vec3::NEG_Y)]);
        assert_eq!(state, ContactState::default());
    }

    #[test]
    fn orient_flips_when_character_is_first() {
        assert_eq!(orient_normal(Vec3::NEG_Y, true), Vec3::Y);
        assert_eq!(orient_normal(Vec3::Y, false), Vec3::Y);
    }
}
