//! Environmental cues: луч фонаря
//!
//! В отличие от звука, луч перекрывается стенами. При попадании событие указывает
//! на фонарь (источник), а не на самого агента.

use bevy::prelude::*;

use crate::geometry::LineOfSight;
use crate::perception::hearing::Emitter;

/// Конус света от фонаря
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightBeam {
    pub emitter_position: Vec2,
    /// Направление луча (не обязательно нормализовано)
    pub direction: Vec2,
    /// Полуугол конуса (радианы)
    pub half_angle: f32,
    pub range: f32,
    pub emitter: Emitter,
}

/// Попал ли агент в конус луча
pub fn beam_hits(beam: &LightBeam, point: Vec2, geometry: &dyn LineOfSight) -> bool {
    let to_point = point - beam.emitter_position;
    let distance = to_point.length();
    if distance > beam.range || distance < f32::EPSILON {
        return false;
    }

    let Some(direction) = beam.direction.try_normalize() else {
        return false;
    };

    let alignment = direction.dot(to_point / distance);
    alignment >= beam.half_angle.cos() && geometry.is_clear(beam.emitter_position, point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{OpenField, WallMap};

    fn flashlight() -> LightBeam {
        LightBeam {
            emitter_position: Vec2::ZERO,
            direction: Vec2::X,
            half_angle: 20f32.to_radians(),
            range: 400.0,
            emitter: Emitter::Player,
        }
    }

    #[test]
    fn test_point_inside_cone_is_lit() {
        assert!(beam_hits(&flashlight(), Vec2::new(200.0, 30.0), &OpenField));
    }

    #[test]
    fn test_point_outside_angle_is_dark() {
        assert!(!beam_hits(&flashlight(), Vec2::new(100.0, 100.0), &OpenField));
    }

    #[test]
    fn test_point_beyond_range_is_dark() {
        assert!(!beam_hits(&flashlight(), Vec2::new(500.0, 0.0), &OpenField));
    }

    #[test]
    fn test_beam_occluded_by_wall() {
        let walls = WallMap::default().with_wall(Vec2::new(100.0, -50.0), Vec2::new(100.0, 50.0));
        assert!(!beam_hits(&flashlight(), Vec2::new(200.0, 0.0), &walls));
    }
}
