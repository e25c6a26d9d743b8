//! Vision: веер лучей в пределах FOV
//!
//! Цель видна если хотя бы один луч веера проходит в пределах радиуса цели
//! и отрезок глаз → точка попадания не перекрыт геометрией.

use bevy::prelude::*;

use crate::config::PerceptionConfig;
use crate::geometry::{closest_point_on_ray, rotate, LineOfSight};

/// Поза сенсора агента на этот тик
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorPose {
    pub position: Vec2,
    /// Нормализованное направление взгляда
    pub facing: Vec2,
}

/// Направления лучей веера (равномерно по FOV, центральный = facing при нечётном count)
pub fn ray_directions(facing: Vec2, fov_degrees: f32, count: u32) -> Vec<Vec2> {
    let facing = facing.normalize_or(Vec2::X);
    if count <= 1 {
        return vec![facing];
    }

    let fov = fov_degrees.to_radians();
    let step = fov / (count - 1) as f32;
    let start = -fov * 0.5;

    (0..count)
        .map(|i| rotate(facing, start + step * i as f32))
        .collect()
}

/// Vision test для точки с радиусом (цель, союзник, граната)
pub fn can_see(
    pose: &SensorPose,
    point: Vec2,
    radius: f32,
    config: &PerceptionConfig,
    geometry: &dyn LineOfSight,
) -> bool {
    let distance = pose.position.distance(point);
    if distance > config.vision_range + radius {
        return false;
    }
    if distance <= radius {
        // Вплотную: тело цели перекрывает глаз
        return true;
    }

    ray_directions(pose.facing, config.fov_degrees, config.ray_count)
        .into_iter()
        .any(|dir| {
            let hit = closest_point_on_ray(pose.position, dir, config.vision_range, point);
            hit.distance(point) <= radius && geometry.is_clear(pose.position, hit)
        })
}
