//! Level geometry для LOS проверок
//!
//! Геометрия уровня принадлежит движку. AI видит её только через [`LineOfSight`]:
//! "перекрыт ли отрезок from → to". Для headless симуляции и тестов есть
//! [`WallMap`]: набор стен-отрезков.

use bevy::prelude::*;

/// Query: перекрыт ли отрезок стенами
pub trait LineOfSight {
    /// `true` если между точками нет препятствий
    fn is_clear(&self, from: Vec2, to: Vec2) -> bool;
}

/// Стена (отрезок)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wall {
    pub start: Vec2,
    pub end: Vec2,
}

impl Wall {
    pub fn new(start: Vec2, end: Vec2) -> Self {
        Self { start, end }
    }
}

/// Набор стен уровня (headless реализация LineOfSight)
#[derive(Resource, Debug, Clone, Default)]
pub struct WallMap {
    pub walls: Vec<Wall>,
}

impl WallMap {
    pub fn new(walls: Vec<Wall>) -> Self {
        Self { walls }
    }

    pub fn with_wall(mut self, start: Vec2, end: Vec2) -> Self {
        self.walls.push(Wall::new(start, end));
        self
    }

    /// Прямоугольник из четырёх стен (min/max углы)
    pub fn with_box(self, min: Vec2, max: Vec2) -> Self {
        self.with_wall(Vec2::new(min.x, min.y), Vec2::new(max.x, min.y))
            .with_wall(Vec2::new(max.x, min.y), Vec2::new(max.x, max.y))
            .with_wall(Vec2::new(max.x, max.y), Vec2::new(min.x, max.y))
            .with_wall(Vec2::new(min.x, max.y), Vec2::new(min.x, min.y))
    }
}

impl LineOfSight for WallMap {
    fn is_clear(&self, from: Vec2, to: Vec2) -> bool {
        !self
            .walls
            .iter()
            .any(|wall| segments_intersect(from, to, wall.start, wall.end))
    }
}

/// Открытое поле: ничего не перекрыто
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenField;

impl LineOfSight for OpenField {
    fn is_clear(&self, _from: Vec2, _to: Vec2) -> bool {
        true
    }
}

fn cross(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Пересечение отрезков p1-p2 и q1-q2 (касание концом тоже считается пересечением)
pub fn segments_intersect(p1: Vec2, p2: Vec2, q1: Vec2, q2: Vec2) -> bool {
    const EPS: f32 = 1e-6;

    let r = p2 - p1;
    let s = q2 - q1;
    let denom = cross(r, s);
    let qp = q1 - p1;

    if denom.abs() < EPS {
        // Параллельные: пересекаются только если коллинеарны и проекции перекрываются
        if cross(qp, r).abs() > EPS {
            return false;
        }
        let len_sq = r.length_squared();
        if len_sq < EPS {
            return (q1 - p1).length_squared() < EPS || point_on_segment(p1, q1, q2);
        }
        let t0 = qp.dot(r) / len_sq;
        let t1 = t0 + s.dot(r) / len_sq;
        let (lo, hi) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
        return hi >= 0.0 && lo <= 1.0;
    }

    let t = cross(qp, s) / denom;
    let u = cross(qp, r) / denom;
    (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)
}

fn point_on_segment(point: Vec2, a: Vec2, b: Vec2) -> bool {
    let ab = b - a;
    let ap = point - a;
    if cross(ab, ap).abs() > 1e-4 {
        return false;
    }
    let t = ap.dot(ab) / ab.length_squared().max(1e-6);
    (0.0..=1.0).contains(&t)
}

/// Ближайшая к `point` точка на луче origin + dir * t, t ∈ [0, max_len]
pub fn closest_point_on_ray(origin: Vec2, dir: Vec2, max_len: f32, point: Vec2) -> Vec2 {
    let t = (point - origin).dot(dir).clamp(0.0, max_len);
    origin + dir * t
}

/// Повернуть единичный вектор на угол (радианы)
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    Vec2::from_angle(angle).rotate(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crossing_segments() {
        assert!(segments_intersect(
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(5.0, -5.0),
            Vec2::new(5.0, 5.0),
        ));
    }

    #[test]
    fn test_disjoint_segments() {
        assert!(!segments_intersect(
            Vec2::new(0.0, 0.0),
            Vec2::new(4.0, 0.0),
            Vec2::new(5.0, -5.0),
            Vec2::new(5.0, 5.0),
        ));
    }

    #[test]
    fn test_parallel_segments_do_not_intersect() {
        assert!(!segments_intersect(
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(10.0, 1.0),
        ));
    }

    #[test]
    fn test_wall_blocks_line_of_sight() {
        let map = WallMap::default().with_wall(Vec2::new(50.0, -100.0), Vec2::new(50.0, 100.0));
        assert!(!map.is_clear(Vec2::ZERO, Vec2::new(100.0, 0.0)));
        assert!(map.is_clear(Vec2::ZERO, Vec2::new(40.0, 0.0)));
        assert!(map.is_clear(Vec2::new(0.0, 200.0), Vec2::new(100.0, 200.0)));
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let rotated = rotate(Vec2::X, std::f32::consts::FRAC_PI_2);
        assert!((rotated - Vec2::Y).length() < 1e-5);
    }
}
