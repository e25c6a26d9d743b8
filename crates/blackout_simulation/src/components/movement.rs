//! Movement компоненты: команды перемещения, скорость, направление взгляда
//!
//! Архитектура (intent-based):
//! - AI пишет MovementCommand + AimDirection (high-level intent)
//! - Движок (или headless integrator) читает и двигает тело
//! - AI никогда не пишет Transform напрямую

use bevy::prelude::*;

/// Команда движения для актора (выполняется movement integrator'ом)
#[derive(Component, Debug, Clone, PartialEq, Default)]
pub enum MovementCommand {
    /// Стоять на месте
    #[default]
    Idle,
    /// Двигаться к точке (следующий waypoint маршрута)
    MoveToPosition { target: Vec2 },
    /// Пятиться от точки, продолжая смотреть на неё
    RetreatFrom { threat: Vec2, target: Vec2 },
}

/// Скорость движения (пиксели/сек)
#[derive(Component, Clone, Copy, Debug)]
pub struct MovementSpeed {
    pub speed: f32,
}

impl Default for MovementSpeed {
    fn default() -> Self {
        Self { speed: 140.0 }
    }
}

/// Куда смотрит актор (нормализованный вектор)
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct AimDirection(pub Vec2);

impl Default for AimDirection {
    fn default() -> Self {
        Self(Vec2::X)
    }
}

/// Позиция из Transform (top-down: X/Y плоскость)
pub fn planar(transform: &Transform) -> Vec2 {
    transform.translation.truncate()
}
