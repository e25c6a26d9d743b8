//! Tactical evaluation: stateless queries для планировщика и state machine
//!
//! Разделение двух вопросов:
//! - "знаем ли где цель" → память (любой источник)
//! - "можем ли попасть отсюда" → геометрия (`can_hit_from`)
//!
//! Движение никогда не гейтится геометрическим вопросом, только финальная атака.

use bevy::prelude::*;

use crate::geometry::{rotate, LineOfSight};
use crate::navigation::{NavError, NavigationPort, Route};

pub mod stall;

pub use stall::ProgressTracker;

/// Сторона фланга относительно оси агент → цель
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FlankSide {
    Left,
    Right,
}

impl FlankSide {
    pub fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// Результат проверки одного кандидата фланга
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlankOutcome {
    Accepted,
    Unreachable,
    NoLineOfHit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlankAttempt {
    pub side: FlankSide,
    pub position: Vec2,
    pub outcome: FlankOutcome,
}

/// Отчёт validated_flank: все попытки по порядку + принятый кандидат
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlankReport {
    pub attempts: Vec<FlankAttempt>,
    pub chosen: Option<(FlankSide, Vec2, Route)>,
}

impl FlankReport {
    pub fn tried(&self, side: FlankSide) -> bool {
        self.attempts.iter().any(|a| a.side == side)
    }
}

/// Кандидат фланга: перпендикулярно оси агент → цель, на `distance` от цели
///
/// Left = поворот оси против часовой стрелки.
pub fn flank_position(agent: Vec2, target: Vec2, side: FlankSide, distance: f32) -> Vec2 {
    let axis = (target - agent).normalize_or(Vec2::X);
    let offset = match side {
        FlankSide::Left => axis.perp(),
        FlankSide::Right => -axis.perp(),
    };
    target + offset * distance
}

/// Stateless tactical queries поверх геометрии и навигации
#[derive(Clone, Copy)]
pub struct TacticalEvaluator<'a> {
    pub geometry: &'a dyn LineOfSight,
    pub nav: &'a dyn NavigationPort,
}

impl<'a> TacticalEvaluator<'a> {
    pub fn new(geometry: &'a dyn LineOfSight, nav: &'a dyn NavigationPort) -> Self {
        Self { geometry, nav }
    }

    /// Линия огня из точки-кандидата до цели не перекрыта
    pub fn can_hit_from(&self, point: Vec2, target: Vec2) -> bool {
        self.geometry.is_clear(point, target)
    }

    /// can_hit_from + дальность оружия
    pub fn attack_possible(&self, point: Vec2, target: Vec2, weapon_range: f32) -> bool {
        point.distance(target) <= weapon_range && self.can_hit_from(point, target)
    }

    /// Обёртка над NavigationPort (Pending вызывающий трактует как Unreachable)
    pub fn reachable(&self, start: Vec2, goal: Vec2) -> Result<Route, NavError> {
        self.nav.route(start, goal)
    }

    /// Фланг с проверкой: сначала `first`, потом противоположная сторона
    pub fn validated_flank(
        &self,
        agent: Vec2,
        target: Vec2,
        first: FlankSide,
        distance: f32,
    ) -> FlankReport {
        let mut report = FlankReport::default();

        for side in [first, first.opposite()] {
            let position = flank_position(agent, target, side, distance);

            if !self.can_hit_from(position, target) {
                report.attempts.push(FlankAttempt {
                    side,
                    position,
                    outcome: FlankOutcome::NoLineOfHit,
                });
                continue;
            }

            match self.reachable(agent, position) {
                Ok(route) => {
                    report.attempts.push(FlankAttempt {
                        side,
                        position,
                        outcome: FlankOutcome::Accepted,
                    });
                    report.chosen = Some((side, position, route));
                    break;
                }
                Err(_) => report.attempts.push(FlankAttempt {
                    side,
                    position,
                    outcome: FlankOutcome::Unreachable,
                }),
            }
        }

        report
    }

    /// Оценка точки укрытия (None = не укрытие от этой угрозы или не дойти)
    ///
    /// Больше = лучше: дальше от угрозы, короче путь.
    pub fn score_cover(&self, point: Vec2, agent: Vec2, threat: Vec2) -> Option<f32> {
        if self.geometry.is_clear(threat, point) {
            return None;
        }
        let route = self.reachable(agent, point).ok()?;
        let travel = route.length_from(agent);
        let separation = point.distance(threat);
        Some(separation * 0.5 - travel)
    }

    /// Лучшее укрытие из точек уровня (при равенстве первое объявленное)
    pub fn best_cover(&self, points: &[Vec2], agent: Vec2, threat: Vec2) -> Option<Vec2> {
        let mut best: Option<(Vec2, f32)> = None;
        for &point in points {
            let Some(score) = self.score_cover(point, agent, threat) else {
                continue;
            };
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((point, score));
            }
        }
        best.map(|(point, _)| point)
    }

    /// Точка отступления: от угрозы, перебирая повёрнутые направления
    pub fn retreat_point(&self, agent: Vec2, threat: Vec2, step: f32) -> Option<(Vec2, Route)> {
        let away = (agent - threat).normalize_or(Vec2::X);
        [0.0f32, 45.0, -45.0, 90.0, -90.0]
            .into_iter()
            .map(|degrees| agent + rotate(away, degrees.to_radians()) * step)
            .find_map(|candidate| {
                self.reachable(agent, candidate)
                    .ok()
                    .map(|route| (candidate, route))
            })
    }
}
