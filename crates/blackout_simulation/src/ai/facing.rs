//! Facing: одна таблица приоритетов, один победитель за тик
//!
//! Каждое состояние объявляет приоритет своего направления взгляда здесь,
//! в exhaustive match. Новое состояние без записи просто не скомпилируется.

use bevy::prelude::*;
use serde::Serialize;

use super::state::StateKind;

/// Приоритет направления взгляда (больше = важнее)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum FacingPriority {
    None,
    Lowest,
    Low,
    Medium,
    High,
    Highest,
}

/// Приоритет взгляда для состояния
pub fn facing_rule(kind: StateKind) -> FacingPriority {
    match kind {
        StateKind::Combat => FacingPriority::Highest,
        StateKind::ThrowingGrenade
        | StateKind::ReadyToThrow
        | StateKind::Pursuing
        | StateKind::Flanking
        | StateKind::Searching
        | StateKind::EvadingGrenade => FacingPriority::High,
        StateKind::InCover | StateKind::Retreating => FacingPriority::Medium,
        StateKind::Patrol => FacingPriority::Low,
        StateKind::Idle => FacingPriority::Lowest,
        StateKind::Dead => FacingPriority::None,
    }
}

/// Кто просит повернуться
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FacingSource {
    State(StateKind),
    /// Получили урон: посмотреть в сторону атакующего
    DamageReaction,
    /// Услышали шум: короткий взгляд на звук
    NoiseGlance,
}

impl FacingSource {
    pub fn priority(&self) -> FacingPriority {
        match self {
            FacingSource::State(kind) => facing_rule(*kind),
            FacingSource::DamageReaction => FacingPriority::High,
            FacingSource::NoiseGlance => FacingPriority::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FacingRequest {
    pub source: FacingSource,
    pub direction: Vec2,
}

impl FacingRequest {
    pub fn new(source: FacingSource, direction: Vec2) -> Self {
        Self { source, direction }
    }
}

/// Победитель: максимальный приоритет, при равенстве первый запрос
pub fn resolve_facing(requests: &[FacingRequest]) -> Option<FacingRequest> {
    let mut winner: Option<FacingRequest> = None;
    for request in requests {
        let priority = request.source.priority();
        if priority == FacingPriority::None || request.direction.length_squared() < 1e-6 {
            continue;
        }
        if winner.is_none_or(|w| priority > w.source.priority()) {
            winner = Some(*request);
        }
    }
    winner
}
