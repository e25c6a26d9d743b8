//! AI states: tagged variants с payload'ом вместо разбросанных флагов

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::perception::GrenadeId;
use crate::planner::ActionKind;
use crate::tactics::FlankSide;

/// Вид состояния (без payload): порядок = порядок объявления
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StateKind {
    Idle,
    Patrol,
    Combat,
    Pursuing,
    Flanking,
    Searching,
    InCover,
    Retreating,
    EvadingGrenade,
    ThrowingGrenade,
    ReadyToThrow,
    Dead,
}

impl StateKind {
    pub const ALL: [StateKind; 12] = [
        StateKind::Idle,
        StateKind::Patrol,
        StateKind::Combat,
        StateKind::Pursuing,
        StateKind::Flanking,
        StateKind::Searching,
        StateKind::InCover,
        StateKind::Retreating,
        StateKind::EvadingGrenade,
        StateKind::ThrowingGrenade,
        StateKind::ReadyToThrow,
        StateKind::Dead,
    ];

    /// Состояния, в которых агент должен куда-то идти (под stall detector)
    pub fn is_movement_state(&self) -> bool {
        matches!(
            self,
            StateKind::Patrol
                | StateKind::Pursuing
                | StateKind::Flanking
                | StateKind::Searching
                | StateKind::InCover
                | StateKind::Retreating
                | StateKind::EvadingGrenade
        )
    }

    /// Окно броска: прерывает только смертельный урон
    pub fn is_throw_window(&self) -> bool {
        matches!(self, StateKind::ReadyToThrow | StateKind::ThrowingGrenade)
    }

    /// Пассивные состояния реагируют на свежий стимул переходом в бой/преследование
    pub fn is_passive(&self) -> bool {
        matches!(self, StateKind::Idle | StateKind::Patrol | StateKind::Searching)
    }
}

/// Текущее поведение агента
#[derive(Debug, Clone, PartialEq)]
pub enum AIState {
    /// Нет стимулов: осматриваемся
    Idle {
        heading: Vec2,
        scan_phase: f32,
        elapsed: f32,
    },
    /// Идём по маршруту патруля
    Patrol { waypoint: usize },
    /// Цель обнаружена и поражаема отсюда
    Combat,
    /// Идём к последней известной позиции (видимость не требуется)
    Pursuing,
    /// Обходим препятствие к валидированной позиции фланга
    Flanking {
        side: FlankSide,
        position: Vec2,
        tried_both: bool,
        elapsed: f32,
    },
    /// Прочёсываем район последней известной позиции
    Searching {
        points: Vec<Vec2>,
        next: usize,
        elapsed: f32,
    },
    /// Идём в укрытие / держим его
    InCover {
        cover: Vec2,
        threat: Vec2,
        arrived: bool,
        quiet: f32,
    },
    /// Отходим от угрозы
    Retreating {
        threat: Vec2,
        destination: Vec2,
        elapsed: f32,
    },
    /// Уходим из радиуса гранаты, которую агент сам заметил
    EvadingGrenade {
        grenade: GrenadeId,
        blast_center: Vec2,
        destination: Vec2,
        resume: StateKind,
        elapsed: f32,
    },
    /// Замах перед броском
    ReadyToThrow { target: Vec2, remaining: f32 },
    /// Бросок (граната уже вылетела)
    ThrowingGrenade { target: Vec2, remaining: f32 },
    /// Терминальное состояние
    Dead,
}

impl Default for AIState {
    fn default() -> Self {
        Self::Idle {
            heading: Vec2::X,
            scan_phase: 0.0,
            elapsed: 0.0,
        }
    }
}

impl AIState {
    pub fn kind(&self) -> StateKind {
        match self {
            AIState::Idle { .. } => StateKind::Idle,
            AIState::Patrol { .. } => StateKind::Patrol,
            AIState::Combat => StateKind::Combat,
            AIState::Pursuing => StateKind::Pursuing,
            AIState::Flanking { .. } => StateKind::Flanking,
            AIState::Searching { .. } => StateKind::Searching,
            AIState::InCover { .. } => StateKind::InCover,
            AIState::Retreating { .. } => StateKind::Retreating,
            AIState::EvadingGrenade { .. } => StateKind::EvadingGrenade,
            AIState::ThrowingGrenade { .. } => StateKind::ThrowingGrenade,
            AIState::ReadyToThrow { .. } => StateKind::ReadyToThrow,
            AIState::Dead => StateKind::Dead,
        }
    }

    pub fn idle(heading: Vec2) -> Self {
        Self::Idle {
            heading: heading.normalize_or(Vec2::X),
            scan_phase: 0.0,
            elapsed: 0.0,
        }
    }
}

/// Почему произошёл переход
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionReason {
    Stimulus,
    TargetAttackable,
    LostLineOfHit,
    /// Точка last known в поле зрения, цели там нет
    TargetVanished,
    ConfidenceDepleted,
    ArrivedEmpty,
    Unreachable,
    ProgressStalled,
    FlankBlocked,
    TimedOut,
    AreaSearched,
    PatrolRouteAvailable,
    TookDamage,
    LowHealth,
    GrenadeThreat,
    ThreatResolved,
    PlanDirective(ActionKind),
    ThrowReleased,
    ThrowComplete,
    Recovered,
    SafeDistance,
    Killed,
}

/// Запись о переходе (лог + debug snapshot)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: StateKind,
    pub to: StateKind,
    pub reason: TransitionReason,
    pub at: f32,
}
