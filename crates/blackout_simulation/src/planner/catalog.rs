//! Action catalog: фиксированный набор действий планировщика
//!
//! Порядок объявления важен: он последний tie-break в поиске (детерминизм тестов).
//! Выключенное действие остаётся в каталоге с `DISABLED_COST`, индексы не сдвигаются.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::facts::{Fact, FactValue, Requirement};

/// Cost-sentinel: действие с cost ≥ этого значения никогда не выбирается
pub const DISABLED_COST: f32 = 1.0e6;

/// Нижняя граница cost: эвристика поиска считает каждое невыполненное требование
/// минимум за одно действие стоимостью 1.0
pub const MIN_ACTION_COST: f32 = 1.0;

/// Capability-действие
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Attack,
    Reload,
    Pursue,
    Flank,
    RushReloadingTarget,
    PeekFromCover,
    SeekCover,
    Retreat,
    ThrowGrenade,
    EvadeGrenade,
    InvestigateNoise,
    InvestigateLight,
    SearchArea,
    Patrol,
    ReturnToPost,
    HoldPosition,
    SuppressFromCover,
    CoordinatedAssault,
}

/// Stateless описание действия
#[derive(Debug, Clone, PartialEq)]
pub struct ActionDef {
    pub kind: ActionKind,
    pub name: &'static str,
    pub preconditions: Vec<(Fact, Requirement)>,
    pub effects: Vec<(Fact, FactValue)>,
    pub cost: f32,
}

impl ActionDef {
    pub fn new(kind: ActionKind, name: &'static str, cost: f32) -> Self {
        Self {
            kind,
            name,
            preconditions: Vec::new(),
            effects: Vec::new(),
            cost,
        }
    }

    pub fn requires(mut self, fact: Fact, requirement: Requirement) -> Self {
        self.preconditions.push((fact, requirement));
        self
    }

    pub fn requires_flag(self, fact: Fact, value: bool) -> Self {
        self.requires(fact, Requirement::Flag(value))
    }

    pub fn sets(mut self, fact: Fact, value: bool) -> Self {
        self.effects.push((fact, FactValue::Flag(value)));
        self
    }

    pub fn is_disabled(&self) -> bool {
        !self.cost.is_finite() || self.cost >= DISABLED_COST
    }

    /// Хотя бы один эффект меняет то, что предусловия не гарантируют
    pub fn makes_progress(&self) -> bool {
        self.effects.iter().any(|(fact, value)| {
            !self
                .preconditions
                .iter()
                .any(|(pre_fact, requirement)| pre_fact == fact && requirement.satisfied_by(Some(*value)))
        })
    }
}

/// Нарушение инвариантов каталога
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("action `{0}` has no effect beyond its preconditions")]
    NoProgress(&'static str),
    #[error("action `{name}` has invalid cost {cost}")]
    InvalidCost { name: &'static str, cost: f32 },
    #[error("action `{0}` declared twice")]
    Duplicate(&'static str),
}

/// Каталог действий (фиксируется при старте)
#[derive(Debug, Clone, PartialEq)]
pub struct ActionCatalog {
    actions: Vec<ActionDef>,
}

impl Default for ActionCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl ActionCatalog {
    pub fn new(actions: Vec<ActionDef>) -> Self {
        Self { actions }
    }

    /// Стандартный каталог врага
    pub fn standard() -> Self {
        use ActionKind as A;
        use Fact as F;

        Self::new(vec![
            ActionDef::new(A::Attack, "attack", 1.0)
                .requires_flag(F::PlayerDetected, true)
                .requires_flag(F::PlayerReachableForAttack, true)
                .requires_flag(F::HasAmmo, true)
                .requires_flag(F::InCover, false)
                .sets(F::PlayerSuppressed, true),
            ActionDef::new(A::Reload, "reload", 1.0)
                .requires_flag(F::HasAmmo, false)
                .sets(F::HasAmmo, true),
            ActionDef::new(A::Pursue, "pursue", 3.0)
                .requires_flag(F::PlayerDetected, true)
                .sets(F::PlayerReachableForAttack, true)
                .sets(F::AtLastKnownPosition, true),
            ActionDef::new(A::Flank, "flank", 2.0)
                .requires_flag(F::PlayerDetected, true)
                .requires_flag(F::FlankAvailable, true)
                .sets(F::PlayerReachableForAttack, true),
            ActionDef::new(A::RushReloadingTarget, "rush_reloading_target", 1.5)
                .requires_flag(F::PlayerDetected, true)
                .requires_flag(F::PlayerReloading, true)
                .sets(F::PlayerReachableForAttack, true),
            ActionDef::new(A::PeekFromCover, "peek_from_cover", 2.0)
                .requires_flag(F::InCover, true)
                .requires_flag(F::PlayerDetected, true)
                .sets(F::PlayerReachableForAttack, true),
            ActionDef::new(A::SeekCover, "seek_cover", 2.0)
                .requires_flag(F::CoverAvailable, true)
                .requires_flag(F::InCover, false)
                .sets(F::InCover, true)
                .sets(F::Safe, true),
            ActionDef::new(A::Retreat, "retreat", 4.0)
                .requires_flag(F::LowHealth, true)
                .sets(F::Safe, true),
            ActionDef::new(A::ThrowGrenade, "throw_grenade", 3.5)
                .requires_flag(F::HasGrenade, true)
                .requires_flag(F::PlayerDetected, true)
                .requires_flag(F::TargetInThrowRange, true)
                .sets(F::PlayerSuppressed, true),
            ActionDef::new(A::EvadeGrenade, "evade_grenade", 1.0)
                .requires_flag(F::GrenadeThreatActive, true)
                .sets(F::GrenadeThreatActive, false)
                .sets(F::Safe, true),
            ActionDef::new(A::InvestigateNoise, "investigate_noise", 2.0)
                .requires_flag(F::HeardNoise, true)
                .sets(F::AtLastKnownPosition, true),
            ActionDef::new(A::InvestigateLight, "investigate_light", 2.0)
                .requires_flag(F::PassageLit, true)
                .sets(F::AtLastKnownPosition, true),
            ActionDef::new(A::SearchArea, "search_area", 2.0)
                .requires_flag(F::AtLastKnownPosition, true)
                .requires_flag(F::AreaSearched, false)
                .sets(F::AreaSearched, true),
            ActionDef::new(A::Patrol, "patrol", 1.0)
                .requires_flag(F::HasPatrolRoute, true)
                .sets(F::OnPatrol, true),
            ActionDef::new(A::ReturnToPost, "return_to_post", 2.0)
                .requires_flag(F::AreaSearched, true)
                .sets(F::OnPatrol, true),
            ActionDef::new(A::HoldPosition, "hold_position", 1.0)
                .requires_flag(F::InCover, true)
                .sets(F::Safe, true),
            ActionDef::new(A::SuppressFromCover, "suppress_from_cover", 1.0)
                .requires_flag(F::InCover, true)
                .requires_flag(F::PlayerDetected, true)
                .requires_flag(F::PlayerReachableForAttack, true)
                .requires_flag(F::HasAmmo, true)
                .sets(F::PlayerSuppressed, true),
            // Одновременный штурм всей группой: эмерджентный rush оказался нежелательным
            ActionDef::new(A::CoordinatedAssault, "coordinated_assault", DISABLED_COST)
                .requires_flag(F::PlayerDetected, true)
                .requires(F::AlliesInCombat, Requirement::AtLeast(2.0))
                .sets(F::PlayerSuppressed, true),
        ])
    }

    pub fn actions(&self) -> &[ActionDef] {
        &self.actions
    }

    pub fn get(&self, kind: ActionKind) -> Option<&ActionDef> {
        self.actions.iter().find(|action| action.kind == kind)
    }

    /// Тот же каталог с новой стоимостью действия (soft-disable для тестов/тулинга)
    pub fn with_cost(mut self, kind: ActionKind, cost: f32) -> Self {
        if let Some(action) = self.actions.iter_mut().find(|action| action.kind == kind) {
            action.cost = cost;
        }
        self
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        for (index, action) in self.actions.iter().enumerate() {
            if action.cost.is_nan() || action.cost < MIN_ACTION_COST {
                return Err(CatalogError::InvalidCost {
                    name: action.name,
                    cost: action.cost,
                });
            }
            if !action.makes_progress() {
                return Err(CatalogError::NoProgress(action.name));
            }
            if self.actions[..index].iter().any(|other| other.kind == action.kind) {
                return Err(CatalogError::Duplicate(action.name));
            }
        }
        Ok(())
    }
}
