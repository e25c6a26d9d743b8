//! Цели планировщика и выбор цели по приоритету

use serde::{Deserialize, Serialize};

use super::facts::{Fact, Requirement, WorldStateFacts};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GoalKind {
    EvadeThreat,
    StaySafe,
    EliminateTarget,
    Investigate,
    PatrolArea,
}

/// Цель = набор требований к фактам
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Goal {
    pub kind: GoalKind,
    pub requirements: Vec<(Fact, Requirement)>,
}

impl Goal {
    pub fn new(kind: GoalKind, requirements: Vec<(Fact, Requirement)>) -> Self {
        Self { kind, requirements }
    }

    fn flag(kind: GoalKind, fact: Fact, value: bool) -> Self {
        Self::new(kind, vec![(fact, Requirement::Flag(value))])
    }

    pub fn is_satisfied(&self, facts: &WorldStateFacts) -> bool {
        facts.satisfies(&self.requirements)
    }
}

/// Выбор цели (сверху вниз, первая подходящая)
pub fn select_goal(facts: &WorldStateFacts) -> Option<Goal> {
    if facts.flag(Fact::GrenadeThreatActive) {
        return Some(Goal::flag(GoalKind::EvadeThreat, Fact::GrenadeThreatActive, false));
    }
    if facts.flag(Fact::LowHealth) {
        return Some(Goal::flag(GoalKind::StaySafe, Fact::Safe, true));
    }
    if facts.flag(Fact::PlayerDetected) {
        return Some(Goal::flag(GoalKind::EliminateTarget, Fact::PlayerSuppressed, true));
    }
    if facts.flag(Fact::HeardNoise) || facts.flag(Fact::PassageLit) {
        return Some(Goal::flag(GoalKind::Investigate, Fact::AtLastKnownPosition, true));
    }
    if facts.flag(Fact::HasPatrolRoute) {
        return Some(Goal::flag(GoalKind::PatrolArea, Fact::OnPatrol, true));
    }
    None
}
