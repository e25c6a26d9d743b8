//! World-state facts для планировщика
//!
//! Факты пересчитываются заново каждый цикл планирования, никогда не кэшируются между тиками.

use serde::Serialize;
use std::collections::BTreeMap;

/// Имя факта
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Fact {
    PlayerVisible,
    PlayerDetected,
    PlayerReloading,
    HeardNoise,
    InCover,
    CoverAvailable,
    GrenadeThreatActive,
    PassageLit,
    HasAmmo,
    HasGrenade,
    LowHealth,
    PlayerReachableForAttack,
    FlankAvailable,
    TargetInThrowRange,
    AtLastKnownPosition,
    AreaSearched,
    Safe,
    PlayerSuppressed,
    HasPatrolRoute,
    OnPatrol,
    // Numeric
    HealthRatio,
    MemoryConfidence,
    DistanceToTarget,
    AlliesInCombat,
}

impl Fact {
    pub fn name(&self) -> &'static str {
        match self {
            Fact::PlayerVisible => "player_visible",
            Fact::PlayerDetected => "player_detected",
            Fact::PlayerReloading => "player_reloading",
            Fact::HeardNoise => "heard_noise",
            Fact::InCover => "in_cover",
            Fact::CoverAvailable => "cover_available",
            Fact::GrenadeThreatActive => "grenade_threat_active",
            Fact::PassageLit => "passage_lit",
            Fact::HasAmmo => "has_ammo",
            Fact::HasGrenade => "has_grenade",
            Fact::LowHealth => "low_health",
            Fact::PlayerReachableForAttack => "player_reachable_for_attack",
            Fact::FlankAvailable => "flank_available",
            Fact::TargetInThrowRange => "target_in_throw_range",
            Fact::AtLastKnownPosition => "at_last_known_position",
            Fact::AreaSearched => "area_searched",
            Fact::Safe => "safe",
            Fact::PlayerSuppressed => "player_suppressed",
            Fact::HasPatrolRoute => "has_patrol_route",
            Fact::OnPatrol => "on_patrol",
            Fact::HealthRatio => "health_ratio",
            Fact::MemoryConfidence => "memory_confidence",
            Fact::DistanceToTarget => "distance_to_target",
            Fact::AlliesInCombat => "allies_in_combat",
        }
    }
}

/// Значение факта
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum FactValue {
    Flag(bool),
    Scalar(f32),
}

impl FactValue {
    /// Ключ для closed set (f32 не Hash)
    fn key(&self) -> u64 {
        match self {
            FactValue::Flag(flag) => u64::from(*flag),
            FactValue::Scalar(value) => (1u64 << 32) | u64::from(value.to_bits()),
        }
    }
}

/// Требование к факту (предусловие действия или часть цели)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Requirement {
    Flag(bool),
    AtLeast(f32),
    AtMost(f32),
}

impl Requirement {
    /// Отсутствующий флаг = false, отсутствующее число = 0.0
    pub fn satisfied_by(&self, value: Option<FactValue>) -> bool {
        match (self, value) {
            (Requirement::Flag(expected), Some(FactValue::Flag(actual))) => *expected == actual,
            (Requirement::Flag(expected), None) => !*expected,
            (Requirement::AtLeast(min), Some(FactValue::Scalar(actual))) => actual >= *min,
            (Requirement::AtLeast(min), None) => 0.0 >= *min,
            (Requirement::AtMost(max), Some(FactValue::Scalar(actual))) => actual <= *max,
            (Requirement::AtMost(max), None) => 0.0 <= *max,
            _ => false,
        }
    }
}

/// Снимок фактов для одного цикла планирования
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct WorldStateFacts {
    values: BTreeMap<Fact, FactValue>,
}

impl WorldStateFacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, fact: Fact, value: FactValue) -> &mut Self {
        self.values.insert(fact, value);
        self
    }

    pub fn set_flag(&mut self, fact: Fact, value: bool) -> &mut Self {
        self.set(fact, FactValue::Flag(value))
    }

    pub fn set_scalar(&mut self, fact: Fact, value: f32) -> &mut Self {
        self.set(fact, FactValue::Scalar(value))
    }

    pub fn with_flag(mut self, fact: Fact, value: bool) -> Self {
        self.set_flag(fact, value);
        self
    }

    pub fn get(&self, fact: Fact) -> Option<FactValue> {
        self.values.get(&fact).copied()
    }

    pub fn flag(&self, fact: Fact) -> bool {
        matches!(self.get(fact), Some(FactValue::Flag(true)))
    }

    pub fn scalar(&self, fact: Fact) -> f32 {
        match self.get(fact) {
            Some(FactValue::Scalar(value)) => value,
            _ => 0.0,
        }
    }

    pub fn satisfies(&self, requirements: &[(Fact, Requirement)]) -> bool {
        requirements
            .iter()
            .all(|(fact, requirement)| requirement.satisfied_by(self.get(*fact)))
    }

    pub fn unsatisfied_count(&self, requirements: &[(Fact, Requirement)]) -> usize {
        requirements
            .iter()
            .filter(|(fact, requirement)| !requirement.satisfied_by(self.get(*fact)))
            .count()
    }

    /// Новое состояние после эффектов действия (исходное не меняется)
    pub fn apply(&self, effects: &[(Fact, FactValue)]) -> Self {
        let mut next = self.clone();
        for (fact, value) in effects {
            next.values.insert(*fact, *value);
        }
        next
    }

    pub(crate) fn key(&self) -> Vec<(Fact, u64)> {
        self.values.iter().map(|(fact, value)| (*fact, value.key())).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Fact, FactValue)> + '_ {
        self.values.iter().map(|(fact, value)| (*fact, *value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_flag_reads_as_false() {
        let facts = WorldStateFacts::new();
        assert!(Requirement::Flag(false).satisfied_by(facts.get(Fact::InCover)));
        assert!(!Requirement::Flag(true).satisfied_by(facts.get(Fact::InCover)));
    }

    #[test]
    fn test_numeric_requirements() {
        let mut facts = WorldStateFacts::new();
        facts.set_scalar(Fact::AlliesInCombat, 2.0);

        assert!(facts.satisfies(&[(Fact::AlliesInCombat, Requirement::AtLeast(2.0))]));
        assert!(!facts.satisfies(&[(Fact::AlliesInCombat, Requirement::AtMost(1.0))]));
        // Тип не совпадает → не выполнено
        assert!(!Requirement::Flag(true).satisfied_by(facts.get(Fact::AlliesInCombat)));
    }

    #[test]
    fn test_apply_does_not_mutate_source() {
        let facts = WorldStateFacts::new().with_flag(Fact::HasAmmo, false);
        let next = facts.apply(&[(Fact::HasAmmo, FactValue::Flag(true))]);

        assert!(!facts.flag(Fact::HasAmmo));
        assert!(next.flag(Fact::HasAmmo));
        assert_ne!(facts.key(), next.key());
    }
}
