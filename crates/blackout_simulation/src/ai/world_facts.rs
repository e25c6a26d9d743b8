//! Сборка WorldStateFacts из восприятия, памяти, тела и тактических запросов
//!
//! Факты строятся заново каждый тик. "Знаем где цель" берётся из памяти,
//! "можем попасть" из геометрии: это разные факты.

use bevy::prelude::*;

use super::state::AIState;
use crate::config::TacticalConfig;
use crate::memory::{Memory, MemorySource};
use crate::perception::GrenadeView;
use crate::planner::{Fact, WorldStateFacts};
use crate::tactics::{FlankSide, TacticalEvaluator};

/// Всё, что нужно для фактов одного агента за тик
#[derive(Debug, Clone, Copy)]
pub struct FactInputs<'a> {
    pub position: Vec2,
    pub state: &'a AIState,
    pub memory: Memory,
    /// Цель в поле зрения этот тик
    pub saw_target: bool,
    pub reload_heard: bool,
    pub health_ratio: f32,
    pub has_ammo: bool,
    pub weapon_range: f32,
    pub grenades_left: u32,
    pub grenade_threat: Option<GrenadeView>,
    pub area_searched: bool,
    pub has_patrol_route: bool,
    pub allies_in_combat: usize,
    pub cover_points: &'a [Vec2],
}

/// Обнаружена ли цель: доверенная память с confidence не ниже порога реакции
pub fn target_detected(memory: &Memory, config: &TacticalConfig) -> bool {
    memory.is_trustworthy() && memory.confidence >= config.perception.min_reaction_confidence
}

pub fn build_facts(
    inputs: &FactInputs,
    eval: &TacticalEvaluator,
    config: &TacticalConfig,
) -> WorldStateFacts {
    let mut facts = WorldStateFacts::new();
    let position = inputs.position;
    let memory = inputs.memory;
    let target = memory.last_known_position;
    let detected = target_detected(&memory, config);

    let in_cover = matches!(inputs.state, AIState::InCover { arrived: true, .. });
    let attackable = detected && eval.attack_possible(position, target, inputs.weapon_range);

    // Фланг нужен только когда прямой подход закрыт
    let flank_available = detected
        && !attackable
        && eval.reachable(position, target).is_err()
        && eval
            .validated_flank(position, target, FlankSide::Left, config.movement.flank_distance)
            .chosen
            .is_some();

    let threat_position = if detected { target } else { position };
    let cover_available = eval
        .best_cover(inputs.cover_points, position, threat_position)
        .is_some();

    let far_from_threat = position.distance(target) >= config.combat.retreat_safe_distance;

    facts
        .set_flag(Fact::PlayerVisible, inputs.saw_target)
        .set_flag(Fact::PlayerDetected, detected)
        .set_flag(
            Fact::PlayerReloading,
            detected && inputs.reload_heard,
        )
        .set_flag(
            Fact::HeardNoise,
            memory.is_trustworthy() && memory.source.is_auditory(),
        )
        .set_flag(
            Fact::PassageLit,
            memory.is_trustworthy() && memory.source == MemorySource::Flashlight,
        )
        .set_flag(Fact::InCover, in_cover)
        .set_flag(Fact::CoverAvailable, cover_available)
        .set_flag(Fact::GrenadeThreatActive, inputs.grenade_threat.is_some())
        .set_flag(Fact::HasAmmo, inputs.has_ammo)
        .set_flag(Fact::HasGrenade, inputs.grenades_left > 0)
        .set_flag(
            Fact::LowHealth,
            inputs.health_ratio < config.combat.retreat_health_threshold,
        )
        .set_flag(Fact::PlayerReachableForAttack, attackable)
        .set_flag(Fact::FlankAvailable, flank_available)
        .set_flag(
            Fact::TargetInThrowRange,
            detected && position.distance(target) <= config.combat.grenade_throw_range,
        )
        .set_flag(
            Fact::AtLastKnownPosition,
            memory.source != MemorySource::None
                && position.distance(target) <= config.movement.arrival_radius,
        )
        .set_flag(Fact::AreaSearched, inputs.area_searched)
        .set_flag(Fact::Safe, in_cover || far_from_threat || !detected)
        .set_flag(Fact::HasPatrolRoute, inputs.has_patrol_route)
        .set_flag(
            Fact::OnPatrol,
            matches!(inputs.state, AIState::Patrol { .. }),
        )
        .set_scalar(Fact::HealthRatio, inputs.health_ratio)
        .set_scalar(Fact::MemoryConfidence, memory.confidence)
        .set_scalar(Fact::DistanceToTarget, position.distance(target))
        .set_scalar(Fact::AlliesInCombat, inputs.allies_in_combat as f32);

    facts
}
