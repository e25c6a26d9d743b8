//! Tests for AgentController (perception → memory → state machine → effectors).

#[cfg(test)]
mod tests {
    use bevy::prelude::*;

    use super::super::state::{AIState, StateKind, TransitionReason};
    use super::super::test_support::Scenario;
    use crate::components::AgentId;
    use crate::memory::MemorySource;
    use crate::perception::{AllyView, Emitter, LightBeam, SoundEmission, SoundKind};

    #[test]
    fn test_own_faction_gunshot_is_ignored() {
        let mut scenario = Scenario::new(Vec2::ZERO);
        scenario.sounds.push(SoundEmission::new(
            SoundKind::Gunshot,
            Vec2::new(80.0, 0.0),
            1.0,
            Emitter::Agent {
                id: AgentId(2),
                faction: 1,
            },
        ));

        let report = scenario.tick().clone();

        assert_eq!(report.sensed, 0);
        assert_eq!(scenario.kind(), StateKind::Idle);
        assert_eq!(
            scenario.controller.memory().current_belief().source,
            MemorySource::None
        );
    }

    #[test]
    fn test_visible_target_engaged_and_fired_upon() {
        let mut scenario = Scenario::new(Vec2::ZERO);
        scenario.target = Some(Vec2::new(200.0, 0.0));

        let report = scenario.tick().clone();

        assert_eq!(report.state, Some(StateKind::Combat));
        assert_eq!(report.fired, Some(Vec2::X));
        assert_eq!(scenario.effectors.shots, vec![Vec2::X]);
        assert_eq!(scenario.effectors.facing, Some(Vec2::X));

        let ally = scenario.controller.ally_view(scenario.position());
        assert!(ally.in_combat);
        assert!(ally.alerted);
        assert_eq!(ally.belief, Some(Vec2::new(200.0, 0.0)));
    }

    #[test]
    fn test_empty_magazine_reloads_instead_of_firing() {
        let mut scenario = Scenario::new(Vec2::ZERO);
        scenario.target = Some(Vec2::new(200.0, 0.0));
        scenario.effectors.weapon.ammo = 0;

        let report = scenario.tick().clone();

        assert!(report.reloaded);
        assert_eq!(report.fired, None);
        assert_eq!(scenario.effectors.reloads, 1);
        assert!(scenario.effectors.weapon.is_reloading());
    }

    #[test]
    fn test_damage_turns_agent_toward_shooter() {
        let mut scenario = Scenario::new(Vec2::ZERO);
        scenario.body.health_ratio = 0.95;
        scenario.controller.apply_damage(3, None);
        scenario.controller.apply_damage(2, Some(Vec2::new(0.0, 100.0)));

        scenario.tick();

        assert_eq!(scenario.kind(), StateKind::Idle);
        assert_eq!(scenario.effectors.facing, Some(Vec2::Y));
    }

    #[test]
    fn test_flashlight_beam_reveals_emitter() {
        let mut scenario = Scenario::new(Vec2::ZERO);
        scenario.beams.push(LightBeam {
            emitter_position: Vec2::new(300.0, 0.0),
            direction: Vec2::NEG_X,
            half_angle: 0.3,
            range: 400.0,
            emitter: Emitter::Player,
        });

        scenario.tick();

        let memory = scenario.controller.memory().current_belief();
        assert_eq!(memory.source, MemorySource::Flashlight);
        assert_eq!(memory.last_known_position, Vec2::new(300.0, 0.0));
        let first = scenario.history.first().copied().expect("reaction");
        assert_eq!((first.from, first.to), (StateKind::Idle, StateKind::Pursuing));
    }

    #[test]
    fn test_alerted_ally_shares_belief() {
        let mut scenario = Scenario::new(Vec2::ZERO);
        scenario.allies.push(AllyView {
            id: AgentId(2),
            position: Vec2::new(100.0, 0.0),
            alerted: true,
            in_combat: true,
            belief: Some(Vec2::new(400.0, 0.0)),
            evading: None,
        });

        scenario.tick();

        let memory = scenario.controller.memory().current_belief();
        assert_eq!(memory.source, MemorySource::AllyAlert);
        assert_eq!(memory.last_known_position, Vec2::new(400.0, 0.0));
        let first = scenario.history.first().copied().expect("reaction");
        assert_eq!(first.to, StateKind::Pursuing);
        assert_eq!(first.reason, TransitionReason::Stimulus);
    }

    #[test]
    fn test_snapshot_serializes_state_memory_and_plan() {
        let mut scenario = Scenario::new(Vec2::ZERO);
        scenario.target = Some(Vec2::new(200.0, 0.0));
        scenario.tick();

        let json = scenario.controller.snapshot().to_json().expect("serializable");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");

        assert_eq!(value["agent"], 1);
        assert_eq!(value["state"], "Combat");
        assert_eq!(value["memory"]["source"], "Visual");
        assert_eq!(value["plan"]["goal"], "EliminateTarget");
        assert_eq!(value["last_transition"]["reason"], "Stimulus");
    }

    #[test]
    fn test_forced_state_is_reported() {
        let mut scenario = Scenario::new(Vec2::ZERO);
        scenario.controller.machine_mut().set_state(AIState::Dead);

        let report = scenario.tick().clone();

        assert_eq!(report.state, Some(StateKind::Dead));
        assert!(report.transitions.is_empty());
    }
}
