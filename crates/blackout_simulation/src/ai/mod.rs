//! Tactical AI: HSM + GOAP-советник поверх perception и decaying memory
//!
//! Слои:
//! - state/transitions: иерархия состояний и таблица допустимых переходов
//! - fsm: StateMachine (прерывания, план, логика состояний, stall, facing)
//! - controller: AgentController (единственное место с side effects)
//! - systems: ECS обвязка (снимок мира → tick → intents)

use bevy::prelude::*;

pub mod awareness;
pub mod controller;
pub mod debug;
pub mod facing;
pub mod fsm;
pub mod state;
pub mod systems;
pub mod transitions;
pub mod world_facts;

// Tests (separate files with _tests suffix)
#[cfg(test)]
mod controller_tests;
#[cfg(test)]
mod test_support;

// Re-export основных типов
pub use awareness::GrenadeAwareness;
pub use controller::{AgentBody, AgentController, TickReport};
pub use debug::AgentSnapshot;
pub use facing::{facing_rule, resolve_facing, FacingPriority, FacingRequest, FacingSource};
pub use fsm::{DamageTaken, StateMachine, StepContext, StepOutput};
pub use state::{AIState, StateKind, TransitionReason, TransitionRecord};
pub use systems::spawn_agent;
pub use transitions::allowed_transition;

/// AI Plugin
///
/// Регистрирует AI системы в FixedUpdate (`SimulationSet::Ai`, после combat).
/// Порядок выполнения:
/// 1. collect_sound_emissions: SoundEmitted → SoundBus
/// 2. react_to_damage: DamageDealt → pending damage агентов
/// 3. tactical_ai_tick: perception → memory → StateMachine → intents
/// 4. integrate_movement: MovementCommand → Transform (headless)
/// 5. clear_transient_stimuli: звуки живут один тик
pub struct AIPlugin;

impl Plugin for AIPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<crate::perception::SoundEmitted>()
            .add_event::<crate::combat::DamageDealt>()
            .add_event::<crate::combat::WeaponFireIntent>()
            .add_event::<crate::combat::ReloadIntent>()
            .add_event::<crate::combat::GrenadeThrowIntent>()
            .init_resource::<crate::perception::SoundBus>()
            .init_resource::<crate::perception::LightBeams>()
            .init_resource::<crate::perception::CoverPoints>()
            .init_resource::<crate::combat::ActiveGrenades>()
            .init_resource::<crate::geometry::WallMap>()
            .init_resource::<crate::navigation::Navigation>();

        app.add_systems(
            FixedUpdate,
            (
                systems::collect_sound_emissions,
                systems::react_to_damage,
                systems::tactical_ai_tick,
                systems::integrate_movement,
                systems::clear_transient_stimuli,
            )
                .chain() // Последовательное выполнение для детерминизма
                .in_set(crate::SimulationSet::Ai),
        );
    }
}
