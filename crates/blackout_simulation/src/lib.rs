//! Blackout Simulation Core
//!
//! Тактический AI врагов на Bevy 0.16 (headless strategic layer)
//!
//! Слои:
//! - perception: зрение (веер лучей), слух через стены, луч фонаря, союзники, гранаты
//! - memory: last known position + затухающая уверенность
//! - planner: GOAP-советник (A* по фактам мира)
//! - ai: иерархическая state machine + AgentController
//! - tactics: фланг, укрытие, отступление, stall detector
//! - combat: health, оружие, гранаты, звуковой след боя
//!
//! Движок (рендер, физика, баллистика) живёт снаружи и общается через
//! intents (MovementCommand, WeaponFireIntent) и events (HitLanded, SoundEmitted).

use bevy::ecs::event::event_update_system;
use bevy::ecs::system::RunSystemOnce;
use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod ai;
pub mod combat;
pub mod components;
pub mod config;
pub mod geometry;
pub mod logger;
pub mod memory;
pub mod navigation;
pub mod perception;
pub mod planner;
pub mod tactics;

// Re-export основных типов для удобства
pub use ai::{spawn_agent, AIPlugin, AIState, AgentController, AgentSnapshot, StateKind, TransitionReason};
pub use combat::{
    CombatPlugin, DamageDealt, Dead, EntityDied, GrenadePouch, GrenadeThrowIntent, HitLanded, ReloadIntent,
    WeaponFireIntent, WeaponStats,
};
pub use components::*;
pub use config::{ConfigError, TacticalConfig};
pub use logger::{
    init_logger, log, log_error, log_info, log_warning, log_with_level, set_log_level, set_logger, LogLevel,
    LogPrinter,
};

/// Порядок подсистем внутри FixedUpdate
///
/// Combat (таймеры, урон, звуки прошлого тика) → Ai (восприятие, решения, движение).
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    Combat,
    Ai,
}

/// Главный plugin симуляции (объединяет все подсистемы)
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        // seed мог положить create_headless_app, не перетираем
        if !app.world().contains_resource::<DeterministicRng>() {
            app.insert_resource(DeterministicRng::new(42));
        }

        app
            // Fixed timestep 60Hz: все таймеры AI считаются в этих тиках
            .insert_resource(Time::<Fixed>::from_hz(60.0))
            .configure_sets(FixedUpdate, (SimulationSet::Combat, SimulationSet::Ai).chain())
            .add_plugins((CombatPlugin, AIPlugin));
    }
}

/// Детерминистичный RNG resource (seeded)
///
/// Каждый агент получает свой seed отсюда при spawn, дальше живёт на собственном RNG.
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    pub fn next_seed(&mut self) -> u64 {
        self.rng.gen::<u64>()
    }
}

/// Создаёт minimal Bevy App для headless симуляции
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .add_plugins(SimulationPlugin);

    app
}

/// Один FixedUpdate тик без wall clock
///
/// `app.update()` зависит от реального времени, тесты и replay крутят schedule напрямую.
/// Main schedule не запускается, поэтому буферы events переключаем сами после тика:
/// event живёт два тика, дальше отбрасывается.
pub fn run_fixed_tick(app: &mut App) {
    let world = app.world_mut();
    let timestep = world.resource::<Time<Fixed>>().timestep();
    world.resource_mut::<Time<Fixed>>().advance_by(timestep);
    world.run_schedule(FixedUpdate);

    if let Err(error) = world.run_system_once(event_update_system) {
        log_error(&format!("Event buffers not swapped: {}", error));
    }
}

/// Snapshot компонента T по всем entity (для сравнения детерминизма)
pub fn world_snapshot<T: Component>(world: &mut World) -> Vec<u8>
where
    T: std::fmt::Debug,
{
    let mut snapshot = Vec::new();

    let mut query = world.query::<(Entity, &T)>();
    let mut entities: Vec<_> = query.iter(world).collect();
    entities.sort_by_key(|(entity, _)| *entity);

    for (entity, component) in entities {
        snapshot.extend_from_slice(&entity.to_bits().to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }

    snapshot
}

/// Debug snapshots всех агентов (порядок по Entity)
pub fn agent_snapshots(world: &mut World) -> Vec<AgentSnapshot> {
    let mut query = world.query::<(Entity, &AgentController)>();
    let mut agents: Vec<_> = query.iter(world).collect();
    agents.sort_by_key(|(entity, _)| *entity);

    agents
        .into_iter()
        .map(|(_, controller)| controller.snapshot())
        .collect()
}
