//! AgentController: единственное место с engine-facing side effects
//!
//! tick(dt): perception.sense → memory.update → grenade awareness →
//! state_machine.step → movement/aim/fire/reload/throw через capability traits.

use bevy::prelude::*;

use super::awareness::GrenadeAwareness;
use super::debug::AgentSnapshot;
use super::fsm::{DamageTaken, StateMachine, StepContext};
use super::state::{AIState, StateKind, TransitionRecord};
use crate::combat::{AgentEffectors, WeaponStats};
use crate::components::{Actor, AgentId, AimDirection, MovementCommand, MovementSpeed};
use crate::config::TacticalConfig;
use crate::memory::{Memory, MemoryStore};
use crate::navigation::NavigationPort;
use crate::perception::{AllyView, Observer, PerceptionModel, SensorPose, SensoryKind, WorldView};
use crate::planner::ActionCatalog;

/// Тело агента глазами AI (позиция, взгляд, здоровье)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentBody {
    pub position: Vec2,
    pub facing: Vec2,
    pub health_ratio: f32,
}

/// Итог тика (для систем, логов и тестов)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub state: Option<StateKind>,
    pub transitions: Vec<TransitionRecord>,
    pub sensed: usize,
    pub fired: Option<Vec2>,
    pub reloaded: bool,
    pub thrown: Option<Vec2>,
}

/// Тактический AI одного врага (ECS Component)
#[derive(Component, Debug, Clone)]
#[require(Actor, Transform, MovementCommand, MovementSpeed, AimDirection, WeaponStats)]
pub struct AgentController {
    pub id: AgentId,
    pub faction: u64,
    perception: PerceptionModel,
    memory: MemoryStore,
    awareness: GrenadeAwareness,
    machine: StateMachine,
    pending_damage: Option<DamageTaken>,
}

impl AgentController {
    pub fn new(id: AgentId, faction: u64, config: TacticalConfig, seed: u64) -> Self {
        Self::with_catalog(id, faction, config, ActionCatalog::standard(), seed)
    }

    pub fn with_catalog(
        id: AgentId,
        faction: u64,
        config: TacticalConfig,
        catalog: ActionCatalog,
        seed: u64,
    ) -> Self {
        Self {
            id,
            faction,
            perception: PerceptionModel::new(config.perception.clone()),
            memory: MemoryStore::new(config.memory.clone()),
            awareness: GrenadeAwareness::new(),
            machine: StateMachine::new(config, catalog, seed),
            pending_damage: None,
        }
    }

    pub fn with_patrol_route(mut self, route: Vec<Vec2>) -> Self {
        self.machine = self.machine.with_patrol_route(route);
        self
    }

    /// Начальный belief (сценарии, тесты)
    pub fn with_memory(mut self, belief: Memory) -> Self {
        self.memory = MemoryStore::with_belief(self.machine.config().memory.clone(), belief);
        self
    }

    pub fn machine(&self) -> &StateMachine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut StateMachine {
        &mut self.machine
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub fn awareness(&self) -> &GrenadeAwareness {
        &self.awareness
    }

    pub fn state(&self) -> &AIState {
        self.machine.state()
    }

    /// Урон с прошлого тика (суммируется до следующего tick)
    pub fn apply_damage(&mut self, amount: u32, from: Option<Vec2>) {
        let pending = self.pending_damage.get_or_insert(DamageTaken { amount: 0, from: None });
        pending.amount = pending.amount.saturating_add(amount);
        if from.is_some() {
            pending.from = from;
        }
    }

    /// Read-only вид для союзников (строится до mutable прохода)
    pub fn ally_view(&self, position: Vec2) -> AllyView {
        let belief = self.memory.current_belief();
        let in_combat = matches!(
            self.machine.kind(),
            StateKind::Combat | StateKind::Pursuing | StateKind::Flanking
        );
        let evading = match self.machine.state() {
            AIState::EvadingGrenade { grenade, .. } => Some(*grenade),
            _ => None,
        };

        AllyView {
            id: self.id,
            position,
            alerted: in_combat && belief.is_trustworthy(),
            in_combat,
            belief: belief.is_trustworthy().then_some(belief.last_known_position),
            evading,
        }
    }

    pub fn tick(
        &mut self,
        dt: f32,
        body: &AgentBody,
        world: &WorldView,
        nav: &dyn NavigationPort,
        effectors: &mut dyn AgentEffectors,
    ) -> TickReport {
        let observer = Observer {
            id: self.id,
            faction: self.faction,
            pose: SensorPose {
                position: body.position,
                facing: body.facing,
            },
        };

        let events = self.perception.sense(&observer, world);
        self.memory.update(&events, dt);
        self.awareness.observe(&events);
        self.awareness.prune(world.grenades);

        let config = self.machine.config();
        let grenade_threat = self.awareness.threat(
            body.position,
            world.grenades,
            config.combat.grenade_danger_margin,
        );
        let reload_heard = self.memory.reload_heard_recently(config.memory.reload_window);

        let ctx = StepContext {
            dt,
            position: body.position,
            facing: body.facing,
            health_ratio: body.health_ratio,
            damage: self.pending_damage.take(),
            memory: self.memory.current_belief(),
            memory_refreshed: self.memory.refreshed_this_tick(),
            reload_heard,
            saw_target: events.iter().any(|event| event.kind == SensoryKind::Seen),
            grenade_threat,
            has_ammo: !effectors.needs_reload(),
            can_fire: effectors.can_fire(),
            weapon_range: effectors.range(),
            grenades_left: effectors.grenades_left(),
            world: *world,
            nav,
        };

        let out = self.machine.step(&ctx);

        effectors.apply_movement(&out.movement);
        if let Some(direction) = out.facing {
            effectors.apply_facing(direction);
        }

        let mut report = TickReport {
            state: Some(self.machine.kind()),
            sensed: events.len(),
            ..TickReport::default()
        };

        if out.reload && effectors.needs_reload() {
            effectors.reload();
            report.reloaded = true;
        }
        if let Some(direction) = out.fire {
            if effectors.can_fire() {
                effectors.fire(direction);
                report.fired = Some(direction);
            }
        }
        if let Some(target) = out.throw {
            if effectors.grenades_left() > 0 {
                effectors.throw(target);
                report.thrown = Some(target);
            }
        }

        report.transitions = out.transitions;
        report
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot::capture(self.id, &self.machine, &self.memory, &self.awareness)
    }
}
