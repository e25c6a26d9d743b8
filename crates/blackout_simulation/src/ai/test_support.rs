//! Тестовый стенд: один агент, headless тело, мир из векторов

use bevy::prelude::*;

use super::controller::{AgentBody, AgentController, TickReport};
use super::state::{AIState, StateKind, TransitionReason, TransitionRecord};
use super::systems::step_toward;
use crate::combat::{GrenadeCapability, GrenadePouch, MovementIntegrator, WeaponCapability, WeaponStats};
use crate::components::{AgentId, MovementCommand};
use crate::config::TacticalConfig;
use crate::geometry::{LineOfSight, WallMap};
use crate::memory::{Memory, MemorySource};
use crate::navigation::{NavigationPort, OpenFieldNavigator, VisibilityGraphNavigator};
use crate::perception::{
    AllyView, Emitter, GrenadeView, LightBeam, SoundEmission, SoundKind, TargetView, WorldView,
};

pub const DT: f32 = 1.0 / 60.0;
pub const SPEED: f32 = 140.0;

/// Effectors, которые просто записывают вызовы
#[derive(Debug, Clone)]
pub struct RecordingEffectors {
    pub weapon: WeaponStats,
    pub pouch: GrenadePouch,
    pub movement: MovementCommand,
    pub facing: Option<Vec2>,
    pub shots: Vec<Vec2>,
    pub reloads: usize,
    pub throws: Vec<Vec2>,
}

impl Default for RecordingEffectors {
    fn default() -> Self {
        Self {
            weapon: WeaponStats::rifle(),
            pouch: GrenadePouch::empty(),
            movement: MovementCommand::Idle,
            facing: None,
            shots: Vec::new(),
            reloads: 0,
            throws: Vec::new(),
        }
    }
}

impl WeaponCapability for RecordingEffectors {
    fn can_fire(&self) -> bool {
        self.weapon.can_fire()
    }

    fn needs_reload(&self) -> bool {
        self.weapon.needs_reload()
    }

    fn range(&self) -> f32 {
        self.weapon.range
    }

    fn fire(&mut self, direction: Vec2) {
        self.weapon.fire(direction);
        self.shots.push(direction);
    }

    fn reload(&mut self) {
        self.weapon.reload();
        self.reloads += 1;
    }
}

impl GrenadeCapability for RecordingEffectors {
    fn grenades_left(&self) -> u32 {
        self.pouch.grenades_left()
    }

    fn throw(&mut self, target: Vec2) {
        self.pouch.throw(target);
        self.throws.push(target);
    }
}

impl MovementIntegrator for RecordingEffectors {
    fn apply_movement(&mut self, intent: &MovementCommand) {
        self.movement = intent.clone();
    }

    fn apply_facing(&mut self, direction: Vec2) {
        self.facing = Some(direction);
    }
}

pub fn belief(source: MemorySource, position: Vec2, confidence: f32) -> Memory {
    Memory {
        last_known_position: position,
        confidence,
        source,
        timestamp: 0.0,
    }
}

pub fn player_shot(origin: Vec2) -> SoundEmission {
    SoundEmission::new(SoundKind::Gunshot, origin, 1.0, Emitter::Player)
}

pub fn player_reload(origin: Vec2) -> SoundEmission {
    SoundEmission::new(SoundKind::Reload, origin, 1.0, Emitter::Player)
}

/// Один агент против мира из векторов; движение = шаг к waypoint, стены блокируют шаг
pub struct Scenario {
    pub controller: AgentController,
    pub body: AgentBody,
    pub effectors: RecordingEffectors,
    pub walls: WallMap,
    pub nav: Box<dyn NavigationPort>,
    pub target: Option<Vec2>,
    /// Одноразовые звуки (очищаются после тика)
    pub sounds: Vec<SoundEmission>,
    pub beams: Vec<LightBeam>,
    pub grenades: Vec<GrenadeView>,
    pub allies: Vec<AllyView>,
    pub cover_points: Vec<Vec2>,
    pub now: f32,
    pub ticks: usize,
    pub history: Vec<TransitionRecord>,
    pub last_report: TickReport,
}

impl Scenario {
    pub fn new(position: Vec2) -> Self {
        Self::with_config(position, TacticalConfig::default())
    }

    pub fn with_config(position: Vec2, config: TacticalConfig) -> Self {
        Self {
            controller: AgentController::new(AgentId(1), 1, config, 7),
            body: AgentBody {
                position,
                facing: Vec2::X,
                health_ratio: 1.0,
            },
            effectors: RecordingEffectors::default(),
            walls: WallMap::default(),
            nav: Box::new(OpenFieldNavigator),
            target: None,
            sounds: Vec::new(),
            beams: Vec::new(),
            grenades: Vec::new(),
            allies: Vec::new(),
            cover_points: Vec::new(),
            now: 0.0,
            ticks: 0,
            history: Vec::new(),
            last_report: TickReport::default(),
        }
    }

    /// Стены + навигатор, который их обходит
    pub fn with_walls(mut self, walls: WallMap) -> Self {
        self.nav = Box::new(VisibilityGraphNavigator::new(walls.clone(), 10.0));
        self.walls = walls;
        self
    }

    pub fn with_nav(mut self, nav: impl NavigationPort + 'static) -> Self {
        self.nav = Box::new(nav);
        self
    }

    pub fn remember(mut self, memory: Memory) -> Self {
        self.controller = self.controller.clone().with_memory(memory);
        self
    }

    pub fn force(mut self, state: AIState) -> Self {
        self.controller.machine_mut().set_state(state);
        self
    }

    pub fn kind(&self) -> StateKind {
        self.controller.machine().kind()
    }

    pub fn position(&self) -> Vec2 {
        self.body.position
    }

    pub fn tick(&mut self) -> &TickReport {
        self.now += DT;
        self.ticks += 1;

        let world = WorldView {
            now: self.now,
            target: self.target.map(|position| TargetView {
                position,
                radius: 16.0,
            }),
            sounds: &self.sounds,
            beams: &self.beams,
            grenades: &self.grenades,
            allies: &self.allies,
            cover_points: &self.cover_points,
            geometry: &self.walls,
        };
        let report = self
            .controller
            .tick(DT, &self.body, &world, self.nav.as_ref(), &mut self.effectors);

        self.sounds.clear();
        self.integrate();
        self.effectors.weapon.tick(DT);
        self.history.extend(report.transitions.iter().copied());
        self.last_report = report;
        &self.last_report
    }

    fn integrate(&mut self) {
        let target = match self.effectors.movement {
            MovementCommand::Idle => None,
            MovementCommand::MoveToPosition { target } | MovementCommand::RetreatFrom { target, .. } => {
                Some(target)
            }
        };
        if let Some(target) = target {
            let position = self.body.position;
            let next = step_toward(position, target, SPEED * DT);
            if self.walls.is_clear(position, next) {
                self.body.position = next;
            }
        }
        if let Some(facing) = self.effectors.facing {
            self.body.facing = facing;
        }
    }

    pub fn run(&mut self, ticks: usize) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    /// Тикать пока условие не выполнится; номер тика (с 1) или None
    pub fn run_until(&mut self, max_ticks: usize, mut done: impl FnMut(&Scenario) -> bool) -> Option<usize> {
        for tick in 1..=max_ticks {
            self.tick();
            if done(self) {
                return Some(tick);
            }
        }
        None
    }

    pub fn saw_transition(&self, from: StateKind, to: StateKind) -> bool {
        self.history.iter().any(|record| record.from == from && record.to == to)
    }

    pub fn saw_reason(&self, reason: TransitionReason) -> bool {
        self.history.iter().any(|record| record.reason == reason)
    }
}
