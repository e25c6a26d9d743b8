//! Tactical StateMachine: один активный AIState, планировщик как советник
//!
//! Порядок одного `step()`:
//! 1. Dead / смертельный урон
//! 2. Факты мира (заново каждый тик)
//! 3. Прерывания: граната → урон/low health → свежий стимул (кроме окна броска)
//! 4. План: перепланирование по триггерам, директива текущего шага
//! 5. Логика состояния (переход → логика нового состояния в этом же тике)
//! 6. Stall detector: принудительный выход в этом же тике
//! 7. Facing: одна таблица приоритетов, один победитель
//!
//! Каждый переход проверяется таблицей `allowed_transition` и логируется с причиной.

use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f32::consts::TAU;

use super::facing::{resolve_facing, FacingRequest, FacingSource};
use super::state::{AIState, StateKind, TransitionReason, TransitionRecord};
use super::transitions::allowed_transition;
use super::world_facts::{build_facts, FactInputs};
use crate::components::MovementCommand;
use crate::config::TacticalConfig;
use crate::geometry::rotate;
use crate::memory::{Memory, MemorySource};
use crate::navigation::{NavError, NavigationPort};
use crate::perception::{can_see, GrenadeView, SensorPose, WorldView};
use crate::planner::{
    select_goal, ActionCatalog, ActionKind, ActionPlanner, Fact, NoPlan, Plan, WorldStateFacts,
};
use crate::tactics::{flank_position, FlankSide, ProgressTracker, TacticalEvaluator};

/// Сколько раз за тик можно выполнить логику состояния после переходов
const MAX_STATE_PASSES: usize = 3;

/// Урон, полученный с прошлого тика
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageTaken {
    pub amount: u32,
    /// Позиция атакующего (если известна)
    pub from: Option<Vec2>,
}

/// Всё, что StateMachine читает за один тик
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    pub dt: f32,
    pub position: Vec2,
    pub facing: Vec2,
    pub health_ratio: f32,
    pub damage: Option<DamageTaken>,
    pub memory: Memory,
    pub memory_refreshed: bool,
    pub reload_heard: bool,
    pub saw_target: bool,
    /// Граната, которую агент лично заметил и в радиусе которой стоит
    pub grenade_threat: Option<GrenadeView>,
    pub has_ammo: bool,
    pub can_fire: bool,
    pub weapon_range: f32,
    pub grenades_left: u32,
    pub world: WorldView<'a>,
    pub nav: &'a dyn NavigationPort,
}

/// Решения тика (применяет AgentController через capability traits)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutput {
    pub movement: MovementCommand,
    pub facing: Option<Vec2>,
    pub fire: Option<Vec2>,
    pub reload: bool,
    pub throw: Option<Vec2>,
    pub transitions: Vec<TransitionRecord>,
}

/// План в исполнении
#[derive(Debug, Clone, PartialEq)]
pub struct ActivePlan {
    pub plan: Plan,
    pub cursor: usize,
    /// Confidence памяти на момент планирования
    pub origin_confidence: f32,
    applied: Option<usize>,
}

impl ActivePlan {
    fn new(plan: Plan, origin_confidence: f32) -> Self {
        Self {
            plan,
            cursor: 0,
            origin_confidence,
            applied: None,
        }
    }

    pub fn current(&self) -> Option<ActionKind> {
        self.plan.steps.get(self.cursor).copied()
    }
}

/// Что состояние хочет от тела в этом тике
#[derive(Debug, Clone, Default)]
struct Behavior {
    movement: MovementCommand,
    look: Option<Vec2>,
}

impl Behavior {
    fn hold(look: Option<Vec2>) -> Self {
        Self {
            movement: MovementCommand::Idle,
            look,
        }
    }
}

fn toward(from: Vec2, to: Vec2) -> Option<Vec2> {
    (to - from).try_normalize()
}

#[derive(Debug, Clone)]
pub struct StateMachine {
    state: AIState,
    plan: Option<ActivePlan>,
    planner: ActionPlanner,
    config: TacticalConfig,
    tracker: ProgressTracker,
    seed: u64,
    rng: ChaCha8Rng,
    patrol_route: Vec<Vec2>,
    patrol_cursor: usize,
    area_searched: bool,
    /// Последняя позиция цели, которой доверяли (центр поиска после decay)
    last_target: Option<Vec2>,
    next_replan_at: f32,
    now: f32,
    last_transition: Option<TransitionRecord>,
    last_plan_error: Option<NoPlan>,
    last_facts: WorldStateFacts,
}

impl StateMachine {
    pub fn new(config: TacticalConfig, catalog: ActionCatalog, seed: u64) -> Self {
        let planner = ActionPlanner::new(catalog, config.planner.clone());
        Self {
            state: AIState::default(),
            plan: None,
            planner,
            config,
            tracker: ProgressTracker::new(),
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            patrol_route: Vec::new(),
            patrol_cursor: 0,
            area_searched: false,
            last_target: None,
            next_replan_at: 0.0,
            now: 0.0,
            last_transition: None,
            last_plan_error: None,
            last_facts: WorldStateFacts::new(),
        }
    }

    pub fn with_patrol_route(mut self, route: Vec<Vec2>) -> Self {
        self.patrol_route = route;
        self.patrol_cursor = 0;
        self
    }

    pub fn state(&self) -> &AIState {
        &self.state
    }

    pub fn kind(&self) -> StateKind {
        self.state.kind()
    }

    pub fn plan(&self) -> Option<&ActivePlan> {
        self.plan.as_ref()
    }

    /// Seed собственного RNG (выдан при spawn)
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &TacticalConfig {
        &self.config
    }

    pub fn patrol_route(&self) -> &[Vec2] {
        &self.patrol_route
    }

    pub fn last_transition(&self) -> Option<TransitionRecord> {
        self.last_transition
    }

    pub fn last_plan_error(&self) -> Option<&NoPlan> {
        self.last_plan_error.as_ref()
    }

    pub fn last_facts(&self) -> &WorldStateFacts {
        &self.last_facts
    }

    /// Принудительно выставить состояние (сценарии, тулинг); таблица переходов не проверяется
    pub fn set_state(&mut self, state: AIState) {
        crate::log(&format!("AI: state forced to {:?}", state.kind()));
        self.state = state;
        self.plan = None;
        self.tracker.reset();
    }

    pub fn step(&mut self, ctx: &StepContext) -> StepOutput {
        let mut out = StepOutput::default();
        self.now = ctx.world.now;

        if self.state.kind() == StateKind::Dead {
            return out;
        }
        if ctx.health_ratio <= 0.0 {
            self.plan = None;
            self.transition(AIState::Dead, TransitionReason::Killed, &mut out);
            return out;
        }

        if ctx.memory.is_trustworthy() {
            self.last_target = Some(ctx.memory.last_known_position);
        }

        let eval = TacticalEvaluator::new(ctx.world.geometry, ctx.nav);
        let facts = self.facts_for(ctx, &eval);

        if !self.state.kind().is_throw_window() {
            self.handle_interrupts(ctx, &eval, &mut out);
            self.update_plan(ctx, &facts);
            self.apply_directive(ctx, &eval, &facts, &mut out);
        }

        let mut behavior = self.run_until_settled(ctx, &eval, ctx.dt, &mut out);
        if self.check_stall(ctx, &eval, &behavior, &mut out) {
            behavior = self.run_until_settled(ctx, &eval, 0.0, &mut out);
        }

        out.facing = self.facing_for(ctx, &behavior);
        out.movement = behavior.movement;
        self.last_facts = facts;
        out
    }

    // --- transitions ---

    fn transition(&mut self, next: AIState, reason: TransitionReason, out: &mut StepOutput) -> bool {
        let from = self.state.kind();
        let to = next.kind();
        if !allowed_transition(from, to) {
            crate::log_warning(&format!(
                "AI: transition {:?} → {:?} ({:?}) not in table, ignored",
                from, to, reason
            ));
            return false;
        }

        let record = TransitionRecord {
            from,
            to,
            reason,
            at: self.now,
        };
        if to == StateKind::Dead {
            crate::log_info(&format!("AI: {:?} → Dead", from));
        } else {
            crate::log(&format!("AI: {:?} → {:?} ({:?})", from, to, reason));
        }

        self.state = next;
        self.tracker.reset();
        self.last_transition = Some(record);
        out.transitions.push(record);
        true
    }

    /// Патруль если есть маршрут, иначе Idle со случайной фазой осмотра
    fn calm_state(&mut self, ctx: &StepContext) -> AIState {
        if !self.patrol_route.is_empty() {
            return AIState::Patrol {
                waypoint: self.patrol_cursor,
            };
        }
        AIState::Idle {
            heading: ctx.facing.normalize_or(Vec2::X),
            scan_phase: self.rng.gen_range(0.0..TAU),
            elapsed: 0.0,
        }
    }

    fn search_center(&self, ctx: &StepContext) -> Vec2 {
        self.last_target.unwrap_or(ctx.position)
    }

    fn threat_position(&self, ctx: &StepContext) -> Vec2 {
        ctx.damage
            .and_then(|damage| damage.from)
            .or(self.last_target)
            .unwrap_or(ctx.position + ctx.facing.normalize_or(Vec2::X) * 100.0)
    }

    /// Точки поиска: центр + кольцо со случайным поворотом
    fn search_state(&mut self, center: Vec2) -> AIState {
        self.area_searched = false;
        let count = self.config.movement.search_points.max(1);
        let radius = self.config.movement.search_radius;
        let offset = self.rng.gen_range(0.0..TAU);

        let mut points = Vec::with_capacity(count as usize + 1);
        points.push(center);
        for index in 0..count {
            let angle = offset + TAU * index as f32 / count as f32;
            points.push(center + Vec2::from_angle(angle) * radius);
        }

        AIState::Searching {
            points,
            next: 0,
            elapsed: 0.0,
        }
    }

    fn cover_state(&self, ctx: &StepContext, eval: &TacticalEvaluator, threat: Vec2) -> Option<AIState> {
        eval.best_cover(ctx.world.cover_points, ctx.position, threat)
            .map(|cover| AIState::InCover {
                cover,
                threat,
                arrived: false,
                quiet: 0.0,
            })
    }

    fn retreat_state(&self, ctx: &StepContext, eval: &TacticalEvaluator, threat: Vec2) -> Option<AIState> {
        eval.retreat_point(ctx.position, threat, self.config.combat.retreat_step)
            .map(|(destination, _)| AIState::Retreating {
                threat,
                destination,
                elapsed: 0.0,
            })
    }

    fn evade_state(
        &self,
        ctx: &StepContext,
        eval: &TacticalEvaluator,
        grenade: &GrenadeView,
        resume: StateKind,
    ) -> AIState {
        let distance = grenade.blast_radius + self.config.movement.evade_clearance;
        let away = (ctx.position - grenade.position)
            .try_normalize()
            .unwrap_or(-ctx.facing.normalize_or(Vec2::X));
        let straight = grenade.position + away * distance;

        let destination = if eval.reachable(ctx.position, straight).is_ok() {
            straight
        } else {
            eval.retreat_point(ctx.position, grenade.position, distance)
                .map(|(point, _)| point)
                .unwrap_or(straight)
        };

        AIState::EvadingGrenade {
            grenade: grenade.id,
            blast_center: grenade.position,
            destination,
            resume,
            elapsed: 0.0,
        }
    }

    /// Состояние, в которое возвращаемся после уклонения
    fn resume_state(&mut self, kind: StateKind, ctx: &StepContext, eval: &TacticalEvaluator) -> AIState {
        match kind {
            StateKind::Combat => AIState::Combat,
            StateKind::Pursuing | StateKind::Flanking => AIState::Pursuing,
            StateKind::Patrol if !self.patrol_route.is_empty() => AIState::Patrol {
                waypoint: self.patrol_cursor,
            },
            StateKind::Searching => self.search_state(self.search_center(ctx)),
            StateKind::InCover => {
                let threat = self.threat_position(ctx);
                match self.cover_state(ctx, eval, threat) {
                    Some(cover) => cover,
                    None => self.search_state(self.search_center(ctx)),
                }
            }
            StateKind::Retreating => {
                let threat = self.threat_position(ctx);
                match self.retreat_state(ctx, eval, threat) {
                    Some(retreat) => retreat,
                    None => self.search_state(self.search_center(ctx)),
                }
            }
            _ => AIState::idle(ctx.facing),
        }
    }

    // --- facts / interrupts / plan ---

    fn facts_for(&self, ctx: &StepContext, eval: &TacticalEvaluator) -> WorldStateFacts {
        let inputs = FactInputs {
            position: ctx.position,
            state: &self.state,
            memory: ctx.memory,
            saw_target: ctx.saw_target,
            reload_heard: ctx.reload_heard,
            health_ratio: ctx.health_ratio,
            has_ammo: ctx.has_ammo,
            weapon_range: ctx.weapon_range,
            grenades_left: ctx.grenades_left,
            grenade_threat: ctx.grenade_threat,
            area_searched: self.area_searched,
            has_patrol_route: !self.patrol_route.is_empty(),
            allies_in_combat: ctx.world.allies_in_combat(),
            cover_points: ctx.world.cover_points,
        };
        build_facts(&inputs, eval, &self.config)
    }

    /// Прерывания текущего поведения; план при прерывании выбрасывается
    fn handle_interrupts(&mut self, ctx: &StepContext, eval: &TacticalEvaluator, out: &mut StepOutput) {
        let kind = self.state.kind();

        if kind == StateKind::EvadingGrenade {
            return;
        }

        if let Some(grenade) = ctx.grenade_threat {
            let next = self.evade_state(ctx, eval, &grenade, kind);
            if self.transition(next, TransitionReason::GrenadeThreat, out) {
                self.plan = None;
            }
            return;
        }

        let combat = &self.config.combat;
        let hurt = ctx.damage.is_some() && ctx.health_ratio < combat.cover_health_threshold;
        let critical = ctx.health_ratio < combat.retreat_health_threshold && ctx.memory_refreshed;
        if (hurt || critical) && !matches!(kind, StateKind::InCover | StateKind::Retreating) {
            let reason = if critical {
                TransitionReason::LowHealth
            } else {
                TransitionReason::TookDamage
            };
            let threat = self.threat_position(ctx);
            // без укрытия отступает только критически раненый, просто раненый держит состояние
            let next = self
                .cover_state(ctx, eval, threat)
                .or_else(|| critical.then(|| self.retreat_state(ctx, eval, threat)).flatten());
            if let Some(next) = next {
                if self.transition(next, reason, out) {
                    self.plan = None;
                    return;
                }
            }
        }

        let min_reaction = self.config.perception.min_reaction_confidence;
        if kind.is_passive() && ctx.memory_refreshed && ctx.memory.confidence >= min_reaction {
            self.area_searched = false;
            let target = ctx.memory.last_known_position;
            let engage = ctx.memory.source.permits_direct_engage()
                && eval.attack_possible(ctx.position, target, ctx.weapon_range);
            let next = if engage { AIState::Combat } else { AIState::Pursuing };
            if self.transition(next, TransitionReason::Stimulus, out) {
                self.plan = None;
            }
        }
    }

    /// Перепланирование по триггерам; NoPlan не фатален (default поведение состояния)
    fn update_plan(&mut self, ctx: &StepContext, facts: &WorldStateFacts) {
        let Some(goal) = select_goal(facts) else {
            self.plan = None;
            return;
        };

        let catalog = &self.planner.catalog;
        if let Some(active) = self.plan.as_mut() {
            advance_cursor(active, facts, catalog);
        }

        let urgent = self.plan.as_ref().is_some_and(|active| {
            active.plan.goal != goal.kind
                || ctx.damage.is_some()
                || (ctx.memory_refreshed && ctx.memory.confidence > active.origin_confidence)
                || active
                    .current()
                    .and_then(|kind| catalog.get(kind))
                    .is_some_and(|action| !facts.satisfies(&action.preconditions))
        });
        let stale = self
            .plan
            .as_ref()
            .is_none_or(|active| active.current().is_none() && !goal.is_satisfied(facts));

        if !urgent && !(stale && self.now >= self.next_replan_at) {
            return;
        }

        self.next_replan_at = self.now + self.config.planner.replan_interval;
        match self.planner.plan(facts, &goal) {
            Ok(plan) => {
                crate::log(&format!(
                    "AI: plan {:?} → {:?} (cost {:.1})",
                    plan.goal, plan.steps, plan.cost
                ));
                self.plan = Some(ActivePlan::new(plan, ctx.memory.confidence));
                self.last_plan_error = None;
            }
            Err(error) => {
                crate::log(&format!("AI: {}, keeping default behavior", error));
                self.plan = None;
                self.last_plan_error = Some(error);
            }
        }
    }

    /// Директива текущего шага плана (один раз на шаг)
    fn apply_directive(
        &mut self,
        ctx: &StepContext,
        eval: &TacticalEvaluator,
        facts: &WorldStateFacts,
        out: &mut StepOutput,
    ) {
        let Some(active) = self.plan.as_mut() else {
            return;
        };
        let Some(action) = active.current() else {
            return;
        };
        if active.applied == Some(active.cursor) {
            return;
        }
        active.applied = Some(active.cursor);

        let kind = self.state.kind();
        let target = ctx.memory.last_known_position;
        let flank_distance = self.config.movement.flank_distance;

        let next = match action {
            ActionKind::Reload => {
                out.reload = true;
                None
            }
            ActionKind::Attack => (kind != StateKind::InCover
                && facts.flag(Fact::PlayerReachableForAttack)
                && !self.target_vanished(ctx))
            .then_some(AIState::Combat),
            ActionKind::Pursue
            | ActionKind::RushReloadingTarget
            | ActionKind::InvestigateNoise
            | ActionKind::InvestigateLight => (kind != StateKind::Combat
                && !facts.flag(Fact::AtLastKnownPosition))
            .then_some(AIState::Pursuing),
            ActionKind::Flank => eval
                .validated_flank(ctx.position, target, FlankSide::Left, flank_distance)
                .chosen
                .map(|(side, position, _)| AIState::Flanking {
                    side,
                    position,
                    tried_both: side != FlankSide::Left,
                    elapsed: 0.0,
                }),
            ActionKind::ThrowGrenade => (ctx.grenades_left > 0).then_some(AIState::ReadyToThrow {
                target,
                remaining: self.config.combat.ready_to_throw_duration,
            }),
            ActionKind::SeekCover => self.cover_state(ctx, eval, self.threat_position(ctx)),
            ActionKind::Retreat => self.retreat_state(ctx, eval, self.threat_position(ctx)),
            ActionKind::SearchArea => {
                (kind != StateKind::Searching).then(|| self.search_state(self.search_center(ctx)))
            }
            ActionKind::Patrol | ActionKind::ReturnToPost => (!self.patrol_route.is_empty())
                .then_some(AIState::Patrol {
                    waypoint: self.patrol_cursor,
                }),
            // Исполняются логикой текущего состояния
            ActionKind::EvadeGrenade
            | ActionKind::PeekFromCover
            | ActionKind::SuppressFromCover
            | ActionKind::HoldPosition
            | ActionKind::CoordinatedAssault => None,
        };

        if let Some(next) = next {
            if next.kind() != kind && allowed_transition(kind, next.kind()) {
                self.transition(next, TransitionReason::PlanDirective(action), out);
            }
        }
    }

    // --- per-state behavior ---

    fn run_until_settled(
        &mut self,
        ctx: &StepContext,
        eval: &TacticalEvaluator,
        dt: f32,
        out: &mut StepOutput,
    ) -> Behavior {
        let mut dt = dt;
        let mut behavior = Behavior::default();
        for _ in 0..MAX_STATE_PASSES {
            let before = self.state.kind();
            behavior = self.run_state(ctx, eval, dt, out);
            if self.state.kind() == before {
                break;
            }
            // Таймеры нового состояния стартуют со следующего тика
            dt = 0.0;
        }
        behavior
    }

    fn run_state(&mut self, ctx: &StepContext, eval: &TacticalEvaluator, dt: f32, out: &mut StepOutput) -> Behavior {
        match self.state.clone() {
            AIState::Idle {
                heading,
                scan_phase,
                elapsed,
            } => self.idle(ctx, heading, scan_phase + dt * self.config.movement.idle_scan_speed, elapsed + dt, out),
            AIState::Patrol { waypoint } => self.patrol(ctx, waypoint),
            AIState::Combat => self.combat(ctx, eval, out),
            AIState::Pursuing => self.pursuing(ctx, eval, out),
            AIState::Flanking {
                side,
                position,
                tried_both,
                elapsed,
            } => self.flanking(ctx, eval, side, position, tried_both, elapsed + dt, out),
            AIState::Searching {
                points,
                next,
                elapsed,
            } => self.searching(ctx, points, next, elapsed + dt, out),
            AIState::InCover {
                cover,
                threat,
                arrived,
                quiet,
            } => self.in_cover(ctx, eval, cover, threat, arrived, quiet, dt, out),
            AIState::Retreating {
                threat,
                destination,
                elapsed,
            } => self.retreating(ctx, eval, threat, destination, elapsed + dt, out),
            AIState::EvadingGrenade {
                grenade,
                blast_center,
                destination,
                resume,
                elapsed,
            } => {
                let elapsed = elapsed + dt;
                let live = ctx.world.grenade(grenade).copied();
                // Угроза снята только взрывом (граната пропала из мира), выход из радиуса не считается
                let resolved = live.is_none();

                if resolved || elapsed > self.config.combat.evade_timeout {
                    let reason = if resolved {
                        TransitionReason::ThreatResolved
                    } else {
                        TransitionReason::TimedOut
                    };
                    let next = self.resume_state(resume, ctx, eval);
                    self.transition(next, reason, out);
                    return Behavior::default();
                }

                let center = live.map(|view| view.position).unwrap_or(blast_center);
                self.state = AIState::EvadingGrenade {
                    grenade,
                    blast_center: center,
                    destination,
                    resume,
                    elapsed,
                };
                let movement = self.route_step(ctx, destination).unwrap_or_default();
                Behavior {
                    movement,
                    look: toward(ctx.position, center),
                }
            }
            AIState::ReadyToThrow { target, remaining } => {
                let remaining = remaining - dt;
                let look = toward(ctx.position, target);
                if remaining <= 0.0 {
                    out.throw = Some(target);
                    let next = AIState::ThrowingGrenade {
                        target,
                        remaining: self.config.combat.throw_duration,
                    };
                    self.transition(next, TransitionReason::ThrowReleased, out);
                } else {
                    self.state = AIState::ReadyToThrow { target, remaining };
                }
                Behavior::hold(look)
            }
            AIState::ThrowingGrenade { target, remaining } => {
                let remaining = remaining - dt;
                if remaining <= 0.0 {
                    let memory = ctx.memory;
                    let attackable = memory.is_trustworthy()
                        && !self.target_vanished(ctx)
                        && eval.attack_possible(ctx.position, memory.last_known_position, ctx.weapon_range);
                    let next = if attackable { AIState::Combat } else { AIState::Pursuing };
                    self.transition(next, TransitionReason::ThrowComplete, out);
                } else {
                    self.state = AIState::ThrowingGrenade { target, remaining };
                }
                Behavior::hold(toward(ctx.position, target))
            }
            AIState::Dead => Behavior::default(),
        }
    }

    /// Следующий waypoint маршрута (Idle если уже на месте)
    fn route_step(&self, ctx: &StepContext, destination: Vec2) -> Result<MovementCommand, NavError> {
        if ctx.position.distance(destination) <= self.config.movement.arrival_radius {
            return Ok(MovementCommand::Idle);
        }
        let route = ctx.nav.route(ctx.position, destination)?;
        Ok(MovementCommand::MoveToPosition {
            target: route.next_waypoint().unwrap_or(destination),
        })
    }

    fn idle(
        &mut self,
        ctx: &StepContext,
        heading: Vec2,
        scan_phase: f32,
        elapsed: f32,
        out: &mut StepOutput,
    ) -> Behavior {
        self.state = AIState::Idle {
            heading,
            scan_phase,
            elapsed,
        };

        if !self.patrol_route.is_empty() && elapsed >= self.config.movement.idle_dwell {
            let next = AIState::Patrol {
                waypoint: self.patrol_cursor,
            };
            self.transition(next, TransitionReason::PatrolRouteAvailable, out);
            return Behavior::default();
        }

        // Осмотр: синусоида вокруг исходного направления
        let sweep = scan_phase.sin() * self.config.movement.idle_scan_half_arc;
        Behavior::hold(Some(rotate(heading, sweep)))
    }

    fn patrol(&mut self, ctx: &StepContext, waypoint: usize) -> Behavior {
        let count = self.patrol_route.len();
        if count == 0 {
            return Behavior::default();
        }

        let mut waypoint = waypoint % count;
        if ctx.position.distance(self.patrol_route[waypoint]) <= self.config.movement.arrival_radius {
            waypoint = (waypoint + 1) % count;
        }

        let destination = self.patrol_route[waypoint];
        let behavior = match self.route_step(ctx, destination) {
            Ok(movement) => Behavior {
                movement,
                look: toward(ctx.position, destination),
            },
            Err(error) => {
                crate::log(&format!("AI: patrol waypoint {} skipped: {}", waypoint, error));
                waypoint = (waypoint + 1) % count;
                Behavior::default()
            }
        };

        self.patrol_cursor = waypoint;
        self.state = AIState::Patrol { waypoint };
        behavior
    }

    fn combat(&mut self, ctx: &StepContext, eval: &TacticalEvaluator, out: &mut StepOutput) -> Behavior {
        let memory = ctx.memory;
        if !memory.is_trustworthy() {
            let next = self.search_state(self.search_center(ctx));
            self.transition(next, TransitionReason::ConfidenceDepleted, out);
            return Behavior::default();
        }

        let target = memory.last_known_position;
        if !eval.attack_possible(ctx.position, target, ctx.weapon_range) {
            self.transition(AIState::Pursuing, TransitionReason::LostLineOfHit, out);
            return Behavior::default();
        }

        // Точка в поле зрения, а цели там нет: не стреляем в пустое место
        if self.target_vanished(ctx) {
            self.transition(AIState::Pursuing, TransitionReason::TargetVanished, out);
            return Behavior::default();
        }

        let aim = toward(ctx.position, target);
        if !ctx.has_ammo {
            out.reload = true;
        } else if ctx.can_fire {
            out.fire = aim;
        }
        Behavior::hold(aim)
    }

    /// Визуальная память указывает на точку, которую агент видит, но цели там нет
    fn target_vanished(&self, ctx: &StepContext) -> bool {
        let memory = ctx.memory;
        if memory.source != MemorySource::Visual || ctx.saw_target {
            return false;
        }
        let pose = SensorPose {
            position: ctx.position,
            facing: ctx.facing.normalize_or(Vec2::X),
        };
        let perception = &self.config.perception;
        can_see(
            &pose,
            memory.last_known_position,
            perception.target_radius,
            perception,
            ctx.world.geometry,
        )
    }

    fn pursuing(&mut self, ctx: &StepContext, eval: &TacticalEvaluator, out: &mut StepOutput) -> Behavior {
        let memory = ctx.memory;
        if !memory.is_trustworthy() {
            let next = self.search_state(self.search_center(ctx));
            self.transition(next, TransitionReason::ConfidenceDepleted, out);
            return Behavior::default();
        }

        let target = memory.last_known_position;
        if !self.target_vanished(ctx) && eval.attack_possible(ctx.position, target, ctx.weapon_range) {
            self.transition(AIState::Combat, TransitionReason::TargetAttackable, out);
            return Behavior::default();
        }

        if ctx.position.distance(target) <= self.config.movement.arrival_radius {
            let next = self.search_state(target);
            self.transition(next, TransitionReason::ArrivedEmpty, out);
            return Behavior::default();
        }

        match self.route_step(ctx, target) {
            Ok(movement) => Behavior {
                movement,
                look: toward(ctx.position, target),
            },
            Err(error) => {
                crate::log(&format!("AI: pursuit target {:?}: {}, trying flank", target, error));
                let report = eval.validated_flank(
                    ctx.position,
                    target,
                    FlankSide::Left,
                    self.config.movement.flank_distance,
                );
                let next = match report.chosen {
                    Some((side, position, _)) => AIState::Flanking {
                        side,
                        position,
                        tried_both: side != FlankSide::Left,
                        elapsed: 0.0,
                    },
                    None => self.search_state(target),
                };
                self.transition(next, TransitionReason::Unreachable, out);
                Behavior::default()
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn flanking(
        &mut self,
        ctx: &StepContext,
        eval: &TacticalEvaluator,
        side: FlankSide,
        position: Vec2,
        tried_both: bool,
        elapsed: f32,
        out: &mut StepOutput,
    ) -> Behavior {
        let memory = ctx.memory;
        if !memory.is_trustworthy() {
            let next = self.search_state(self.search_center(ctx));
            self.transition(next, TransitionReason::ConfidenceDepleted, out);
            return Behavior::default();
        }
        if elapsed > self.config.movement.flank_timeout {
            self.transition(AIState::Pursuing, TransitionReason::TimedOut, out);
            return Behavior::default();
        }

        let target = memory.last_known_position;
        if ctx.position.distance(position) <= self.config.movement.arrival_radius {
            // С фланга выстрела нет: дальше преследование
            if !self.target_vanished(ctx) && eval.attack_possible(ctx.position, target, ctx.weapon_range) {
                self.transition(AIState::Combat, TransitionReason::TargetAttackable, out);
            } else {
                self.transition(AIState::Pursuing, TransitionReason::ArrivedEmpty, out);
            }
            return Behavior::default();
        }

        // Кандидат перепроверяется каждый тик: цель могла сместиться
        let valid = |candidate: Vec2| {
            eval.can_hit_from(candidate, target) && eval.reachable(ctx.position, candidate).is_ok()
        };
        let (side, position, tried_both) = if valid(position) {
            (side, position, tried_both)
        } else {
            let other = side.opposite();
            let candidate =
                flank_position(ctx.position, target, other, self.config.movement.flank_distance);
            if tried_both || !valid(candidate) {
                self.transition(AIState::Pursuing, TransitionReason::FlankBlocked, out);
                return Behavior::default();
            }
            crate::log(&format!("AI: flank {:?} blocked, switching to {:?}", side, other));
            (other, candidate, true)
        };

        self.state = AIState::Flanking {
            side,
            position,
            tried_both,
            elapsed,
        };

        match self.route_step(ctx, position) {
            Ok(movement) => Behavior {
                movement,
                look: toward(ctx.position, target),
            },
            Err(_) => {
                self.transition(AIState::Pursuing, TransitionReason::FlankBlocked, out);
                Behavior::default()
            }
        }
    }

    fn searching(
        &mut self,
        ctx: &StepContext,
        points: Vec<Vec2>,
        next: usize,
        elapsed: f32,
        out: &mut StepOutput,
    ) -> Behavior {
        let arrival = self.config.movement.arrival_radius;
        let mut next = next;
        while points
            .get(next)
            .is_some_and(|point| ctx.position.distance(*point) <= arrival)
        {
            next += 1;
        }

        let timed_out = elapsed > self.config.movement.search_duration;
        let Some(&point) = points.get(next).filter(|_| !timed_out) else {
            self.area_searched = true;
            let reason = if timed_out {
                TransitionReason::TimedOut
            } else {
                TransitionReason::AreaSearched
            };
            let calm = self.calm_state(ctx);
            self.transition(calm, reason, out);
            return Behavior::default();
        };

        let behavior = match self.route_step(ctx, point) {
            Ok(movement) => Behavior {
                movement,
                look: toward(ctx.position, point),
            },
            Err(_) => {
                next += 1;
                Behavior::default()
            }
        };

        self.state = AIState::Searching {
            points,
            next,
            elapsed,
        };
        behavior
    }

    #[allow(clippy::too_many_arguments)]
    fn in_cover(
        &mut self,
        ctx: &StepContext,
        eval: &TacticalEvaluator,
        cover: Vec2,
        threat: Vec2,
        arrived: bool,
        quiet: f32,
        dt: f32,
        out: &mut StepOutput,
    ) -> Behavior {
        let memory = ctx.memory;
        let threat = if memory.is_trustworthy() {
            memory.last_known_position
        } else {
            threat
        };
        let look = toward(ctx.position, threat);
        let arrived = arrived || ctx.position.distance(cover) <= self.config.movement.arrival_radius;

        if !arrived {
            return match self.route_step(ctx, cover) {
                Ok(movement) => {
                    self.state = AIState::InCover {
                        cover,
                        threat,
                        arrived,
                        quiet,
                    };
                    Behavior { movement, look }
                }
                Err(_) => {
                    let next = match self.retreat_state(ctx, eval, threat) {
                        Some(retreat) => retreat,
                        None => self.search_state(self.search_center(ctx)),
                    };
                    self.transition(next, TransitionReason::Unreachable, out);
                    Behavior::default()
                }
            };
        }

        let quiet = if ctx.memory_refreshed || ctx.damage.is_some() {
            0.0
        } else {
            quiet + dt
        };
        self.state = AIState::InCover {
            cover,
            threat,
            arrived,
            quiet,
        };

        let low_health = ctx.health_ratio < self.config.combat.retreat_health_threshold;
        let recovered = ctx.health_ratio >= self.config.combat.recovered_health_threshold;
        let settled = quiet >= self.config.combat.cover_safe_duration;
        let attackable = memory.is_trustworthy()
            && ctx.saw_target
            && eval.attack_possible(ctx.position, memory.last_known_position, ctx.weapon_range);

        if attackable && !low_health {
            self.transition(AIState::Combat, TransitionReason::TargetAttackable, out);
            return Behavior::default();
        }
        if recovered || settled {
            let reason = if settled {
                TransitionReason::ThreatResolved
            } else {
                TransitionReason::Recovered
            };
            let calm = self.calm_state(ctx);
            self.transition(calm, reason, out);
            return Behavior::default();
        }

        // Держим укрытие: перезарядка или огонь на подавление
        if !ctx.has_ammo {
            out.reload = true;
        } else if attackable && ctx.can_fire {
            out.fire = look;
        }
        Behavior::hold(look)
    }

    fn retreating(
        &mut self,
        ctx: &StepContext,
        eval: &TacticalEvaluator,
        threat: Vec2,
        destination: Vec2,
        elapsed: f32,
        out: &mut StepOutput,
    ) -> Behavior {
        let combat = self.config.combat.clone();
        let threat = if ctx.memory_refreshed {
            ctx.memory.last_known_position
        } else {
            threat
        };

        let exit = if ctx.position.distance(threat) >= combat.retreat_safe_distance {
            Some(TransitionReason::SafeDistance)
        } else if ctx.health_ratio >= combat.recovered_health_threshold {
            Some(TransitionReason::Recovered)
        } else if elapsed > combat.retreat_max_duration {
            Some(TransitionReason::TimedOut)
        } else {
            None
        };
        if let Some(reason) = exit {
            let calm = self.calm_state(ctx);
            self.transition(calm, reason, out);
            return Behavior::default();
        }

        let mut destination = destination;
        if ctx.position.distance(destination) <= self.config.movement.arrival_radius {
            if let Some((point, _)) = eval.retreat_point(ctx.position, threat, combat.retreat_step) {
                destination = point;
            }
        }

        match ctx.nav.route(ctx.position, destination) {
            Ok(route) if ctx.position.distance(destination) > self.config.movement.arrival_radius => {
                self.state = AIState::Retreating {
                    threat,
                    destination,
                    elapsed,
                };
                Behavior {
                    movement: MovementCommand::RetreatFrom {
                        threat,
                        target: route.next_waypoint().unwrap_or(destination),
                    },
                    look: toward(ctx.position, threat),
                }
            }
            _ => {
                // Отступать некуда: укрытие, иначе поиск
                let next = match self.cover_state(ctx, eval, threat) {
                    Some(cover) => cover,
                    None => self.search_state(self.search_center(ctx)),
                };
                self.transition(next, TransitionReason::Unreachable, out);
                Behavior::default()
            }
        }
    }

    // --- stall / facing ---

    /// Stall detector: движение не даёт смещения за окно → выход в этом же тике
    fn check_stall(
        &mut self,
        ctx: &StepContext,
        eval: &TacticalEvaluator,
        behavior: &Behavior,
        out: &mut StepOutput,
    ) -> bool {
        let kind = self.state.kind();
        if !kind.is_movement_state() || behavior.movement == MovementCommand::Idle {
            self.tracker.reset();
            return false;
        }

        let window = self.config.movement.stall_window;
        self.tracker.record(self.now, ctx.position, window);
        if !self
            .tracker
            .is_progress_stalled(window, self.config.movement.stall_epsilon)
        {
            return false;
        }

        crate::log(&format!("AI: progress stalled in {:?} at {:?}", kind, ctx.position));
        let next = match self.state.clone() {
            AIState::Searching { .. } => self.calm_state(ctx),
            AIState::Patrol { .. } => AIState::idle(ctx.facing),
            AIState::EvadingGrenade { resume, .. } => self.resume_state(resume, ctx, eval),
            _ => self.search_state(self.search_center(ctx)),
        };
        self.transition(next, TransitionReason::ProgressStalled, out)
    }

    /// Один победитель среди запросов взгляда
    fn facing_for(&self, ctx: &StepContext, behavior: &Behavior) -> Option<Vec2> {
        let mut requests = Vec::with_capacity(3);
        let state_look = behavior.look.or(match behavior.movement {
            MovementCommand::MoveToPosition { target } => toward(ctx.position, target),
            MovementCommand::RetreatFrom { threat, .. } => toward(ctx.position, threat),
            MovementCommand::Idle => None,
        });
        if let Some(direction) = state_look {
            requests.push(FacingRequest::new(
                FacingSource::State(self.state.kind()),
                direction,
            ));
        }
        if let Some(direction) = ctx
            .damage
            .and_then(|damage| damage.from)
            .and_then(|from| toward(ctx.position, from))
        {
            requests.push(FacingRequest::new(FacingSource::DamageReaction, direction));
        }
        if ctx.memory_refreshed && ctx.memory.source.is_auditory() {
            if let Some(direction) = toward(ctx.position, ctx.memory.last_known_position) {
                requests.push(FacingRequest::new(FacingSource::NoiseGlance, direction));
            }
        }

        resolve_facing(&requests).map(|request| request.direction)
    }
}

/// Шаг плана выполнен, когда все его эффекты держатся в свежих фактах
fn advance_cursor(active: &mut ActivePlan, facts: &WorldStateFacts, catalog: &ActionCatalog) {
    while let Some(action) = active.current().and_then(|kind| catalog.get(kind)) {
        let done = action
            .effects
            .iter()
            .all(|(fact, value)| facts.get(*fact) == Some(*value));
        if !done {
            break;
        }
        active.cursor += 1;
    }
}
