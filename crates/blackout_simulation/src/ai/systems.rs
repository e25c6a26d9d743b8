//! ECS системы тактического AI
//!
//! Ядро (AgentController) не знает про ECS. Здесь собираем read-only снимок мира,
//! прогоняем tick каждого агента и превращаем решения в intents/events.

use bevy::prelude::*;

use super::controller::{AgentBody, AgentController};
use super::state::StateKind;
use crate::combat::{
    Dead, DamageDealt, GrenadeCapability, GrenadePouch, GrenadeThrowIntent, MovementIntegrator,
    ReloadIntent, WeaponCapability, WeaponFireIntent, WeaponStats,
};
use crate::combat::ActiveGrenades;
use crate::components::{planar, Actor, AgentId, AimDirection, Health, MovementCommand, MovementSpeed, Player};
use crate::config::TacticalConfig;
use crate::geometry::{LineOfSight, WallMap};
use crate::navigation::Navigation;
use crate::perception::{AllyView, CoverPoints, LightBeams, SoundBus, SoundEmitted, TargetView, WorldView};
use crate::DeterministicRng;

/// Capability adapter: ECS компоненты агента за трейтами AgentEffectors
struct EcsEffectors<'a> {
    weapon: &'a mut WeaponStats,
    pouch: Option<&'a mut GrenadePouch>,
    command: &'a mut MovementCommand,
    aim: &'a mut AimDirection,
}

impl WeaponCapability for EcsEffectors<'_> {
    fn can_fire(&self) -> bool {
        self.weapon.can_fire()
    }

    fn needs_reload(&self) -> bool {
        self.weapon.needs_reload()
    }

    fn range(&self) -> f32 {
        WeaponCapability::range(&*self.weapon)
    }

    fn fire(&mut self, direction: Vec2) {
        self.weapon.fire(direction);
    }

    fn reload(&mut self) {
        self.weapon.reload();
    }
}

impl GrenadeCapability for EcsEffectors<'_> {
    fn grenades_left(&self) -> u32 {
        self.pouch.as_ref().map_or(0, |pouch| pouch.grenades_left())
    }

    fn throw(&mut self, target: Vec2) {
        if let Some(pouch) = self.pouch.as_mut() {
            pouch.throw(target);
        }
    }
}

impl MovementIntegrator for EcsEffectors<'_> {
    fn apply_movement(&mut self, intent: &MovementCommand) {
        if *self.command != *intent {
            *self.command = intent.clone();
        }
    }

    fn apply_facing(&mut self, direction: Vec2) {
        if let Some(direction) = direction.try_normalize() {
            self.aim.0 = direction;
        }
    }
}

/// Заспавнить тактического агента (seed берётся из DeterministicRng мира)
pub fn spawn_agent(
    world: &mut World,
    position: Vec2,
    faction: u64,
    config: TacticalConfig,
    patrol_route: Vec<Vec2>,
) -> Entity {
    let seed = world
        .get_resource_mut::<DeterministicRng>()
        .map(|mut rng| rng.next_seed())
        .unwrap_or_default();

    let entity = world
        .spawn((
            Actor { faction_id: faction },
            Transform::from_xyz(position.x, position.y, 0.0),
            WeaponStats::rifle(),
            GrenadePouch::default(),
        ))
        .id();

    let controller = AgentController::new(AgentId::from(entity), faction, config, seed)
        .with_patrol_route(patrol_route);
    world.entity_mut(entity).insert(controller);

    crate::log(&format!(
        "Spawned tactical agent {:?} (faction {}) at ({:.0}, {:.0})",
        entity, faction, position.x, position.y
    ));
    entity
}

/// Система: SoundEmitted events → SoundBus (один снимок звуков на тик)
pub fn collect_sound_emissions(mut emitted: EventReader<SoundEmitted>, mut bus: ResMut<SoundBus>) {
    for SoundEmitted(emission) in emitted.read() {
        bus.push(*emission);
    }
}

/// Система: DamageDealt → pending damage агента (реакция в следующем tactical tick)
pub fn react_to_damage(
    mut damage_events: EventReader<DamageDealt>,
    mut agents: Query<&mut AgentController>,
) {
    for event in damage_events.read() {
        let Ok(mut controller) = agents.get_mut(event.target) else {
            continue;
        };
        controller.apply_damage(event.damage, event.origin);
    }
}

/// Система: тик тактического AI всех агентов
///
/// Снимок союзников строится до mutable прохода; агенты обходятся в порядке Entity
/// (детерминизм при одинаковом seed).
#[allow(clippy::too_many_arguments)]
pub fn tactical_ai_tick(
    mut agents: Query<
        (
            Entity,
            &Actor,
            &Transform,
            &Health,
            &mut AgentController,
            &mut WeaponStats,
            Option<&mut GrenadePouch>,
            &mut MovementCommand,
            &mut AimDirection,
        ),
        Without<Player>,
    >,
    players: Query<&Transform, (With<Player>, Without<Dead>)>,
    sounds: Res<SoundBus>,
    beams: Res<LightBeams>,
    cover: Res<CoverPoints>,
    walls: Res<WallMap>,
    navigation: Res<Navigation>,
    grenades: Res<ActiveGrenades>,
    time: Res<Time<Fixed>>,
    mut fire_intents: EventWriter<WeaponFireIntent>,
    mut reload_intents: EventWriter<ReloadIntent>,
    mut throw_intents: EventWriter<GrenadeThrowIntent>,
) {
    let dt = time.delta_secs();
    let now = time.elapsed_secs();
    let target_position = players.iter().next().map(planar);
    let grenade_views = grenades.views();

    let roster: Vec<(u64, AllyView)> = agents
        .iter()
        .map(|(_, actor, transform, _, controller, ..)| {
            (actor.faction_id, controller.ally_view(planar(transform)))
        })
        .collect();

    let mut order: Vec<Entity> = agents.iter().map(|(entity, ..)| entity).collect();
    order.sort();

    for entity in order {
        let Ok((_, actor, transform, health, mut controller, mut weapon, mut pouch, mut command, mut aim)) =
            agents.get_mut(entity)
        else {
            continue;
        };
        // мертвый агент один раз проходит step (переход в Dead), дальше не тикается
        if controller.machine().kind() == StateKind::Dead {
            continue;
        }

        let position = planar(transform);
        let allies: Vec<AllyView> = roster
            .iter()
            .filter(|(faction, view)| *faction == actor.faction_id && view.id != controller.id)
            .map(|(_, view)| *view)
            .collect();
        let target = target_position.map(|position| TargetView {
            position,
            radius: controller.machine().config().perception.target_radius,
        });

        let world = WorldView {
            now,
            target,
            sounds: &sounds.emissions,
            beams: &beams.beams,
            grenades: &grenade_views,
            allies: &allies,
            cover_points: &cover.points,
            geometry: &*walls,
        };
        let body = AgentBody {
            position,
            facing: aim.0,
            health_ratio: health.ratio(),
        };

        let mut effectors = EcsEffectors {
            weapon: &mut weapon,
            pouch: pouch.as_deref_mut(),
            command: &mut command,
            aim: &mut aim,
        };
        let report = controller.tick(dt, &body, &world, navigation.port.as_ref(), &mut effectors);

        if let Some(direction) = report.fired {
            fire_intents.write(WeaponFireIntent {
                shooter: entity,
                origin: position,
                direction,
                damage: weapon.damage,
                range: weapon.range,
                loudness: weapon.loudness,
            });
        }
        if report.reloaded {
            reload_intents.write(ReloadIntent {
                entity,
                origin: position,
            });
        }
        if let Some(target) = report.thrown {
            throw_intents.write(GrenadeThrowIntent {
                thrower: entity,
                origin: position,
                target,
            });
        }
    }
}

/// Шаг к точке не длиннее `max_step`
pub fn step_toward(from: Vec2, to: Vec2, max_step: f32) -> Vec2 {
    let offset = to - from;
    let distance = offset.length();
    if distance <= max_step || distance < f32::EPSILON {
        return to;
    }
    from + offset / distance * max_step
}

/// Система: headless movement integrator (MovementCommand → Transform)
///
/// Стены блокируют шаг целиком (агент упирается, stall detector это заметит).
pub fn integrate_movement(
    mut movers: Query<(&mut Transform, &MovementCommand, &MovementSpeed), Without<Dead>>,
    walls: Res<WallMap>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();
    for (mut transform, command, speed) in movers.iter_mut() {
        let target = match command {
            MovementCommand::Idle => continue,
            MovementCommand::MoveToPosition { target } | MovementCommand::RetreatFrom { target, .. } => {
                *target
            }
        };

        let position = planar(&transform);
        let next = step_toward(position, target, speed.speed * delta);
        if walls.is_clear(position, next) {
            transform.translation.x = next.x;
            transform.translation.y = next.y;
        }
    }
}

/// Система: очистка одноразовых стимулов в конце тика
pub fn clear_transient_stimuli(mut bus: ResMut<SoundBus>) {
    bus.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_toward_clamps_to_target() {
        assert_eq!(step_toward(Vec2::ZERO, Vec2::new(3.0, 4.0), 10.0), Vec2::new(3.0, 4.0));
        let partial = step_toward(Vec2::ZERO, Vec2::new(30.0, 40.0), 5.0);
        assert!((partial - Vec2::new(3.0, 4.0)).length() < 1e-4);
    }

    #[test]
    fn test_facing_ignores_zero_direction() {
        let mut weapon = WeaponStats::rifle();
        let mut command = MovementCommand::Idle;
        let mut aim = AimDirection(Vec2::Y);
        let mut effectors = EcsEffectors {
            weapon: &mut weapon,
            pouch: None,
            command: &mut command,
            aim: &mut aim,
        };

        effectors.apply_facing(Vec2::ZERO);
        effectors.apply_movement(&MovementCommand::MoveToPosition { target: Vec2::X });

        assert_eq!(effectors.grenades_left(), 0);
        assert_eq!(aim.0, Vec2::Y);
        assert_eq!(command, MovementCommand::MoveToPosition { target: Vec2::X });
    }
}
