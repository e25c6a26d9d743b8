//! Damage application
//!
//! Баллистика внешняя: она сообщает `HitLanded`. Здесь только правило
//! "урон → Health → DamageDealt / EntityDied". AI реагирует на DamageDealt.

use bevy::prelude::*;

use crate::components::{planar, Health, MovementCommand};

/// Событие (от внешней баллистики): попадание по цели
#[derive(Event, Debug, Clone)]
pub struct HitLanded {
    pub attacker: Option<Entity>,
    pub target: Entity,
    pub damage: u32,
}

/// Событие: урон нанесен
///
/// `origin` = позиция атакующего на момент попадания (если известна).
#[derive(Event, Debug, Clone)]
pub struct DamageDealt {
    pub attacker: Option<Entity>,
    pub target: Entity,
    pub damage: u32,
    pub origin: Option<Vec2>,
    pub target_died: bool,
}

/// Событие: entity умер (health <= 0)
#[derive(Event, Debug, Clone)]
pub struct EntityDied {
    pub entity: Entity,
    pub killer: Option<Entity>,
}

/// Компонент-маркер: entity мертв (Health <= 0)
///
/// Трупы остаются на месте, деспавн не автоматический.
#[derive(Component, Debug)]
pub struct Dead;

/// Система: HitLanded → Health, DamageDealt, EntityDied
pub fn apply_damage(
    mut hits: EventReader<HitLanded>,
    mut damage_dealt_events: EventWriter<DamageDealt>,
    mut entity_died_events: EventWriter<EntityDied>,
    mut targets: Query<&mut Health>,
    positions: Query<&Transform>,
) {
    for hit in hits.read() {
        let Ok(mut health) = targets.get_mut(hit.target) else {
            crate::log_warning(&format!("HitLanded: target {:?} has no Health", hit.target));
            continue;
        };

        let was_alive = health.is_alive();
        health.take_damage(hit.damage);
        let died = was_alive && !health.is_alive();

        let origin = hit
            .attacker
            .and_then(|attacker| positions.get(attacker).ok())
            .map(planar);

        damage_dealt_events.write(DamageDealt {
            attacker: hit.attacker,
            target: hit.target,
            damage: hit.damage,
            origin,
            target_died: died,
        });

        if died {
            entity_died_events.write(EntityDied {
                entity: hit.target,
                killer: hit.attacker,
            });
            crate::log_info(&format!("Entity {:?} killed by {:?}", hit.target, hit.attacker));
        }
    }
}

/// Система: пометить мёртвых и остановить их движение
pub fn mark_dead(
    mut commands: Commands,
    mut death_events: EventReader<EntityDied>,
    mut movement: Query<&mut MovementCommand>,
) {
    for event in death_events.read() {
        if let Ok(mut command) = movement.get_mut(event.entity) {
            *command = MovementCommand::Idle;
        }
        if let Ok(mut entity_commands) = commands.get_entity(event.entity) {
            entity_commands.insert(Dead);
        }
    }
}
