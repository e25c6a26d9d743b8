//! Combat intents (AI → внешний мир) и их звуковой след
//!
//! AI не симулирует баллистику: выстрел/перезарядка/бросок уходят событиями.
//! Каждый выстрел и перезарядка попадают на звуковую шину, так враги слышат
//! игрока, а игрок (и чужие фракции) слышат врагов.

use bevy::prelude::*;

use crate::components::{Actor, AgentId, Player};
use crate::perception::{Emitter, SoundEmission, SoundEmitted, SoundKind};

/// Намерение выстрелить
#[derive(Event, Debug, Clone)]
pub struct WeaponFireIntent {
    pub shooter: Entity,
    pub origin: Vec2,
    pub direction: Vec2,
    pub damage: u32,
    pub range: f32,
    pub loudness: f32,
}

/// Намерение перезарядиться (звук перезарядки)
#[derive(Event, Debug, Clone)]
pub struct ReloadIntent {
    pub entity: Entity,
    pub origin: Vec2,
}

/// Намерение бросить гранату
#[derive(Event, Debug, Clone)]
pub struct GrenadeThrowIntent {
    pub thrower: Entity,
    pub origin: Vec2,
    pub target: Vec2,
}

fn emitter_of(entity: Entity, actors: &Query<(&Actor, Has<Player>)>) -> Emitter {
    match actors.get(entity) {
        Ok((_, true)) => Emitter::Player,
        Ok((actor, false)) => Emitter::Agent {
            id: AgentId::from(entity),
            faction: actor.faction_id,
        },
        Err(_) => Emitter::Environment,
    }
}

/// Система: выстрелы и перезарядки → SoundEmitted
pub fn emit_combat_sounds(
    mut fire_intents: EventReader<WeaponFireIntent>,
    mut reload_intents: EventReader<ReloadIntent>,
    mut sounds: EventWriter<SoundEmitted>,
    actors: Query<(&Actor, Has<Player>)>,
) {
    for intent in fire_intents.read() {
        sounds.write(SoundEmitted(SoundEmission::new(
            SoundKind::Gunshot,
            intent.origin,
            intent.loudness,
            emitter_of(intent.shooter, &actors),
        )));
    }

    for intent in reload_intents.read() {
        sounds.write(SoundEmitted(SoundEmission::new(
            SoundKind::Reload,
            intent.origin,
            1.0,
            emitter_of(intent.entity, &actors),
        )));
    }
}
