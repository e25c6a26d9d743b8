//! ECS-side stimulus buses: звуковая шина и активные световые лучи
//!
//! Источники (игрок, агенты, окружение) пишут `SoundEmitted` events. За тик
//! `collect_sound_emissions` собирает их в `SoundBus`, все агенты читают шину
//! read-only, в конце тика она очищается.

use bevy::prelude::*;

use super::cues::LightBeam;
use super::hearing::SoundEmission;

/// Событие: кто-то издал звук
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct SoundEmitted(pub SoundEmission);

/// Звуки текущего тика
#[derive(Resource, Debug, Default, Clone)]
pub struct SoundBus {
    pub emissions: Vec<SoundEmission>,
}

impl SoundBus {
    pub fn push(&mut self, emission: SoundEmission) {
        self.emissions.push(emission);
    }

    pub fn clear(&mut self) {
        self.emissions.clear();
    }
}

/// Активные лучи фонарей (хост обновляет каждый тик)
#[derive(Resource, Debug, Default, Clone)]
pub struct LightBeams {
    pub beams: Vec<LightBeam>,
}

/// Точки укрытия уровня (порядок объявления = tie-break при выборе)
#[derive(Resource, Debug, Default, Clone)]
pub struct CoverPoints {
    pub points: Vec<Vec2>,
}
