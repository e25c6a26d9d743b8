//! Hearing: звуки слышны через стены
//!
//! Звук НЕ перекрывается геометрией: перезарядка за стеной должна быть слышна,
//! иначе звуковые стимулы бесполезны против цели в укрытии.
//! Слышимость = distance ≤ propagation_range(kind) × intensity.

use bevy::prelude::*;

use crate::components::AgentId;
use crate::config::{MemoryConfig, PerceptionConfig};
use crate::perception::events::{GrenadeId, SensoryEvent, SensoryKind};

/// Тип звука на шине
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SoundKind {
    Gunshot,
    Reload,
    /// Щелчок пустого магазина (тот же сигнал что и перезарядка)
    EmptyClick,
    GrenadeLanding { grenade: GrenadeId },
}

/// Кто издал звук / включил фонарь
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Emitter {
    Player,
    Agent { id: AgentId, faction: u64 },
    Environment,
}

/// Запись на звуковой шине: `{kind, origin, intensity}`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundEmission {
    pub kind: SoundKind,
    pub origin: Vec2,
    pub intensity: f32,
    pub emitter: Emitter,
}

impl SoundEmission {
    pub fn new(kind: SoundKind, origin: Vec2, intensity: f32, emitter: Emitter) -> Self {
        Self {
            kind,
            origin,
            intensity,
            emitter,
        }
    }
}

/// Дальность распространения звука при intensity = 1.0
pub fn propagation_range(kind: SoundKind, config: &PerceptionConfig) -> f32 {
    match kind {
        SoundKind::Gunshot => config.gunshot_range,
        SoundKind::Reload => config.reload_range,
        SoundKind::EmptyClick => config.empty_click_range,
        SoundKind::GrenadeLanding { .. } => config.grenade_landing_range,
    }
}

/// Фиксированная confidence для звукового/визуального стимула (< 1.0 для всего кроме Seen)
pub fn confidence_for(kind: SensoryKind, config: &MemoryConfig) -> f32 {
    match kind {
        SensoryKind::Seen => config.seen_confidence,
        SensoryKind::HeardShot => config.heard_shot_confidence,
        SensoryKind::HeardReload => config.heard_reload_confidence,
        SensoryKind::SawFlashlightBeam => config.flashlight_confidence,
        SensoryKind::SawAllyAlerted => config.ally_alert_confidence,
        SensoryKind::SawGrenadeThrow | SensoryKind::HeardGrenadeLanding => 0.0,
    }
}

/// Hearing test одного звука для слушателя
///
/// Свои звуки и звуки своей фракции не выдают цель. Падение гранаты слышно от кого угодно.
pub fn hear(
    listener: AgentId,
    listener_faction: u64,
    listener_position: Vec2,
    sound: &SoundEmission,
    now: f32,
    config: &PerceptionConfig,
) -> Option<SensoryEvent> {
    if !sound.intensity.is_finite() || sound.intensity <= 0.0 {
        return None;
    }

    let friendly = match sound.emitter {
        Emitter::Agent { id, faction } => id == listener || faction == listener_faction,
        Emitter::Player | Emitter::Environment => false,
    };

    let range = propagation_range(sound.kind, config) * sound.intensity;
    if listener_position.distance(sound.origin) > range {
        return None;
    }

    match sound.kind {
        SoundKind::Gunshot if !friendly => Some(SensoryEvent::new(
            SensoryKind::HeardShot,
            sound.origin,
            sound.intensity,
            now,
        )),
        SoundKind::Reload | SoundKind::EmptyClick if !friendly => Some(SensoryEvent::new(
            SensoryKind::HeardReload,
            sound.origin,
            sound.intensity,
            now,
        )),
        SoundKind::GrenadeLanding { grenade } => Some(
            SensoryEvent::new(SensoryKind::HeardGrenadeLanding, sound.origin, sound.intensity, now)
                .with_grenade(grenade),
        ),
        _ => None,
    }
}
