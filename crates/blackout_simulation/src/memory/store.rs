//! MemoryStore: последняя известная позиция цели + decaying confidence

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::MemoryConfig;
use crate::perception::{confidence_for, SensoryEvent, SensoryKind};

/// Откуда агент знает позицию цели
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MemorySource {
    #[default]
    None,
    Visual,
    Gunshot,
    ReloadSound,
    Flashlight,
    AllyAlert,
}

impl MemorySource {
    pub fn from_kind(kind: SensoryKind) -> Option<Self> {
        match kind {
            SensoryKind::Seen => Some(Self::Visual),
            SensoryKind::HeardShot => Some(Self::Gunshot),
            SensoryKind::HeardReload => Some(Self::ReloadSound),
            SensoryKind::SawFlashlightBeam => Some(Self::Flashlight),
            SensoryKind::SawAllyAlerted => Some(Self::AllyAlert),
            SensoryKind::SawGrenadeThrow | SensoryKind::HeardGrenadeLanding => None,
        }
    }

    /// Разрешает ли источник сразу атаковать (иначе только подойти и перепроверить)
    pub fn permits_direct_engage(&self) -> bool {
        matches!(self, Self::Visual)
    }

    pub fn is_auditory(&self) -> bool {
        matches!(self, Self::Gunshot | Self::ReloadSound)
    }
}

/// Belief о позиции цели
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Memory {
    pub last_known_position: Vec2,
    /// 0.0..=1.0, никогда не отрицательная
    pub confidence: f32,
    pub source: MemorySource,
    pub timestamp: f32,
}

impl Memory {
    /// Позиции можно доверять для планирования
    ///
    /// При confidence = 0 позиция остаётся (центр поиска, debug), но цель не "известна".
    pub fn is_trustworthy(&self) -> bool {
        self.confidence > 0.0 && self.source != MemorySource::None
    }
}

/// Память одного агента
#[derive(Debug, Clone)]
pub struct MemoryStore {
    belief: Memory,
    config: MemoryConfig,
    /// Локальные часы памяти (сумма dt)
    clock: f32,
    refreshed: bool,
    last_reload_heard: Option<f32>,
}

impl MemoryStore {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            belief: Memory::default(),
            config,
            clock: 0.0,
            refreshed: false,
            last_reload_heard: None,
        }
    }

    /// Память с заданным начальным belief (тесты, сценарии)
    pub fn with_belief(config: MemoryConfig, belief: Memory) -> Self {
        let mut store = Self::new(config);
        store.belief = Memory {
            confidence: belief.confidence.clamp(0.0, 1.0),
            ..belief
        };
        store
    }

    pub fn current_belief(&self) -> Memory {
        self.belief
    }

    /// Перезаписал ли belief хотя бы один стимул в последнем update
    pub fn refreshed_this_tick(&self) -> bool {
        self.refreshed
    }

    /// Слышали ли перезарядку в пределах окна (для факта player_reloading)
    pub fn reload_heard_recently(&self, window: f32) -> bool {
        self.last_reload_heard
            .is_some_and(|heard_at| self.clock - heard_at <= window)
    }

    /// Применить события тика, либо (если ни одно не перезаписало belief) decay
    pub fn update(&mut self, events: &[SensoryEvent], dt: f32) {
        self.clock += dt.max(0.0);
        self.refreshed = false;

        for event in events {
            if !event.is_valid() || !event.updates_target_memory() {
                continue;
            }
            let Some(source) = MemorySource::from_kind(event.kind) else {
                continue;
            };
            let confidence = confidence_for(event.kind, &self.config).clamp(0.0, 1.0);
            if confidence <= 0.0 {
                continue;
            }

            if event.kind == SensoryKind::HeardReload {
                self.last_reload_heard = Some(self.clock);
            }

            if confidence >= self.belief.confidence || event.kind == SensoryKind::Seen {
                self.belief = Memory {
                    last_known_position: event.origin,
                    confidence,
                    source,
                    timestamp: event.timestamp,
                };
                self.refreshed = true;
            }
        }

        if !self.refreshed {
            self.decay(dt);
        }
    }

    fn decay(&mut self, dt: f32) {
        if self.belief.confidence <= 0.0 {
            self.belief.confidence = 0.0;
            self.belief.source = MemorySource::None;
            return;
        }

        self.belief.confidence = (self.belief.confidence - self.config.decay_rate * dt.max(0.0)).max(0.0);
        if self.belief.confidence <= 0.0 {
            self.belief.confidence = 0.0;
            self.belief.source = MemorySource::None;
        }
    }
}
