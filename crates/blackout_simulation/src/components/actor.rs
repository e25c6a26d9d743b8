//! Базовые компоненты акторов: Actor, Health, AgentId

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Stable ID агента внутри тактического ядра
///
/// Ядро не знает про ECS Entity. Bevy слой строит ID из `Entity::to_bits()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct AgentId(pub u64);

impl From<Entity> for AgentId {
    fn from(entity: Entity) -> Self {
        Self(entity.to_bits())
    }
}

/// Актор (NPC, игрок, враг): базовый компонент для живых существ
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
#[require(Health)]
pub struct Actor {
    /// Stable ID фракции (свои выстрелы не считаются стимулом)
    pub faction_id: u64,
}

/// Здоровье актора
///
/// Инвариант: 0 ≤ current ≤ max
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
pub struct Health {
    pub current: u32,
    pub max: u32,
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100)
    }
}

impl Health {
    pub fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0
    }

    pub fn take_damage(&mut self, amount: u32) {
        self.current = self.current.saturating_sub(amount);
    }

    pub fn heal(&mut self, amount: u32) {
        self.current = self.current.saturating_add(amount).min(self.max);
    }

    /// Доля здоровья 0.0..=1.0
    pub fn ratio(&self) -> f32 {
        if self.max == 0 {
            return 0.0;
        }
        self.current as f32 / self.max as f32
    }
}
