//! Capability interfaces: что AgentController может вызвать у тела
//!
//! Одни и те же трейты реализуются для врагов и для игрока: вызывающий код не
//! знает конкретного типа комбатанта. Баллистику эти вызовы не симулируют.

use bevy::prelude::*;

use crate::components::MovementCommand;

/// Оружие (fire / reload)
pub trait WeaponCapability {
    fn can_fire(&self) -> bool;
    fn needs_reload(&self) -> bool;
    /// Дальность прицельной стрельбы (для "могу ли попасть отсюда")
    fn range(&self) -> f32;
    fn fire(&mut self, direction: Vec2);
    fn reload(&mut self);
}

/// Гранаты
pub trait GrenadeCapability {
    fn grenades_left(&self) -> u32;
    fn throw(&mut self, target: Vec2);
}

/// Movement/physics integrator (движок двигает тело и поворачивает взгляд)
pub trait MovementIntegrator {
    fn apply_movement(&mut self, intent: &MovementCommand);
    fn apply_facing(&mut self, direction: Vec2);
}

/// Полный набор engine-facing вызовов одного агента
pub trait AgentEffectors: WeaponCapability + GrenadeCapability + MovementIntegrator {}

impl<T: WeaponCapability + GrenadeCapability + MovementIntegrator> AgentEffectors for T {}
