//! Combat module
//!
//! ECS ответственность:
//! - Game state: Health, WeaponStats (патроны, cooldown), GrenadePouch
//! - Combat rules: HitLanded → Health → DamageDealt / EntityDied
//! - Звуковой след боя (выстрел, перезарядка, падение гранаты)
//!
//! Внешняя ответственность: баллистика, урон от взрыва, анимации.

use bevy::prelude::*;

pub mod capability;
pub mod damage;
pub mod grenade;
pub mod intents;
pub mod weapon;

// Re-export основных типов
pub use capability::{AgentEffectors, GrenadeCapability, MovementIntegrator, WeaponCapability};
pub use damage::{DamageDealt, Dead, EntityDied, HitLanded};
pub use grenade::{ActiveGrenade, ActiveGrenades, GrenadeExploded};
pub use intents::{GrenadeThrowIntent, ReloadIntent, WeaponFireIntent};
pub use weapon::{GrenadePouch, WeaponStats};

/// System: тик weapon cooldown / reload таймеров
pub fn update_weapon_timers(mut weapons: Query<&mut WeaponStats>, time: Res<Time<Fixed>>) {
    let delta = time.delta_secs();
    for mut weapon in weapons.iter_mut() {
        weapon.tick(delta);
    }
}

/// Combat Plugin
///
/// Регистрирует combat системы в FixedUpdate (`SimulationSet::Combat`, до AI).
///
/// Порядок выполнения:
/// 1. update_weapon_timers: cooldown + завершение перезарядки
/// 2. apply_damage: HitLanded → Health → DamageDealt/EntityDied
/// 3. mark_dead: Dead marker, остановка движения
/// 4. emit_combat_sounds: выстрелы/перезарядки прошлого тика → звуковая шина
/// 5. spawn_thrown_grenades, advance_grenades: жизненный цикл гранат
pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<HitLanded>()
            .add_event::<DamageDealt>()
            .add_event::<EntityDied>()
            .add_event::<WeaponFireIntent>()
            .add_event::<ReloadIntent>()
            .add_event::<GrenadeThrowIntent>()
            .add_event::<GrenadeExploded>()
            .add_event::<crate::perception::SoundEmitted>()
            .init_resource::<ActiveGrenades>();

        app.add_systems(
            FixedUpdate,
            (
                update_weapon_timers,
                damage::apply_damage,
                damage::mark_dead,
                intents::emit_combat_sounds,
                grenade::spawn_thrown_grenades,
                grenade::advance_grenades,
            )
                .chain() // Последовательное выполнение для детерминизма
                .in_set(crate::SimulationSet::Combat),
        );
    }
}
