//! Weapon stats + grenade pouch
//!
//! ECS хранит только game state (патроны, cooldown, таймер перезарядки).
//! Выстрел/бросок уходят наружу как intent events, баллистика внешняя.

use bevy::prelude::*;

use super::capability::{GrenadeCapability, WeaponCapability};

/// Ranged weapon state
#[derive(Component, Debug, Clone, PartialEq, Reflect)]
#[reflect(Component)]
pub struct WeaponStats {
    /// Урон за попадание (применяет внешняя баллистика)
    pub damage: u32,
    pub magazine_size: u32,
    pub ammo: u32,
    /// Пауза между выстрелами (секунды)
    pub fire_cooldown: f32,
    pub cooldown_timer: f32,
    pub reload_duration: f32,
    /// > 0 пока идёт перезарядка
    pub reload_timer: f32,
    /// Дальность прицельной стрельбы (пиксели)
    pub range: f32,
    /// Громкость выстрела (intensity на звуковой шине)
    pub loudness: f32,
}

impl Default for WeaponStats {
    fn default() -> Self {
        Self::rifle()
    }
}

impl WeaponStats {
    pub fn rifle() -> Self {
        Self {
            damage: 12,
            magazine_size: 8,
            ammo: 8,
            fire_cooldown: 0.35,
            cooldown_timer: 0.0,
            reload_duration: 1.6,
            reload_timer: 0.0,
            range: 520.0,
            loudness: 1.0,
        }
    }

    pub fn pistol() -> Self {
        Self {
            damage: 8,
            magazine_size: 6,
            ammo: 6,
            fire_cooldown: 0.5,
            cooldown_timer: 0.0,
            reload_duration: 1.2,
            reload_timer: 0.0,
            range: 380.0,
            loudness: 0.8,
        }
    }

    pub fn is_reloading(&self) -> bool {
        self.reload_timer > 0.0
    }

    /// Тик таймеров; перезарядка завершается заполнением магазина
    pub fn tick(&mut self, delta: f32) {
        self.cooldown_timer = (self.cooldown_timer - delta).max(0.0);

        if self.reload_timer > 0.0 {
            self.reload_timer = (self.reload_timer - delta).max(0.0);
            if self.reload_timer <= 0.0 {
                self.ammo = self.magazine_size;
            }
        }
    }
}

impl WeaponCapability for WeaponStats {
    fn can_fire(&self) -> bool {
        self.ammo > 0 && self.cooldown_timer <= 0.0 && !self.is_reloading()
    }

    fn needs_reload(&self) -> bool {
        self.ammo == 0 && !self.is_reloading()
    }

    fn range(&self) -> f32 {
        self.range
    }

    fn fire(&mut self, _direction: Vec2) {
        if !self.can_fire() {
            return;
        }
        self.ammo -= 1;
        self.cooldown_timer = self.fire_cooldown;
    }

    fn reload(&mut self) {
        if self.is_reloading() || self.ammo == self.magazine_size {
            return;
        }
        self.reload_timer = self.reload_duration;
    }
}

/// Запас гранат
#[derive(Component, Debug, Clone, PartialEq, Reflect)]
#[reflect(Component)]
pub struct GrenadePouch {
    pub count: u32,
    pub blast_radius: f32,
    /// Время полёта до приземления (секунды)
    pub flight_time: f32,
    /// Время от приземления до взрыва (секунды)
    pub fuse: f32,
}

impl Default for GrenadePouch {
    fn default() -> Self {
        Self {
            count: 1,
            blast_radius: 120.0,
            flight_time: 0.8,
            fuse: 1.5,
        }
    }
}

impl GrenadePouch {
    pub fn empty() -> Self {
        Self {
            count: 0,
            ..Self::default()
        }
    }
}

impl GrenadeCapability for GrenadePouch {
    fn grenades_left(&self) -> u32 {
        self.count
    }

    fn throw(&mut self, _target: Vec2) {
        self.count = self.count.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fire_consumes_ammo_and_sets_cooldown() {
        let mut weapon = WeaponStats::rifle();
        weapon.fire(Vec2::X);

        assert_eq!(weapon.ammo, 7);
        assert!(!weapon.can_fire()); // cooldown

        weapon.tick(0.4);
        assert!(weapon.can_fire());
    }

    #[test]
    fn test_reload_cycle() {
        let mut weapon = WeaponStats::pistol();
        weapon.ammo = 0;
        assert!(weapon.needs_reload());
        assert!(!weapon.can_fire());

        weapon.reload();
        assert!(weapon.is_reloading());
        assert!(!weapon.needs_reload());

        weapon.tick(0.6);
        assert_eq!(weapon.ammo, 0);
        weapon.tick(0.7);
        assert_eq!(weapon.ammo, 6);
        assert!(weapon.can_fire());
    }

    #[test]
    fn test_reload_with_full_magazine_is_noop() {
        let mut weapon = WeaponStats::rifle();
        weapon.reload();
        assert!(!weapon.is_reloading());
    }

    #[test]
    fn test_throw_never_underflows() {
        let mut pouch = GrenadePouch::default();
        pouch.throw(Vec2::ZERO);
        pouch.throw(Vec2::ZERO);
        assert_eq!(pouch.grenades_left(), 0);
    }
}
