//! Grenade lifecycle: бросок → полёт → приземление (звук) → взрыв
//!
//! Гранаты живут в resource `ActiveGrenades`. Агенты узнают о них только
//! через восприятие (видят полёт, слышат падение, видят реакцию союзника).

use bevy::prelude::*;

use super::intents::GrenadeThrowIntent;
use super::weapon::GrenadePouch;
use crate::perception::{Emitter, GrenadeId, GrenadePhase, GrenadeView, SoundEmission, SoundEmitted, SoundKind};

/// Граната в мире
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveGrenade {
    pub id: GrenadeId,
    pub thrower: Option<Entity>,
    pub origin: Vec2,
    pub target: Vec2,
    pub position: Vec2,
    pub phase: GrenadePhase,
    pub flight_time: f32,
    pub elapsed: f32,
    pub fuse_remaining: f32,
    pub blast_radius: f32,
}

impl ActiveGrenade {
    pub fn view(&self) -> GrenadeView {
        GrenadeView {
            id: self.id,
            position: self.position,
            phase: self.phase,
            blast_radius: self.blast_radius,
        }
    }
}

/// Все гранаты в полёте/на земле
#[derive(Resource, Debug, Default, Clone)]
pub struct ActiveGrenades {
    pub grenades: Vec<ActiveGrenade>,
    next_id: u64,
}

impl ActiveGrenades {
    /// Добавить гранату в полёте, вернуть её ID
    pub fn launch(
        &mut self,
        thrower: Option<Entity>,
        origin: Vec2,
        target: Vec2,
        pouch: &GrenadePouch,
    ) -> GrenadeId {
        self.next_id += 1;
        let id = GrenadeId(self.next_id);
        self.grenades.push(ActiveGrenade {
            id,
            thrower,
            origin,
            target,
            position: origin,
            phase: GrenadePhase::Airborne,
            flight_time: pouch.flight_time.max(f32::EPSILON),
            elapsed: 0.0,
            fuse_remaining: pouch.fuse,
            blast_radius: pouch.blast_radius,
        });
        id
    }

    pub fn views(&self) -> Vec<GrenadeView> {
        self.grenades.iter().map(ActiveGrenade::view).collect()
    }

    /// Продвинуть все гранаты на dt: возвращает (приземлившиеся, взорвавшиеся)
    pub fn advance(&mut self, delta: f32) -> (Vec<ActiveGrenade>, Vec<ActiveGrenade>) {
        let mut landed = Vec::new();
        for grenade in &mut self.grenades {
            match grenade.phase {
                GrenadePhase::Airborne => {
                    grenade.elapsed += delta;
                    let t = (grenade.elapsed / grenade.flight_time).min(1.0);
                    grenade.position = grenade.origin.lerp(grenade.target, t);
                    if t >= 1.0 {
                        grenade.phase = GrenadePhase::Landed;
                        landed.push(grenade.clone());
                    }
                }
                GrenadePhase::Landed => {
                    grenade.fuse_remaining -= delta;
                }
            }
        }

        let (exploded, alive): (Vec<_>, Vec<_>) = self
            .grenades
            .drain(..)
            .partition(|g| g.phase == GrenadePhase::Landed && g.fuse_remaining <= 0.0);
        self.grenades = alive;
        (landed, exploded)
    }
}

/// Событие: граната взорвалась (урон считает внешняя система)
#[derive(Event, Debug, Clone)]
pub struct GrenadeExploded {
    pub id: GrenadeId,
    pub position: Vec2,
    pub blast_radius: f32,
    pub thrower: Option<Entity>,
}

/// Система: GrenadeThrowIntent → ActiveGrenades
pub fn spawn_thrown_grenades(
    mut intents: EventReader<GrenadeThrowIntent>,
    mut grenades: ResMut<ActiveGrenades>,
    pouches: Query<&GrenadePouch>,
) {
    for intent in intents.read() {
        let pouch = pouches.get(intent.thrower).cloned().unwrap_or_default();
        let id = grenades.launch(Some(intent.thrower), intent.origin, intent.target, &pouch);
        crate::log(&format!(
            "Grenade {:?} thrown by {:?} at ({:.0}, {:.0})",
            id, intent.thrower, intent.target.x, intent.target.y
        ));
    }
}

/// Система: полёт/приземление/взрыв
pub fn advance_grenades(
    mut grenades: ResMut<ActiveGrenades>,
    mut sounds: EventWriter<SoundEmitted>,
    mut explosions: EventWriter<GrenadeExploded>,
    time: Res<Time<Fixed>>,
) {
    let (landed, exploded) = grenades.advance(time.delta_secs());

    for grenade in landed {
        sounds.write(SoundEmitted(SoundEmission::new(
            SoundKind::GrenadeLanding { grenade: grenade.id },
            grenade.position,
            1.0,
            Emitter::Environment,
        )));
    }

    for grenade in exploded {
        explosions.write(GrenadeExploded {
            id: grenade.id,
            position: grenade.position,
            blast_radius: grenade.blast_radius,
            thrower: grenade.thrower,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grenade_lands_then_explodes() {
        let mut grenades = ActiveGrenades::default();
        let pouch = GrenadePouch {
            count: 1,
            blast_radius: 100.0,
            flight_time: 0.5,
            fuse: 1.0,
        };
        let id = grenades.launch(None, Vec2::ZERO, Vec2::new(200.0, 0.0), &pouch);

        let (landed, exploded) = grenades.advance(0.25);
        assert!(landed.is_empty() && exploded.is_empty());
        assert_eq!(grenades.grenades[0].position, Vec2::new(100.0, 0.0));

        let (landed, _) = grenades.advance(0.25);
        assert_eq!(landed.len(), 1);
        assert_eq!(landed[0].id, id);
        assert_eq!(grenades.grenades[0].phase, GrenadePhase::Landed);

        let (_, exploded) = grenades.advance(1.0);
        assert_eq!(exploded.len(), 1);
        assert!(grenades.grenades.is_empty());
    }

    #[test]
    fn test_ids_are_unique() {
        let mut grenades = ActiveGrenades::default();
        let pouch = GrenadePouch::default();
        let a = grenades.launch(None, Vec2::ZERO, Vec2::X, &pouch);
        let b = grenades.launch(None, Vec2::ZERO, Vec2::X, &pouch);
        assert_ne!(a, b);
    }
}
