//! Sensory events: одноразовые наблюдения за один тик

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// ID гранаты в мире (стабилен от броска до взрыва)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GrenadeId(pub u64);

/// Тип наблюдения
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensoryKind {
    /// Цель в поле зрения (ground truth)
    Seen,
    /// Звук перезарядки / щелчок пустого магазина
    HeardReload,
    /// Выстрел
    HeardShot,
    /// Агент попал в луч фонаря (origin = позиция фонаря)
    SawFlashlightBeam,
    /// Видим встревоженного союзника (origin = его оценка позиции цели,
    /// или позиция союзника если он уклоняется от гранаты)
    SawAllyAlerted,
    /// Видим летящую гранату
    SawGrenadeThrow,
    /// Слышим как граната упала
    HeardGrenadeLanding,
}

impl SensoryKind {
    /// Влияет ли событие на память о цели (гранаты идут в GrenadeAwareness)
    pub fn targets_memory(&self) -> bool {
        !matches!(self, SensoryKind::SawGrenadeThrow | SensoryKind::HeardGrenadeLanding)
    }
}

/// Одно наблюдение агента за тик
///
/// Живёт один тик: MemoryStore обновляет belief, GrenadeAwareness запоминает гранату,
/// после чего событие выбрасывается.
#[derive(Debug, Clone, PartialEq)]
pub struct SensoryEvent {
    pub kind: SensoryKind,
    pub origin: Vec2,
    pub intensity: f32,
    pub timestamp: f32,
    /// Граната, к которой относится событие (для grenade awareness)
    pub grenade: Option<GrenadeId>,
}

impl SensoryEvent {
    pub fn new(kind: SensoryKind, origin: Vec2, intensity: f32, timestamp: f32) -> Self {
        Self {
            kind,
            origin,
            intensity,
            timestamp,
            grenade: None,
        }
    }

    pub fn with_grenade(mut self, grenade: GrenadeId) -> Self {
        self.grenade = Some(grenade);
        self
    }

    /// Битые события (NaN origin, нулевая интенсивность) отбрасываются без паники
    pub fn is_valid(&self) -> bool {
        self.origin.is_finite()
            && self.intensity.is_finite()
            && self.intensity > 0.0
            && self.timestamp.is_finite()
    }

    /// Обновляет ли событие belief о позиции цели
    ///
    /// Реакция союзника на гранату несёт позицию союзника, а не цели.
    pub fn updates_target_memory(&self) -> bool {
        self.kind.targets_memory() && self.grenade.is_none()
    }

    /// Событие про конкретную гранату (бросок, падение, реакция союзника на неё)
    pub fn grenade_cue(&self) -> Option<GrenadeId> {
        match self.kind {
            SensoryKind::SawGrenadeThrow
            | SensoryKind::HeardGrenadeLanding
            | SensoryKind::SawAllyAlerted => self.grenade,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_events_detected() {
        let nan = SensoryEvent::new(SensoryKind::HeardShot, Vec2::new(f32::NAN, 0.0), 1.0, 0.0);
        let silent = SensoryEvent::new(SensoryKind::HeardShot, Vec2::ZERO, 0.0, 0.0);
        let ok = SensoryEvent::new(SensoryKind::HeardShot, Vec2::ZERO, 0.5, 0.0);

        assert!(!nan.is_valid());
        assert!(!silent.is_valid());
        assert!(ok.is_valid());
    }

    #[test]
    fn test_grenade_cue_only_for_grenade_related_kinds() {
        let landing = SensoryEvent::new(SensoryKind::HeardGrenadeLanding, Vec2::ZERO, 1.0, 0.0)
            .with_grenade(GrenadeId(3));
        let shot = SensoryEvent::new(SensoryKind::HeardShot, Vec2::ZERO, 1.0, 0.0)
            .with_grenade(GrenadeId(3));

        assert_eq!(landing.grenade_cue(), Some(GrenadeId(3)));
        assert_eq!(shot.grenade_cue(), None);
        assert!(!landing.kind.targets_memory());
        assert!(shot.kind.targets_memory());
    }
}
