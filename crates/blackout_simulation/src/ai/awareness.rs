//! Grenade awareness: какие гранаты агент лично заметил
//!
//! Граната в мире ничего не значит, пока агент не получил про неё собственный
//! SensoryEvent (видел бросок, слышал падение, видел союзника, уклоняющегося от неё).

use bevy::prelude::*;
use std::collections::BTreeSet;

use crate::perception::{GrenadeId, GrenadeView, SensoryEvent};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrenadeAwareness {
    known: BTreeSet<GrenadeId>,
}

impl GrenadeAwareness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Запомнить гранаты из событий тика
    pub fn observe(&mut self, events: &[SensoryEvent]) {
        for event in events {
            if let Some(id) = event.grenade_cue() {
                if self.known.insert(id) {
                    crate::log(&format!("💣 Grenade {:?} noticed via {:?}", id, event.kind));
                }
            }
        }
    }

    /// Забыть гранаты, которых больше нет в мире (взорвались)
    pub fn prune(&mut self, grenades: &[GrenadeView]) {
        self.known
            .retain(|id| grenades.iter().any(|grenade| grenade.id == *id));
    }

    pub fn knows(&self, id: GrenadeId) -> bool {
        self.known.contains(&id)
    }

    pub fn known(&self) -> impl Iterator<Item = GrenadeId> + '_ {
        self.known.iter().copied()
    }

    /// Ближайшая известная граната, в радиус которой (с запасом) попадает агент
    pub fn threat(&self, position: Vec2, grenades: &[GrenadeView], margin: f32) -> Option<GrenadeView> {
        grenades
            .iter()
            .filter(|grenade| self.knows(grenade.id))
            .filter(|grenade| position.distance(grenade.position) <= grenade.blast_radius + margin)
            .min_by(|a, b| {
                position
                    .distance(a.position)
                    .total_cmp(&position.distance(b.position))
            })
            .copied()
    }
}
