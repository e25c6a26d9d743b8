//! Perception: зрение, слух, световые конусы, наблюдение за союзниками и гранатами
//!
//! PerceptionModel никогда не трогает память напрямую: `sense()` только возвращает
//! события за тик, MemoryStore решает что с ними делать.
//!
//! Порядок событий в выдаче стабилен (Seen → звуки → лучи → союзники → гранаты),
//! от него зависит какое событие перезапишет память при равной confidence.

use bevy::prelude::*;

use crate::components::AgentId;
use crate::config::PerceptionConfig;
use crate::geometry::LineOfSight;

pub mod bus;
pub mod cues;
pub mod events;
pub mod hearing;
pub mod vision;

pub use bus::{CoverPoints, LightBeams, SoundBus, SoundEmitted};
pub use cues::{beam_hits, LightBeam};
pub use events::{GrenadeId, SensoryEvent, SensoryKind};
pub use hearing::{confidence_for, hear, propagation_range, Emitter, SoundEmission, SoundKind};
pub use vision::{can_see, ray_directions, SensorPose};

/// Что агент может знать о цели (ground truth, фильтруется через vision test)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetView {
    pub position: Vec2,
    pub radius: f32,
}

/// Фаза полёта гранаты
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrenadePhase {
    Airborne,
    Landed,
}

/// Граната в мире (существование гранаты само по себе ничего не значит для агента)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrenadeView {
    pub id: GrenadeId,
    pub position: Vec2,
    pub phase: GrenadePhase,
    pub blast_radius: f32,
}

/// Read-only снимок союзника (строится до mutable прохода по агентам)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllyView {
    pub id: AgentId,
    pub position: Vec2,
    /// Союзник в Combat/Pursuing/Flanking с уверенной оценкой позиции цели
    pub alerted: bool,
    pub in_combat: bool,
    /// Куда союзник думает что цель
    pub belief: Option<Vec2>,
    /// Граната, от которой союзник сейчас уклоняется
    pub evading: Option<GrenadeId>,
}

/// Всё, что агент может прочитать о мире за один тик
#[derive(Clone, Copy)]
pub struct WorldView<'a> {
    pub now: f32,
    pub target: Option<TargetView>,
    pub sounds: &'a [SoundEmission],
    pub beams: &'a [LightBeam],
    pub grenades: &'a [GrenadeView],
    pub allies: &'a [AllyView],
    pub cover_points: &'a [Vec2],
    pub geometry: &'a dyn LineOfSight,
}

impl<'a> WorldView<'a> {
    /// Пустой мир без стимулов (удобно для тестов и спавна)
    pub fn empty(now: f32, geometry: &'a dyn LineOfSight) -> Self {
        Self {
            now,
            target: None,
            sounds: &[],
            beams: &[],
            grenades: &[],
            allies: &[],
            cover_points: &[],
            geometry,
        }
    }

    pub fn grenade(&self, id: GrenadeId) -> Option<&GrenadeView> {
        self.grenades.iter().find(|g| g.id == id)
    }

    pub fn allies_in_combat(&self) -> usize {
        self.allies.iter().filter(|a| a.in_combat).count()
    }
}

/// Кто смотрит/слушает
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observer {
    pub id: AgentId,
    pub faction: u64,
    pub pose: SensorPose,
}

/// Multi-modal perception одного агента
#[derive(Debug, Clone, Default)]
pub struct PerceptionModel {
    pub config: PerceptionConfig,
}

impl PerceptionModel {
    pub fn new(config: PerceptionConfig) -> Self {
        Self { config }
    }

    /// Все наблюдения агента за тик
    pub fn sense(&self, observer: &Observer, world: &WorldView) -> Vec<SensoryEvent> {
        let mut events = Vec::new();
        let pose = &observer.pose;

        if let Some(target) = world.target {
            if can_see(pose, target.position, target.radius, &self.config, world.geometry) {
                events.push(SensoryEvent::new(SensoryKind::Seen, target.position, 1.0, world.now));
            }
        }

        events.extend(world.sounds.iter().filter_map(|sound| {
            hear(
                observer.id,
                observer.faction,
                pose.position,
                sound,
                world.now,
                &self.config,
            )
        }));

        for beam in world.beams {
            if beam.emitter != Emitter::Player {
                continue;
            }
            if beam_hits(beam, pose.position, world.geometry) {
                events.push(SensoryEvent::new(
                    SensoryKind::SawFlashlightBeam,
                    beam.emitter_position,
                    1.0,
                    world.now,
                ));
            }
        }

        for ally in world.allies {
            if ally.id == observer.id
                || !can_see(pose, ally.position, self.config.target_radius, &self.config, world.geometry)
            {
                continue;
            }

            if let Some(grenade) = ally.evading {
                events.push(
                    SensoryEvent::new(SensoryKind::SawAllyAlerted, ally.position, 1.0, world.now)
                        .with_grenade(grenade),
                );
            } else if let (true, Some(belief)) = (ally.alerted, ally.belief) {
                events.push(SensoryEvent::new(SensoryKind::SawAllyAlerted, belief, 1.0, world.now));
            }
        }

        for grenade in world.grenades {
            if grenade.phase == GrenadePhase::Airborne
                && can_see(pose, grenade.position, 4.0, &self.config, world.geometry)
            {
                events.push(
                    SensoryEvent::new(SensoryKind::SawGrenadeThrow, grenade.position, 1.0, world.now)
                        .with_grenade(grenade.id),
                );
            }
        }

        // InvalidEvent: отбрасываем молча, тик не падает
        events.retain(SensoryEvent::is_valid);
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{OpenField, WallMap};

    fn observer_at_origin() -> Observer {
        Observer {
            id: AgentId(1),
            faction: 2,
            pose: SensorPose {
                position: Vec2::ZERO,
                facing: Vec2::X,
            },
        }
    }

    #[test]
    fn test_sense_sees_target_in_front() {
        let model = PerceptionModel::default();
        let mut world = WorldView::empty(3.0, &OpenField);
        world.target = Some(TargetView {
            position: Vec2::new(200.0, 0.0),
            radius: 16.0,
        });

        let events = model.sense(&observer_at_origin(), &world);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, SensoryKind::Seen);
        assert_eq!(events[0].timestamp, 3.0);
    }

    #[test]
    fn test_sound_through_wall_heard_but_target_not_seen() {
        let model = PerceptionModel::default();
        let walls = WallMap::default().with_wall(Vec2::new(40.0, -100.0), Vec2::new(40.0, 100.0));
        let sounds = [SoundEmission::new(
            SoundKind::Reload,
            Vec2::new(120.0, 0.0),
            1.0,
            Emitter::Player,
        )];
        let mut world = WorldView::empty(0.0, &walls);
        world.target = Some(TargetView {
            position: Vec2::new(120.0, 0.0),
            radius: 16.0,
        });
        world.sounds = &sounds;

        let events = model.sense(&observer_at_origin(), &world);
        let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![SensoryKind::HeardReload]);
    }

    #[test]
    fn test_flashlight_event_points_at_emitter() {
        let model = PerceptionModel::default();
        let beams = [LightBeam {
            emitter_position: Vec2::new(-300.0, 0.0),
            direction: Vec2::X,
            half_angle: 0.3,
            range: 500.0,
            emitter: Emitter::Player,
        }];
        let mut world = WorldView::empty(0.0, &OpenField);
        world.beams = &beams;

        let events = model.sense(&observer_at_origin(), &world);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, SensoryKind::SawFlashlightBeam);
        assert_eq!(events[0].origin, Vec2::new(-300.0, 0.0));
    }

    #[test]
    fn test_grenade_existence_alone_is_not_perceived() {
        let model = PerceptionModel::default();
        // Граната сзади агента, уже лежит, звука падения не было
        let grenades = [GrenadeView {
            id: GrenadeId(5),
            position: Vec2::new(-40.0, 0.0),
            phase: GrenadePhase::Landed,
            blast_radius: 120.0,
        }];
        let mut world = WorldView::empty(0.0, &OpenField);
        world.grenades = &grenades;

        assert!(model.sense(&observer_at_origin(), &world).is_empty());
    }

    #[test]
    fn test_visible_airborne_grenade_perceived() {
        let model = PerceptionModel::default();
        let grenades = [GrenadeView {
            id: GrenadeId(5),
            position: Vec2::new(150.0, 0.0),
            phase: GrenadePhase::Airborne,
            blast_radius: 120.0,
        }];
        let mut world = WorldView::empty(0.0, &OpenField);
        world.grenades = &grenades;

        let events = model.sense(&observer_at_origin(), &world);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].grenade_cue(), Some(GrenadeId(5)));
    }

    #[test]
    fn test_alerted_ally_shares_belief() {
        let model = PerceptionModel::default();
        let allies = [AllyView {
            id: AgentId(9),
            position: Vec2::new(100.0, 0.0),
            alerted: true,
            in_combat: true,
            belief: Some(Vec2::new(400.0, 300.0)),
            evading: None,
        }];
        let mut world = WorldView::empty(0.0, &OpenField);
        world.allies = &allies;

        let events = model.sense(&observer_at_origin(), &world);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, SensoryKind::SawAllyAlerted);
        assert_eq!(events[0].origin, Vec2::new(400.0, 300.0));
        assert!(events[0].updates_target_memory());
        assert_eq!(world.allies_in_combat(), 1);
    }

    #[test]
    fn test_invalid_sound_discarded() {
        let model = PerceptionModel::default();
        let sounds = [SoundEmission::new(
            SoundKind::Gunshot,
            Vec2::new(f32::NAN, 0.0),
            1.0,
            Emitter::Player,
        )];
        let mut world = WorldView::empty(0.0, &OpenField);
        world.sounds = &sounds;

        assert!(model.sense(&observer_at_origin(), &world).is_empty());
    }
}
