//! ECS Components для игровых entity
//!
//! Организация по доменам:
//! - actor: базовые характеристики (AgentId, faction, health)
//! - movement: intents перемещения и взгляда (MovementCommand, AimDirection)
//! - player: marker цели AI (Player)

pub mod actor;
pub mod movement;
pub mod player;

// Re-exports для удобного импорта
pub use actor::*;
pub use movement::*;
pub use player::*;
