//! Player marker component
//!
//! Отмечает entity, за которым охотится AI (цель памяти/восприятия).

use bevy::prelude::Component;

/// Marker component для player-controlled entity
///
/// - AI systems используют `Without<Player>` (игрок не управляется тактическим AI)
/// - Perception строит TargetView из `With<Player>`
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Player;
