//! Headless симуляция Blackout
//!
//! Склад с колонной и ящиками, два патрульных, игрок стреляет из-за колонны.
//! Запуск: `blackout_simulation [tactical_config.json]`

use bevy::prelude::*;
use blackout_simulation::geometry::WallMap;
use blackout_simulation::navigation::{Navigation, VisibilityGraphNavigator};
use blackout_simulation::perception::{CoverPoints, Emitter, SoundBus, SoundEmission, SoundKind};
use blackout_simulation::{
    agent_snapshots, create_headless_app, log_error, log_info, run_fixed_tick, spawn_agent, Actor, Player,
    TacticalConfig,
};

const SEED: u64 = 42;
const TICKS: usize = 1200;
const PLAYER_SHOT_TICK: usize = 90;

fn load_config() -> TacticalConfig {
    let Some(path) = std::env::args().nth(1) else {
        return TacticalConfig::default();
    };

    match std::fs::read_to_string(&path) {
        Ok(source) => TacticalConfig::from_json_or_default(&source),
        Err(error) => {
            log_error(&format!("Cannot read config {}: {}", path, error));
            TacticalConfig::default()
        }
    }
}

fn main() {
    let mut app = create_headless_app(SEED);
    log_info(&format!("Starting Blackout headless simulation (seed: {})", SEED));

    let config = load_config();

    let walls = WallMap::default()
        .with_box(Vec2::new(-600.0, -400.0), Vec2::new(600.0, 400.0))
        .with_box(Vec2::new(180.0, -60.0), Vec2::new(240.0, 60.0))
        .with_box(Vec2::new(-200.0, 150.0), Vec2::new(-140.0, 210.0));

    {
        let world = app.world_mut();
        world.insert_resource(Navigation::new(VisibilityGraphNavigator::new(walls.clone(), 12.0)));
        world.insert_resource(walls);
        world.insert_resource(CoverPoints {
            points: vec![Vec2::new(-240.0, 180.0), Vec2::new(150.0, 0.0), Vec2::new(-100.0, -300.0)],
        });

        world.spawn((Player, Actor { faction_id: 0 }, Transform::from_xyz(420.0, 0.0, 0.0)));
    }

    let route = vec![Vec2::new(-400.0, -200.0), Vec2::new(-400.0, 200.0), Vec2::new(0.0, 200.0)];
    spawn_agent(app.world_mut(), Vec2::new(-400.0, -200.0), 1, config.clone(), route);
    spawn_agent(app.world_mut(), Vec2::new(0.0, -250.0), 1, config, Vec::new());

    for tick in 0..TICKS {
        if tick == PLAYER_SHOT_TICK {
            log_info("Player fires from behind the pillar");
            let origin = Vec2::new(420.0, 0.0);
            app.world_mut()
                .resource_mut::<SoundBus>()
                .push(SoundEmission::new(SoundKind::Gunshot, origin, 1.0, Emitter::Player));
        }

        run_fixed_tick(&mut app);

        if tick % 120 == 0 {
            for snapshot in agent_snapshots(app.world_mut()) {
                log_info(&format!(
                    "Tick {}: agent {} {:?} (memory {:?} {:.2})",
                    tick, snapshot.agent, snapshot.state, snapshot.memory.source, snapshot.memory.confidence
                ));
            }
        }
    }

    for snapshot in agent_snapshots(app.world_mut()) {
        match snapshot.to_json() {
            Ok(json) => log_info(&json),
            Err(error) => log_error(&format!("Snapshot serialization failed: {}", error)),
        }
    }

    log_info("Simulation complete!");
}
