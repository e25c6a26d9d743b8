//! Integration тесты: тактический AI внутри Bevy App
//!
//! Полный конвейер FixedUpdate: combat (звуки, урон) → AI (восприятие, решения, движение).

use bevy::prelude::*;
use blackout_simulation::geometry::WallMap;
use blackout_simulation::memory::MemorySource;
use blackout_simulation::navigation::{Navigation, VisibilityGraphNavigator};
use blackout_simulation::perception::SoundEmitted;
use blackout_simulation::{
    create_headless_app, run_fixed_tick, spawn_agent, Actor, AgentController, AimDirection, Dead, EntityDied,
    HitLanded, Player, StateKind, TacticalConfig, WeaponFireIntent,
};

fn spawn_player(app: &mut App, position: Vec2) -> Entity {
    app.world_mut()
        .spawn((Player, Actor { faction_id: 0 }, Transform::from_xyz(position.x, position.y, 0.0)))
        .id()
}

fn agent(app: &App, entity: Entity) -> &AgentController {
    app.world().get::<AgentController>(entity).expect("agent controller")
}

fn position(app: &App, entity: Entity) -> Vec2 {
    app.world().get::<Transform>(entity).expect("transform").translation.truncate()
}

fn player_gunshot(app: &mut App, player: Entity, origin: Vec2) {
    app.world_mut().send_event(WeaponFireIntent {
        shooter: player,
        origin,
        direction: Vec2::NEG_X,
        damage: 0,
        range: 500.0,
        loudness: 1.0,
    });
}

#[test]
fn test_visible_player_is_fired_upon() {
    let mut app = create_headless_app(1);
    spawn_player(&mut app, Vec2::new(250.0, 0.0));
    let enemy = spawn_agent(app.world_mut(), Vec2::ZERO, 1, TacticalConfig::default(), Vec::new());

    run_fixed_tick(&mut app);

    assert_eq!(agent(&app, enemy).state().kind(), StateKind::Combat);
    let fired: Vec<WeaponFireIntent> = app
        .world_mut()
        .resource_mut::<Events<WeaponFireIntent>>()
        .drain()
        .collect();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].shooter, enemy);
    assert_eq!(fired[0].direction, Vec2::X);
}

#[test]
fn test_gunshot_behind_wall_starts_pursuit() {
    let mut app = create_headless_app(2);
    let walls = WallMap::default().with_wall(Vec2::new(150.0, -100.0), Vec2::new(150.0, 100.0));
    app.world_mut()
        .insert_resource(Navigation::new(VisibilityGraphNavigator::new(walls.clone(), 10.0)));
    app.world_mut().insert_resource(walls);

    let player_position = Vec2::new(400.0, 0.0);
    let player = spawn_player(&mut app, player_position);
    let enemy = spawn_agent(app.world_mut(), Vec2::ZERO, 1, TacticalConfig::default(), Vec::new());

    player_gunshot(&mut app, player, player_position);
    run_fixed_tick(&mut app);

    let controller = agent(&app, enemy);
    assert_eq!(controller.state().kind(), StateKind::Pursuing);
    let belief = controller.memory().current_belief();
    assert_eq!(belief.source, MemorySource::Gunshot);
    assert_eq!(belief.last_known_position, player_position);

    // обходит стену и в итоге видит игрока
    let mut spotted = false;
    for _ in 0..900 {
        run_fixed_tick(&mut app);
        if agent(&app, enemy).memory().current_belief().source == MemorySource::Visual {
            spotted = true;
            break;
        }
    }
    assert!(spotted, "agent never regained sight of the shooter");
    assert_ne!(position(&app, enemy), Vec2::ZERO);
}

#[test]
fn test_alerted_ally_pulls_squadmate_into_pursuit() {
    let mut app = create_headless_app(3);
    spawn_player(&mut app, Vec2::new(300.0, 0.0));

    let spotter = spawn_agent(app.world_mut(), Vec2::ZERO, 1, TacticalConfig::default(), Vec::new());
    let squadmate = spawn_agent(app.world_mut(), Vec2::new(0.0, -200.0), 1, TacticalConfig::default(), Vec::new());
    app.world_mut().entity_mut(squadmate).insert(AimDirection(Vec2::Y));

    run_fixed_tick(&mut app);
    assert_eq!(agent(&app, spotter).state().kind(), StateKind::Combat);
    assert_eq!(agent(&app, squadmate).state().kind(), StateKind::Idle);

    // союзник виден, его belief передаётся; собственные выстрелы фракции не стимул
    run_fixed_tick(&mut app);
    let controller = agent(&app, squadmate);
    assert_eq!(controller.state().kind(), StateKind::Pursuing);
    let belief = controller.memory().current_belief();
    assert_eq!(belief.source, MemorySource::AllyAlert);
    assert_eq!(belief.last_known_position, Vec2::new(300.0, 0.0));
}

#[test]
fn test_lethal_hit_kills_agent() {
    let mut app = create_headless_app(4);
    let player = spawn_player(&mut app, Vec2::new(0.0, 300.0));
    let enemy = spawn_agent(app.world_mut(), Vec2::ZERO, 1, TacticalConfig::default(), Vec::new());

    app.world_mut().send_event(HitLanded {
        attacker: Some(player),
        target: enemy,
        damage: 1000,
    });
    run_fixed_tick(&mut app);

    assert!(app.world().get::<Dead>(enemy).is_some());
    assert_eq!(agent(&app, enemy).state().kind(), StateKind::Dead);
    assert_eq!(app.world().resource::<Events<EntityDied>>().len(), 1);

    // мертвый агент больше не реагирует
    player_gunshot(&mut app, player, Vec2::new(0.0, 300.0));
    for _ in 0..30 {
        run_fixed_tick(&mut app);
    }
    assert_eq!(agent(&app, enemy).state().kind(), StateKind::Dead);
    assert_eq!(position(&app, enemy), Vec2::ZERO);
}

#[test]
fn test_non_lethal_hit_turns_agent_toward_attacker() {
    let mut app = create_headless_app(5);
    let player = spawn_player(&mut app, Vec2::new(0.0, 300.0));
    let enemy = spawn_agent(app.world_mut(), Vec2::ZERO, 1, TacticalConfig::default(), Vec::new());

    app.world_mut().send_event(HitLanded {
        attacker: Some(player),
        target: enemy,
        damage: 5,
    });
    run_fixed_tick(&mut app);

    let aim = app.world().get::<AimDirection>(enemy).expect("aim");
    assert!((aim.0 - Vec2::Y).length() < 1e-4);
}

#[test]
fn test_event_buffers_do_not_grow_across_ticks() {
    let mut app = create_headless_app(6);
    let origin = Vec2::new(0.0, 300.0);
    let player = spawn_player(&mut app, origin);

    for _ in 0..600 {
        player_gunshot(&mut app, player, origin);
        run_fixed_tick(&mut app);
    }

    // Текущий тик + предыдущий, старше не держим
    assert!(app.world().resource::<Events<WeaponFireIntent>>().len() <= 2);
    assert!(app.world().resource::<Events<SoundEmitted>>().len() <= 2);
}
