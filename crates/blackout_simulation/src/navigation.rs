//! Navigation port: "найди проходимый маршрут"
//!
//! Pathfinding/navmesh внешний. AI потребляет его как oracle через [`NavigationPort`].
//! Асинхронный pathfinding отвечает `NavError::Pending`, AI трактует это как Unreachable
//! до следующего тика (агент не ждёт).
//!
//! Headless реализации:
//! - [`OpenFieldNavigator`]: всегда прямой маршрут
//! - [`VisibilityGraphNavigator`]: граф видимости по концам стен + запретные зоны

use bevy::prelude::*;
use std::collections::BinaryHeap;
use std::cmp::Ordering;
use thiserror::Error;

use crate::geometry::{LineOfSight, WallMap};

/// Почему маршрута нет
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NavError {
    #[error("no walkable route")]
    Unreachable,
    #[error("route request still pending")]
    Pending,
}

/// Проходимый маршрут (последний waypoint = цель)
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub waypoints: Vec<Vec2>,
}

impl Route {
    pub fn direct(to: Vec2) -> Self {
        Self { waypoints: vec![to] }
    }

    pub fn next_waypoint(&self) -> Option<Vec2> {
        self.waypoints.first().copied()
    }

    pub fn destination(&self) -> Option<Vec2> {
        self.waypoints.last().copied()
    }

    /// Длина маршрута от стартовой точки
    pub fn length_from(&self, start: Vec2) -> f32 {
        let mut length = 0.0;
        let mut cursor = start;
        for waypoint in &self.waypoints {
            length += cursor.distance(*waypoint);
            cursor = *waypoint;
        }
        length
    }
}

/// External pathfinding oracle
pub trait NavigationPort {
    fn route(&self, from: Vec2, to: Vec2) -> Result<Route, NavError>;
}

/// ECS resource: текущий navigation backend
#[derive(Resource)]
pub struct Navigation {
    pub port: Box<dyn NavigationPort + Send + Sync>,
}

impl Navigation {
    pub fn new(port: impl NavigationPort + Send + Sync + 'static) -> Self {
        Self { port: Box::new(port) }
    }
}

impl Default for Navigation {
    fn default() -> Self {
        Self::new(OpenFieldNavigator)
    }
}

/// Всегда прямой маршрут (арена без препятствий)
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenFieldNavigator;

impl NavigationPort for OpenFieldNavigator {
    fn route(&self, _from: Vec2, to: Vec2) -> Result<Route, NavError> {
        Ok(Route::direct(to))
    }
}

/// Непроходимая область (яма, закрытая комната)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockedZone {
    pub min: Vec2,
    pub max: Vec2,
}

impl BlockedZone {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    /// Пересекает ли отрезок прямоугольник зоны (slab test)
    pub fn intersects_segment(&self, from: Vec2, to: Vec2) -> bool {
        let delta = to - from;
        let mut enter = 0.0_f32;
        let mut exit = 1.0_f32;

        for (origin, step, low, high) in [
            (from.x, delta.x, self.min.x, self.max.x),
            (from.y, delta.y, self.min.y, self.max.y),
        ] {
            if step.abs() < f32::EPSILON {
                if origin < low || origin > high {
                    return false;
                }
                continue;
            }
            let t1 = (low - origin) / step;
            let t2 = (high - origin) / step;
            enter = enter.max(t1.min(t2));
            exit = exit.min(t1.max(t2));
            if enter > exit {
                return false;
            }
        }
        true
    }

    /// Углы зоны, вынесенные наружу на `clearance`
    fn corners(&self, clearance: f32) -> [Vec2; 4] {
        let min = self.min - Vec2::splat(clearance);
        let max = self.max + Vec2::splat(clearance);
        [min, Vec2::new(max.x, min.y), max, Vec2::new(min.x, max.y)]
    }
}

/// Граф видимости: узлы = концы стен и углы запретных зон, вынесенные наружу на `clearance`
///
/// Маршрут ищется Dijkstra'ой по рёбрам с чистой линией видимости,
/// ребро через запретную зону не проходит.
#[derive(Debug, Clone, Default)]
pub struct VisibilityGraphNavigator {
    pub walls: WallMap,
    pub blocked: Vec<BlockedZone>,
    pub clearance: f32,
    nodes: Vec<Vec2>,
}

impl VisibilityGraphNavigator {
    pub fn new(walls: WallMap, clearance: f32) -> Self {
        let mut navigator = Self {
            walls,
            blocked: Vec::new(),
            clearance,
            nodes: Vec::new(),
        };
        navigator.rebuild_nodes();
        navigator
    }

    pub fn with_blocked_zone(mut self, zone: BlockedZone) -> Self {
        self.blocked.push(zone);
        self.rebuild_nodes();
        self
    }

    fn rebuild_nodes(&mut self) {
        let mut nodes = Vec::new();
        for wall in &self.walls.walls {
            let along = (wall.end - wall.start).normalize_or_zero();
            let normal = along.perp();
            for (point, outward) in [(wall.start, -along), (wall.end, along)] {
                for side in [normal, -normal] {
                    let candidate = point + (outward + side) * self.clearance;
                    if !self.is_blocked(candidate) {
                        nodes.push(candidate);
                    }
                }
            }
        }
        for zone in &self.blocked {
            for corner in zone.corners(self.clearance) {
                if !self.is_blocked(corner) {
                    nodes.push(corner);
                }
            }
        }
        self.nodes = nodes;
    }

    fn is_blocked(&self, point: Vec2) -> bool {
        self.blocked.iter().any(|zone| zone.contains(point))
    }

    fn edge_clear(&self, from: Vec2, to: Vec2) -> bool {
        self.walls.is_clear(from, to) && !self.blocked.iter().any(|zone| zone.intersects_segment(from, to))
    }
}

#[derive(Debug, Clone, Copy)]
struct Frontier {
    cost: f32,
    node: usize,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        // min-heap по стоимости, затем по индексу узла
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl NavigationPort for VisibilityGraphNavigator {
    fn route(&self, from: Vec2, to: Vec2) -> Result<Route, NavError> {
        if self.is_blocked(to) {
            return Err(NavError::Unreachable);
        }
        if self.edge_clear(from, to) {
            return Ok(Route::direct(to));
        }

        // Узлы: 0 = start, 1 = goal, 2.. = углы стен
        let mut points = Vec::with_capacity(self.nodes.len() + 2);
        points.push(from);
        points.push(to);
        points.extend(self.nodes.iter().copied());

        let mut best = vec![f32::INFINITY; points.len()];
        let mut parent: Vec<Option<usize>> = vec![None; points.len()];
        let mut heap = BinaryHeap::new();
        best[0] = 0.0;
        heap.push(Frontier { cost: 0.0, node: 0 });

        while let Some(Frontier { cost, node }) = heap.pop() {
            if node == 1 {
                break;
            }
            if cost > best[node] {
                continue;
            }
            for next in 1..points.len() {
                if next == node || !self.edge_clear(points[node], points[next]) {
                    continue;
                }
                let next_cost = cost + points[node].distance(points[next]);
                if next_cost < best[next] {
                    best[next] = next_cost;
                    parent[next] = Some(node);
                    heap.push(Frontier { cost: next_cost, node: next });
                }
            }
        }

        if !best[1].is_finite() {
            return Err(NavError::Unreachable);
        }

        let mut waypoints = Vec::new();
        let mut cursor = 1;
        while cursor != 0 {
            waypoints.push(points[cursor]);
            match parent[cursor] {
                Some(previous) => cursor = previous,
                None => return Err(NavError::Unreachable),
            }
        }
        waypoints.reverse();
        Ok(Route { waypoints })
    }
}
