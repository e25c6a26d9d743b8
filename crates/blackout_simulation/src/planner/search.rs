//! Forward A* по каталогу действий
//!
//! g = сумма cost, h = число невыполненных требований цели.
//! Порядок frontier: (f, число действий, индексы каталога лексикографически),
//! так что среди планов равной стоимости выигрывает более короткий, затем объявленный раньше.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use thiserror::Error;

use super::catalog::{ActionCatalog, ActionKind};
use super::facts::WorldStateFacts;
use super::goals::{Goal, GoalKind};
use crate::config::PlannerConfig;

/// Упорядоченная последовательность действий под цель (заменяется целиком, не мутируется)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub goal: GoalKind,
    pub steps: Vec<ActionKind>,
    pub cost: f32,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Поиск не нашёл плана (не фатально: state machine продолжает default поведение)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no plan for {goal:?} after {expanded} expansions")]
pub struct NoPlan {
    pub goal: GoalKind,
    pub expanded: usize,
}

#[derive(Debug, Clone)]
struct Node {
    f: f32,
    g: f32,
    path: Vec<usize>,
    facts: WorldStateFacts,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Node {}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap = max-heap, разворачиваем: меньший ключ выше
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.path.len().cmp(&self.path.len()))
            .then_with(|| other.path.cmp(&self.path))
    }
}

/// Goal-directed планировщик
#[derive(Debug, Clone, Default)]
pub struct ActionPlanner {
    pub catalog: ActionCatalog,
    pub config: PlannerConfig,
}

impl ActionPlanner {
    pub fn new(catalog: ActionCatalog, config: PlannerConfig) -> Self {
        Self { catalog, config }
    }

    pub fn plan(&self, facts: &WorldStateFacts, goal: &Goal) -> Result<Plan, NoPlan> {
        let actions = self.catalog.actions();
        let mut frontier = BinaryHeap::new();
        let mut closed = HashSet::new();
        let mut expanded = 0usize;

        frontier.push(Node {
            f: facts.unsatisfied_count(&goal.requirements) as f32,
            g: 0.0,
            path: Vec::new(),
            facts: facts.clone(),
        });

        while let Some(node) = frontier.pop() {
            if goal.is_satisfied(&node.facts) {
                return Ok(Plan {
                    goal: goal.kind,
                    steps: node.path.iter().map(|&index| actions[index].kind).collect(),
                    cost: node.g,
                });
            }

            if !closed.insert(node.facts.key()) {
                continue;
            }
            expanded += 1;
            if expanded > self.config.max_expansions {
                break;
            }
            if node.path.len() >= self.config.max_depth {
                continue;
            }

            for (index, action) in actions.iter().enumerate() {
                if action.is_disabled() || !node.facts.satisfies(&action.preconditions) {
                    continue;
                }
                let next = node.facts.apply(&action.effects);
                if next == node.facts {
                    continue;
                }

                let g = node.g + action.cost;
                let mut path = node.path.clone();
                path.push(index);
                frontier.push(Node {
                    f: g + next.unsatisfied_count(&goal.requirements) as f32,
                    g,
                    path,
                    facts: next,
                });
            }
        }

        Err(NoPlan {
            goal: goal.kind,
            expanded,
        })
    }
}
