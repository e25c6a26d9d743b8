//! Debug snapshot агента (JSON для оверлеев и логов)

use serde::Serialize;

use super::fsm::StateMachine;
use super::awareness::GrenadeAwareness;
use super::state::{StateKind, TransitionRecord};
use crate::components::AgentId;
use crate::memory::{MemorySource, MemoryStore};
use crate::planner::{ActionKind, GoalKind};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemorySnapshot {
    pub position: [f32; 2],
    pub confidence: f32,
    pub source: MemorySource,
    pub timestamp: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanSnapshot {
    pub goal: GoalKind,
    pub steps: Vec<ActionKind>,
    pub cursor: usize,
    pub cost: f32,
}

/// {state, memory, plan, last transition} одного агента
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSnapshot {
    pub agent: u64,
    pub state: StateKind,
    pub memory: MemorySnapshot,
    pub plan: Option<PlanSnapshot>,
    pub last_transition: Option<TransitionRecord>,
    pub plan_error: Option<String>,
    pub known_grenades: Vec<u64>,
}

impl AgentSnapshot {
    pub fn capture(
        id: AgentId,
        machine: &StateMachine,
        memory: &MemoryStore,
        awareness: &GrenadeAwareness,
    ) -> Self {
        let belief = memory.current_belief();
        Self {
            agent: id.0,
            state: machine.kind(),
            memory: MemorySnapshot {
                position: belief.last_known_position.to_array(),
                confidence: belief.confidence,
                source: belief.source,
                timestamp: belief.timestamp,
            },
            plan: machine.plan().map(|active| PlanSnapshot {
                goal: active.plan.goal,
                steps: active.plan.steps.clone(),
                cursor: active.cursor,
                cost: active.plan.cost,
            }),
            last_transition: machine.last_transition(),
            plan_error: machine.last_plan_error().map(ToString::to_string),
            known_grenades: awareness.known().map(|id| id.0).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
