//! Goal-oriented action planner
//!
//! Планировщик выбирает *какую* capability вызвать дальше, state machine решает
//! *как* многотиковое поведение разворачивается. План никогда не мутируется:
//! при инвалидации запрашивается новый.

pub mod catalog;
pub mod facts;
pub mod goals;
pub mod search;

// Tests (separate files with _tests suffix)
#[cfg(test)]
mod planner_tests;

pub use catalog::{ActionCatalog, ActionDef, ActionKind, CatalogError, DISABLED_COST, MIN_ACTION_COST};
pub use facts::{Fact, FactValue, Requirement, WorldStateFacts};
pub use goals::{select_goal, Goal, GoalKind};
pub use search::{ActionPlanner, NoPlan, Plan};
