//! Target memory: что агент думает о позиции цели

pub mod store;


pub use store::{Memory, MemorySource, MemoryStore};
