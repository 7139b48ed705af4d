//! Tick scheduling and overworld simulation phases

pub mod overworld;
pub mod scheduler;

pub use scheduler::{SystemId, TickContext, TickScheduler, TickSystem};
