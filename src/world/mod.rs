//! World snapshot model, canonical ordering and validation

pub mod data;
pub mod normalize;
pub mod validate;

pub use data::WorldState;
pub use normalize::normalize;
pub use validate::{ValidationReport, WorldValidator};
