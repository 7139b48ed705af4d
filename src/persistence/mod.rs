//! Snapshot persistence: serialization, gateway and incremental diffs

pub mod diff;
pub mod gateway;
pub mod serializer;

pub use diff::{BaseStateDiff, BaseStateDiffCalculator};
pub use gateway::SnapshotGateway;
pub use serializer::WorldSerializer;
