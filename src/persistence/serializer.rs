//! JSON serialization for world snapshots
//!
//! Serialization always normalizes first, so logically identical worlds
//! produce byte-identical documents no matter how their collections were
//! built. Deserialization normalizes too: a hand-edited or merged document
//! comes out canonically ordered.

use crate::core::error::{SimError, SimResult};
use crate::world::data::WorldState;
use crate::world::normalize::normalize;

/// Deterministic JSON (de)serializer for [`WorldState`].
pub struct WorldSerializer;

impl WorldSerializer {
    /// Normalize and serialize to pretty-printed JSON.
    pub fn serialize(world: &mut WorldState) -> SimResult<String> {
        normalize(world);
        Ok(serde_json::to_string_pretty(world)?)
    }

    /// Parse a snapshot document and normalize the result.
    pub fn deserialize(json: &str) -> SimResult<WorldState> {
        if json.trim().is_empty() {
            return Err(SimError::InvalidArgument(
                "JSON payload must be provided".to_string(),
            ));
        }
        let mut world: WorldState = serde_json::from_str(json)?;
        normalize(&mut world);
        Ok(world)
    }
}
