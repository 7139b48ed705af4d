//! Snapshot gateway
//!
//! Entry point for persisting world snapshots as strings, streams or files,
//! all funneling through [`WorldSerializer`] so every save and load passes
//! normalization.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::core::error::SimResult;
use crate::persistence::serializer::WorldSerializer;
use crate::world::data::WorldState;

pub struct SnapshotGateway;

impl SnapshotGateway {
    pub fn save_to_string(world: &mut WorldState) -> SimResult<String> {
        WorldSerializer::serialize(world)
    }

    pub fn save_to_writer(world: &mut WorldState, writer: &mut impl Write) -> SimResult<()> {
        let json = WorldSerializer::serialize(world)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    pub fn save_to_file(world: &mut WorldState, path: impl AsRef<Path>) -> SimResult<()> {
        let mut file = File::create(path)?;
        Self::save_to_writer(world, &mut file)
    }

    pub fn load_from_string(json: &str) -> SimResult<WorldState> {
        WorldSerializer::deserialize(json)
    }

    pub fn load_from_reader(reader: &mut impl Read) -> SimResult<WorldState> {
        let mut json = String::new();
        reader.read_to_string(&mut json)?;
        WorldSerializer::deserialize(&json)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> SimResult<WorldState> {
        let mut file = File::open(path)?;
        Self::load_from_reader(&mut file)
    }
}
