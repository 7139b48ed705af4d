//! Indirect command ingestion
//!
//! The only sanctioned outside-in mutation path: a presentation layer never
//! touches simulation state directly, it issues commands to this dispatcher,
//! which validates them, keeps a bounded history and announces them on the
//! event bus for whichever core system chooses to consume them.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use crate::core::error::{SimError, SimResult};
use crate::core::events::EventBus;

/// A command issued from outside the simulation core.
#[derive(Debug, Clone, PartialEq)]
pub struct IndirectCommand {
    pub command_type: String,
    pub target_id: Option<String>,
    pub payload: BTreeMap<String, String>,
}

impl IndirectCommand {
    pub fn new(command_type: impl Into<String>) -> Self {
        Self {
            command_type: command_type.into(),
            target_id: None,
            payload: BTreeMap::new(),
        }
    }

    pub fn with_target(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    pub fn with_payload_entry(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }
}

/// Published whenever a command passes validation.
#[derive(Debug, Clone)]
pub struct CommandQueued {
    pub command: IndirectCommand,
}

/// Validating dispatcher with a bounded FIFO history.
pub struct IndirectCommandDispatcher {
    bus: Arc<EventBus>,
    history: VecDeque<IndirectCommand>,
    history_limit: usize,
}

impl IndirectCommandDispatcher {
    pub fn new(bus: Arc<EventBus>, history_limit: usize) -> SimResult<Self> {
        if history_limit == 0 {
            return Err(SimError::InvalidArgument(
                "history_limit must be positive".to_string(),
            ));
        }
        Ok(Self {
            bus,
            history: VecDeque::new(),
            history_limit,
        })
    }

    /// Commands still in the history window, oldest first.
    pub fn recent_commands(&self) -> impl Iterator<Item = &IndirectCommand> {
        self.history.iter()
    }

    /// Validate, record and announce a command.
    pub fn issue(&mut self, command: IndirectCommand) -> SimResult<()> {
        if command.command_type.trim().is_empty() {
            return Err(SimError::InvalidArgument(
                "command_type must be provided".to_string(),
            ));
        }

        self.history.push_back(command.clone());
        if self.history.len() > self.history_limit {
            self.history.pop_front();
        }

        tracing::debug!(command = %command.command_type, "command queued");
        self.bus.publish(CommandQueued { command });
        Ok(())
    }
}
