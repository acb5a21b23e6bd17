//! Per-extension FIFO of pending commands.
//!
//! The queue itself is not synchronised: it lives inside the extension's
//! state mutex, and the blocking `pop_or_wait` half is implemented by the
//! instance on top of that mutex and its condition variable. The command
//! currently being executed has already been popped, so it is never visible
//! here and never matched by de-duplication.

use std::collections::VecDeque;

use super::command::Command;
use super::error::{ExtensionError, ExtensionResult};

/// Result of a push that may be de-duplicated or filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// An equivalent command was already pending, or the event was filtered out.
    Suppressed,
}

#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: VecDeque<Command>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the tail.
    ///
    /// Storage is reserved up front, so an allocation failure is reported
    /// and leaves the queue untouched.
    pub fn push(&mut self, command: Command) -> ExtensionResult<()> {
        self.pending.try_reserve(1).map_err(|e| {
            ExtensionError::Resource(format!("cannot queue {}: {}", command, e))
        })?;
        self.pending.push_back(command);
        Ok(())
    }

    /// Append unless an equivalent command is already pending.
    pub fn push_unique(&mut self, command: Command) -> ExtensionResult<PushOutcome> {
        if self.pending.iter().any(|queued| queued.duplicates(&command)) {
            return Ok(PushOutcome::Suppressed);
        }
        self.push(command)?;
        Ok(PushOutcome::Queued)
    }

    pub fn pop(&mut self) -> Option<Command> {
        self.pending.pop_front()
    }

    pub fn has_deactivate(&self) -> bool {
        self.pending.iter().any(|c| *c == Command::Deactivate)
    }

    /// Drop every pending command without executing it.
    ///
    /// Returns how many were discarded.
    pub fn drain(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
