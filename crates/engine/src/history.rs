use std::collections::VecDeque;
use std::fmt;

use uuid::Uuid;

use crate::error::EngineError;

/// Identifies one entry on the history stacks.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommandId(Uuid);

impl CommandId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CommandId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommandId({})", &self.0.to_string()[..8])
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reversible action against some context `S` (normally a record store).
///
/// Implementations keep whatever they learn from a run (new ids, snapshots)
/// so the opposite direction can use it. A failing run must leave the
/// command able to retry.
pub trait Command<S: ?Sized> {
    fn label(&self) -> &'static str;

    fn forward(&mut self, ctx: &mut S) -> Result<(), EngineError>;

    fn backward(&mut self, ctx: &mut S) -> Result<(), EngineError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    /// On the undo stack: its effect is live.
    Armed,
    /// On the redo stack: its effect has been reversed.
    Reversed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryOutcome {
    Applied {
        command_id: CommandId,
        label: &'static str,
    },
    Empty,
}

#[derive(Debug)]
pub struct HistoryEntry<C> {
    pub command_id: CommandId,
    pub command: C,
}

/// Undo and redo stacks of commands.
pub struct CommandHistory<C> {
    undo_stack: VecDeque<HistoryEntry<C>>,
    redo_stack: VecDeque<HistoryEntry<C>>,
    max_depth: usize,
}

impl<C> CommandHistory<C> {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_depth,
        }
    }

    /// Record a command whose forward action has already run.
    /// Discards everything on the redo stack.
    pub fn push(&mut self, command: C) -> CommandId {
        let command_id = CommandId::new();
        self.undo_stack.push_back(HistoryEntry {
            command_id,
            command,
        });
        // Enforce depth limit by dropping oldest entry
        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
        }
        if !self.redo_stack.is_empty() {
            tracing::debug!(discarded = self.redo_stack.len(), "clearing redo stack");
            self.redo_stack.clear();
        }
        command_id
    }

    /// Reverse the most recent command. The stacks only change when the
    /// backward action succeeds.
    pub fn undo<S: ?Sized>(&mut self, ctx: &mut S) -> Result<HistoryOutcome, EngineError>
    where
        C: Command<S>,
    {
        let Some(entry) = self.undo_stack.back_mut() else {
            return Ok(HistoryOutcome::Empty);
        };
        let label = entry.command.label();
        let command_id = entry.command_id;
        entry.command.backward(ctx)?;

        if let Some(entry) = self.undo_stack.pop_back() {
            self.redo_stack.push_back(entry);
        }
        tracing::debug!(%command_id, label, "undone");
        Ok(HistoryOutcome::Applied { command_id, label })
    }

    /// Re-run the most recently undone command. The stacks only change when
    /// the forward action succeeds.
    pub fn redo<S: ?Sized>(&mut self, ctx: &mut S) -> Result<HistoryOutcome, EngineError>
    where
        C: Command<S>,
    {
        let Some(entry) = self.redo_stack.back_mut() else {
            return Ok(HistoryOutcome::Empty);
        };
        let label = entry.command.label();
        let command_id = entry.command_id;
        entry.command.forward(ctx)?;

        if let Some(entry) = self.redo_stack.pop_back() {
            self.undo_stack.push_back(entry);
        }
        tracing::debug!(%command_id, label, "redone");
        Ok(HistoryOutcome::Applied { command_id, label })
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn state_of(&self, command_id: CommandId) -> Option<CommandState> {
        if self.undo_stack.iter().any(|e| e.command_id == command_id) {
            Some(CommandState::Armed)
        } else if self.redo_stack.iter().any(|e| e.command_id == command_id) {
            Some(CommandState::Reversed)
        } else {
            None
        }
    }

    /// The command `undo` would reverse next.
    pub fn peek_undo(&self) -> Option<&C> {
        self.undo_stack.back().map(|e| &e.command)
    }

    pub fn peek_redo(&self) -> Option<&C> {
        self.redo_stack.back().map(|e| &e.command)
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Adds `delta` to an integer; fails while `fail` is set.
    struct Add {
        delta: i64,
        fail: bool,
    }

    impl Command<i64> for Add {
        fn label(&self) -> &'static str {
            "add"
        }

        fn forward(&mut self, ctx: &mut i64) -> Result<(), EngineError> {
            if self.fail {
                return Err(EngineError::Config("forced".into()));
            }
            *ctx += self.delta;
            Ok(())
        }

        fn backward(&mut self, ctx: &mut i64) -> Result<(), EngineError> {
            if self.fail {
                return Err(EngineError::Config("forced".into()));
            }
            *ctx -= self.delta;
            Ok(())
        }
    }

    fn add(delta: i64) -> Add {
        Add { delta, fail: false }
    }

    #[test]
    fn undo_redo_round_trip() {
        let mut value = 0_i64;
        let mut history = CommandHistory::new(10);
        value += 5;
        let id = history.push(add(5));
        assert_eq!(history.state_of(id), Some(CommandState::Armed));

        let outcome = history.undo(&mut value).unwrap();
        assert_eq!(outcome, HistoryOutcome::Applied { command_id: id, label: "add" });
        assert_eq!(value, 0);
        assert_eq!(history.state_of(id), Some(CommandState::Reversed));

        history.redo(&mut value).unwrap();
        assert_eq!(value, 5);
        assert_eq!(history.state_of(id), Some(CommandState::Armed));
    }

    #[test]
    fn empty_stacks_are_no_ops() {
        let mut value = 3_i64;
        let mut history: CommandHistory<Add> = CommandHistory::new(10);
        assert_eq!(history.undo(&mut value).unwrap(), HistoryOutcome::Empty);
        assert_eq!(history.redo(&mut value).unwrap(), HistoryOutcome::Empty);
        assert_eq!(value, 3);
    }

    #[test]
    fn push_after_undo_discards_redo() {
        let mut value = 0_i64;
        let mut history = CommandHistory::new(10);
        value += 1;
        let first = history.push(add(1));
        history.undo(&mut value).unwrap();
        assert_eq!(history.redo_depth(), 1);

        value += 2;
        history.push(add(2));
        assert_eq!(history.redo_depth(), 0);
        assert_eq!(history.state_of(first), None);
        assert_eq!(history.redo(&mut value).unwrap(), HistoryOutcome::Empty);
        assert_eq!(value, 2);
    }

    #[test]
    fn failed_undo_leaves_stacks_untouched() {
        let mut value = 0_i64;
        let mut history = CommandHistory::new(10);
        let id = history.push(Add { delta: 4, fail: true });
        assert!(history.undo(&mut value).is_err());
        assert_eq!(history.undo_depth(), 1);
        assert_eq!(history.redo_depth(), 0);
        assert_eq!(history.state_of(id), Some(CommandState::Armed));
    }

    #[test]
    fn failed_redo_leaves_stacks_untouched() {
        let mut value = 0_i64;
        let mut history = CommandHistory::new(10);
        value += 4;
        let id = history.push(add(4));
        history.undo(&mut value).unwrap();
        if let Some(entry) = history.redo_stack.back_mut() {
            entry.command.fail = true;
        }
        assert!(history.redo(&mut value).is_err());
        assert_eq!(history.state_of(id), Some(CommandState::Reversed));
        assert_eq!(value, 0);
    }

    #[test]
    fn depth_limit_drops_oldest() {
        let mut history = CommandHistory::new(2);
        let oldest = history.push(add(1));
        history.push(add(2));
        history.push(add(3));
        assert_eq!(history.undo_depth(), 2);
        assert_eq!(history.state_of(oldest), None);
        assert_eq!(history.peek_undo().map(|c| c.delta), Some(3));
    }
}
