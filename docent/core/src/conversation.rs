//! Conversation Log
//!
//! Ordered record of every turn in the conversation, oldest first.
//!
//! # Invariants
//!
//! - At most one turn is pending, and if one is, it is the last turn.
//! - Only the pending turn is ever mutated. Completed turns are frozen.
//! - A turn that fails or is aborted is removed, never kept as an error record.

use crate::error::AskError;
use crate::messages::ConversationMessage;
use crate::streaming::StreamEvent;
use crate::turn::Turn;

/// The turns of one conversation
#[derive(Clone, Debug, Default)]
pub struct ConversationLog {
    /// Turns in chronological order
    turns: Vec<Turn>,
}

impl ConversationLog {
    /// Create an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new pending turn
    ///
    /// Returns the turn's index along with the history to send with the
    /// question, computed before the new turn is added.
    ///
    /// # Errors
    ///
    /// Returns [`AskError::InvalidState`] if a turn is already pending. The log
    /// is left unchanged.
    pub fn begin_turn(
        &mut self,
        question: impl Into<String>,
    ) -> Result<(usize, Vec<ConversationMessage>), AskError> {
        if let Some(index) = self.pending_index() {
            return Err(AskError::InvalidState(format!(
                "turn {index} is still pending"
            )));
        }

        let history = self.history();
        self.turns.push(Turn::pending(question));
        let index = self.turns.len() - 1;

        tracing::debug!(index, history = history.len(), "Turn started");
        Ok((index, history))
    }

    /// History of every completed turn as flattened user/assistant pairs
    #[must_use]
    pub fn history(&self) -> Vec<ConversationMessage> {
        self.turns
            .iter()
            .filter(|turn| !turn.pending)
            .flat_map(|turn| turn.history_messages())
            .collect()
    }

    /// Apply an event to the pending turn at `index`
    ///
    /// Returns `false` (and does nothing) if `index` is not a pending turn.
    pub fn update_turn(&mut self, index: usize, event: StreamEvent) -> bool {
        match self.turns.get_mut(index) {
            Some(turn) if turn.pending => {
                turn.apply(event);
                true
            }
            _ => {
                tracing::debug!(index, "Ignoring update for a turn that is not pending");
                false
            }
        }
    }

    /// Mark the pending turn at `index` as complete
    pub fn complete_turn(&mut self, index: usize) -> Option<&Turn> {
        let turn = self.turns.get_mut(index).filter(|turn| turn.pending)?;
        turn.complete();
        tracing::debug!(index, answer_len = turn.answer.len(), "Turn completed");
        Some(turn)
    }

    /// Remove the pending turn at `index`
    ///
    /// Completed turns are never removed this way.
    pub fn rollback_turn(&mut self, index: usize) -> Option<Turn> {
        if !self.turns.get(index).is_some_and(|turn| turn.pending) {
            return None;
        }
        tracing::debug!(index, "Turn rolled back");
        Some(self.turns.remove(index))
    }

    /// Remove every turn
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// All turns, oldest first
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Get a turn by index
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Turn> {
        self.turns.get(index)
    }

    /// Number of turns
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the log has no turns
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Index of the pending turn, if any
    #[must_use]
    pub fn pending_index(&self) -> Option<usize> {
        self.turns.iter().rposition(|turn| turn.pending)
    }

    /// Whether a turn is currently pending
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending_index().is_some()
    }

    /// Copy of the turns for publishing
    #[must_use]
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }
}
