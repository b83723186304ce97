//! Turn Accumulation
//!
//! A turn is one question plus the answer being streamed back for it. While
//! pending, decoded events are folded into it one at a time; once completed it
//! never changes again.

use serde::Serialize;

use crate::messages::{ConversationMessage, SourceReference};
use crate::streaming::StreamEvent;

/// One question and its (possibly still streaming) answer
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Turn {
    /// The question as submitted
    pub question: String,
    /// Answer text received so far (append-only)
    pub answer: String,
    /// Citations for the answer (replaced wholesale)
    pub sources: Vec<SourceReference>,
    /// Whether the answer is still streaming
    pub pending: bool,
}

impl Turn {
    /// Create a pending turn with an empty answer
    pub fn pending(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: String::new(),
            sources: Vec::new(),
            pending: true,
        }
    }

    /// Fold one decoded event into the turn
    pub fn apply(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::TextDelta { content } => self.answer.push_str(&content),
            StreamEvent::SourcesSet { sources } => self.sources = sources,
        }
    }

    /// Mark the answer as finished
    pub fn complete(&mut self) {
        self.pending = false;
    }

    /// The history entries this turn contributes
    ///
    /// Blank or whitespace-only content is skipped; the service rejects it.
    pub(crate) fn history_messages(&self) -> impl Iterator<Item = ConversationMessage> + '_ {
        let question = (!self.question.trim().is_empty())
            .then(|| ConversationMessage::user(self.question.clone()));
        let answer = (!self.answer.trim().is_empty())
            .then(|| ConversationMessage::assistant(self.answer.clone()));
        question.into_iter().chain(answer)
    }
}
