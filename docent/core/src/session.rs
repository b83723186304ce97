//! Ask Session
//!
//! The session owns the conversation and runs one question at a time against
//! an [`AnswerBackend`]. Every state change is published to an observer as a
//! [`ConversationSnapshot`] over an mpsc channel, so a surface can render the
//! answer as it streams without sharing any state with the session.
//!
//! # Lifecycle of a question
//!
//! ```text
//! Idle ──► Requesting ──► Streaming ──► Completed
//!              │              │
//!              └──────┬───────┘
//!                     ├──► Failed   (turn rolled back, error published)
//!                     └──► Aborted  (turn rolled back, nothing reported)
//! ```

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::backend::AnswerBackend;
use crate::cancel::{CancellationController, TurnPhase};
use crate::config::SessionSettings;
use crate::conversation::ConversationLog;
use crate::error::AskError;
use crate::messages::AskRequest;
use crate::turn::Turn;

/// Immutable view of the conversation, published after every change
#[derive(Clone, Debug, PartialEq)]
pub struct ConversationSnapshot {
    /// All turns, oldest first; the last one may be pending
    pub turns: Vec<Turn>,
    /// Phase of the current or most recent question
    pub phase: TurnPhase,
    /// User-facing message of the last failure, if the last question failed
    pub error: Option<String>,
}

impl ConversationSnapshot {
    /// Whether an answer is still streaming
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.turns.last().is_some_and(|turn| turn.pending)
    }

    /// The pending turn, if any
    #[must_use]
    pub fn pending_turn(&self) -> Option<&Turn> {
        self.turns.last().filter(|turn| turn.pending)
    }
}

/// A conversation with the answer service
pub struct AskSession<B: AnswerBackend> {
    /// Transport to the answer service
    backend: Arc<B>,
    /// Question limits
    settings: SessionSettings,
    /// Turns so far
    log: ConversationLog,
    /// Abort handle for the in-flight question
    canceller: CancellationController,
    /// Phase of the current or most recent question
    phase: TurnPhase,
    /// Message of the last failure
    error: Option<String>,
    /// Channel to the observing surface
    tx: mpsc::Sender<ConversationSnapshot>,
}

impl<B: AnswerBackend> AskSession<B> {
    /// Create a new session
    pub fn new(backend: B, settings: SessionSettings, tx: mpsc::Sender<ConversationSnapshot>) -> Self {
        Self {
            backend: Arc::new(backend),
            settings,
            log: ConversationLog::new(),
            canceller: CancellationController::new(),
            phase: TurnPhase::Idle,
            error: None,
            tx,
        }
    }

    /// Ask a question and stream its answer into the conversation
    ///
    /// Returns the completed turn. Snapshots are published when the turn is
    /// created, after every decoded event, and when the question ends.
    ///
    /// # Errors
    ///
    /// - [`AskError::InvalidQuestion`] if the text is empty or too long
    /// - [`AskError::InvalidState`] if the turn vanished from the log while streaming
    /// - [`AskError::Transport`] or [`AskError::Decode`] if the answer failed
    /// - [`AskError::Aborted`] if the question was aborted through
    ///   [`Self::canceller`]
    ///
    /// The turn is removed from the log in the last two cases. If a previous
    /// `ask` future was dropped before finishing, its turn is rolled back here.
    pub async fn ask(&mut self, question: &str) -> Result<Turn, AskError> {
        let question = self.validate_question(question)?;
        self.recover_abandoned_turn();

        let (index, history) = self.log.begin_turn(question.clone())?;
        let token = self.canceller.begin();
        self.phase = TurnPhase::Requesting;
        self.error = None;
        self.publish().await;

        tracing::info!(
            index,
            history = history.len(),
            backend = self.backend.name(),
            "Asking question"
        );

        let request = AskRequest::new(question).with_history(history);
        let result = self.stream_answer(index, &request, token).await;
        self.canceller.finish();

        match result {
            Ok(()) => {
                let turn = self.log.complete_turn(index).cloned().ok_or_else(|| {
                    AskError::InvalidState(format!("turn {index} vanished while streaming"))
                })?;
                self.phase = TurnPhase::Completed;
                self.publish().await;

                tracing::info!(
                    index,
                    answer_len = turn.answer.len(),
                    sources = turn.sources.len(),
                    "Answer complete"
                );
                Ok(turn)
            }
            Err(e) => {
                self.log.rollback_turn(index);
                if e.is_aborted() {
                    self.phase = TurnPhase::Aborted;
                    tracing::info!(index, "Question aborted");
                } else {
                    self.phase = TurnPhase::Failed;
                    self.error = Some(e.user_message());
                    tracing::warn!(index, error = %e, "Question failed");
                }
                self.publish().await;
                Err(e)
            }
        }
    }

    /// Roll back a turn left pending by an `ask` future that was dropped
    ///
    /// `ask` holds `&mut self` until it returns, so a pending turn seen here
    /// has no live question behind it.
    fn recover_abandoned_turn(&mut self) {
        if let Some(index) = self.log.pending_index() {
            self.canceller.abort();
            self.log.rollback_turn(index);
            self.phase = TurnPhase::Aborted;
            tracing::warn!(index, "Rolled back turn abandoned by a dropped question");
        }
    }

    /// Open the answer stream and fold every event into the pending turn
    async fn stream_answer(
        &mut self,
        index: usize,
        request: &AskRequest,
        token: CancellationToken,
    ) -> Result<(), AskError> {
        let backend = Arc::clone(&self.backend);
        let mut events = tokio::select! {
            biased;
            () = token.cancelled() => return Err(AskError::Aborted),
            result = backend.ask_streaming(request, token.clone()) => result?,
        };

        loop {
            let next = tokio::select! {
                biased;
                () = token.cancelled() => return Err(AskError::Aborted),
                next = events.next() => next,
            };

            let Some(event) = next else {
                return Ok(());
            };
            let event = event?;

            if self.phase == TurnPhase::Requesting {
                self.phase = TurnPhase::Streaming;
            }
            self.log.update_turn(index, event);
            self.publish().await;
        }
    }

    /// Abort any in-flight question and forget the conversation
    pub async fn clear(&mut self) {
        self.canceller.abort();
        self.log.clear();
        self.phase = TurnPhase::Idle;
        self.error = None;
        self.publish().await;
        tracing::debug!("Conversation cleared");
    }

    /// Handle for aborting the in-flight question from another task
    #[must_use]
    pub fn canceller(&self) -> CancellationController {
        self.canceller.clone()
    }

    /// Current state of the conversation
    #[must_use]
    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            turns: self.log.snapshot(),
            phase: self.phase,
            error: self.error.clone(),
        }
    }

    /// Phase of the current or most recent question
    #[must_use]
    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// The conversation log
    #[must_use]
    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    /// The backend this session talks to
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Trim and length-check a question
    fn validate_question(&self, question: &str) -> Result<String, AskError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AskError::InvalidQuestion(
                "Question text cannot be empty".to_string(),
            ));
        }
        let max = self.settings.max_question_length;
        if question.chars().count() > max {
            return Err(AskError::InvalidQuestion(format!(
                "Question text exceeds maximum length of {max} characters"
            )));
        }
        Ok(question.to_string())
    }

    /// Send the current snapshot to the observer
    async fn publish(&self) {
        if let Err(e) = self.tx.send(self.snapshot()).await {
            tracing::warn!("Failed to publish conversation snapshot: {}", e);
        }
    }
}
