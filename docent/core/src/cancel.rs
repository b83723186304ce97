//! Cancellation Control
//!
//! Each in-flight question gets a fresh [`CancellationToken`]. The controller
//! keeps the live one so that any task holding a clone of the controller (a
//! Ctrl-C handler, a UI event loop) can abort the question while the session
//! is blocked on I/O.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Where the current (or most recent) question is in its lifecycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    /// No question has been asked since start or the last clear
    #[default]
    Idle,
    /// Request sent, waiting for the first event
    Requesting,
    /// Events are arriving
    Streaming,
    /// The answer finished normally
    Completed,
    /// The question failed; the turn was rolled back
    Failed,
    /// The question was aborted on purpose; the turn was rolled back
    Aborted,
}

impl TurnPhase {
    /// Whether a question is in flight
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Requesting | Self::Streaming)
    }

    /// Whether the question has reached an end state
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Aborted)
    }
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Requesting => "requesting",
            Self::Streaming => "streaming",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Shared handle for aborting the in-flight question
#[derive(Clone, Debug, Default)]
pub struct CancellationController {
    current: Arc<Mutex<Option<CancellationToken>>>,
}

impl CancellationController {
    /// Create a controller with no live token
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh token for a new question
    ///
    /// Any token still live is cancelled first.
    pub fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        if let Some(previous) = self.current.lock().replace(token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Cancel the live token
    ///
    /// Returns `true` if a question was in flight.
    pub fn abort(&self) -> bool {
        match self.current.lock().take() {
            Some(token) => {
                token.cancel();
                tracing::debug!("Question abort requested");
                true
            }
            None => false,
        }
    }

    /// Retire the live token without cancelling it
    pub fn finish(&self) {
        self.current.lock().take();
    }

    /// Whether a token is live
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.current.lock().is_some()
    }
}
