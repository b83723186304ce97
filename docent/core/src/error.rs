//! Ask Errors
//!
//! Everything that can end a question early. Transport and decode failures
//! are surfaced to the user; an operator-initiated abort is not.

use thiserror::Error;

/// Errors produced while asking a question
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AskError {
    /// The service answered with a non-success status, or the connection failed
    ///
    /// Displays as the bare message so it can be shown to the user verbatim.
    #[error("{message}")]
    Transport {
        /// HTTP status, if a response was received at all
        status: Option<u16>,
        /// Human-readable description
        message: String,
    },

    /// A line of the answer stream could not be parsed
    #[error("Malformed answer stream: {0}")]
    Decode(String),

    /// The question was cancelled on purpose
    #[error("Question aborted")]
    Aborted,

    /// The operation is not allowed in the current conversation state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The question text was rejected before anything was sent
    #[error("{0}")]
    InvalidQuestion(String),
}

impl AskError {
    /// Build a transport error
    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: message.into(),
        }
    }

    /// Whether this error came from a deliberate cancellation
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// Whether this error ends a turn that was already in the log
    ///
    /// Rejections (`InvalidState`, `InvalidQuestion`) happen before a turn
    /// exists and leave the log untouched.
    #[must_use]
    pub fn is_turn_failure(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Decode(_) | Self::Aborted
        )
    }

    /// HTTP status attached to the error, if any
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }

    /// Message suitable for showing to the user
    #[must_use]
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}
