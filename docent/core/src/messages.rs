//! Wire Messages
//!
//! Types exchanged with the answer service: the outbound question payload,
//! the citation records embedded in the answer stream, and the error body
//! returned alongside non-success statuses.

use serde::{Deserialize, Serialize};

/// Who authored a conversation message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The person asking
    User,
    /// The answer service
    Assistant,
}

/// One entry of the history sent along with a question
///
/// Built from completed turns; never mutated after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Who sent this message
    pub role: MessageRole,
    /// Message content
    pub content: String,
}

impl ConversationMessage {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// A citation backing part of an answer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceReference {
    /// Title of the document the chunk came from
    pub document_title: String,
    /// The cited text
    pub chunk_text: String,
    /// Retrieval relevance in `[0, 1]`
    pub relevance_score: f64,
    /// Unique chunk identifier
    pub chunk_id: String,
}

impl SourceReference {
    /// Whether the relevance score is a finite number in `[0, 1]`
    #[must_use]
    pub fn has_valid_score(&self) -> bool {
        self.relevance_score.is_finite() && (0.0..=1.0).contains(&self.relevance_score)
    }
}

/// Body of the streaming ask request
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AskRequest {
    /// The question text
    pub question: String,
    /// Prior turns, flattened into user/assistant pairs
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<ConversationMessage>,
}

impl AskRequest {
    /// Create a request with no history
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            history: Vec::new(),
        }
    }

    /// Attach conversation history
    #[must_use]
    pub fn with_history(mut self, history: Vec<ConversationMessage>) -> Self {
        self.history = history;
        self
    }
}

/// Error body the service sends with non-success statuses
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    /// Either a plain message or a list of validation issues
    #[serde(default)]
    pub detail: Option<ErrorDetail>,
}

/// Shape of the `detail` field
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    /// `{"detail": "..."}`
    Message(String),
    /// `{"detail": [{"msg": "...", "loc": [...]}]}`
    Validation(Vec<ValidationIssue>),
    /// Anything else
    Other(serde_json::Value),
}

/// One request-validation failure
#[derive(Debug, Deserialize)]
pub struct ValidationIssue {
    /// Human-readable message
    pub msg: String,
    /// Where in the request the problem is
    #[serde(default)]
    pub loc: Vec<serde_json::Value>,
}

impl ApiErrorBody {
    /// Flatten the detail into one message
    #[must_use]
    pub fn message(&self) -> String {
        match &self.detail {
            Some(ErrorDetail::Message(message)) => message.clone(),
            Some(ErrorDetail::Validation(issues)) => issues
                .iter()
                .map(|issue| issue.msg.as_str())
                .collect::<Vec<_>>()
                .join("; "),
            Some(ErrorDetail::Other(_)) | None => "An unexpected error occurred".to_string(),
        }
    }
}

/// Message for a failed response, given its status and raw body
///
/// Falls back to `Request failed (<status>)` when the body is missing or not JSON.
#[must_use]
pub fn error_message(status: u16, body: Option<&[u8]>) -> String {
    body.and_then(|bytes| serde_json::from_slice::<ApiErrorBody>(bytes).ok())
        .map_or_else(|| format!("Request failed ({status})"), |parsed| parsed.message())
}
