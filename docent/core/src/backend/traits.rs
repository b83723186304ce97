//! Answer Backend Traits
//!
//! The transport seam between the conversation engine and the answer service.
//! Implementations own the network details; the session only sees a stream of
//! decoded events.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use tokio_util::sync::CancellationToken;

use crate::error::AskError;
use crate::messages::AskRequest;
use crate::streaming::StreamEvent;

/// Events of one answer, in the order they were decoded
///
/// Ends after the last event or after the first error.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, AskError>> + Send>>;

/// Answer service trait
///
/// Implement this trait to plug a different transport into [`crate::AskSession`].
#[async_trait]
pub trait AnswerBackend: Send + Sync {
    /// Get the backend name (e.g., "HTTP")
    fn name(&self) -> &str;

    /// Check if the service is reachable and healthy
    async fn health_check(&self) -> bool;

    /// Send a question and get its answer as a stream of events
    ///
    /// Fails without producing any event when the service rejects the request.
    /// `cancel` must interrupt both the request and any pending read, surfacing
    /// as [`AskError::Aborted`].
    async fn ask_streaming(
        &self,
        request: &AskRequest,
        cancel: CancellationToken,
    ) -> Result<EventStream, AskError>;
}
