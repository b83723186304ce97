//! HTTP Backend Implementation
//!
//! Talks to the answer service over plain HTTP:
//! - `POST <ask_path>` - ask a question, answer streamed as NDJSON
//! - `GET <health_path>` - liveness probe
//!
//! Only a connect timeout is applied; an answer may legitimately stream for a
//! long time, so there is no whole-request deadline.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use super::traits::{AnswerBackend, EventStream};
use crate::config::ServerSettings;
use crate::error::AskError;
use crate::messages::{error_message, AskRequest};
use crate::streaming::{abortable, decode_stream};

/// Timeout for the health probe
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for the answer service
#[derive(Clone, Debug)]
pub struct HttpBackend {
    /// Service base URL, without trailing slash
    base_url: String,
    /// Path of the streaming ask endpoint
    ask_path: String,
    /// Path of the health endpoint
    health_path: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpBackend {
    /// Create a backend from server settings
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn from_settings(settings: &ServerSettings) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            ask_path: settings.ask_path.clone(),
            health_path: settings.health_path.clone(),
            http_client,
        })
    }

    /// Get the base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the ask endpoint URL
    fn ask_url(&self) -> String {
        format!("{}{}", self.base_url, self.ask_path)
    }

    /// Get the health endpoint URL
    fn health_url(&self) -> String {
        format!("{}{}", self.base_url, self.health_path)
    }
}

#[async_trait]
impl AnswerBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "HTTP"
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(self.health_url())
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "Health check failed");
                false
            }
        }
    }

    async fn ask_streaming(
        &self,
        request: &AskRequest,
        cancel: CancellationToken,
    ) -> Result<EventStream, AskError> {
        let url = self.ask_url();
        tracing::debug!(url = %url, history = request.history.len(), "Sending question");

        let send = self.http_client.post(&url).json(request).send();
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AskError::Aborted),
            result = send => result.map_err(|e| AskError::transport(None, e.to_string()))?,
        };

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(AskError::Aborted),
                body = response.bytes() => body.ok(),
            };
            let message = error_message(status, body.as_deref());
            tracing::warn!(status, message = %message, "Answer service rejected question");
            return Err(AskError::transport(Some(status), message));
        }

        tracing::debug!(status, "Answer stream opened");

        let bytes = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| AskError::transport(Some(status), e.to_string())));

        Ok(abortable(Box::pin(decode_stream(bytes)), cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(base_url: &str) -> ServerSettings {
        ServerSettings {
            base_url: base_url.to_string(),
            ..ServerSettings::default()
        }
    }

    #[test]
    fn test_http_backend_creation() {
        let backend = HttpBackend::from_settings(&settings("http://localhost:8000/api/")).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8000/api");
        assert_eq!(backend.ask_url(), "http://localhost:8000/api/ask/stream");
        assert_eq!(backend.health_url(), "http://localhost:8000/api/health");
        assert_eq!(backend.name(), "HTTP");
    }

    #[tokio::test]
    async fn test_cancelled_before_send_is_aborted() {
        // Port 9 (discard) is never contacted: cancellation wins the biased select.
        let backend = HttpBackend::from_settings(&settings("http://127.0.0.1:9")).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = backend
            .ask_streaming(&AskRequest::new("What is X?"), cancel)
            .await;
        assert!(matches!(result, Err(AskError::Aborted)));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        // Bind then drop a listener so the port is very likely closed.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let backend =
            HttpBackend::from_settings(&settings(&format!("http://127.0.0.1:{port}"))).unwrap();

        let result = backend
            .ask_streaming(&AskRequest::new("What is X?"), CancellationToken::new())
            .await;
        assert!(matches!(result, Err(AskError::Transport { status: None, .. })));
        assert!(!backend.health_check().await);
    }
}
