//! Answer Service Integration
//!
//! This module provides access to the question-answering service through a
//! common trait, so the session logic can run against the real HTTP service or
//! a scripted stand-in.
//!
//! # Usage
//!
//! ```ignore
//! use docent_core::backend::{AnswerBackend, HttpBackend};
//! use docent_core::{AskRequest, ServerSettings};
//! use tokio_util::sync::CancellationToken;
//!
//! let backend = HttpBackend::from_settings(&ServerSettings::default())?;
//! let events = backend
//!     .ask_streaming(&AskRequest::new("What is X?"), CancellationToken::new())
//!     .await?;
//! ```

mod http;
mod traits;

pub use http::HttpBackend;
pub use traits::{AnswerBackend, EventStream};
