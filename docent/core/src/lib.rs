//! Docent Core - Streaming Conversation Engine
//!
//! This crate implements the client side of a question-answering service that
//! streams its answers as newline-delimited JSON records. It knows nothing about
//! terminals or any other UI: surfaces drive an [`AskSession`] and render the
//! [`ConversationSnapshot`]s it publishes.
//!
//! # Architecture
//!
//! ```text
//!   question ──► AskSession ──────────────► AnswerBackend (HTTP POST)
//!                  │   ▲                          │
//!                  │   │ StreamEvent              │ bytes
//!                  │   └──────── decode_stream ◄──┘
//!                  ▼
//!           ConversationLog ──► Turn::apply
//!                  │
//!                  └──► ConversationSnapshot ──► surface (mpsc)
//! ```
//!
//! # Key Types
//!
//! - [`AskSession`]: Owns the conversation and runs one question at a time
//! - [`ConversationLog`]: Ordered turns plus the outbound history derived from them
//! - [`Turn`]: One question and its progressively accumulated answer
//! - [`StreamEvent`]: A decoded line of the answer stream
//! - [`AnswerBackend`]: Transport seam, implemented over HTTP by [`HttpBackend`]
//! - [`CancellationController`]: Aborts the in-flight question from anywhere
//!
//! # Quick Start
//!
//! ```ignore
//! use docent_core::{load_config, AskSession, HttpBackend};
//! use tokio::sync::mpsc;
//!
//! let config = load_config()?;
//! let backend = HttpBackend::from_settings(&config.server)?;
//! let (tx, mut rx) = mpsc::channel(config.session.snapshot_capacity);
//! let mut session = AskSession::new(backend, config.session.clone(), tx);
//!
//! tokio::spawn(async move {
//!     while let Some(snapshot) = rx.recv().await {
//!         // Render snapshot.turns
//!     }
//! });
//!
//! let turn = session.ask("What is X?").await?;
//! println!("{}", turn.answer);
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod cancel;
pub mod config;
pub mod conversation;
pub mod error;
pub mod messages;
pub mod session;
pub mod streaming;
pub mod turn;

// Re-exports for convenience
pub use backend::{AnswerBackend, EventStream, HttpBackend};
pub use cancel::{CancellationController, TurnPhase};
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, DocentConfig, DocentToml, ServerSettings, SessionSettings,
};
pub use conversation::ConversationLog;
pub use error::AskError;
pub use messages::{AskRequest, ConversationMessage, MessageRole, SourceReference};
pub use session::{AskSession, ConversationSnapshot};
pub use streaming::{decode_stream, LineDecoder, StreamEvent};
pub use turn::Turn;
