//! Docent
//!
//! Terminal client for a question-answering service that streams its answers.
//!
//! # Usage
//!
//! ```bash
//! # Interactive prompt (type /clear to start over, /quit to leave)
//! docent
//!
//! # Ask questions in order, keeping the conversation between them
//! docent "What is X?" "How does it relate to Y?"
//!
//! # Point at another service and list citations
//! docent --base-url http://docs.internal:8000/api --show-sources "What is X?"
//!
//! # With verbose logging
//! RUST_LOG=docent_core=debug docent
//! ```
//!
//! # Environment Variables
//!
//! - `DOCENT_BASE_URL`: Answer service base URL
//! - `DOCENT_CONFIG`: Path to the TOML config file
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)
//!
//! # Signals
//!
//! - SIGINT: Aborts the question being answered; exits when nothing is in flight

mod render;

use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{info, warn};

use docent_core::{
    default_config_path, load_config_from_path, AnswerBackend, AskError, AskSession,
    CancellationController, ConfigOverrides, ConversationSnapshot, HttpBackend,
};

use render::Renderer;

/// Ask questions against a streaming answer service
#[derive(Debug, Parser)]
#[command(name = "docent", version, about)]
struct Args {
    /// Questions to ask in order; starts an interactive prompt when omitted
    question: Vec<String>,

    /// Answer service base URL
    #[arg(long, env = "DOCENT_BASE_URL")]
    base_url: Option<String>,

    /// Path to the TOML config file
    #[arg(long, env = "DOCENT_CONFIG")]
    config: Option<PathBuf>,

    /// Path of the streaming ask endpoint
    #[arg(long)]
    ask_path: Option<String>,

    /// Skip the startup health probe
    #[arg(long)]
    no_health_check: bool,

    /// List cited sources after each answer
    #[arg(long)]
    show_sources: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(ref url) = self.base_url {
            overrides = overrides.with_base_url(url.clone());
        }
        if let Some(ref path) = self.ask_path {
            overrides = overrides.with_ask_path(path.clone());
        }
        overrides
    }
}

/// How a question ended, from the prompt's point of view
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Answered,
    Aborted,
    Failed,
}

type Output = Renderer<io::Stdout, io::Stderr>;

/// Ask one question, rendering snapshots while the answer streams
async fn ask_and_render<B: AnswerBackend>(
    session: &mut AskSession<B>,
    rx: &mut mpsc::Receiver<ConversationSnapshot>,
    renderer: &mut Output,
    question: &str,
) -> anyhow::Result<Outcome> {
    let result = {
        let ask = session.ask(question);
        tokio::pin!(ask);
        loop {
            tokio::select! {
                result = &mut ask => break result,
                Some(snapshot) = rx.recv() => renderer.render(&snapshot)?,
            }
        }
    };
    while let Ok(snapshot) = rx.try_recv() {
        renderer.render(&snapshot)?;
    }

    Ok(match result {
        Ok(_) => Outcome::Answered,
        Err(AskError::Aborted) => Outcome::Aborted,
        Err(e @ (AskError::InvalidQuestion(_) | AskError::InvalidState(_))) => {
            renderer.notice(&e.user_message())?;
            Outcome::Failed
        }
        // Already rendered from the published snapshot
        Err(_) => Outcome::Failed,
    })
}

/// Abort the in-flight question on Ctrl-C, or ask to quit when idle
fn spawn_interrupt_handler(canceller: CancellationController) -> mpsc::Receiver<()> {
    let (quit_tx, quit_rx) = mpsc::channel(1);
    tokio::spawn(async move {
        loop {
            if let Err(e) = signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C");
                break;
            }
            if !canceller.abort() {
                let _ = quit_tx.send(()).await;
                break;
            }
        }
    });
    quit_rx
}

async fn run_interactive<B: AnswerBackend>(
    session: &mut AskSession<B>,
    rx: &mut mpsc::Receiver<ConversationSnapshot>,
    renderer: &mut Output,
    quit_rx: &mut mpsc::Receiver<()>,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        renderer.prompt()?;
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read from stdin")?,
            _ = quit_rx.recv() => None,
        };
        let Some(line) = line else {
            break;
        };

        match line.trim() {
            "" => {}
            "/quit" => break,
            "/clear" => {
                session.clear().await;
                while let Ok(snapshot) = rx.try_recv() {
                    renderer.render(&snapshot)?;
                }
                renderer.notice("(conversation cleared)")?;
            }
            question => {
                ask_and_render(session, rx, renderer, question).await?;
            }
        }
    }

    Ok(())
}

async fn run_questions<B: AnswerBackend>(
    session: &mut AskSession<B>,
    rx: &mut mpsc::Receiver<ConversationSnapshot>,
    renderer: &mut Output,
    quit_rx: &mut mpsc::Receiver<()>,
    questions: &[String],
) -> anyhow::Result<()> {
    for question in questions {
        if quit_rx.try_recv().is_ok() {
            break;
        }
        match ask_and_render(session, rx, renderer, question).await? {
            Outcome::Answered => {}
            Outcome::Aborted => break,
            Outcome::Failed => anyhow::bail!("Question failed: {question}"),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout carries only answers
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("docent=warn,docent_core=warn")),
        )
        .with_writer(io::stderr)
        .with_target(true)
        .init();

    let args = Args::parse();

    if let Some(ref path) = args.config {
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
    }
    let config_path = args.config.clone().or_else(default_config_path);
    let mut config = load_config_from_path(config_path).context("Failed to load configuration")?;
    args.overrides().apply(&mut config);
    config.validate().context("Invalid configuration")?;

    info!(
        base_url = %config.server.base_url,
        source = %config.source(),
        "Configuration loaded"
    );

    let backend =
        HttpBackend::from_settings(&config.server).context("Failed to create HTTP client")?;
    if !args.no_health_check && !backend.health_check().await {
        warn!(
            base_url = %backend.base_url(),
            "Answer service is not reachable; questions will likely fail"
        );
    }

    let (tx, mut rx) = mpsc::channel(config.session.snapshot_capacity);
    let mut session = AskSession::new(backend, config.session.clone(), tx);
    let mut quit_rx = spawn_interrupt_handler(session.canceller());
    let mut renderer = Renderer::new(io::stdout(), io::stderr(), args.show_sources);

    if args.question.is_empty() {
        run_interactive(&mut session, &mut rx, &mut renderer, &mut quit_rx).await
    } else {
        run_questions(
            &mut session,
            &mut rx,
            &mut renderer,
            &mut quit_rx,
            &args.question,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_questions_and_flags() {
        let args = Args::try_parse_from([
            "docent",
            "--show-sources",
            "--ask-path",
            "/v2/ask",
            "What is X?",
            "And Y?",
        ])
        .unwrap();

        assert_eq!(args.question, vec!["What is X?", "And Y?"]);
        assert!(args.show_sources);
        assert!(!args.no_health_check);
        assert_eq!(args.ask_path.as_deref(), Some("/v2/ask"));
    }

    #[test]
    fn test_overrides_from_args() {
        let args = Args::try_parse_from([
            "docent",
            "--base-url",
            "http://docs.example.com/api",
        ])
        .unwrap();

        let overrides = args.overrides();
        assert_eq!(
            overrides.base_url.as_deref(),
            Some("http://docs.example.com/api")
        );
        assert!(overrides.ask_path.is_none());
    }

    #[test]
    fn test_no_questions_means_interactive() {
        let args = Args::try_parse_from(["docent", "--no-health-check"]).unwrap();
        assert!(args.question.is_empty());
        assert!(args.no_health_check);
    }
}
