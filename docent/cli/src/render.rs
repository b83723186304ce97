//! Terminal rendering of conversation snapshots
//!
//! Snapshots carry the whole conversation, so the renderer remembers how much
//! of the streaming answer it has already written and only prints the rest.

use std::io::{self, Write};

use docent_core::{ConversationSnapshot, SourceReference, TurnPhase};

/// Writes answers to `out` as they stream, and failures to `err`
pub struct Renderer<O: Write, E: Write> {
    out: O,
    err: E,
    show_sources: bool,
    /// Whether a question is being rendered
    active: bool,
    /// Bytes of the current answer already written
    printed: usize,
}

impl<O: Write, E: Write> Renderer<O, E> {
    pub fn new(out: O, err: E, show_sources: bool) -> Self {
        Self {
            out,
            err,
            show_sources,
            active: false,
            printed: 0,
        }
    }

    /// Render one published snapshot
    pub fn render(&mut self, snapshot: &ConversationSnapshot) -> io::Result<()> {
        match snapshot.phase {
            TurnPhase::Requesting => {
                self.active = true;
                self.printed = 0;
            }
            TurnPhase::Streaming => self.write_delta(snapshot)?,
            TurnPhase::Completed => {
                if self.active {
                    self.write_delta(snapshot)?;
                    self.end_answer()?;
                    if self.show_sources {
                        if let Some(turn) = snapshot.turns.last() {
                            self.write_sources(&turn.sources)?;
                        }
                    }
                }
            }
            TurnPhase::Failed => {
                self.end_answer()?;
                if let Some(ref message) = snapshot.error {
                    writeln!(self.err, "error: {message}")?;
                }
            }
            TurnPhase::Aborted => {
                self.end_answer()?;
                writeln!(self.err, "(aborted)")?;
            }
            TurnPhase::Idle => {
                self.end_answer()?;
            }
        }
        self.out.flush()
    }

    /// Print a message that is not part of any answer
    pub fn notice(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.err, "{message}")
    }

    /// Print the interactive prompt
    pub fn prompt(&mut self) -> io::Result<()> {
        write!(self.out, "> ")?;
        self.out.flush()
    }

    fn write_delta(&mut self, snapshot: &ConversationSnapshot) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        let Some(turn) = snapshot.turns.last() else {
            return Ok(());
        };
        if let Some(delta) = turn.answer.get(self.printed..) {
            self.out.write_all(delta.as_bytes())?;
            self.printed = turn.answer.len();
        }
        Ok(())
    }

    fn end_answer(&mut self) -> io::Result<()> {
        if self.active && self.printed > 0 {
            writeln!(self.out)?;
        }
        self.active = false;
        self.printed = 0;
        Ok(())
    }

    fn write_sources(&mut self, sources: &[SourceReference]) -> io::Result<()> {
        if sources.is_empty() {
            return Ok(());
        }
        writeln!(self.out, "\nSources:")?;
        for (i, source) in sources.iter().enumerate() {
            writeln!(
                self.out,
                "  [{}] {} ({:.0}%)",
                i + 1,
                source.document_title,
                source.relevance_score * 100.0
            )?;
        }
        Ok(())
    }

    #[cfg(test)]
    fn into_parts(self) -> (O, E) {
        (self.out, self.err)
    }
}
