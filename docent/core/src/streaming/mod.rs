//! Answer Stream Decoding
//!
//! The answer service replies with a body of newline-terminated JSON records:
//!
//! ```text
//! {"type":"text","content":"X is "}
//! {"type":"text","content":"a thing."}
//! {"type":"sources","sources":[{"chunk_id":"c1", ...}]}
//! ```
//!
//! [`LineDecoder`] turns arbitrary byte chunks into [`StreamEvent`]s, and
//! [`decode_stream`] lifts it over an async byte stream. Chunk boundaries never
//! affect the decoded sequence. A trailing line without its newline is dropped
//! when the body ends.

mod decoder;

pub use decoder::{abortable, decode_stream, LineDecoder};

use crate::messages::SourceReference;

/// One decoded update of the answer stream
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// An incremental fragment of the answer text
    TextDelta {
        /// Text to append
        content: String,
    },
    /// The citation list for the turn (replaces any earlier list)
    SourcesSet {
        /// Citations in display order
        sources: Vec<SourceReference>,
    },
}

impl StreamEvent {
    /// Convenience constructor for a text fragment
    pub fn text(content: impl Into<String>) -> Self {
        Self::TextDelta {
            content: content.into(),
        }
    }

    /// Convenience constructor for a citation list
    #[must_use]
    pub fn sources(sources: Vec<SourceReference>) -> Self {
        Self::SourcesSet { sources }
    }
}
