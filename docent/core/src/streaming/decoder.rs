//! Line Decoder Implementation
//!
//! Newline-delimited JSON decoding over incrementally arriving bytes.

use std::collections::VecDeque;
use std::pin::Pin;

use futures::{stream, Stream, StreamExt};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::StreamEvent;
use crate::backend::EventStream;
use crate::error::AskError;
use crate::messages::SourceReference;

/// A record as it appears on the wire, discriminated by `type`
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireRecord {
    Text { content: String },
    Sources { sources: Vec<SourceReference> },
    /// Tags this client does not know about are skipped
    #[serde(other)]
    Unknown,
}

/// Incremental decoder for newline-delimited answer records
///
/// Bytes are buffered until a `\n` arrives; only complete lines are decoded
/// as UTF-8, so a multi-byte character split across chunks is handled.
/// The first malformed line poisons the decoder: nothing after it is emitted.
#[derive(Debug, Default)]
pub struct LineDecoder {
    /// Bytes received but not yet terminated by a newline
    buffer: Vec<u8>,
    /// Set once a line failed to decode
    failed: bool,
}

impl LineDecoder {
    /// Create an empty decoder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and collect every event completed by it
    ///
    /// An `Err` entry is always the last one returned, and the decoder yields
    /// nothing afterwards.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<StreamEvent, AskError>> {
        let mut events = Vec::new();
        if self.failed {
            return events;
        }

        self.buffer.extend_from_slice(chunk);

        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            let parsed = parse_line(&self.buffer[start..end]);
            start = end + 1;

            match parsed {
                Ok(Some(event)) => events.push(Ok(event)),
                Ok(None) => {}
                Err(e) => {
                    self.failed = true;
                    self.buffer.clear();
                    events.push(Err(e));
                    return events;
                }
            }
        }

        self.buffer.drain(..start);
        events
    }

    /// Number of bytes waiting for a newline
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// End of input: drop whatever partial line is left
    ///
    /// Returns how many non-whitespace-only bytes were discarded (0 if none).
    pub fn finish(&mut self) -> usize {
        let leftover = std::mem::take(&mut self.buffer);
        if leftover.iter().all(u8::is_ascii_whitespace) {
            0
        } else {
            leftover.len()
        }
    }
}

/// Decode one complete line (without its newline)
fn parse_line(line: &[u8]) -> Result<Option<StreamEvent>, AskError> {
    let text = std::str::from_utf8(line)
        .map_err(|e| AskError::Decode(format!("invalid UTF-8 in stream line: {e}")))?;
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let record: WireRecord =
        serde_json::from_str(text).map_err(|e| AskError::Decode(e.to_string()))?;

    match record {
        WireRecord::Text { content } => Ok(Some(StreamEvent::TextDelta { content })),
        WireRecord::Sources { sources } => {
            if let Some(bad) = sources.iter().find(|s| !s.has_valid_score()) {
                return Err(AskError::Decode(format!(
                    "relevance score must be between 0.0 and 1.0, got {} for chunk {}",
                    bad.relevance_score, bad.chunk_id
                )));
            }
            Ok(Some(StreamEvent::SourcesSet { sources }))
        }
        WireRecord::Unknown => {
            tracing::debug!(line = %text, "Ignoring stream record with unknown type");
            Ok(None)
        }
    }
}

struct DecodeState<S> {
    bytes: Pin<Box<S>>,
    decoder: LineDecoder,
    ready: VecDeque<Result<StreamEvent, AskError>>,
    finished: bool,
}

/// Decode an async byte stream into answer events
///
/// The returned stream is lazy and finite: it ends when the byte stream ends
/// or right after the first error (from the bytes or from decoding).
/// Dropping it drops the underlying byte stream.
pub fn decode_stream<S, B>(bytes: S) -> impl Stream<Item = Result<StreamEvent, AskError>> + Send
where
    S: Stream<Item = Result<B, AskError>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let state = DecodeState {
        bytes: Box::pin(bytes),
        decoder: LineDecoder::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.ready.pop_front() {
                if item.is_err() {
                    state.finished = true;
                    state.ready.clear();
                }
                return Some((item, state));
            }

            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.push(chunk.as_ref());
                    state.ready.extend(events);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(e), state));
                }
                None => {
                    state.finished = true;
                    let discarded = state.decoder.finish();
                    if discarded > 0 {
                        tracing::warn!(
                            bytes = discarded,
                            "Answer stream ended mid-line, discarding partial record"
                        );
                    }
                }
            }
        }
    })
}

/// Make an event stream end with [`AskError::Aborted`] once `cancel` fires
///
/// Cancellation wins over a simultaneously ready event. The inner stream is
/// dropped as soon as the abort is reported.
pub fn abortable(events: EventStream, cancel: CancellationToken) -> EventStream {
    Box::pin(stream::unfold(
        Some((events, cancel)),
        |state| async move {
            let (mut events, cancel) = state?;
            tokio::select! {
                biased;
                () = cancel.cancelled() => Some((Err(AskError::Aborted), None)),
                item = events.next() => item.map(|item| (item, Some((events, cancel)))),
            }
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BODY: &str = concat!(
        "{\"type\":\"text\",\"content\":\"X is \"}\n",
        "{\"type\":\"text\",\"content\":\"a thing.\"}\n",
        "{\"type\":\"sources\",\"sources\":[{\"chunk_id\":\"c1\",\"document_title\":\"Doc\",",
        "\"chunk_text\":\"...\",\"relevance_score\":0.9}]}\n",
    );

    fn expected() -> Vec<StreamEvent> {
        vec![
            StreamEvent::text("X is "),
            StreamEvent::text("a thing."),
            StreamEvent::sources(vec![SourceReference {
                document_title: "Doc".to_string(),
                chunk_text: "...".to_string(),
                relevance_score: 0.9,
                chunk_id: "c1".to_string(),
            }]),
        ]
    }

    fn decode_chunks(chunks: &[&[u8]]) -> Vec<Result<StreamEvent, AskError>> {
        let owned: Vec<Result<Vec<u8>, AskError>> =
            chunks.iter().map(|c| Ok(c.to_vec())).collect();
        tokio_test::block_on(decode_stream(stream::iter(owned)).collect())
    }

    fn ok_events(results: Vec<Result<StreamEvent, AskError>>) -> Vec<StreamEvent> {
        results.into_iter().map(Result::unwrap).collect()
    }

    #[test]
    fn test_single_chunk() {
        assert_eq!(ok_events(decode_chunks(&[BODY.as_bytes()])), expected());
    }

    #[test]
    fn test_one_line_per_chunk() {
        let lines: Vec<&[u8]> = BODY.split_inclusive('\n').map(str::as_bytes).collect();
        assert_eq!(ok_events(decode_chunks(&lines)), expected());
    }

    #[test]
    fn test_every_split_point_matches_whole_body() {
        let bytes = BODY.as_bytes();
        for split in 0..=bytes.len() {
            let (a, b) = bytes.split_at(split);
            assert_eq!(ok_events(decode_chunks(&[a, b])), expected(), "split at {split}");
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let chunks: Vec<&[u8]> = BODY.as_bytes().chunks(1).collect();
        assert_eq!(ok_events(decode_chunks(&chunks)), expected());
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let line = "{\"type\":\"text\",\"content\":\"caf\u{e9} \u{1f600}\"}\n";
        let bytes = line.as_bytes();
        let accent = line.find('\u{e9}').unwrap();
        let chunks = [&bytes[..=accent], &bytes[accent + 1..]];
        assert_eq!(
            ok_events(decode_chunks(&chunks)),
            vec![StreamEvent::text("caf\u{e9} \u{1f600}")]
        );
    }

    #[test]
    fn test_trailing_partial_line_is_dropped() {
        let body = format!("{BODY}{{\"type\":\"text\",\"content\":\"never seen\"}}");
        assert_eq!(ok_events(decode_chunks(&[body.as_bytes()])), expected());
    }

    #[test]
    fn test_finish_reports_discarded_bytes() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"{\"type\":\"text\"").is_empty());
        assert_eq!(decoder.buffered_len(), 14);
        assert_eq!(decoder.finish(), 14);
        assert_eq!(decoder.buffered_len(), 0);

        decoder.push(b"  \r");
        assert_eq!(decoder.finish(), 0);
    }

    #[test]
    fn test_blank_lines_and_crlf_are_tolerated() {
        let body = "\n\r\n{\"type\":\"text\",\"content\":\"A\"}\r\n\n";
        assert_eq!(ok_events(decode_chunks(&[body.as_bytes()])), vec![StreamEvent::text("A")]);
    }

    #[test]
    fn test_unknown_type_is_ignored() {
        let body = concat!(
            "{\"type\":\"usage\",\"tokens\":12}\n",
            "{\"type\":\"text\",\"content\":\"A\"}\n",
        );
        assert_eq!(ok_events(decode_chunks(&[body.as_bytes()])), vec![StreamEvent::text("A")]);
    }

    #[test]
    fn test_malformed_line_is_fatal() {
        let body = concat!(
            "{\"type\":\"text\",\"content\":\"A\"}\n",
            "not json\n",
            "{\"type\":\"text\",\"content\":\"B\"}\n",
        );
        let results = decode_chunks(&[body.as_bytes()]);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0], Ok(StreamEvent::text("A")));
        assert!(matches!(results[1], Err(AskError::Decode(_))));
    }

    #[test]
    fn test_missing_field_is_fatal() {
        let results = decode_chunks(&[b"{\"type\":\"text\"}\n"]);
        assert!(matches!(results.as_slice(), [Err(AskError::Decode(_))]));
    }

    #[test]
    fn test_out_of_range_score_is_fatal() {
        let body = "{\"type\":\"sources\",\"sources\":[{\"chunk_id\":\"c1\",\"document_title\":\"D\",\
                    \"chunk_text\":\"t\",\"relevance_score\":1.2}]}\n";
        let results = decode_chunks(&[body.as_bytes()]);
        assert!(matches!(results.as_slice(), [Err(AskError::Decode(_))]));
    }

    #[test]
    fn test_poisoned_decoder_stays_silent() {
        let mut decoder = LineDecoder::new();
        assert_eq!(decoder.push(b"{oops}\n").len(), 1);
        assert!(decoder.push(b"{\"type\":\"text\",\"content\":\"A\"}\n").is_empty());
    }

    #[test]
    fn test_byte_stream_error_ends_decode() {
        let chunks: Vec<Result<Vec<u8>, AskError>> = vec![
            Ok(b"{\"type\":\"text\",\"content\":\"A\"}\n".to_vec()),
            Err(AskError::transport(Some(200), "connection reset")),
            Ok(b"{\"type\":\"text\",\"content\":\"B\"}\n".to_vec()),
        ];
        let results: Vec<_> = tokio_test::block_on(decode_stream(stream::iter(chunks)).collect());
        assert_eq!(
            results,
            vec![
                Ok(StreamEvent::text("A")),
                Err(AskError::transport(Some(200), "connection reset")),
            ]
        );
    }

    #[tokio::test]
    async fn test_abortable_prefers_cancellation() {
        let cancel = CancellationToken::new();
        let events: EventStream = Box::pin(stream::iter(vec![
            Ok(StreamEvent::text("A")),
            Ok(StreamEvent::text("B")),
        ]));
        let mut events = abortable(events, cancel.clone());

        assert_eq!(events.next().await, Some(Ok(StreamEvent::text("A"))));
        cancel.cancel();
        assert_eq!(events.next().await, Some(Err(AskError::Aborted)));
        assert_eq!(events.next().await, None);
    }
}
