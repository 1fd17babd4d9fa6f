//! Incremental newline-delimited JSON decoding.

use super::types::ChatResponseBody;
use super::TextStream;
use crate::errors::BackendError;
use futures::{Stream, StreamExt};
use std::collections::VecDeque;

/// Splits a byte stream into `/api/chat` response objects.
///
/// Chunks may end mid-line; incomplete lines are buffered until the next
/// chunk or [`finish`](Self::finish).
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
}

/// A decoded streaming line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamLine {
    /// A content fragment.
    Chunk(String),
    /// The final object; carries any trailing content.
    Done(String),
}

impl NdjsonDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds bytes and returns every complete line decoded so far.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Malformed`] for a line that is not valid JSON
    /// and [`BackendError::Remote`] for an error payload.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<StreamLine>, BackendError> {
        self.buffer.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(decoded) = decode_line(&line)? {
                lines.push(decoded);
            }
        }
        Ok(lines)
    }

    /// Decodes whatever remains after the byte stream ended.
    ///
    /// # Errors
    ///
    /// Same as [`push`](Self::push).
    pub fn finish(&mut self) -> Result<Option<StreamLine>, BackendError> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }
}

/// Turns an HTTP body stream into a stream of non-empty content fragments.
///
/// The stream ends after the `done` object or when the body ends; the
/// first error terminates it.
pub fn decode_chat_stream<S, B, E>(body: S) -> TextStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<BackendError> + Send + 'static,
{
    let state = DecodeState {
        body: Box::pin(body),
        decoder: NdjsonDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(chunk) = state.pending.pop_front() {
                return Some((Ok(chunk), state));
            }
            if state.finished {
                return None;
            }

            let decoded = match state.body.next().await {
                Some(Ok(bytes)) => state.decoder.push(bytes.as_ref()),
                Some(Err(e)) => Err(e.into()),
                None => {
                    state.finished = true;
                    state.decoder.finish().map(|line| line.into_iter().collect())
                }
            };
            match decoded {
                Ok(lines) => state.absorb(lines),
                Err(e) => {
                    state.finished = true;
                    state.pending.clear();
                    return Some((Err(e), state));
                }
            }
        }
    })
    .boxed()
}

struct DecodeState<S> {
    body: std::pin::Pin<Box<S>>,
    decoder: NdjsonDecoder,
    pending: VecDeque<String>,
    finished: bool,
}

impl<S> DecodeState<S> {
    fn absorb(&mut self, lines: Vec<StreamLine>) {
        for line in lines {
            let (content, done) = match line {
                StreamLine::Chunk(content) => (content, false),
                StreamLine::Done(content) => (content, true),
            };
            if !content.is_empty() {
                self.pending.push_back(content);
            }
            if done {
                self.finished = true;
                break;
            }
        }
    }
}

fn decode_line(line: &[u8]) -> Result<Option<StreamLine>, BackendError> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let body: ChatResponseBody =
        serde_json::from_str(text).map_err(|e| BackendError::Malformed(e.to_string()))?;
    if let Some(error) = body.error {
        return Err(BackendError::Remote(error));
    }
    let done = body.done;
    let content = body.into_content();
    Ok(Some(if done {
        StreamLine::Done(content)
    } else {
        StreamLine::Chunk(content)
    }))
}
