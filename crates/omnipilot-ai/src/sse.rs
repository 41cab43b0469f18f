//! Incremental decoding of `data: <json>` server-sent event streams.
//!
//! Bytes arrive in arbitrary fragments: a fragment may end in the middle of a
//! line, a JSON object, or a multi-byte character. [`Utf8StreamDecoder`] holds
//! back incomplete code points and [`SseFrameDecoder`] holds back incomplete
//! lines, so neither assumes fragment boundaries line up with anything.

use serde_json::Value;
use tracing::trace;

use crate::types::{AssembledResponse, TokenUsage};

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

/// Converts byte fragments to text, buffering a trailing partial code point
/// until the rest of it arrives. Invalid sequences become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut decoded = String::new();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    decoded.push_str(valid);
                    self.pending.clear();
                    break;
                }
                Err(error) => {
                    let valid_up_to = error.valid_up_to();
                    decoded.push_str(
                        std::str::from_utf8(&self.pending[..valid_up_to]).unwrap_or_default(),
                    );
                    match error.error_len() {
                        Some(invalid_len) => {
                            decoded.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid_up_to + invalid_len);
                        }
                        None => {
                            self.pending.drain(..valid_up_to);
                            break;
                        }
                    }
                }
            }
        }

        decoded
    }

    /// Flushes whatever is still buffered once the source is exhausted.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        tail
    }
}

/// Running result of one streaming call.
#[derive(Debug, Default)]
pub struct ResponseAccumulator {
    full_text: String,
    usage: Option<TokenUsage>,
}

impl ResponseAccumulator {
    pub fn push_delta(&mut self, delta: &str) {
        self.full_text.push_str(delta);
    }

    /// Last write wins: a later usage object replaces an earlier one wholesale.
    pub fn record_usage(&mut self, usage: TokenUsage) {
        self.usage = Some(usage);
    }

    pub fn finish(self) -> AssembledResponse {
        AssembledResponse {
            full_text: self.full_text,
            usage: self.usage,
        }
    }
}

#[derive(Debug, Default)]
pub struct SseFrameDecoder {
    buffer: String,
    accumulator: ResponseAccumulator,
}

impl SseFrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `fragment` and processes every complete line now in the buffer.
    ///
    /// `on_chunk` receives each non-empty content delta, in arrival order.
    /// A `[DONE]` line ends the current batch; anything after it stays
    /// buffered for the next fragment.
    pub fn feed<F>(&mut self, fragment: &str, mut on_chunk: F)
    where
        F: FnMut(&str),
    {
        self.buffer.push_str(fragment);

        while let Some(line_end) = self.buffer.find('\n') {
            let raw_line: String = self.buffer.drain(..=line_end).collect();
            let line = raw_line.trim();
            let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
                continue;
            };
            if payload == DONE_SENTINEL {
                break;
            }
            self.apply_payload(payload, &mut on_chunk);
        }
    }

    /// Text received after the last complete line.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    pub fn finish(self) -> AssembledResponse {
        if !self.buffer.trim().is_empty() {
            trace!(
                pending_len = self.buffer.len(),
                "discarding unterminated trailing SSE line"
            );
        }
        self.accumulator.finish()
    }

    fn apply_payload<F>(&mut self, payload: &str, on_chunk: &mut F)
    where
        F: FnMut(&str),
    {
        let frame: Value = match serde_json::from_str(payload) {
            Ok(frame) => frame,
            Err(error) => {
                trace!(%error, payload_len = payload.len(), "skipping malformed SSE frame");
                return;
            }
        };

        if let Some(content) = delta_content(&frame) {
            self.accumulator.push_delta(content);
            on_chunk(content);
        }

        if let Some(usage) = frame.get("usage").and_then(usage_from_value) {
            self.accumulator.record_usage(usage);
        }
    }
}

fn delta_content(frame: &Value) -> Option<&str> {
    frame
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("delta"))
        .and_then(|delta| delta.get("content"))
        .and_then(Value::as_str)
        .filter(|content| !content.is_empty())
}

fn usage_from_value(value: &Value) -> Option<TokenUsage> {
    let usage = value.as_object()?;
    let count = |field: &str| usage.get(field).and_then(Value::as_u64).unwrap_or(0);
    Some(TokenUsage {
        prompt_tokens: count("prompt_tokens"),
        completion_tokens: count("completion_tokens"),
        total_tokens: count("total_tokens"),
    })
}
