use crate::models::GenerateChunk;

use super::frame::Frame;

/// Longest slice of a bad line kept for logging
const FAILURE_EXCERPT_LEN: usize = 200;

/// What a single `/generate` line carried
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Text to append to the running response
    Delta(String),
    /// A well-formed line with nothing to append (blank line, `done` marker,
    /// or an object with neither payload field)
    Empty,
}

impl StreamEvent {
    pub fn delta(&self) -> &str {
        match self {
            StreamEvent::Delta(text) => text,
            StreamEvent::Empty => "",
        }
    }
}

/// A line that could not be decoded; the stream carries on without it
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to parse stream line ({reason}): {excerpt}")]
pub struct ParseFailure {
    pub reason: String,
    pub excerpt: String,
}

impl ParseFailure {
    fn new(frame: &Frame, reason: impl ToString) -> Self {
        let line = String::from_utf8_lossy(frame.as_bytes());
        let excerpt = line.chars().take(FAILURE_EXCERPT_LEN).collect();
        Self {
            reason: reason.to_string(),
            excerpt,
        }
    }
}

/// Decodes one frame into a text delta
///
/// Accepts both `{"response": "..."}` and `{"message": {"content": "..."}}`.
/// When a line carries both, the `message` form wins.
pub fn parse_frame(frame: &Frame) -> Result<StreamEvent, ParseFailure> {
    if frame.is_blank() {
        return Ok(StreamEvent::Empty);
    }

    let text = frame
        .to_text()
        .map_err(|e| ParseFailure::new(frame, e))?;

    let chunk: GenerateChunk =
        serde_json::from_str(text).map_err(|e| ParseFailure::new(frame, e))?;

    let delta = chunk
        .message
        .and_then(|message| message.content)
        .or(chunk.response)
        .unwrap_or_default();

    if delta.is_empty() {
        Ok(StreamEvent::Empty)
    } else {
        Ok(StreamEvent::Delta(delta))
    }
}
