//! Streaming response assembly
//!
//! Raw `/generate` bytes flow through three stages:
//! - [`LineFrameBuffer`] cuts the byte stream into complete lines
//! - [`parse_frame`] turns a line into a text delta, or a non-fatal [`ParseFailure`]
//! - [`ResponseAccumulator`] appends deltas and publishes full snapshots
//!
//! [`ResponseAssembler`] wires the stages together for a single session.
mod accumulator;
mod frame;
mod parser;

pub use accumulator::{ResponseAccumulator, SnapshotListener};
pub use frame::{Frame, LineFrameBuffer};
pub use parser::{parse_frame, ParseFailure, StreamEvent};

use crate::models::ResponseSession;

/// Counters for one assembled stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    pub chunks: usize,
    pub frames: usize,
    pub parse_failures: usize,
}

/// Drives chunks for one session through framing, parsing and accumulation
///
/// Chunks must be pushed in arrival order; each is fully processed before the
/// call returns.
pub struct ResponseAssembler {
    buffer: LineFrameBuffer,
    accumulator: ResponseAccumulator,
    stats: AssemblyStats,
}

impl ResponseAssembler {
    pub fn new(accumulator: ResponseAccumulator) -> Self {
        Self {
            buffer: LineFrameBuffer::new(),
            accumulator,
            stats: AssemblyStats::default(),
        }
    }

    pub fn session(&self) -> &ResponseSession {
        self.accumulator.session()
    }

    pub fn stats(&self) -> AssemblyStats {
        self.stats
    }

    pub fn push_chunk(&mut self, chunk: impl AsRef<[u8]>) {
        self.stats.chunks += 1;
        for frame in self.buffer.append_chunk(chunk) {
            self.apply(&frame);
        }
    }

    /// Flushes the trailing line and completes the session
    pub fn finish(mut self) -> (ResponseSession, AssemblyStats) {
        if let Some(frame) = self.buffer.flush() {
            self.apply(&frame);
        }
        self.accumulator.finalize();
        (self.accumulator.into_session(), self.stats)
    }

    /// Ends the session as errored; text already received is kept
    ///
    /// The unterminated trailing fragment is dropped: the line it belonged to
    /// never finished arriving.
    pub fn fail(mut self, error: impl ToString) -> (ResponseSession, AssemblyStats) {
        if self.buffer.pending_len() > 0 {
            tracing::debug!(
                session_id = %self.accumulator.session().id,
                pending_bytes = self.buffer.pending_len(),
                "Discarding incomplete line after transport failure"
            );
        }
        self.accumulator.fail(error);
        (self.accumulator.into_session(), self.stats)
    }

    fn apply(&mut self, frame: &Frame) {
        self.stats.frames += 1;
        match parse_frame(frame) {
            Ok(event) => self.accumulator.append(event.delta()),
            Err(failure) => {
                self.stats.parse_failures += 1;
                tracing::warn!(
                    session_id = %self.accumulator.session().id,
                    reason = %failure.reason,
                    line = %failure.excerpt,
                    "Skipping malformed stream line"
                );
            }
        }
    }
}
