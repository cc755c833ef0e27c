use std::sync::Arc;

use crate::models::{ResponseSession, ResponseSnapshot, ResponseStatus};

/// Callback invoked synchronously with the full session state after each update
pub type SnapshotListener = Arc<dyn Fn(&ResponseSnapshot) + Send + Sync>;

/// Owns one generation session and grows its text delta by delta
///
/// Every change is published as a complete [`ResponseSnapshot`], so listeners
/// replace their view rather than patch it. Once the session is complete or
/// errored it no longer changes.
pub struct ResponseAccumulator {
    session: ResponseSession,
    listeners: Vec<SnapshotListener>,
}

impl ResponseAccumulator {
    pub fn new(prompt_text: impl Into<String>) -> Self {
        Self {
            session: ResponseSession::new(prompt_text),
            listeners: Vec::new(),
        }
    }

    pub fn with_listeners(prompt_text: impl Into<String>, listeners: Vec<SnapshotListener>) -> Self {
        Self {
            session: ResponseSession::new(prompt_text),
            listeners,
        }
    }

    pub fn subscribe(&mut self, listener: SnapshotListener) {
        self.listeners.push(listener);
    }

    pub fn session(&self) -> &ResponseSession {
        &self.session
    }

    pub fn into_session(self) -> ResponseSession {
        self.session
    }

    pub fn is_active(&self) -> bool {
        self.session.status == ResponseStatus::Active
    }

    /// Appends a delta and publishes; empty deltas are no-ops
    pub fn append(&mut self, delta: &str) {
        if delta.is_empty() {
            return;
        }
        if !self.is_active() {
            tracing::warn!(
                session_id = %self.session.id,
                status = ?self.session.status,
                "Dropping delta for finished session"
            );
            return;
        }

        self.session.accumulated_text.push_str(delta);
        self.publish();
    }

    /// Marks a cleanly ended stream
    pub fn finalize(&mut self) {
        if !self.is_active() {
            return;
        }
        self.session.status = ResponseStatus::Complete;
        tracing::info!(
            session_id = %self.session.id,
            chars = self.session.accumulated_text.chars().count(),
            "Generation complete"
        );
        self.publish();
    }

    /// Marks a failed stream, keeping the text received so far
    pub fn fail(&mut self, error: impl ToString) {
        if !self.is_active() {
            return;
        }
        let error = error.to_string();
        tracing::error!(
            session_id = %self.session.id,
            error = %error,
            kept_chars = self.session.accumulated_text.chars().count(),
            "Generation failed"
        );
        self.session.status = ResponseStatus::Errored;
        self.session.error = Some(error);
        self.publish();
    }

    fn publish(&self) {
        if self.listeners.is_empty() {
            return;
        }
        let snapshot = self.session.snapshot();
        for listener in &self.listeners {
            listener(&snapshot);
        }
    }
}
