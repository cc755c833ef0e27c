use std::sync::{Arc, Mutex, RwLock as StdRwLock};

use futures::StreamExt;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{ClientError, ClientResult},
    models::{GenerateRequest, ResponseSession, SimilarityResult},
    services::{providers::RecommendationBackend, similarity::SimilaritySearchDispatcher},
    stream::{AssemblyStats, ResponseAccumulator, ResponseAssembler, SnapshotListener},
};

/// Result of a finished generation
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub session: ResponseSession,
    pub stats: AssemblyStats,
    /// Movies similar to the generated text, when a dispatcher is attached and
    /// its search succeeded
    pub similar: Option<SimilarityResult>,
}

/// Clears the active-session slot when the submission ends, however it ends
struct ActiveSessionGuard<'a> {
    slot: &'a Mutex<Option<Uuid>>,
}

impl Drop for ActiveSessionGuard<'_> {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

/// Submits prompts and assembles the streamed answers
///
/// At most one session is active at a time; a second submission is rejected
/// with [`ClientError::SessionActive`] rather than merged into the first.
/// Finished sessions, complete or errored, are kept in submission order.
pub struct GenerationClient {
    backend: Arc<dyn RecommendationBackend>,
    num_ctx: u32,
    listeners: StdRwLock<Vec<SnapshotListener>>,
    active: Mutex<Option<Uuid>>,
    history: RwLock<Vec<ResponseSession>>,
    similarity: Option<Arc<SimilaritySearchDispatcher>>,
}

impl GenerationClient {
    pub fn new(backend: Arc<dyn RecommendationBackend>, num_ctx: u32) -> Self {
        Self {
            backend,
            num_ctx,
            listeners: StdRwLock::new(Vec::new()),
            active: Mutex::new(None),
            history: RwLock::new(Vec::new()),
            similarity: None,
        }
    }

    /// Runs a similarity search over each completed response
    pub fn with_similarity(mut self, dispatcher: Arc<SimilaritySearchDispatcher>) -> Self {
        self.similarity = Some(dispatcher);
        self
    }

    /// Registers a listener for every session started after this call
    pub fn subscribe(&self, listener: SnapshotListener) {
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(listener);
    }

    pub fn active_session(&self) -> Option<Uuid> {
        *self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub async fn history(&self) -> Vec<ResponseSession> {
        self.history.read().await.clone()
    }

    fn claim(&self, session_id: Uuid) -> ClientResult<ActiveSessionGuard<'_>> {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = *active {
            tracing::warn!(active_session = %existing, "Rejecting prompt while a session is active");
            return Err(ClientError::SessionActive(existing));
        }
        *active = Some(session_id);
        Ok(ActiveSessionGuard { slot: &self.active })
    }

    /// Submits `prompt` and streams the answer into a new session
    ///
    /// Returns `Ok(None)` for a blank prompt without contacting the backend. A
    /// transport failure is returned once; the partial text stays in the
    /// errored session recorded in [`GenerationClient::history`].
    pub async fn submit(&self, prompt: &str) -> ClientResult<Option<GenerationOutcome>> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            tracing::debug!("Ignoring empty prompt");
            return Ok(None);
        }

        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let accumulator = ResponseAccumulator::with_listeners(prompt, listeners);
        let session_id = accumulator.session().id;

        let guard = self.claim(session_id)?;
        let mut assembler = ResponseAssembler::new(accumulator);

        let request = GenerateRequest {
            prompt: prompt.to_string(),
            num_ctx: self.num_ctx,
        };

        tracing::info!(
            session_id = %session_id,
            backend = self.backend.name(),
            "Submitting prompt"
        );

        let mut stream = match self.backend.generate(&request).await {
            Ok(stream) => stream,
            Err(e) => {
                let (session, _) = assembler.fail(&e);
                self.history.write().await.push(session);
                return Err(e);
            }
        };

        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => assembler.push_chunk(&bytes),
                Err(e) => {
                    let (session, _) = assembler.fail(&e);
                    self.history.write().await.push(session);
                    return Err(e);
                }
            }
        }

        let (session, stats) = assembler.finish();
        tracing::info!(
            session_id = %session_id,
            chunks = stats.chunks,
            frames = stats.frames,
            parse_failures = stats.parse_failures,
            "Generation stream finished"
        );
        self.history.write().await.push(session.clone());
        drop(guard);

        let similar = match &self.similarity {
            Some(dispatcher) => match dispatcher.dispatch(&session.accumulated_text).await {
                Ok(result) => result,
                Err(e) => {
                    // Already surfaced through the dispatcher's view
                    tracing::warn!(session_id = %session_id, error = %e, "Similar movies unavailable");
                    None
                }
            },
            None => None,
        };

        Ok(Some(GenerationOutcome {
            session,
            stats,
            similar,
        }))
    }
}
