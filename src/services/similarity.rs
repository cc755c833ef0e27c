use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    config::SimilaritySettings,
    error::{ClientError, ClientResult},
    models::{HybridSearchRequest, SimilarityResult, VectorSearchRequest},
    services::providers::RecommendationBackend,
};

const HYBRID_METRICS: [&str; 2] = ["cosine", "euclidean"];

/// What the similar-movies panel shows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimilarityView {
    pub result: Option<SimilarityResult>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Default)]
struct SimilarityState {
    /// Highest dispatch id handed out so far
    last_issued: u64,
    /// Only this dispatch may replace the visible result
    current: Option<u64>,
    view: SimilarityView,
}

/// Runs nearest-neighbor searches over generated text
///
/// The visible result is replaced as a whole by the latest dispatch only. A
/// failure clears the loading indicator and records an error, but leaves the
/// previous result on screen.
pub struct SimilaritySearchDispatcher {
    backend: Arc<dyn RecommendationBackend>,
    settings: SimilaritySettings,
    state: RwLock<SimilarityState>,
}

impl SimilaritySearchDispatcher {
    pub fn new(backend: Arc<dyn RecommendationBackend>, settings: SimilaritySettings) -> Self {
        Self {
            backend,
            settings,
            state: RwLock::new(SimilarityState::default()),
        }
    }

    pub async fn view(&self) -> SimilarityView {
        self.state.read().await.view.clone()
    }

    /// Searches for movies similar to `text`
    ///
    /// Returns `Ok(None)` when there is nothing to search for or when a later
    /// dispatch superseded this one before it resolved.
    pub async fn dispatch(&self, text: &str) -> ClientResult<Option<SimilarityResult>> {
        let text = text.trim();
        if text.is_empty() {
            tracing::debug!("Skipping similarity search for empty text");
            return Ok(None);
        }

        let dispatch_id = {
            let mut state = self.state.write().await;
            state.last_issued += 1;
            let dispatch_id = state.last_issued;
            state.current = Some(dispatch_id);
            state.view.loading = true;
            state.view.error = None;
            dispatch_id
        };

        let request = VectorSearchRequest {
            text: text.to_string(),
            num_neighbors: self.settings.num_neighbors,
            metric: Some(self.settings.metric.clone()),
        };

        tracing::info!(
            dispatch_id = dispatch_id,
            num_neighbors = request.num_neighbors,
            backend = self.backend.name(),
            "Dispatching similarity search"
        );

        let outcome = self.backend.vector_search(&request).await;

        let mut state = self.state.write().await;
        if state.current != Some(dispatch_id) {
            tracing::debug!(dispatch_id = dispatch_id, "Discarding superseded similarity result");
            return Ok(None);
        }
        state.view.loading = false;

        match outcome {
            Ok(response) => {
                let metric = if response.metric.is_empty() {
                    request.metric.unwrap_or_default()
                } else {
                    response.metric
                };
                let result = SimilarityResult {
                    dispatch_id,
                    query: text.to_string(),
                    metric,
                    movies: response.results,
                    fetched_at: Utc::now(),
                };
                state.view.result = Some(result.clone());
                Ok(Some(result))
            }
            Err(e) => {
                tracing::error!(dispatch_id = dispatch_id, error = %e, "Similarity search failed");
                state.view.error = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// Passes a hybrid search through to the backend
    ///
    /// Requests the backend would reject are refused here without a round trip.
    /// The response is returned untouched and does not change the view.
    pub async fn hybrid_search(&self, request: &HybridSearchRequest) -> ClientResult<serde_json::Value> {
        validate_hybrid(request)?;
        self.backend.hybrid_search(request).await
    }
}

fn validate_hybrid(request: &HybridSearchRequest) -> ClientResult<()> {
    if request.text.trim().is_empty() {
        return Err(ClientError::InvalidInput(
            "Text for embedding is required".to_string(),
        ));
    }
    if !HYBRID_METRICS.contains(&request.metric.as_str()) {
        return Err(ClientError::InvalidInput(
            "Invalid metric. Must be 'cosine' or 'euclidean'".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&request.embedding_weight) {
        return Err(ClientError::InvalidInput(
            "embedding_weight must be between 0 and 1".to_string(),
        ));
    }
    Ok(())
}
