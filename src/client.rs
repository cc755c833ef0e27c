use std::sync::Arc;

use crate::{
    config::Config,
    error::ClientResult,
    services::{
        providers::{HttpBackend, RecommendationBackend},
        GenerationClient, SearchSessionController, SimilaritySearchDispatcher,
    },
};

/// Everything the presentation layer needs, wired to one backend
///
/// Generation and catalog search are independent: each owns its own state and
/// neither can roll back the other.
#[derive(Clone)]
pub struct ReccoClient {
    pub generation: Arc<GenerationClient>,
    pub search: SearchSessionController,
    pub similarity: Arc<SimilaritySearchDispatcher>,
}

impl ReccoClient {
    /// Creates a client talking HTTP to `config.backend_url`
    pub fn from_config(config: &Config) -> ClientResult<Self> {
        let backend = HttpBackend::from_config(config)?;
        tracing::info!(backend_url = %config.backend_url, "Recommendation client configured");
        Ok(Self::with_backend(Arc::new(backend), config))
    }

    pub fn with_backend(backend: Arc<dyn RecommendationBackend>, config: &Config) -> Self {
        let similarity = Arc::new(SimilaritySearchDispatcher::new(
            backend.clone(),
            config.similarity_settings(),
        ));
        let generation = Arc::new(
            GenerationClient::new(backend.clone(), config.num_ctx).with_similarity(similarity.clone()),
        );
        let search = SearchSessionController::new(backend, config.search_settings());

        Self {
            generation,
            search,
            similarity,
        }
    }
}
