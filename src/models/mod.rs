use serde::{Deserialize, Serialize};

pub mod movie;
pub mod session;

pub use movie::{Movie, MoviesPage, SimilarMovie, SimilarityResult};
pub use session::{
    ResponseSession, ResponseSnapshot, ResponseStatus, SearchQuery, SearchSession, SearchStatus,
};

// ============================================================================
// Generation API Types
// ============================================================================

/// Body of `POST /generate`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerateRequest {
    pub prompt: String,
    pub num_ctx: u32,
}

/// One line of the `/generate` stream
///
/// The backend has shipped two payload shapes: the legacy `{response}` and the
/// current `{message: {content}}`. Both are accepted; anything else in the
/// object is ignored.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct GenerateChunk {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub message: Option<ChatMessage>,
    #[serde(default)]
    pub done: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

// ============================================================================
// Search API Types
// ============================================================================

/// Body of `POST /vector_search`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VectorSearchRequest {
    pub text: String,
    pub num_neighbors: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
}

/// Response from `POST /vector_search`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct VectorSearchResponse {
    #[serde(default)]
    pub results: Vec<SimilarMovie>,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub metric: String,
    #[serde(default)]
    pub num_results: usize,
}

/// Body of `POST /hybrid_search`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HybridSearchRequest {
    pub text: String,
    pub text_query: String,
    pub num_neighbors: u32,
    pub metric: String,
    pub use_normalized: bool,
    pub embedding_weight: f64,
    pub min_similarity: f64,
}

impl HybridSearchRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            text_query: String::new(),
            num_neighbors: 5,
            metric: "cosine".to_string(),
            use_normalized: true,
            embedding_weight: 0.7,
            min_similarity: 0.0,
        }
    }
}

/// Query string of `GET /movies`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MoviesQuery {
    pub limit: u32,
    pub offset: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
}
