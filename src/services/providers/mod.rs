/// Recommendation backend abstraction
///
/// The generation model, vector index and movie catalog all sit behind one HTTP
/// service. This trait is the seam to that service: the controllers only see
/// wire-level request and response types, so tests can swap in fakes.
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::{
    error::ClientResult,
    models::{
        GenerateRequest, HybridSearchRequest, MoviesPage, MoviesQuery, VectorSearchRequest,
        VectorSearchResponse,
    },
};

pub mod http;

pub use http::HttpBackend;

/// Raw body of a streamed response, in transport order
pub type ByteStream = BoxStream<'static, ClientResult<Bytes>>;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecommendationBackend: Send + Sync {
    /// Start a generation and return its newline-delimited JSON body unparsed
    async fn generate(&self, request: &GenerateRequest) -> ClientResult<ByteStream>;

    /// Nearest-neighbor search over plot embeddings
    ///
    /// Results come back in the server's ranking order.
    async fn vector_search(&self, request: &VectorSearchRequest)
        -> ClientResult<VectorSearchResponse>;

    /// Combined embedding and text search; the response is not interpreted
    async fn hybrid_search(&self, request: &HybridSearchRequest) -> ClientResult<serde_json::Value>;

    /// One page of the catalog, optionally filtered by title
    async fn fetch_movies(&self, query: &MoviesQuery) -> ClientResult<MoviesPage>;

    /// Backend name for logging and debugging
    fn name(&self) -> &'static str;
}
