/// HTTP recommendation backend
///
/// Endpoints:
/// 1. `POST /generate` → newline-delimited JSON, streamed
/// 2. `POST /vector_search`, `POST /hybrid_search` → single JSON document
/// 3. `GET /movies?limit&offset&title` → single JSON document, buffered in full
use crate::{
    config::Config,
    error::{ClientError, ClientResult},
    models::{
        GenerateRequest, HybridSearchRequest, MoviesPage, MoviesQuery, VectorSearchRequest,
        VectorSearchResponse,
    },
    services::providers::{ByteStream, RecommendationBackend},
};
use futures::{StreamExt, TryStreamExt};
use reqwest::{Client as HttpClient, Response};
use serde::de::DeserializeOwned;

#[derive(Clone)]
pub struct HttpBackend {
    http_client: HttpClient,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(HttpClient::new(), base_url)
    }

    pub fn with_client(http_client: HttpClient, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http_client,
            base_url,
        }
    }

    /// Builds a backend with the configured connect timeout
    ///
    /// No overall request timeout is set: a generation body may legitimately
    /// stream for a long time.
    pub fn from_config(config: &Config) -> ClientResult<Self> {
        let http_client = HttpClient::builder()
            .connect_timeout(config.connect_timeout())
            .build()?;
        Ok(Self::with_client(http_client, &config.backend_url))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn ensure_success(endpoint: &'static str, response: Response) -> ClientResult<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::error!(
            endpoint = endpoint,
            status = %status,
            body = %body,
            "Backend request failed"
        );
        Err(ClientError::Api {
            endpoint,
            status,
            body,
        })
    }

    /// Reads the whole body before decoding it
    async fn read_json<T: DeserializeOwned>(
        endpoint: &'static str,
        response: Response,
    ) -> ClientResult<T> {
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| {
            tracing::error!(
                endpoint = endpoint,
                error = %e,
                response = %String::from_utf8_lossy(&body),
                "Failed to deserialize backend response"
            );
            ClientError::Decode(format!("{}: {}", endpoint, e))
        })
    }
}

#[async_trait::async_trait]
impl RecommendationBackend for HttpBackend {
    async fn generate(&self, request: &GenerateRequest) -> ClientResult<ByteStream> {
        let response = self
            .http_client
            .post(self.url("/generate"))
            .json(request)
            .send()
            .await?;

        let response = Self::ensure_success("/generate", response).await?;

        tracing::debug!(num_ctx = request.num_ctx, "Generation stream opened");

        Ok(response.bytes_stream().map_err(ClientError::from).boxed())
    }

    async fn vector_search(
        &self,
        request: &VectorSearchRequest,
    ) -> ClientResult<VectorSearchResponse> {
        let response = self
            .http_client
            .post(self.url("/vector_search"))
            .json(request)
            .send()
            .await?;

        let response = Self::ensure_success("/vector_search", response).await?;
        let results: VectorSearchResponse = Self::read_json("/vector_search", response).await?;

        tracing::info!(
            num_neighbors = request.num_neighbors,
            results = results.results.len(),
            metric = %results.metric,
            "Vector search completed"
        );

        Ok(results)
    }

    async fn hybrid_search(&self, request: &HybridSearchRequest) -> ClientResult<serde_json::Value> {
        let response = self
            .http_client
            .post(self.url("/hybrid_search"))
            .json(request)
            .send()
            .await?;

        let response = Self::ensure_success("/hybrid_search", response).await?;
        Self::read_json("/hybrid_search", response).await
    }

    async fn fetch_movies(&self, query: &MoviesQuery) -> ClientResult<MoviesPage> {
        let response = self
            .http_client
            .get(self.url("/movies"))
            .query(query)
            .send()
            .await?;

        let response = Self::ensure_success("/movies", response).await?;
        let page: MoviesPage = Self::read_json("/movies", response).await?;

        tracing::debug!(
            title = %query.title,
            offset = query.offset,
            results = page.movies.len(),
            total_count = page.total_count,
            "Catalog page fetched"
        );

        Ok(page)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
