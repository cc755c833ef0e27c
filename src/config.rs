use serde::Deserialize;
use std::time::Duration;

/// Client configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the recommendation backend (host and port)
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Context window requested from the generation model
    #[serde(default = "default_num_ctx")]
    pub num_ctx: u32,

    /// Quiet period before a typeahead query is dispatched
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Catalog results per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Shortest normalized query that is sent to the catalog
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,

    /// Neighbors requested from vector search
    #[serde(default = "default_num_neighbors")]
    pub num_neighbors: u32,

    /// Distance metric for vector search
    #[serde(default = "default_metric")]
    pub metric: String,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_backend_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_num_ctx() -> u32 {
    2048
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_page_size() -> u32 {
    5
}

fn default_min_query_len() -> usize {
    2
}

fn default_num_neighbors() -> u32 {
    15
}

fn default_metric() -> String {
    "cosine".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            num_ctx: default_num_ctx(),
            debounce_ms: default_debounce_ms(),
            page_size: default_page_size(),
            min_query_len: default_min_query_len(),
            num_neighbors: default_num_neighbors(),
            metric: default_metric(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            debounce: Duration::from_millis(self.debounce_ms),
            page_size: self.page_size.max(1),
            min_query_len: self.min_query_len,
        }
    }

    pub fn similarity_settings(&self) -> SimilaritySettings {
        SimilaritySettings {
            num_neighbors: self.num_neighbors,
            metric: self.metric.clone(),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Tuning for the typeahead catalog search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    pub debounce: Duration,
    pub page_size: u32,
    pub min_query_len: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Config::default().search_settings()
    }
}

/// Parameters sent with every similarity dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct SimilaritySettings {
    pub num_neighbors: u32,
    pub metric: String,
}

impl Default for SimilaritySettings {
    fn default() -> Self {
        Config::default().similarity_settings()
    }
}
