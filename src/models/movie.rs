use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A catalog entry returned by `GET /movies`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    #[serde(default)]
    pub id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default, alias = "plot")]
    pub plot_summary: Option<String>,
}

/// One page of the catalog
///
/// Older backends omit `total_count`; it then reads as zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MoviesPage {
    #[serde(default)]
    pub movies: Vec<Movie>,
    #[serde(default)]
    pub total_count: u64,
}

/// A nearest-neighbor match from `/vector_search`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimilarMovie {
    pub title: String,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default, alias = "plot")]
    pub plot_summary: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

/// The similarity set currently on display
///
/// Always replaced as a whole; `movies` keeps the server's ranking.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SimilarityResult {
    pub dispatch_id: u64,
    pub query: String,
    pub metric: String,
    pub movies: Vec<SimilarMovie>,
    pub fetched_at: DateTime<Utc>,
}
