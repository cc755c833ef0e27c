pub mod generation;
pub mod providers;
pub mod search_session;
pub mod similarity;

pub use generation::{GenerationClient, GenerationOutcome};
pub use search_session::{SearchSessionController, SearchView};
pub use similarity::{SimilaritySearchDispatcher, SimilarityView};
