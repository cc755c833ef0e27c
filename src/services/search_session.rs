use std::sync::{Arc, Mutex};

use tokio::{sync::RwLock, task::JoinHandle};

use crate::{
    config::SearchSettings,
    models::{Movie, MoviesQuery, SearchQuery, SearchSession, SearchStatus},
    services::providers::RecommendationBackend,
};

/// What the typeahead panel shows
#[derive(Debug, Clone, PartialEq)]
pub struct SearchView {
    pub query: String,
    pub page: u32,
    pub total_pages: u64,
    pub total_count: u64,
    pub results: Vec<Movie>,
    pub panel_open: bool,
    pub loading: bool,
    /// Current session still waiting for its response
    pub pending: Option<SearchSession>,
    pub error: Option<String>,
}

struct SearchState {
    query: SearchQuery,
    /// Highest session id handed out so far
    last_issued: u64,
    /// Session allowed to update the view; `None` once the query was cleared
    current: Option<u64>,
    /// Latest dispatched session whose response has not arrived yet
    in_flight: Option<SearchSession>,
    results: Vec<Movie>,
    total_count: u64,
    panel_open: bool,
    error: Option<String>,
}

impl SearchState {
    fn new(page_size: u32) -> Self {
        Self {
            query: SearchQuery::new("", 1, page_size),
            last_issued: 0,
            current: None,
            in_flight: None,
            results: Vec::new(),
            total_count: 0,
            panel_open: false,
            error: None,
        }
    }

    /// Drops results and makes every in-flight session stale
    fn clear(&mut self) {
        self.current = None;
        self.in_flight = None;
        self.results.clear();
        self.total_count = 0;
        self.error = None;
        self.panel_open = false;
    }

    fn total_pages(&self) -> u64 {
        self.total_count.div_ceil(u64::from(self.query.page_size))
    }

    fn last_page(&self) -> u32 {
        u32::try_from(self.total_pages().max(1)).unwrap_or(u32::MAX)
    }

    fn pending(&self) -> Option<&SearchSession> {
        self.in_flight
            .as_ref()
            .filter(|session| Some(session.id) == self.current)
    }
}

struct Shared {
    catalog: Arc<dyn RecommendationBackend>,
    settings: SearchSettings,
    state: RwLock<SearchState>,
    /// Pending debounce timer, aborted on every new keystroke
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Shared {
    /// Installs `handle` as the debounce timer and aborts the one it replaces
    fn replace_timer(&self, handle: Option<JoinHandle<()>>) {
        let mut timer = self.timer.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(old) = std::mem::replace(&mut *timer, handle) {
            old.abort();
        }
    }

    async fn dispatch(&self, query: SearchQuery) -> SearchSession {
        let id = {
            let mut state = self.state.write().await;
            state.last_issued += 1;
            let id = state.last_issued;
            state.current = Some(id);
            state.in_flight = Some(SearchSession {
                id,
                query: query.clone(),
                status: SearchStatus::Pending,
            });
            id
        };

        let request = MoviesQuery {
            limit: query.page_size,
            offset: query.offset(),
            title: query.normalized_text.clone(),
        };

        tracing::info!(
            session_id = id,
            title = %request.title,
            offset = request.offset,
            limit = request.limit,
            "Dispatching catalog query"
        );

        let outcome = self.catalog.fetch_movies(&request).await;

        let mut state = self.state.write().await;
        if state.current != Some(id) {
            tracing::debug!(
                session_id = id,
                current = ?state.current,
                "Discarding stale catalog result"
            );
            return SearchSession {
                id,
                query,
                status: SearchStatus::Stale,
            };
        }
        state.in_flight = None;

        let status = match outcome {
            Ok(page) => {
                state.results = page.movies;
                state.total_count = page.total_count;
                state.error = None;
                SearchStatus::Resolved
            }
            Err(e) => {
                tracing::warn!(session_id = id, error = %e, "Catalog query failed");
                state.results.clear();
                state.total_count = 0;
                state.error = Some(e.user_message());
                SearchStatus::Error
            }
        };

        SearchSession { id, query, status }
    }
}

/// Typeahead search over the paginated catalog
///
/// Keystrokes are debounced; page changes dispatch at once. Every dispatch gets
/// a strictly increasing session id, and a response only reaches the view if
/// its id is still the current one when it arrives. Aborting a superseded
/// debounce task may drop its request early, but the id check alone decides
/// what reaches the view.
#[derive(Clone)]
pub struct SearchSessionController {
    shared: Arc<Shared>,
}

impl SearchSessionController {
    pub fn new(catalog: Arc<dyn RecommendationBackend>, settings: SearchSettings) -> Self {
        let state = SearchState::new(settings.page_size);
        Self {
            shared: Arc::new(Shared {
                catalog,
                settings,
                state: RwLock::new(state),
                timer: Mutex::new(None),
            }),
        }
    }

    /// Handles an edit of the query text
    ///
    /// Restarts the quiet-period timer and resets to the first page. Queries
    /// shorter than the minimum length are never sent; they clear the results
    /// and close the panel instead.
    pub async fn on_query_change(&self, text: &str) {
        // Held until the new timer is installed, so keystrokes replace timers
        // in the order they update the query
        let mut state = self.shared.state.write().await;
        let Some(query) = self.replace_query(&mut state, text) else {
            return;
        };

        let shared = self.shared.clone();
        let debounce = self.shared.settings.debounce;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            shared.dispatch(query).await;
        });
        self.shared.replace_timer(Some(handle));
    }

    /// Dispatches the given text immediately, skipping the quiet period
    pub async fn search_now(&self, text: &str) -> Option<SearchSession> {
        let query = {
            let mut state = self.shared.state.write().await;
            self.replace_query(&mut state, text)?
        };
        Some(self.shared.dispatch(query).await)
    }

    /// Installs new query text on page 1, or clears everything if it is too short
    fn replace_query(&self, state: &mut SearchState, text: &str) -> Option<SearchQuery> {
        self.shared.replace_timer(None);

        let query = SearchQuery::new(text, 1, self.shared.settings.page_size);
        state.query = query.clone();
        if query.normalized_len() < self.shared.settings.min_query_len {
            tracing::debug!(len = query.normalized_len(), "Query below minimum length");
            state.clear();
            return None;
        }
        state.panel_open = true;
        Some(query)
    }

    /// Jumps to page `page`, clamped to the known page range
    ///
    /// Dispatches at once. Returns `None` when there is no searchable query.
    pub async fn set_page(&self, page: u32) -> Option<SearchSession> {
        let query = {
            let mut state = self.shared.state.write().await;
            if state.query.normalized_len() < self.shared.settings.min_query_len {
                return None;
            }
            let query = state.query.with_page(page.clamp(1, state.last_page()));
            state.query = query.clone();
            self.shared.replace_timer(None);
            query
        };

        Some(self.shared.dispatch(query).await)
    }

    /// Moves one page forward; `None` on the last page
    pub async fn next_page(&self) -> Option<SearchSession> {
        self.step_page(true).await
    }

    /// Moves one page back; `None` on the first page
    pub async fn prev_page(&self) -> Option<SearchSession> {
        self.step_page(false).await
    }

    async fn step_page(&self, forward: bool) -> Option<SearchSession> {
        let target = {
            let state = self.shared.state.read().await;
            let page = state.query.page;
            let target = if forward {
                page.saturating_add(1)
            } else {
                page.saturating_sub(1)
            };
            if target.clamp(1, state.last_page()) == page {
                tracing::debug!(page = page, "Page step outside the page range");
                return None;
            }
            target
        };
        self.set_page(target).await
    }

    /// Picks a result: clears the query and closes the panel
    pub async fn select(&self, index: usize) -> Option<Movie> {
        let mut state = self.shared.state.write().await;
        let movie = state.results.get(index).cloned()?;
        self.shared.replace_timer(None);
        state.query = SearchQuery::new("", 1, self.shared.settings.page_size);
        state.clear();

        tracing::debug!(title = %movie.title, "Catalog result selected");
        Some(movie)
    }

    pub async fn open_panel(&self) {
        let mut state = self.shared.state.write().await;
        state.panel_open = true;
    }

    /// Hides the panel without touching results or pending queries
    pub async fn close_panel(&self) {
        let mut state = self.shared.state.write().await;
        state.panel_open = false;
    }

    /// Id of the most recently dispatched session, 0 before the first
    pub async fn latest_session_id(&self) -> u64 {
        self.shared.state.read().await.last_issued
    }

    pub async fn view(&self) -> SearchView {
        let state = self.shared.state.read().await;
        let pending = state.pending().cloned();

        SearchView {
            query: state.query.raw_text.clone(),
            page: state.query.page,
            total_pages: state.total_pages(),
            total_count: state.total_count,
            results: state.results.clone(),
            panel_open: state.panel_open,
            loading: pending.is_some(),
            pending,
            error: state.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{request_error, ClientResult};
    use crate::models::{
        GenerateRequest, HybridSearchRequest, MoviesPage, VectorSearchRequest,
        VectorSearchResponse,
    };
    use crate::services::providers::{ByteStream, MockRecommendationBackend};
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn movie(title: &str) -> Movie {
        Movie {
            id: None,
            title: title.to_string(),
            release_year: Some(1979),
            director: None,
            plot_summary: None,
        }
    }

    fn page(titles: &[&str], total_count: u64) -> MoviesPage {
        MoviesPage {
            movies: titles.iter().map(|t| movie(t)).collect(),
            total_count,
        }
    }

    fn titles(view: &SearchView) -> Vec<String> {
        view.results.iter().map(|m| m.title.clone()).collect()
    }

    fn unsupported<T>() -> ClientResult<T> {
        Err(request_error())
    }

    /// Answers immediately and remembers every query it saw
    struct RecordingCatalog {
        queries: Mutex<Vec<MoviesQuery>>,
        total_count: u64,
    }

    impl RecordingCatalog {
        fn new(total_count: u64) -> Arc<Self> {
            Arc::new(Self {
                queries: Mutex::new(Vec::new()),
                total_count,
            })
        }

        fn queries(&self) -> Vec<MoviesQuery> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl RecommendationBackend for RecordingCatalog {
        async fn generate(&self, _request: &GenerateRequest) -> ClientResult<ByteStream> {
            unsupported()
        }

        async fn vector_search(
            &self,
            _request: &VectorSearchRequest,
        ) -> ClientResult<VectorSearchResponse> {
            unsupported()
        }

        async fn hybrid_search(&self, _request: &HybridSearchRequest) -> ClientResult<serde_json::Value> {
            unsupported()
        }

        async fn fetch_movies(&self, query: &MoviesQuery) -> ClientResult<MoviesPage> {
            self.queries.lock().unwrap().push(query.clone());
            let title = format!("{} @{}", query.title, query.offset);
            Ok(page(&[title.as_str()], self.total_count))
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    /// Holds every request until the test releases it
    #[derive(Default)]
    struct GatedCatalog {
        pending: Mutex<Vec<(String, oneshot::Sender<ClientResult<MoviesPage>>)>>,
    }

    impl GatedCatalog {
        fn pending_count(&self) -> usize {
            self.pending.lock().unwrap().len()
        }

        async fn wait_for_pending(&self, count: usize) {
            while self.pending_count() < count {
                tokio::task::yield_now().await;
            }
        }

        fn release(&self, title: &str, result: ClientResult<MoviesPage>) {
            let mut pending = self.pending.lock().unwrap();
            let index = pending
                .iter()
                .position(|(t, _)| t == title)
                .expect("no pending request for title");
            let (_, sender) = pending.remove(index);
            let _ = sender.send(result);
        }
    }

    #[async_trait::async_trait]
    impl RecommendationBackend for GatedCatalog {
        async fn generate(&self, _request: &GenerateRequest) -> ClientResult<ByteStream> {
            unsupported()
        }

        async fn vector_search(
            &self,
            _request: &VectorSearchRequest,
        ) -> ClientResult<VectorSearchResponse> {
            unsupported()
        }

        async fn hybrid_search(&self, _request: &HybridSearchRequest) -> ClientResult<serde_json::Value> {
            unsupported()
        }

        async fn fetch_movies(&self, query: &MoviesQuery) -> ClientResult<MoviesPage> {
            let (tx, rx) = oneshot::channel();
            self.pending.lock().unwrap().push((query.title.clone(), tx));
            rx.await.unwrap_or_else(|_| Err(request_error()))
        }

        fn name(&self) -> &'static str {
            "gated"
        }
    }

    fn controller(catalog: Arc<dyn RecommendationBackend>) -> SearchSessionController {
        SearchSessionController::new(catalog, SearchSettings::default())
    }

    #[tokio::test]
    async fn test_out_of_order_responses_only_latest_wins() {
        let catalog = Arc::new(GatedCatalog::default());
        let controller = controller(catalog.clone());

        let mut handles = Vec::new();
        for (n, text) in ["star", "stars", "starsh"].into_iter().enumerate() {
            let c = controller.clone();
            handles.push(tokio::spawn(async move { c.search_now(text).await }));
            catalog.wait_for_pending(n + 1).await;
        }
        let h3 = handles.pop().unwrap();
        let h2 = handles.pop().unwrap();
        let h1 = handles.pop().unwrap();

        catalog.release("starsh", Ok(page(&["Starship Troopers"], 1)));
        let s3 = h3.await.unwrap().unwrap();
        assert_eq!((s3.id, s3.status), (3, SearchStatus::Resolved));

        catalog.release("star", Ok(page(&["Star Wars", "Stardust"], 2)));
        let s1 = h1.await.unwrap().unwrap();
        assert_eq!((s1.id, s1.status), (1, SearchStatus::Stale));

        catalog.release("stars", Ok(page(&["Stars Fell on Alabama"], 1)));
        let s2 = h2.await.unwrap().unwrap();
        assert_eq!((s2.id, s2.status), (2, SearchStatus::Stale));

        let view = controller.view().await;
        assert_eq!(titles(&view), vec!["Starship Troopers"]);
        assert_eq!(view.total_count, 1);
        assert!(!view.loading);
        assert_eq!(controller.latest_session_id().await, 3);
    }

    #[tokio::test]
    async fn test_loading_tracks_current_session() {
        let catalog = Arc::new(GatedCatalog::default());
        let controller = controller(catalog.clone());

        let c = controller.clone();
        let handle = tokio::spawn(async move { c.search_now("alien").await });
        catalog.wait_for_pending(1).await;
        let view = controller.view().await;
        assert!(view.loading);
        let pending = view.pending.unwrap();
        assert_eq!((pending.id, pending.status), (1, SearchStatus::Pending));
        assert_eq!(pending.query.normalized_text, "alien");

        catalog.release("alien", Ok(page(&["Alien"], 1)));
        handle.await.unwrap();
        let view = controller.view().await;
        assert!(!view.loading);
        assert_eq!(view.pending, None);
    }

    #[tokio::test]
    async fn test_cleared_query_has_no_pending_session() {
        let catalog = Arc::new(GatedCatalog::default());
        let controller = controller(catalog.clone());

        let c = controller.clone();
        let handle = tokio::spawn(async move { c.search_now("alien").await });
        catalog.wait_for_pending(1).await;

        controller.on_query_change("").await;
        let view = controller.view().await;
        assert_eq!(view.pending, None);
        assert!(!view.loading);

        catalog.release("alien", Ok(page(&["Alien"], 1)));
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_keystroke_burst_dispatches_once() {
        let catalog = RecordingCatalog::new(1);
        let controller = controller(catalog.clone());

        for text in ["a", "al", "ali", "alie", "alien"] {
            controller.on_query_change(text).await;
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(catalog.queries().is_empty());

        tokio::time::sleep(Duration::from_millis(400)).await;

        let queries = catalog.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].title, "alien");
        assert_eq!(queries[0].offset, 0);
        assert_eq!(queries[0].limit, 5);

        let view = controller.view().await;
        assert_eq!(titles(&view), vec!["alien @0"]);
        assert!(view.panel_open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_keystrokes_share_one_timer() {
        let catalog = RecordingCatalog::new(1);
        let controller = controller(catalog.clone());

        // Both edits queue up behind the lock and install their timers afterwards
        let busy = controller.shared.state.read().await;
        let c = controller.clone();
        let first = tokio::spawn(async move { c.on_query_change("alien").await });
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        let c = controller.clone();
        let second = tokio::spawn(async move { c.on_query_change("aliens").await });
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        drop(busy);
        first.await.unwrap();
        second.await.unwrap();

        tokio::time::sleep(Duration::from_millis(400)).await;

        let sent: Vec<String> = catalog.queries().into_iter().map(|q| q.title).collect();
        assert_eq!(sent, vec!["aliens"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_period_separates_dispatches() {
        let catalog = RecordingCatalog::new(1);
        let controller = controller(catalog.clone());

        controller.on_query_change("heat").await;
        tokio::time::sleep(Duration::from_millis(350)).await;
        controller.on_query_change("heathers").await;
        tokio::time::sleep(Duration::from_millis(350)).await;

        let sent: Vec<String> = catalog.queries().into_iter().map(|q| q.title).collect();
        assert_eq!(sent, vec!["heat", "heathers"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_is_normalized_before_sending() {
        let catalog = RecordingCatalog::new(1);
        let controller = controller(catalog.clone());

        controller.on_query_change("  up  ").await;
        tokio::time::sleep(Duration::from_millis(301)).await;

        assert_eq!(catalog.queries()[0].title, "up");
        assert_eq!(controller.view().await.query, "  up  ");
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_query_clears_and_never_dispatches() {
        let catalog = RecordingCatalog::new(1);
        let controller = controller(catalog.clone());

        controller.search_now("alien").await.unwrap();
        assert_eq!(controller.view().await.results.len(), 1);

        controller.on_query_change(" a ").await;
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(catalog.queries().len(), 1);
        let view = controller.view().await;
        assert!(view.results.is_empty());
        assert_eq!(view.total_count, 0);
        assert!(!view.panel_open);
    }

    #[tokio::test]
    async fn test_clearing_query_makes_in_flight_session_stale() {
        let catalog = Arc::new(GatedCatalog::default());
        let controller = controller(catalog.clone());

        let c = controller.clone();
        let handle = tokio::spawn(async move { c.search_now("alien").await });
        catalog.wait_for_pending(1).await;

        controller.on_query_change("").await;
        catalog.release("alien", Ok(page(&["Alien"], 1)));

        let session = handle.await.unwrap().unwrap();
        assert_eq!(session.status, SearchStatus::Stale);
        assert!(controller.view().await.results.is_empty());
    }

    #[tokio::test]
    async fn test_pagination_is_clamped_to_page_range() {
        let catalog = RecordingCatalog::new(12);
        let controller = controller(catalog.clone());

        controller.search_now("star").await.unwrap();
        assert_eq!(controller.view().await.total_pages, 3);

        controller.set_page(2).await.unwrap();
        controller.next_page().await.unwrap();
        assert!(controller.next_page().await.is_none());
        assert_eq!(controller.view().await.page, 3);

        controller.prev_page().await.unwrap();
        controller.prev_page().await.unwrap();
        assert!(controller.prev_page().await.is_none());
        assert_eq!(controller.view().await.page, 1);

        controller.set_page(99).await.unwrap();
        controller.set_page(0).await.unwrap();

        let offsets: Vec<u32> = catalog.queries().into_iter().map(|q| q.offset).collect();
        assert_eq!(offsets, vec![0, 5, 10, 5, 0, 10, 0]);
    }

    #[tokio::test]
    async fn test_page_change_is_subject_to_staleness() {
        let catalog = Arc::new(GatedCatalog::default());
        let controller = controller(catalog.clone());

        let c = controller.clone();
        let first = tokio::spawn(async move { c.search_now("star").await });
        catalog.wait_for_pending(1).await;
        catalog.release("star", Ok(page(&["Star Wars"], 10)));
        first.await.unwrap();

        let c = controller.clone();
        let paged = tokio::spawn(async move { c.set_page(2).await });
        catalog.wait_for_pending(1).await;

        let c = controller.clone();
        let retyped = tokio::spawn(async move { c.search_now("stardust").await });
        catalog.wait_for_pending(2).await;

        catalog.release("stardust", Ok(page(&["Stardust"], 1)));
        assert_eq!(retyped.await.unwrap().unwrap().status, SearchStatus::Resolved);
        catalog.release("star", Ok(page(&["Star Trek"], 10)));
        assert_eq!(paged.await.unwrap().unwrap().status, SearchStatus::Stale);

        let view = controller.view().await;
        assert_eq!(titles(&view), vec!["Stardust"]);
        assert_eq!(view.page, 1);
    }

    #[tokio::test]
    async fn test_set_page_without_query_is_noop() {
        let catalog = RecordingCatalog::new(10);
        let controller = controller(catalog.clone());

        assert!(controller.set_page(2).await.is_none());
        assert!(catalog.queries().is_empty());
    }

    #[tokio::test]
    async fn test_select_clears_query_and_closes_panel() {
        let catalog = RecordingCatalog::new(1);
        let controller = controller(catalog.clone());

        controller.search_now("alien").await.unwrap();
        let picked = controller.select(0).await.unwrap();
        assert_eq!(picked.title, "alien @0");

        let view = controller.view().await;
        assert_eq!(view.query, "");
        assert!(!view.panel_open);
        assert!(view.results.is_empty());
        assert!(controller.select(0).await.is_none());
    }

    #[tokio::test]
    async fn test_close_panel_keeps_results() {
        let catalog = RecordingCatalog::new(1);
        let controller = controller(catalog.clone());

        controller.search_now("alien").await.unwrap();
        controller.close_panel().await;
        let view = controller.view().await;
        assert!(!view.panel_open);
        assert_eq!(view.results.len(), 1);

        controller.open_panel().await;
        assert!(controller.view().await.panel_open);
    }

    #[tokio::test]
    async fn test_current_failure_clears_results_and_reports() {
        let mut mock = MockRecommendationBackend::new();
        let mut calls = 0;
        mock.expect_fetch_movies().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(page(&["Alien"], 1))
            } else {
                Err(request_error())
            }
        });

        let controller = controller(Arc::new(mock));
        controller.search_now("alien").await.unwrap();
        let session = controller.search_now("aliens").await.unwrap();
        assert_eq!(session.status, SearchStatus::Error);

        let view = controller.view().await;
        assert!(view.results.is_empty());
        assert_eq!(view.total_count, 0);
        assert!(view.error.is_some());
    }

    #[tokio::test]
    async fn test_stale_failure_is_silent() {
        let catalog = Arc::new(GatedCatalog::default());
        let controller = controller(catalog.clone());

        let c = controller.clone();
        let older = tokio::spawn(async move { c.search_now("alien").await });
        catalog.wait_for_pending(1).await;
        let c = controller.clone();
        let newer = tokio::spawn(async move { c.search_now("aliens").await });
        catalog.wait_for_pending(2).await;

        catalog.release("aliens", Ok(page(&["Aliens"], 1)));
        newer.await.unwrap();
        catalog.release("alien", Err(request_error()));
        assert_eq!(older.await.unwrap().unwrap().status, SearchStatus::Stale);

        let view = controller.view().await;
        assert_eq!(view.error, None);
        assert_eq!(titles(&view), vec!["Aliens"]);
    }
}
