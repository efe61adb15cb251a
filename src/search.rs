//! Debounced search-as-you-type with a suggestion dropdown.
//!
//! Every keystroke restarts a quiet period; only when it elapses is the
//! lookup issued. Each scheduled lookup carries a generation number and its
//! result is applied only if no newer keystroke, selection or submit
//! happened in the meantime, so a slow earlier response can never
//! overwrite a later one.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::logging::SanitizedQuery;
use crate::media::{Category, MediaLookup, SuggestionItem};
use crate::navigation::{Navigator, Route};

/// Delay between the last keystroke and the lookup.
pub const QUIET_PERIOD: Duration = Duration::from_millis(300);

/// Maximum number of suggestions shown in the dropdown.
pub const MAX_SUGGESTIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchState {
    /// No text typed yet, or the field was emptied.
    Idle,
    /// Text present; suggestions are stale, loading, or empty.
    Typing,
    /// The latest lookup returned at least one result and the field is focused.
    SuggestionsShown,
    /// A suggestion was picked, the form was submitted, or the field was cleared.
    Dismissed,
}

/// Text handed to the results grid on submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    pub text: String,
    pub category: Option<Category>,
}

pub type SearchCallback = Arc<dyn Fn(SearchQuery) + Send + Sync>;

struct SearchBarState {
    query: String,
    category: Option<Category>,
    suggestions: Vec<SuggestionItem>,
    state: SearchState,
    focused: bool,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl SearchBarState {
    /// Invalidates any scheduled or in-flight lookup.
    fn supersede(&mut self) -> u64 {
        self.generation += 1;
        if let Some(task) = self.pending.take() {
            task.abort();
        }
        self.generation
    }

    fn dismiss(&mut self) {
        self.supersede();
        self.suggestions.clear();
        self.state = SearchState::Dismissed;
    }
}

/// State of one mounted search bar.
///
/// Must be used from within a tokio runtime. Dropping it cancels any
/// pending lookup.
pub struct SuggestionSearch {
    inner: Arc<Mutex<SearchBarState>>,
    lookup: Arc<dyn MediaLookup>,
    navigator: Arc<dyn Navigator>,
    on_search: SearchCallback,
    language: String,
    quiet_period: Duration,
}

impl fmt::Debug for SuggestionSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("SuggestionSearch")
            .field("state", &inner.state)
            .field("suggestions", &inner.suggestions.len())
            .field("generation", &inner.generation)
            .finish()
    }
}

impl SuggestionSearch {
    pub fn new(
        lookup: Arc<dyn MediaLookup>,
        navigator: Arc<dyn Navigator>,
        on_search: SearchCallback,
        language: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SearchBarState {
                query: String::new(),
                category: None,
                suggestions: Vec::new(),
                state: SearchState::Idle,
                focused: false,
                generation: 0,
                pending: None,
            })),
            lookup,
            navigator,
            on_search,
            language: language.into(),
            quiet_period: QUIET_PERIOD,
        }
    }

    pub fn with_quiet_period(mut self, quiet_period: Duration) -> Self {
        self.quiet_period = quiet_period;
        self
    }

    /// Handles one keystroke: stores the text and restarts the quiet period.
    pub fn input(&self, text: impl Into<String>) {
        let mut inner = self.inner.lock();
        inner.query = text.into();
        inner.focused = true;
        inner.state = if inner.query.is_empty() {
            SearchState::Idle
        } else {
            SearchState::Typing
        };

        let generation = inner.supersede();
        let task = tokio::spawn(run_lookup(
            Arc::downgrade(&self.inner),
            Arc::clone(&self.lookup),
            inner.query.clone(),
            inner.category,
            self.language.clone(),
            self.quiet_period,
            generation,
        ));
        inner.pending = Some(task);
    }

    /// Selects the category used by later lookups and submits.
    pub fn set_category(&self, category: Option<Category>) {
        self.inner.lock().category = category;
    }

    pub fn focus(&self) {
        let mut inner = self.inner.lock();
        inner.focused = true;
        if inner.state == SearchState::Typing && !inner.suggestions.is_empty() {
            inner.state = SearchState::SuggestionsShown;
        }
    }

    pub fn blur(&self) {
        let mut inner = self.inner.lock();
        inner.focused = false;
        if inner.state == SearchState::SuggestionsShown {
            inner.state = SearchState::Typing;
        }
    }

    /// Picks a suggestion: fills the field with its name and navigates to
    /// its detail page.
    pub fn select(&self, item: &SuggestionItem) -> Route {
        {
            let mut inner = self.inner.lock();
            inner.query = item.name.clone();
            inner.dismiss();
        }

        let route = Route::detail(item.category, item.id);
        tracing::debug!(route = ?route, "Suggestion selected");
        self.navigator.navigate(route.clone());
        route
    }

    /// Submits the typed text to the results grid. Blank text is ignored.
    pub fn submit(&self) -> bool {
        let query = {
            let mut inner = self.inner.lock();
            if inner.query.trim().is_empty() {
                return false;
            }
            inner.dismiss();
            SearchQuery {
                text: inner.query.clone(),
                category: inner.category,
            }
        };

        (self.on_search)(query);
        true
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.query.clear();
        inner.dismiss();
    }

    pub fn state(&self) -> SearchState {
        self.inner.lock().state
    }

    pub fn query(&self) -> String {
        self.inner.lock().query.clone()
    }

    pub fn suggestions(&self) -> Vec<SuggestionItem> {
        self.inner.lock().suggestions.clone()
    }

    pub fn dropdown_visible(&self) -> bool {
        self.state() == SearchState::SuggestionsShown
    }
}

impl Drop for SuggestionSearch {
    fn drop(&mut self) {
        self.inner.lock().supersede();
    }
}

async fn run_lookup(
    target: Weak<Mutex<SearchBarState>>,
    lookup: Arc<dyn MediaLookup>,
    query: String,
    category: Option<Category>,
    language: String,
    quiet_period: Duration,
    generation: u64,
) {
    tokio::time::sleep(quiet_period).await;

    let items = fetch_suggestions(lookup.as_ref(), &query, category, &language).await;

    let Some(target) = target.upgrade() else {
        return;
    };
    let mut inner = target.lock();
    if inner.generation != generation {
        tracing::debug!(
            generation,
            latest = inner.generation,
            "Discarding superseded suggestions"
        );
        return;
    }
    inner.pending = None;

    inner.suggestions = items;
    if !inner.suggestions.is_empty() && inner.focused {
        inner.state = SearchState::SuggestionsShown;
    } else if inner.state == SearchState::SuggestionsShown {
        inner.state = SearchState::Typing;
    }
}

/// One suggestion lookup: blank text yields nothing, results are capped at
/// [`MAX_SUGGESTIONS`], and a failed lookup degrades to an empty list.
pub async fn fetch_suggestions(
    lookup: &dyn MediaLookup,
    query: &str,
    category: Option<Category>,
    language: &str,
) -> Vec<SuggestionItem> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }

    match lookup.suggest(query, category, language).await {
        Ok(mut items) => {
            items.truncate(MAX_SUGGESTIONS);
            items
        }
        Err(err) => {
            tracing::warn!(
                query = %SanitizedQuery::new(query),
                error = %err,
                "Suggestion lookup failed"
            );
            Vec::new()
        }
    }
}
