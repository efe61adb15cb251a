//! Navigable page routes.

use serde::Serialize;
use url::form_urlencoded;

use crate::media::Category;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "page", rename_all = "snake_case")]
pub enum Route {
    Home,
    Movies,
    Series,
    Auth,
    Profile,
    Movie { id: u64 },
    Serie { id: u64 },
    Artist { id: u64 },
    Results {
        category: Option<Category>,
        query: String,
    },
}

impl Route {
    /// Detail page of one search result.
    pub fn detail(category: Category, id: u64) -> Self {
        match category {
            Category::Movie => Route::Movie { id },
            Category::Tv => Route::Serie { id },
            Category::Person => Route::Artist { id },
        }
    }

    /// Listing page showing the results of a free-text search.
    pub fn results(category: Option<Category>, query: impl Into<String>) -> Self {
        Route::Results {
            category,
            query: query.into(),
        }
    }

    /// Path relative to the site root, without the deployment prefix.
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Movies => "/movies".to_string(),
            Route::Series => "/series".to_string(),
            Route::Auth => "/auth".to_string(),
            Route::Profile => "/profile".to_string(),
            Route::Movie { id } => format!("/movie/{id}"),
            Route::Serie { id } => format!("/serie/{id}"),
            Route::Artist { id } => format!("/artist/{id}"),
            Route::Results { category, query } => {
                let listing = match category {
                    Some(Category::Movie) => "/movies",
                    Some(Category::Tv) => "/series",
                    Some(Category::Person) | None => "/",
                };
                let encoded: String = form_urlencoded::Serializer::new(String::new())
                    .append_pair("query", query)
                    .finish();
                format!("{listing}?{encoded}")
            }
        }
    }

    /// Path including the deployment prefix, e.g. `/cineverse/movie/42`.
    pub fn href(&self, base_path: &str) -> String {
        let base = base_path.trim_end_matches('/');
        match self.path().as_str() {
            "/" if !base.is_empty() => base.to_string(),
            path => format!("{base}{path}"),
        }
    }
}

/// Page router the search bar hands its selections to.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}
