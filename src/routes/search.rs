use axum::{Extension, Json, Router, extract::Query, routing::get};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;
use crate::logging::SanitizedQuery;
use crate::media::{Category, Page, SuggestionItem};
use crate::navigation::Route;
use crate::routes::Catalog;
use crate::search::fetch_suggestions;

pub fn router() -> Router {
    Router::new()
        .route("/search/suggestions", get(suggestions))
        .route("/search", get(search))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    query: String,
    category: Option<String>,
    page: Option<u32>,
}

impl SearchParams {
    fn category(&self) -> Result<Option<Category>, AppError> {
        match self.category.as_deref().map(str::trim) {
            None | Some("") | Some("all") => Ok(None),
            Some(raw) => Ok(Some(raw.parse()?)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Suggestion {
    #[serde(flatten)]
    item: SuggestionItem,
    href: String,
}

/// Dropdown candidates for the search bar; lookup failures yield an empty list.
pub async fn suggestions(
    Extension(catalog): Extension<Catalog>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Suggestion>>, AppError> {
    let category = params.category()?;
    let items = fetch_suggestions(
        catalog.lookup.as_ref(),
        &params.query,
        category,
        catalog.language(),
    )
    .await;

    let suggestions = items
        .into_iter()
        .map(|item| Suggestion {
            href: Route::detail(item.category, item.id).href(&catalog.base_path),
            item,
        })
        .collect();

    Ok(Json(suggestions))
}

/// Full results page behind a submitted search.
pub async fn search(
    Extension(catalog): Extension<Catalog>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Page<Value>>, AppError> {
    let category = params.category()?;
    let page = params.page.unwrap_or(1);
    let query = params.query.trim();
    if query.is_empty() {
        return Ok(Json(Page::empty(page)));
    }

    let results = catalog
        .tmdb
        .search(query, category, catalog.language(), Some(page))
        .await
        .unwrap_or_else(|err| {
            tracing::warn!(
                query = %SanitizedQuery::new(query),
                error = %err,
                "Search lookup failed"
            );
            Page::empty(page)
        });

    Ok(Json(results))
}
