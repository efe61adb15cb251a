use std::sync::Arc;

use axum::Router;

use crate::config::RateLimitConfig;
use crate::media::{MediaLookup, TmdbClient, WikipediaClient};

pub mod auth;
pub mod catalog;
pub mod profile;
pub mod search;

/// Media services shared by the search and catalog handlers.
#[derive(Clone)]
pub struct Catalog {
    pub tmdb: TmdbClient,
    pub wiki: WikipediaClient,
    pub lookup: Arc<dyn MediaLookup>,
    pub base_path: Arc<str>,
}

impl Catalog {
    pub fn new(tmdb: TmdbClient, wiki: WikipediaClient, base_path: impl Into<Arc<str>>) -> Self {
        Self {
            lookup: Arc::new(tmdb.clone()),
            tmdb,
            wiki,
            base_path: base_path.into(),
        }
    }

    pub fn language(&self) -> &str {
        self.tmdb.language()
    }
}

pub fn create_router(auth_rate_limit: RateLimitConfig) -> Router {
    tracing::debug!("Creating application router");
    Router::new()
        .merge(auth::router(auth_rate_limit))
        .merge(profile::router())
        .merge(search::router())
        .merge(catalog::router())
}
