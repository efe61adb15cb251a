pub mod auth;
pub mod config;
pub mod errors;
pub mod logging;
pub mod media;
pub mod navigation;
pub mod routes;
pub mod search;
pub mod security;
pub mod session;
pub mod validation;

use axum::{Extension, Router, extract::DefaultBodyLimit};

use config::RateLimitConfig;
use routes::{Catalog, create_router};
use session::AuthService;

/// Router with every service injected, ready to be served.
pub fn build_app(catalog: Catalog, auth: AuthService, auth_rate_limit: RateLimitConfig) -> Router {
    create_router(auth_rate_limit)
        .layer(DefaultBodyLimit::max(security::json::MAX_BODY_SIZE_BYTES))
        .layer(Extension(auth))
        .layer(Extension(catalog))
}
