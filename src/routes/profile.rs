use axum::{Json, Router, middleware, routing::get};

use crate::security::auth::{CurrentSession, authenticate};
use crate::session::SessionUser;

pub fn router() -> Router {
    Router::new().route(
        "/profile",
        get(show_profile).layer(middleware::from_fn(authenticate)),
    )
}

pub async fn show_profile(CurrentSession(session): CurrentSession) -> Json<SessionUser> {
    tracing::debug!(uid = %session.user.uid, "Serving profile");
    Json(SessionUser::from(&session))
}
