use axum::{
    Extension, async_trait,
    extract::{FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::session::{AuthService, Session};

/// Session resolved by [`authenticate`] for the current request.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

/// Resolves `Authorization: Bearer <token>` to a live session.
pub async fn authenticate(
    Extension(auth): Extension<AuthService>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header_value = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or(AppError::MissingAuthHeader)?;

    let header_str = header_value
        .to_str()
        .map_err(|_| AppError::InvalidAuthHeader)?;

    let token = header_str
        .strip_prefix("Bearer ")
        .ok_or(AppError::InvalidAuthHeader)?;

    let token = Uuid::parse_str(token.trim()).map_err(|_| AppError::InvalidSession)?;
    let session = auth.current(&token).ok_or(AppError::InvalidSession)?;

    request.extensions_mut().insert(CurrentSession(session));

    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentSession>()
            .cloned()
            .ok_or(AppError::MissingSession)
    }
}
