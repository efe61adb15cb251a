use axum::http::StatusCode;
use axum::{Extension, Json, Router, middleware, response::IntoResponse, routing::post};
use serde::{Deserialize, Serialize};

use crate::config::RateLimitConfig;
use crate::errors::AppError;
use crate::security::auth::{CurrentSession, authenticate};
use crate::security::json::ValidatedJson;
use crate::security::rate_limit::{RateLimiterState, enforce_rate_limit};
use crate::session::{AuthService, Session, SessionToken, SessionUser};
use crate::validation::form::{AuthForm, Field, FormMode};

pub fn router(rate_limit: RateLimitConfig) -> Router {
    Router::new()
        .route("/auth/validate", post(validate_field))
        .route(
            "/auth/signup",
            post(signup).layer(middleware::from_fn_with_state(
                RateLimiterState::new(rate_limit),
                enforce_rate_limit,
            )),
        )
        .route(
            "/auth/login",
            post(login).layer(middleware::from_fn_with_state(
                RateLimiterState::new(rate_limit),
                enforce_rate_limit,
            )),
        )
        .route(
            "/auth/logout",
            post(logout).layer(middleware::from_fn(authenticate)),
        )
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidateRequest {
    field: Field,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    field: Field,
    valid: bool,
    message: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

impl LoginRequest {
    fn into_form(self) -> AuthForm {
        let mut form = AuthForm::new(FormMode::Login);
        form.update(Field::Email, self.email);
        form.update(Field::Password, self.password);
        form
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    confirm_password: String,
}

impl SignupRequest {
    fn into_form(self) -> AuthForm {
        let mut form = AuthForm::new(FormMode::Signup);
        form.update(Field::Username, self.username);
        form.update(Field::Email, self.email);
        form.update(Field::Password, self.password);
        form.update(Field::ConfirmPassword, self.confirm_password);
        form
    }
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: SessionToken,
    user: SessionUser,
}

impl From<&Session> for AuthResponse {
    fn from(session: &Session) -> Self {
        Self {
            token: session.token,
            user: SessionUser::from(session),
        }
    }
}

/// Per-keystroke check of one field against its rule table.
pub async fn validate_field(
    ValidatedJson(payload): ValidatedJson<ValidateRequest>,
) -> Json<ValidateResponse> {
    let message = payload.field.rules().first_failure(&payload.value);
    Json(ValidateResponse {
        field: payload.field,
        valid: message.is_none(),
        message,
    })
}

pub async fn login(
    Extension(auth): Extension<AuthService>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut form = payload.into_form();
    form.validate_for_submit()?;

    let session = auth
        .login(form.value(Field::Email), form.value(Field::Password))
        .await?;

    Ok((StatusCode::OK, Json(AuthResponse::from(&session))))
}

pub async fn signup(
    Extension(auth): Extension<AuthService>,
    ValidatedJson(payload): ValidatedJson<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut form = payload.into_form();
    form.validate_for_submit()?;

    let session = auth
        .signup(
            form.value(Field::Email),
            form.value(Field::Password),
            form.value(Field::Username),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(AuthResponse::from(&session))))
}

pub async fn logout(
    Extension(auth): Extension<AuthService>,
    CurrentSession(session): CurrentSession,
) -> Result<StatusCode, AppError> {
    auth.logout(&session.token).await?;
    Ok(StatusCode::NO_CONTENT)
}
