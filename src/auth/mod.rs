//! Auth provider and profile store collaborators.

pub mod identity;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use identity::{FirestoreProfiles, IdentityClient};

pub const WRONG_PASSWORD_MESSAGE: &str = "Mot de passe incorrect";
pub const USER_NOT_FOUND_MESSAGE: &str = "Utilisateur non trouvé";
pub const EMAIL_IN_USE_MESSAGE: &str = "Email déjà utilisé";
pub const GENERIC_MESSAGE: &str = "Une erreur est survenue. Veuillez réessayer.";

/// Account returned by the provider after a successful sign-in or sign-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub id_token: String,
}

/// Profile document stored alongside the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Failure reported by the provider, keyed by its error code.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("auth provider rejected the request: {code}")]
    Rejected { code: String },
    #[error("auth provider unreachable: {0}")]
    Transport(String),
    #[error("auth provider failed with HTTP {0}")]
    Unavailable(u16),
    #[error("unexpected auth provider response: {0}")]
    Decode(String),
}

impl ProviderError {
    pub fn rejected(code: impl Into<String>) -> Self {
        ProviderError::Rejected { code: code.into() }
    }

    pub fn kind(&self) -> AuthErrorKind {
        match self {
            ProviderError::Rejected { code } => AuthErrorKind::from_code(code),
            _ => AuthErrorKind::Other,
        }
    }

    /// French message shown above the form.
    pub fn user_message(&self) -> &'static str {
        self.kind().user_message()
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        ProviderError::Transport(error.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    WrongPassword,
    UserNotFound,
    EmailAlreadyInUse,
    Other,
}

impl AuthErrorKind {
    /// Accepts both SDK-style (`auth/wrong-password`) and REST-style
    /// (`INVALID_PASSWORD`) codes. REST messages may carry a detail suffix
    /// after `" : "`, which is ignored.
    pub fn from_code(code: &str) -> Self {
        let code = code.split(" : ").next().unwrap_or(code).trim();
        match code {
            "auth/wrong-password" | "INVALID_PASSWORD" => AuthErrorKind::WrongPassword,
            "auth/user-not-found" | "EMAIL_NOT_FOUND" => AuthErrorKind::UserNotFound,
            "auth/email-already-in-use" | "EMAIL_EXISTS" => AuthErrorKind::EmailAlreadyInUse,
            _ => AuthErrorKind::Other,
        }
    }

    pub fn user_message(self) -> &'static str {
        match self {
            AuthErrorKind::WrongPassword => WRONG_PASSWORD_MESSAGE,
            AuthErrorKind::UserNotFound => USER_NOT_FOUND_MESSAGE,
            AuthErrorKind::EmailAlreadyInUse => EMAIL_IN_USE_MESSAGE,
            AuthErrorKind::Other => GENERIC_MESSAGE,
        }
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, ProviderError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, ProviderError>;

    async fn sign_out(&self, user: &AuthUser) -> Result<(), ProviderError>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn save_profile(&self, user: &AuthUser, profile: &UserProfile)
    -> Result<(), ProviderError>;

    async fn load_profile(&self, user: &AuthUser) -> Result<Option<UserProfile>, ProviderError>;
}
