//! Server-side sessions and the auth service that creates them.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::{AuthProvider, AuthUser, ProfileStore, ProviderError, UserProfile};
use crate::log_security_event;
use crate::logging::{SanitizedEmail, SanitizedUsername, SecurityEvent};

/// Opaque bearer token handed to the page after login.
pub type SessionToken = Uuid;

#[derive(Debug, Clone)]
pub struct Session {
    pub token: SessionToken,
    pub user: AuthUser,
    pub profile: Option<UserProfile>,
    pub created_at: DateTime<Utc>,
}

/// What the page sees of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub uid: String,
    pub email: String,
    pub username: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<&Session> for SessionUser {
    fn from(session: &Session) -> Self {
        Self {
            uid: session.user.uid.clone(),
            email: session.user.email.clone(),
            username: session.profile.as_ref().map(|p| p.username.clone()),
            created_at: session.profile.as_ref().map(|p| p.created_at),
        }
    }
}

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

impl Session {
    fn expired(&self, ttl: TimeDelta, now: DateTime<Utc>) -> bool {
        self.created_at
            .checked_add_signed(ttl)
            .is_some_and(|expires_at| expires_at <= now)
    }
}

/// Sessions live for a fixed time after login. Expired entries are dropped
/// when looked up and whenever a new session is opened.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<SessionToken, Session>>,
    ttl: TimeDelta,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
        }
    }

    pub fn open(&self, user: AuthUser, profile: Option<UserProfile>) -> Session {
        self.open_at(user, profile, Utc::now())
    }

    fn open_at(&self, user: AuthUser, profile: Option<UserProfile>, now: DateTime<Utc>) -> Session {
        self.sweep(now);
        let session = Session {
            token: Uuid::new_v4(),
            user,
            profile,
            created_at: now,
        };
        self.sessions.insert(session.token, session.clone());
        session
    }

    pub fn get(&self, token: &SessionToken) -> Option<Session> {
        self.get_at(token, Utc::now())
    }

    /// Live session for `token` as of `now`; an expired one is removed.
    pub fn get_at(&self, token: &SessionToken, now: DateTime<Utc>) -> Option<Session> {
        let session = self.sessions.get(token).map(|entry| entry.value().clone())?;
        if session.expired(self.ttl, now) {
            self.sessions.remove(token);
            tracing::debug!(uid = %session.user.uid, "Session expired");
            return None;
        }
        Some(session)
    }

    pub fn sweep(&self, now: DateTime<Utc>) {
        let ttl = self.ttl;
        self.sessions.retain(|_, session| !session.expired(ttl, now));
    }

    pub fn close(&self, token: &SessionToken) -> Option<Session> {
        self.sessions.remove(token).map(|(_, session)| session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Login, signup and logout against the injected provider and profile store.
#[derive(Clone)]
pub struct AuthService {
    provider: Arc<dyn AuthProvider>,
    profiles: Arc<dyn ProfileStore>,
    sessions: SessionStore,
}

impl AuthService {
    pub fn new(provider: Arc<dyn AuthProvider>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self {
            provider,
            profiles,
            sessions: SessionStore::default(),
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.sessions = SessionStore::new(ttl);
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    #[tracing::instrument(name = "login", skip_all, fields(email = %SanitizedEmail::new(email)))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ProviderError> {
        let user = self.provider.sign_in(email, password).await.map_err(|err| {
            log_security_event!(
                SecurityEvent::LoginFailure,
                email = %SanitizedEmail::new(email),
                error = %err,
                "Login rejected by provider"
            );
            err
        })?;

        // A missing or unreadable profile does not block the login.
        let profile = match self.profiles.load_profile(&user).await {
            Ok(profile) => profile,
            Err(err) => {
                tracing::warn!(uid = %user.uid, error = %err, "Could not load user profile");
                None
            }
        };

        let session = self.sessions.open(user, profile);
        log_security_event!(
            SecurityEvent::LoginSuccess,
            uid = %session.user.uid,
            "User logged in"
        );
        Ok(session)
    }

    #[tracing::instrument(
        name = "signup",
        skip_all,
        fields(email = %SanitizedEmail::new(email), username = %SanitizedUsername::new(username))
    )]
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<Session, ProviderError> {
        let user = self.provider.sign_up(email, password).await.map_err(|err| {
            log_security_event!(
                SecurityEvent::SignupFailure,
                email = %SanitizedEmail::new(email),
                error = %err,
                "Signup rejected by provider"
            );
            err
        })?;

        let profile = UserProfile {
            username: username.to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        self.profiles
            .save_profile(&user, &profile)
            .await
            .map_err(|err| {
                tracing::error!(uid = %user.uid, error = %err, "Could not create user profile");
                err
            })?;

        let session = self.sessions.open(user, Some(profile));
        log_security_event!(
            SecurityEvent::SignupSuccess,
            uid = %session.user.uid,
            username = %SanitizedUsername::new(username),
            "User signed up"
        );
        Ok(session)
    }

    pub async fn logout(&self, token: &SessionToken) -> Result<(), ProviderError> {
        let Some(session) = self.sessions.close(token) else {
            return Ok(());
        };
        self.provider.sign_out(&session.user).await?;
        log_security_event!(SecurityEvent::Logout, uid = %session.user.uid, "User logged out");
        Ok(())
    }

    pub fn current(&self, token: &SessionToken) -> Option<Session> {
        self.sessions.get(token)
    }

    pub fn current_at(&self, token: &SessionToken, now: DateTime<Utc>) -> Option<Session> {
        self.sessions.get_at(token, now)
    }
}
