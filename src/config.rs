use std::{net::SocketAddr, num::NonZeroU32, str::FromStr, time::Duration};

use dotenvy::dotenv;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_BASE_PATH: &str = "/cineverse";
pub const DEFAULT_LANGUAGE: &str = "fr-FR";
pub const DEFAULT_TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
pub const DEFAULT_WIKIPEDIA_BASE_URL: &str = "https://fr.wikipedia.org/api/rest_v1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Throttle applied to the login and signup endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub burst: NonZeroU32,
    pub window: Duration,
    /// Key clients on `X-Forwarded-For` / `X-Real-IP` instead of the peer
    /// address. Only safe behind a proxy that overwrites those headers.
    pub trust_proxy_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            burst: NonZeroU32::MIN.saturating_add(9),
            window: Duration::from_secs(60),
            trust_proxy_headers: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub base_path: String,
    pub language: String,
    pub tmdb_api_key: String,
    pub tmdb_base_url: String,
    pub firebase_api_key: String,
    pub firebase_project_id: String,
    pub identity_base_url: String,
    pub firestore_base_url: String,
    pub wikipedia_base_url: String,
    pub http_timeout: Duration,
    pub session_ttl: Duration,
    pub auth_rate_limit: RateLimitConfig,
}

impl AppConfig {
    /// Reads the process environment, after loading `.env` if present.
    #[tracing::instrument(name = "load_config")]
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        let config = Self::from_lookup(|name| std::env::var(name).ok())?;

        tracing::debug!(
            bind_addr = %config.bind_addr,
            base_path = %config.base_path,
            language = %config.language,
            http_timeout_secs = config.http_timeout.as_secs(),
            "Configuration loaded"
        );
        Ok(config)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let burst: u32 = vars.parsed("AUTH_RATE_LIMIT_BURST", 10)?;
        let burst = NonZeroU32::new(burst).ok_or(ConfigError::Invalid {
            name: "AUTH_RATE_LIMIT_BURST",
            value: burst.to_string(),
        })?;

        Ok(Self {
            bind_addr: vars.parsed("CINEVERSE_BIND_ADDR", default_bind_addr())?,
            base_path: vars.or("CINEVERSE_BASE_PATH", DEFAULT_BASE_PATH),
            language: vars.or("CINEVERSE_LANGUAGE", DEFAULT_LANGUAGE),
            tmdb_api_key: vars.required("TMDB_API_KEY")?,
            tmdb_base_url: vars.or("TMDB_BASE_URL", DEFAULT_TMDB_BASE_URL),
            firebase_api_key: vars.required("FIREBASE_API_KEY")?,
            firebase_project_id: vars.required("FIREBASE_PROJECT_ID")?,
            identity_base_url: vars.or("IDENTITY_BASE_URL", DEFAULT_IDENTITY_BASE_URL),
            firestore_base_url: vars.or("FIRESTORE_BASE_URL", DEFAULT_FIRESTORE_BASE_URL),
            wikipedia_base_url: vars.or("WIKIPEDIA_BASE_URL", DEFAULT_WIKIPEDIA_BASE_URL),
            http_timeout: Duration::from_secs(vars.parsed("HTTP_TIMEOUT_SECS", 10)?),
            session_ttl: Duration::from_secs(vars.parsed("SESSION_TTL_SECS", 3600)?),
            auth_rate_limit: RateLimitConfig {
                burst,
                window: Duration::from_secs(vars.parsed("AUTH_RATE_LIMIT_WINDOW_SECS", 60)?),
                trust_proxy_headers: vars.parsed("TRUST_PROXY_HEADERS", false)?,
            },
        })
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&'static str) -> Option<String>,
{
    fn get(&self, name: &'static str) -> Option<String> {
        (self.0)(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.get(name).ok_or(ConfigError::Missing(name))
    }

    fn or(&self, name: &'static str, default: &str) -> String {
        self.get(name).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T: FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        match self.get(name) {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid { name, value }),
            None => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&'static str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<&'static str, String> =
            pairs.iter().map(|(k, v)| (*k, v.to_string())).collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("TMDB_API_KEY", "tmdb-key"),
        ("FIREBASE_API_KEY", "firebase-key"),
        ("FIREBASE_PROJECT_ID", "cineverse-test"),
    ];

    #[test]
    fn test_defaults_apply() {
        let config = load(&REQUIRED).unwrap();
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.base_path, "/cineverse");
        assert_eq!(config.language, "fr-FR");
        assert_eq!(config.tmdb_base_url, DEFAULT_TMDB_BASE_URL);
        assert_eq!(config.http_timeout, Duration::from_secs(10));
        assert_eq!(config.session_ttl, Duration::from_secs(3600));
        assert_eq!(config.wikipedia_base_url, DEFAULT_WIKIPEDIA_BASE_URL);
        assert_eq!(config.auth_rate_limit, RateLimitConfig::default());
        assert!(!config.auth_rate_limit.trust_proxy_headers);
        assert_eq!(config.auth_rate_limit.burst.get(), 10);
    }

    #[test]
    fn test_missing_required_key_is_named() {
        let err = load(&REQUIRED[..2]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("FIREBASE_PROJECT_ID")));
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let mut vars = REQUIRED.to_vec();
        vars[0] = ("TMDB_API_KEY", "   ");
        assert!(matches!(
            load(&vars).unwrap_err(),
            ConfigError::Missing("TMDB_API_KEY")
        ));
    }

    #[test]
    fn test_overrides_are_parsed() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("CINEVERSE_BIND_ADDR", "127.0.0.1:8080"),
            ("CINEVERSE_LANGUAGE", "en-US"),
            ("AUTH_RATE_LIMIT_BURST", "3"),
            ("AUTH_RATE_LIMIT_WINDOW_SECS", "300"),
            ("TRUST_PROXY_HEADERS", "true"),
            ("SESSION_TTL_SECS", "900"),
        ]);
        let config = load(&vars).unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.language, "en-US");
        assert_eq!(config.auth_rate_limit.burst.get(), 3);
        assert_eq!(config.auth_rate_limit.window, Duration::from_secs(300));
        assert!(config.auth_rate_limit.trust_proxy_headers);
        assert_eq!(config.session_ttl, Duration::from_secs(900));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("HTTP_TIMEOUT_SECS", "soon"));
        assert!(matches!(
            load(&vars).unwrap_err(),
            ConfigError::Invalid { name: "HTTP_TIMEOUT_SECS", .. }
        ));

        let mut vars = REQUIRED.to_vec();
        vars.push(("AUTH_RATE_LIMIT_BURST", "0"));
        assert!(load(&vars).is_err());
    }
}
