use std::fmt;

/// Sanitized wrapper for email addresses that masks the local part
#[derive(Debug, Clone)]
pub struct SanitizedEmail(String);

impl SanitizedEmail {
    pub fn new(email: impl AsRef<str>) -> Self {
        Self(Self::sanitize(email.as_ref()))
    }

    fn sanitize(email: &str) -> String {
        match email.split_once('@') {
            Some((local, domain)) => {
                let mut chars = local.chars();
                let masked_local = match (chars.next(), local.chars().count()) {
                    (Some(first), len) if len > 2 => format!("{first}***"),
                    (_, len) => "*".repeat(len),
                };
                format!("{masked_local}@{domain}")
            }
            // Invalid email format, mask entirely
            None => "***@***".to_string(),
        }
    }
}

impl fmt::Display for SanitizedEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sanitized wrapper for usernames that shows only first and last character
#[derive(Debug, Clone)]
pub struct SanitizedUsername(String);

impl SanitizedUsername {
    pub fn new(username: impl AsRef<str>) -> Self {
        Self(Self::sanitize(username.as_ref()))
    }

    fn sanitize(username: &str) -> String {
        let len = username.chars().count();
        match (username.chars().next(), username.chars().last()) {
            (Some(first), Some(last)) if len > 4 => format!("{first}***{last}"),
            (Some(first), _) if len > 2 => format!("{first}***"),
            _ => "*".repeat(len),
        }
    }
}

impl fmt::Display for SanitizedUsername {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Free-text search input reduced to its length, since users type names
/// and other personal data into the search bar.
#[derive(Debug, Clone, Copy)]
pub struct SanitizedQuery {
    chars: usize,
}

impl SanitizedQuery {
    pub fn new(query: impl AsRef<str>) -> Self {
        Self {
            chars: query.as_ref().chars().count(),
        }
    }
}

impl fmt::Display for SanitizedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} chars>", self.chars)
    }
}

/// Sanitized wrapper for IP addresses that masks the last octet
#[derive(Debug, Clone)]
pub struct SanitizedIpAddr(String);

impl SanitizedIpAddr {
    pub fn new(ip: impl fmt::Display) -> Self {
        Self(Self::sanitize(&ip.to_string()))
    }

    fn sanitize(ip: &str) -> String {
        if let Some(last_dot) = ip.rfind('.') {
            format!("{}.***", &ip[..last_dot])
        } else if let Some(last_colon) = ip.rfind(':') {
            format!("{}:****", &ip[..last_colon])
        } else {
            "***".to_string()
        }
    }
}

impl fmt::Display for SanitizedIpAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Security event types for structured logging
#[derive(Debug, Clone, Copy)]
pub enum SecurityEvent {
    LoginSuccess,
    LoginFailure,
    SignupSuccess,
    SignupFailure,
    Logout,
    SessionRejected,
    RateLimitExceeded,
    ProviderUnavailable,
}

impl SecurityEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEvent::LoginSuccess => "login_success",
            SecurityEvent::LoginFailure => "login_failure",
            SecurityEvent::SignupSuccess => "signup_success",
            SecurityEvent::SignupFailure => "signup_failure",
            SecurityEvent::Logout => "logout",
            SecurityEvent::SessionRejected => "session_rejected",
            SecurityEvent::RateLimitExceeded => "rate_limit_exceeded",
            SecurityEvent::ProviderUnavailable => "provider_unavailable",
        }
    }

    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            SecurityEvent::LoginFailure
                | SecurityEvent::SessionRejected
                | SecurityEvent::RateLimitExceeded
                | SecurityEvent::ProviderUnavailable
        )
    }
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log a security event with sanitized context
#[macro_export]
macro_rules! log_security_event {
    ($event:expr, $($field:tt)*) => {
        if $event.is_critical() {
            tracing::warn!(
                security_event = %$event,
                event_type = "security",
                $($field)*
            );
        } else {
            tracing::info!(
                security_event = %$event,
                event_type = "security",
                $($field)*
            );
        }
    };
}
