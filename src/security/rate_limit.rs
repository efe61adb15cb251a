use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use dashmap::{DashMap, mapref::entry::Entry};
use parking_lot::Mutex;

use crate::config::RateLimitConfig;
use crate::errors::AppError;
use crate::logging::{SanitizedIpAddr, SecurityEvent};

/// Fixed-window attempt counter keyed by client IP.
///
/// Windows that have run out are swept at most once per window length, so
/// the map only holds clients seen recently.
#[derive(Clone)]
pub struct RateLimiterState {
    limit: RateLimitConfig,
    windows: Arc<DashMap<IpAddr, AttemptWindow>>,
    last_sweep: Arc<Mutex<Instant>>,
}

#[derive(Debug)]
struct AttemptWindow {
    opened_at: Instant,
    attempts: u32,
}

impl RateLimiterState {
    pub fn new(limit: RateLimitConfig) -> Self {
        Self {
            limit,
            windows: Arc::new(DashMap::new()),
            last_sweep: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Client identity used for counting. Forwarding headers are only
    /// honoured when the deployment says a proxy rewrites them.
    fn client_ip(&self, headers: &HeaderMap, peer: IpAddr) -> IpAddr {
        if self.limit.trust_proxy_headers {
            forwarded_ip(headers).unwrap_or(peer)
        } else {
            peer
        }
    }

    /// Counts one attempt; on refusal returns how long until the window reopens.
    fn attempt(&self, ip: IpAddr, now: Instant) -> Result<(), Duration> {
        self.sweep(now);

        let window = self.limit.window;
        let mut entry = match self.windows.entry(ip) {
            Entry::Vacant(vacant) => {
                vacant.insert(AttemptWindow {
                    opened_at: now,
                    attempts: 1,
                });
                return Ok(());
            }
            Entry::Occupied(occupied) => occupied,
        };

        let current = entry.get_mut();
        if now.saturating_duration_since(current.opened_at) >= window {
            *current = AttemptWindow {
                opened_at: now,
                attempts: 0,
            };
        }

        if current.attempts >= self.limit.burst.get() {
            let elapsed = now.saturating_duration_since(current.opened_at);
            return Err(window.saturating_sub(elapsed));
        }

        current.attempts += 1;
        Ok(())
    }

    fn sweep(&self, now: Instant) {
        let window = self.limit.window;
        {
            let mut last_sweep = self.last_sweep.lock();
            if now.saturating_duration_since(*last_sweep) < window {
                return;
            }
            *last_sweep = now;
        }

        let before = self.windows.len();
        self.windows
            .retain(|_, current| now.saturating_duration_since(current.opened_at) < window);
        tracing::trace!(
            before,
            after = self.windows.len(),
            "Swept expired rate limit windows"
        );
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

pub async fn enforce_rate_limit(
    State(limiter): State<RateLimiterState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client_ip = limiter.client_ip(request.headers(), peer.ip());

    if let Err(reopens_in) = limiter.attempt(client_ip, Instant::now()) {
        crate::log_security_event!(
            SecurityEvent::RateLimitExceeded,
            client_ip = %SanitizedIpAddr::new(client_ip),
            path = %request.uri().path(),
            "Too many auth attempts from client"
        );

        return Err(AppError::RateLimitExceeded {
            retry_after: Some(reopens_in.max(Duration::from_secs(1))),
        });
    }

    Ok(next.run(request).await)
}

/// First hop of `X-Forwarded-For`, else `X-Real-IP`.
fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let header_ip = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| raw.split(',').next())
            .and_then(|ip| ip.trim().parse::<IpAddr>().ok())
    };

    header_ip("x-forwarded-for").or_else(|| header_ip("x-real-ip"))
}
