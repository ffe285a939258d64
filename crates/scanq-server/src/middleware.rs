use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use subtle::{Choice, ConstantTimeEq};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::{ApiError, ErrorCode};

const REQUEST_ID_HEADER: &str = "x-request-id";
const MAX_REQUEST_ID_LEN: usize = 128;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Who is calling, as established by [`require_bearer_auth`].
///
/// Inserted into request extensions and read by handlers; the domain crates
/// never see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// `anonymous` when auth is disabled, otherwise `key:` plus a short
    /// SHA-256 fingerprint of the bearer token.
    pub principal: String,
    pub authenticated: bool,
}

impl Session {
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            principal: "anonymous".to_owned(),
            authenticated: false,
        }
    }

    fn for_token(token: &str) -> Self {
        let digest = format!("{:x}", Sha256::digest(token.as_bytes()));
        Self {
            principal: format!("key:{}", &digest[..12]),
            authenticated: true,
        }
    }
}

/// Bearer tokens accepted by the API. An empty set means auth is off.
#[derive(Debug, Clone)]
pub struct AuthState {
    api_keys: Arc<[String]>,
}

impl AuthState {
    /// Reads `SCANQ_API_KEYS` (comma-separated bearer tokens).
    ///
    /// # Errors
    ///
    /// Fails outside development when no keys are configured.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let raw = std::env::var("SCANQ_API_KEYS").unwrap_or_default();
        Self::from_keys(&raw, is_development)
    }

    /// Parses a comma-separated key list, ignoring blanks and duplicates.
    ///
    /// # Errors
    ///
    /// Fails outside development when the list is empty.
    pub fn from_keys(raw: &str, is_development: bool) -> anyhow::Result<Self> {
        let mut keys: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
            .collect();
        keys.sort();
        keys.dedup();

        if keys.is_empty() && !is_development {
            anyhow::bail!("SCANQ_API_KEYS must list at least one bearer token outside development");
        }
        if keys.is_empty() {
            tracing::warn!("SCANQ_API_KEYS is empty; serving without bearer auth");
        }

        Ok(Self {
            api_keys: keys.into(),
        })
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        !self.api_keys.is_empty()
    }

    /// Checks every configured key so timing does not reveal which one matched.
    fn allows(&self, token: &str) -> bool {
        self.api_keys
            .iter()
            .fold(Choice::from(0), |acc, key| {
                acc | key.as_bytes().ct_eq(token.as_bytes())
            })
            .into()
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    opened_at: Instant,
    used: u32,
}

/// Fixed-window request budget, counted separately per session principal.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    budget: u32,
    window: Duration,
    callers: Arc<Mutex<HashMap<String, Window>>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(budget: u32, window: Duration) -> Self {
        Self {
            budget,
            window,
            callers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Spends one request for `principal`, or returns how long until its
    /// window reopens.
    async fn spend(&self, principal: &str, now: Instant) -> Result<(), Duration> {
        let mut callers = self.callers.lock().await;
        callers.retain(|_, w| now.duration_since(w.opened_at) < self.window);

        let window = callers.entry(principal.to_owned()).or_insert(Window {
            opened_at: now,
            used: 0,
        });
        if window.used >= self.budget {
            return Err(self.window.saturating_sub(now.duration_since(window.opened_at)));
        }
        window.used += 1;
        Ok(())
    }
}

fn request_id_of(req: &Request) -> String {
    req.extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default()
}

/// Tags the request with an ID and echoes it on the response.
///
/// A client-supplied `x-request-id` is kept when it is short printable ASCII;
/// anything else is replaced by a fresh `UUIDv4`.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| {
            !v.is_empty()
                && v.len() <= MAX_REQUEST_ID_LEN
                && v.bytes().all(|b| b.is_ascii_graphic())
        })
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_owned);

    req.extensions_mut().insert(RequestId(id.clone()));
    let mut res = next.run(req).await;
    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, val);
    }
    res
}

/// Resolves the caller's [`Session`] from the bearer token. Runs before
/// [`enforce_rate_limit`], which budgets per session.
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    let session = if auth.enabled() {
        let token = extract_bearer_token(req.headers().get(header::AUTHORIZATION));
        match token.filter(|t| auth.allows(t)) {
            Some(token) => Session::for_token(token),
            None => {
                tracing::debug!(path = %req.uri().path(), "rejected request without a valid bearer token");
                return ApiError::new(
                    request_id_of(&req),
                    ErrorCode::Unauthorized,
                    "missing or invalid bearer token",
                )
                .into_response();
            }
        }
    } else {
        Session::anonymous()
    };

    req.extensions_mut().insert(session);
    next.run(req).await
}

pub async fn enforce_rate_limit(
    State(limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let principal = req
        .extensions()
        .get::<Session>()
        .map_or_else(|| "anonymous".to_owned(), |s| s.principal.clone());

    match limit.spend(&principal, Instant::now()).await {
        Ok(()) => next.run(req).await,
        Err(wait) => {
            tracing::warn!(%principal, retry_after_secs = wait.as_secs(), "rate limit exceeded");
            let mut res = ApiError::new(
                request_id_of(&req),
                ErrorCode::RateLimited,
                "rate limit exceeded",
            )
            .into_response();
            res.headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(wait.as_secs().max(1)));
            res
        }
    }
}

/// Token from an `Authorization: Bearer <token>` header; the scheme is
/// case-insensitive.
fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    let (scheme, token) = value?.to_str().ok()?.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
