use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

#[derive(Debug)]
struct WindowState {
    start: Instant,
    count: u32,
}

/// Fixed one-second window per session, so a double-clicking client cannot
/// fire several paid model calls at once.
#[derive(Clone, Debug)]
pub struct SessionRateLimiter {
    rps: u32,
    windows: Arc<Mutex<HashMap<String, WindowState>>>,
}

impl SessionRateLimiter {
    fn new(rps: u32) -> Self {
        Self {
            rps: rps.max(1),
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn allow(&self, key: &str) -> bool {
        let mut guard = self.windows.lock().expect("rate limiter mutex poisoned");
        let now = Instant::now();
        guard.retain(|_, w| now.duration_since(w.start) < Duration::from_secs(60));
        let window = guard.entry(key.to_string()).or_insert(WindowState {
            start: now,
            count: 0,
        });
        if now.duration_since(window.start) >= Duration::from_secs(1) {
            window.start = now;
            window.count = 0;
        }
        if window.count < self.rps {
            window.count += 1;
            true
        } else {
            false
        }
    }
}

/// `/api/sessions/{id}/...` → `{id}`; anything else shares one bucket.
fn session_key(path: &str) -> &str {
    path.strip_prefix("/api/sessions/")
        .and_then(|rest| rest.split('/').next())
        .filter(|id| !id.is_empty())
        .unwrap_or("")
}

pub async fn session_rps_middleware(
    State(limiter): State<SessionRateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let key = session_key(req.uri().path()).to_string();
    if !limiter.allow(&key) {
        tracing::warn!(session_id = %key, "session action rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"error": "rate_limit_exceeded", "retry": true})),
        )
            .into_response();
    }
    next.run(req).await
}

pub fn new_session_limiter(rps: u32) -> SessionRateLimiter {
    SessionRateLimiter::new(rps)
}
