pub mod config;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

#[cfg(test)]
pub(crate) mod test_support;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::services::{
    gemini_service::GeminiService,
    model_client::{ModelClient, ResponseCache, TextGenerator},
    quiz_service::QuizService,
    session_service::SessionService,
};
use axum::{
    routing::{get, post},
    Router,
};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionService,
    pub quiz_service: QuizService,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.model_timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        let gemini = GeminiService::new(http_client, &config.gemini_api_base, &config.gemini_model)?;
        Ok(Self::with_generator(config, Arc::new(gemini)))
    }

    /// Wires the services around any text generator.
    pub fn with_generator(config: &Config, generator: Arc<dyn TextGenerator>) -> Self {
        let model = ModelClient::new(
            generator,
            ResponseCache::new(config.cache_capacity),
            config.model_max_attempts,
            Duration::from_millis(config.model_backoff_ms),
        );
        let quiz_service = QuizService::new(
            model,
            config.question_temperature,
            config.grading_temperature,
            config.max_duplicate_retries,
        );

        Self {
            sessions: SessionService::new(),
            quiz_service,
        }
    }
}

/// Session and catalog API. Static assets and tracing layers are added by the binary.
pub fn build_router(state: AppState, session_rps: u32) -> Router {
    let actions = Router::new()
        .route(
            "/api/sessions/:id/actions",
            post(routes::session::dispatch_action),
        )
        .layer(axum::middleware::from_fn_with_state(
            middleware::rate_limit::new_session_limiter(session_rps),
            middleware::rate_limit::session_rps_middleware,
        ));

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/catalog", get(routes::catalog::get_catalog))
        .route("/api/sessions", post(routes::session::create_session))
        .route(
            "/api/sessions/:id",
            get(routes::session::get_session).delete(routes::session::end_session),
        )
        .merge(actions)
        .with_state(state)
}
