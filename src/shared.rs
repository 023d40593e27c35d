use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::auth::token::TokenConfig;
use crate::room::registry::RoomRegistry;
use crate::signaling::coordinator::SessionCoordinator;

/// Shared application state containing all dependencies
///
/// The registry is the only shared mutable state in the process; the
/// coordinator is stateless over it.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RoomRegistry>,
    pub coordinator: Arc<SessionCoordinator>,
    pub token_config: TokenConfig,
}

impl AppState {
    pub fn new() -> Self {
        let registry = Arc::new(RoomRegistry::new());
        let coordinator = Arc::new(SessionCoordinator::new(Arc::clone(&registry)));
        Self {
            registry,
            coordinator,
            token_config: TokenConfig::new(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::JwtError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}
