//! HTTP API for the Foresight backend

mod dependencies;
mod projects;
mod risk;
mod server;
mod tasks;
mod users;

pub use server::{ApiServer, ApiServerConfig};

use crate::error::ForesightError;
use crate::risk::RiskService;
use crate::storage::SqliteStore;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

/// Shared state injected into request handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SqliteStore>,
    pub risk: Arc<RiskService>,
    /// Expected bearer token; None disables authentication
    pub api_token: Option<String>,
}

impl IntoResponse for ForesightError {
    fn into_response(self) -> Response {
        let status = match &self {
            ForesightError::NotFound(_) => StatusCode::NOT_FOUND,
            ForesightError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ForesightError::Conflict(_) => StatusCode::CONFLICT,
            ForesightError::Unauthorized => StatusCode::UNAUTHORIZED,
            other => {
                error!("Internal error serving request: {}", other);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
