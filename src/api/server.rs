//! HTTP server setup and routing

use super::{dependencies, projects, risk, tasks, users, AppState};
use crate::error::ForesightError;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Server address
    pub addr: SocketAddr,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            addr: ([127, 0, 0, 1], 8000).into(),
        }
    }
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
}

impl ApiServer {
    /// Create a new API server over shared state
    pub fn new(config: ApiServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Build the router with all routes and middleware
    pub fn build_router(state: AppState) -> Router {
        let api = Router::new()
            .route("/users", get(users::list_users).post(users::create_user))
            .route(
                "/users/:id",
                get(users::get_user)
                    .put(users::update_user)
                    .delete(users::delete_user),
            )
            .route(
                "/projects",
                get(projects::list_projects).post(projects::create_project),
            )
            .route(
                "/projects/:id",
                get(projects::get_project)
                    .put(projects::update_project)
                    .delete(projects::delete_project),
            )
            .route("/tasks", get(tasks::list_tasks).post(tasks::create_task))
            .route(
                "/tasks/:id",
                get(tasks::get_task)
                    .put(tasks::update_task)
                    .delete(tasks::delete_task),
            )
            .route(
                "/tasks/:id/comments",
                get(tasks::list_comments).post(tasks::create_comment),
            )
            .route(
                "/dependencies",
                get(dependencies::list_dependencies).post(dependencies::create_dependency),
            )
            .route("/dependencies/:id", delete(dependencies::delete_dependency))
            .route("/risk/predict", post(risk::predict_risk))
            .route("/risk/task/:id", get(risk::task_risk))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                require_token,
            ));

        Router::new()
            .route("/health", get(health_handler))
            .nest("/api/v1", api)
            .with_state(state)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Start serving
    ///
    /// Tries the configured address first, then a few alternative ports
    /// when the primary is taken (e.g., another instance running).
    pub async fn serve(self) -> anyhow::Result<()> {
        let router = Self::build_router(self.state);

        match tokio::net::TcpListener::bind(self.config.addr).await {
            Ok(listener) => {
                info!("API server listening on http://{}", self.config.addr);
                axum::serve(listener, router).await?;
                return Ok(());
            }
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                debug!(
                    "Port {} in use, trying alternative ports...",
                    self.config.addr.port()
                );
            }
            Err(e) => return Err(e.into()),
        }

        let base_port = self.config.addr.port();
        for offset in 1..=10 {
            let alt_addr = SocketAddr::new(self.config.addr.ip(), base_port + offset);
            match tokio::net::TcpListener::bind(alt_addr).await {
                Ok(listener) => {
                    info!("API server listening on http://{}", alt_addr);
                    axum::serve(listener, router).await?;
                    return Ok(());
                }
                Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(anyhow::anyhow!(
            "All ports ({}-{}) are in use, API server unavailable",
            base_port,
            base_port + 10
        ))
    }
}

/// Bearer-token check applied to /api/v1 routes
///
/// A no-op when no token is configured.
async fn require_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ForesightError> {
    if let Some(expected) = &state.api_token {
        let supplied = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));
        if supplied != Some(expected.as_str()) {
            return Err(ForesightError::Unauthorized);
        }
    }
    Ok(next.run(request).await)
}

/// Health check handler
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
