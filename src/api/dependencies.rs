//! Task dependency handlers
//!
//! Dependency writes validate endpoints, the same-project rule, direct
//! self-loops, and exact duplicates. There is no transitive cycle
//! detection.

use super::AppState;
use crate::error::Result;
use crate::types::{NewDependency, TaskDependency};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

/// Query parameters for dependency listing
#[derive(Debug, Deserialize)]
pub struct DependencyListQuery {
    /// Restrict to edges touching this task on either side
    task_id: Option<i64>,
}

pub async fn list_dependencies(
    State(state): State<AppState>,
    Query(query): Query<DependencyListQuery>,
) -> Result<Json<Vec<TaskDependency>>> {
    Ok(Json(state.store.list_dependencies(query.task_id).await?))
}

pub async fn create_dependency(
    State(state): State<AppState>,
    Json(new): Json<NewDependency>,
) -> Result<(StatusCode, Json<TaskDependency>)> {
    let dependency = state.store.create_dependency(new).await?;
    Ok((StatusCode::CREATED, Json(dependency)))
}

pub async fn delete_dependency(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    state.store.delete_dependency(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
