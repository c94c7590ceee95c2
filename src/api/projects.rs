//! Project CRUD handlers

use super::AppState;
use crate::error::Result;
use crate::types::{NewProject, Project, ProjectUpdate};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

pub async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<Project>>> {
    Ok(Json(state.store.list_projects().await?))
}

pub async fn create_project(
    State(state): State<AppState>,
    Json(new): Json<NewProject>,
) -> Result<(StatusCode, Json<Project>)> {
    let project = state.store.create_project(new).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Project>> {
    Ok(Json(state.store.get_project(id).await?))
}

pub async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<ProjectUpdate>,
) -> Result<Json<Project>> {
    Ok(Json(state.store.update_project(id, update).await?))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    state.store.delete_project(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
