//! Task and task-comment handlers

use super::AppState;
use crate::error::Result;
use crate::storage::TaskFilter;
use crate::types::{NewTask, Task, TaskComment, TaskStatus, TaskUpdate};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

/// Query parameters for task listing
#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    project_id: Option<i64>,
    status: Option<String>,
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<Vec<Task>>> {
    let status = query.status.as_deref().map(TaskStatus::parse).transpose()?;
    let filter = TaskFilter {
        project_id: query.project_id,
        status,
    };
    Ok(Json(state.store.list_tasks(filter).await?))
}

pub async fn create_task(
    State(state): State<AppState>,
    Json(new): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>)> {
    let task = state.store.create_task(new).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Task>> {
    Ok(Json(state.store.get_task(id).await?))
}

pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<TaskUpdate>,
) -> Result<Json<Task>> {
    Ok(Json(state.store.update_task(id, update).await?))
}

pub async fn delete_task(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    state.store.delete_task(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Payload for creating a comment
#[derive(Debug, Deserialize)]
pub struct NewComment {
    content: String,
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<TaskComment>>> {
    Ok(Json(state.store.list_comments(id).await?))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(new): Json<NewComment>,
) -> Result<(StatusCode, Json<TaskComment>)> {
    let comment = state.store.add_comment(id, new.content).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}
