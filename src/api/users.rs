//! User CRUD handlers

use super::AppState;
use crate::error::Result;
use crate::types::{NewUser, User, UserUpdate};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>> {
    Ok(Json(state.store.list_users().await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(new): Json<NewUser>,
) -> Result<(StatusCode, Json<User>)> {
    let user = state.store.create_user(new).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<User>> {
    Ok(Json(state.store.get_user(id).await?))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<UserUpdate>,
) -> Result<Json<User>> {
    Ok(Json(state.store.update_user(id, update).await?))
}

pub async fn delete_user(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    state.store.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
