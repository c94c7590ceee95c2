//! Risk prediction handlers

use super::AppState;
use crate::error::Result;
use crate::types::{RiskFactors, RiskPrediction};
use axum::{
    extract::{Path, State},
    Json,
};

/// Predict risk from caller-supplied factors
pub async fn predict_risk(
    State(state): State<AppState>,
    Json(factors): Json<RiskFactors>,
) -> Result<Json<RiskPrediction>> {
    factors.validate()?;
    Ok(Json(state.risk.predict_from_factors(&factors)))
}

/// Predict risk for a persisted task
///
/// The task-derived score is authoritative; importances and suggestions
/// come from the factor path with the placeholder inputs tasks cannot
/// supply.
pub async fn task_risk(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<RiskPrediction>> {
    let task = state.store.get_task(id).await?;
    Ok(Json(state.risk.predict_for_task(&task)))
}
