//! Attendance service routes

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use uuid::Uuid;

use crate::{error::ApiError, standings::compute_standings, state::AppState};

/// Create the router for the attendance service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/session/current", get(current_session))
        .route("/roster", get(get_roster))
        .route("/attendance", get(get_attendance))
        .route("/attendance/live", get(attendance_live))
        .route("/attendance/:student_id/check-in", post(check_in))
        .route("/attendance/:student_id/check-out", post(check_out))
        .route("/standings", get(get_standings))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "attendance-service"
    }))
}

/// Resolve (and lazily create) the session for the current club date
pub async fn current_session(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let session = state.active_session().await.map_err(|e| {
        tracing::error!("Failed to resolve session: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(session))
}

/// Active students, ordered by grade then last name
pub async fn get_roster(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let students = state.roster.list_active_students().await.map_err(|e| {
        tracing::error!("Failed to list roster: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(students))
}

/// Snapshot of the attendance view for the active session
pub async fn get_attendance(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    state.active_session().await?;
    let view = state.view.read().await.clone();

    Ok(Json(view))
}

/// Realtime-sync liveness for the UI indicator
pub async fn attendance_live(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "connected": state.is_live()
    }))
}

/// Toggle a student's check-in for the active session
pub async fn check_in(
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.active_session().await?;

    match state.reconciler.check_in(&session, student_id).await {
        Ok(outcome) => {
            state.view.write().await.apply(&outcome.as_change_event());
            Ok(Json(outcome))
        }
        Err(e) => {
            tracing::error!("Check-in failed for student {}: {}", student_id, e);
            // partial local state is untrustworthy after a failed mutation
            state.resync_view().await;
            Err(ApiError::from(e))
        }
    }
}

/// Check a student out of the active session
pub async fn check_out(
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.active_session().await?;

    match state.reconciler.check_out(&session, student_id).await {
        Ok(outcome) => {
            state.view.write().await.apply(&outcome.as_change_event());
            Ok(Json(outcome))
        }
        Err(e) => {
            tracing::error!("Check-out failed for student {}: {}", student_id, e);
            state.resync_view().await;
            Err(ApiError::from(e))
        }
    }
}

/// Tournament standings computed from recorded matches
pub async fn get_standings(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let matches = state.store.list_match_results().await.map_err(|e| {
        tracing::error!("Failed to list match results: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(compute_standings(&matches)))
}
