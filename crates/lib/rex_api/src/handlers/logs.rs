//! Event log handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rex_core::models::log::EventLog;
use uuid::Uuid;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::AppJson;
use crate::models::{EventLogRequest, EventLogResponse, STATUS_SUCCESS, SuccessResponse};

/// `POST /logs`
pub async fn post_log_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<EventLogRequest>,
) -> AppResult<(StatusCode, Json<EventLogResponse>)> {
    let log = state.event_logs().post(&body.event_description).await?;
    Ok((
        StatusCode::CREATED,
        Json(EventLogResponse {
            status: STATUS_SUCCESS.into(),
            log,
        }),
    ))
}

/// `GET /logs/{id}`
pub async fn get_log_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<EventLog>> {
    Ok(Json(state.event_logs().get(id).await?))
}

/// `PATCH /logs/{id}` — replace the description.
pub async fn update_log_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(body): AppJson<EventLogRequest>,
) -> AppResult<Json<EventLogResponse>> {
    let log = state.event_logs().update(id, &body.event_description).await?;
    Ok(Json(EventLogResponse {
        status: STATUS_SUCCESS.into(),
        log,
    }))
}

/// `DELETE /logs/{id}`
pub async fn delete_log_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SuccessResponse>> {
    state.event_logs().delete(id).await?;
    Ok(Json(SuccessResponse { success: true }))
}
