use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::debug;
use uuid::Uuid;

use lunch_train_types::TrainPatch;
use lunch_train_types::api::{
    CreateTrainRequest, HealthResponse, JoinTrainRequest, LeaveTrainRequest, SuccessResponse,
    required,
};

use crate::error::TrainError;
use crate::service::TrainService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub trains: TrainService,
}

const MISSING_FIELDS: &str = "Missing required fields";
const MALFORMED_BODY: &str = "Malformed request body";

/// Unwrap a JSON body, answering 400 with `message` for anything axum
/// could not deserialize.
fn body<T>(payload: Result<Json<T>, JsonRejection>, message: &'static str) -> Result<T, TrainError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            debug!("Rejected request body: {}", rejection.body_text());
            Err(TrainError::Validation(message))
        }
    }
}

/// GET /api/trains: active trains inside the visibility window, earliest first.
pub async fn list_trains(State(state): State<AppState>) -> Result<impl IntoResponse, TrainError> {
    let trains = state.trains.list_visible_trains().await?;
    Ok(Json(trains))
}

/// POST /api/trains
pub async fn create_train(
    State(state): State<AppState>,
    payload: Result<Json<CreateTrainRequest>, JsonRejection>,
) -> Result<impl IntoResponse, TrainError> {
    let req = body(payload, MISSING_FIELDS)?;
    let user_id = required(req.user_id.as_deref())
        .ok_or(TrainError::Validation(MISSING_FIELDS))?
        .to_string();
    let input = req.train.ok_or(TrainError::Validation(MISSING_FIELDS))?;

    let train = state.trains.create_train(input, user_id).await?;
    Ok(Json(train))
}

/// POST /api/trains/{id}/join
pub async fn join_train(
    State(state): State<AppState>,
    Path(train_id): Path<Uuid>,
    payload: Result<Json<JoinTrainRequest>, JsonRejection>,
) -> Result<impl IntoResponse, TrainError> {
    let req = body(payload, MISSING_FIELDS)?;
    let (Some(user_id), Some(nickname)) = (
        required(req.user_id.as_deref()),
        required(req.nickname.as_deref()),
    ) else {
        return Err(TrainError::Validation(MISSING_FIELDS));
    };

    state
        .trains
        .join_train(train_id, user_id.to_string(), nickname.to_string())
        .await?;
    Ok(Json(SuccessResponse::ok()))
}

/// POST /api/trains/{id}/leave: 204 when the leaver emptied and deleted the train.
pub async fn leave_train(
    State(state): State<AppState>,
    Path(train_id): Path<Uuid>,
    payload: Result<Json<LeaveTrainRequest>, JsonRejection>,
) -> Result<Response, TrainError> {
    let req = body(payload, MISSING_FIELDS)?;
    let user_id = required(req.user_id.as_deref())
        .ok_or(TrainError::Validation(MISSING_FIELDS))?
        .to_string();

    let result = state.trains.leave_train(train_id, user_id).await?;
    if result.was_train_deleted {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    Ok(Json(SuccessResponse::ok()).into_response())
}

/// PATCH /api/trains/{id}: partial field update, e.g. a roster rewrite
/// after a rider changes their nickname.
pub async fn update_train(
    State(state): State<AppState>,
    Path(train_id): Path<Uuid>,
    payload: Result<Json<TrainPatch>, JsonRejection>,
) -> Result<impl IntoResponse, TrainError> {
    let patch = body(payload, MALFORMED_BODY)?;
    state.trains.update_train_fields(train_id, patch).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// POST /api/trains/{id}/complete
pub async fn complete_train(
    State(state): State<AppState>,
    Path(train_id): Path<Uuid>,
) -> Result<impl IntoResponse, TrainError> {
    state.trains.complete_train(train_id).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// POST /api/trains/{id}/cancel
pub async fn cancel_train(
    State(state): State<AppState>,
    Path(train_id): Path<Uuid>,
) -> Result<impl IntoResponse, TrainError> {
    state.trains.cancel_train(train_id).await?;
    Ok(Json(SuccessResponse::ok()))
}

pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok".into() })
}
