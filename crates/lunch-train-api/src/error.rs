use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;
use uuid::Uuid;

use lunch_train_types::api::ErrorResponse;

/// Failures of the train lifecycle, as seen by the HTTP boundary.
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    /// A required field was missing or blank. The caller must fix the input.
    #[error("{0}")]
    Validation(&'static str),

    #[error("train {0} not found")]
    NotFound(Uuid),

    /// The store was unreachable or rejected the operation. Never retried here.
    #[error("store failure: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl TrainError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for TrainError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Store(e) => {
                error!("Store failure: {:#}", e);
                "Something went wrong, please try again".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
