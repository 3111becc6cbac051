pub mod error;
pub mod service;
pub mod trains;

use axum::{
    Router,
    routing::{get, patch, post},
};

pub use error::TrainError;
pub use service::{LeaveResult, TrainService};
pub use trains::{AppState, AppStateInner};

/// All train routes plus `/health`, with state applied.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/trains", get(trains::list_trains).post(trains::create_train))
        .route("/api/trains/{train_id}", patch(trains::update_train))
        .route("/api/trains/{train_id}/join", post(trains::join_train))
        .route("/api/trains/{train_id}/leave", post(trains::leave_train))
        .route("/api/trains/{train_id}/complete", post(trains::complete_train))
        .route("/api/trains/{train_id}/cancel", post(trains::cancel_train))
        .route("/health", get(trains::health))
        .with_state(state)
}
