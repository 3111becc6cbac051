use std::sync::Arc;

use chrono::FixedOffset;
use mockable::Clock;
use tracing::{debug, error, info};
use uuid::Uuid;

use lunch_train_db::{Database, JoinOutcome, LeaveOutcome};
use lunch_train_types::{
    CreateTrainInput, Participant, Train, TrainPatch, TrainStatus, VisibilityWindow,
};

use crate::error::TrainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveResult {
    pub was_train_deleted: bool,
}

/// Train lifecycle: create, list, join, leave, status changes.
///
/// Every operation is one call into the store, run off the async runtime.
/// Store failures are propagated untouched for the boundary to map.
#[derive(Clone)]
pub struct TrainService {
    db: Arc<Database>,
    clock: Arc<dyn Clock + Send + Sync>,
    utc_offset: FixedOffset,
}

impl TrainService {
    pub fn new(db: Arc<Database>, clock: Arc<dyn Clock + Send + Sync>, utc_offset: FixedOffset) -> Self {
        Self { db, clock, utc_offset }
    }

    /// The window listings are filtered by, as of now.
    pub fn window(&self) -> VisibilityWindow {
        VisibilityWindow::at(self.clock.utc(), self.utc_offset)
    }

    pub async fn create_train(&self, input: CreateTrainInput, user_id: String) -> Result<Train, TrainError> {
        let created_at = self.clock.utc();
        let train = self
            .blocking(move |db| db.insert_train(&input, &user_id, created_at))
            .await?;

        info!(
            "Train {} created by {}: {} -> {} at {}",
            train.id, train.created_by, train.departure_place, train.destination, train.departure_time
        );
        Ok(train)
    }

    pub async fn list_visible_trains(&self) -> Result<Vec<Train>, TrainError> {
        let window = self.window();
        self.blocking(move |db| db.query_visible(&window)).await
    }

    pub async fn get_train(&self, id: Uuid) -> Result<Train, TrainError> {
        self.blocking(move |db| db.get_train(&id.to_string()))
            .await?
            .ok_or(TrainError::NotFound(id))
    }

    /// Seat `(user_id, nickname)`. Union semantics are those of the store:
    /// an identical pair is not added twice, a new nickname is a new entry.
    pub async fn join_train(&self, id: Uuid, user_id: String, nickname: String) -> Result<(), TrainError> {
        let participant = Participant::new(user_id, nickname);
        let seat = participant.clone();
        let outcome = self
            .blocking(move |db| db.add_participant(&id.to_string(), &seat))
            .await?;

        match outcome {
            JoinOutcome::Added => {
                info!("{} ({}) joined train {}", participant.nickname, participant.user_id, id);
                Ok(())
            }
            JoinOutcome::AlreadyPresent => {
                debug!("{} already seated on train {}", participant.user_id, id);
                Ok(())
            }
            JoinOutcome::TrainMissing => Err(TrainError::NotFound(id)),
        }
    }

    /// Remove the user from the train; the last one out deletes it.
    pub async fn leave_train(&self, id: Uuid, user_id: String) -> Result<LeaveResult, TrainError> {
        let leaver = user_id.clone();
        let outcome = self
            .blocking(move |db| db.leave_train(&id.to_string(), &leaver))
            .await?;

        match outcome {
            LeaveOutcome::Left => {
                info!("{} left train {}", user_id, id);
                Ok(LeaveResult { was_train_deleted: false })
            }
            LeaveOutcome::TrainDeleted => {
                info!("{} was the last rider, train {} deleted", user_id, id);
                Ok(LeaveResult { was_train_deleted: true })
            }
            LeaveOutcome::NotSeated => {
                debug!("{} is not on train {}, nothing to leave", user_id, id);
                Ok(LeaveResult { was_train_deleted: false })
            }
            LeaveOutcome::TrainMissing => Err(TrainError::NotFound(id)),
        }
    }

    pub async fn update_train_fields(&self, id: Uuid, patch: TrainPatch) -> Result<(), TrainError> {
        if patch.is_empty() {
            // Still report a missing train.
            self.get_train(id).await?;
            return Ok(());
        }

        let found = self
            .blocking(move |db| db.update_train(&id.to_string(), &patch))
            .await?;
        if !found {
            return Err(TrainError::NotFound(id));
        }
        debug!("Train {} updated", id);
        Ok(())
    }

    pub async fn complete_train(&self, id: Uuid) -> Result<(), TrainError> {
        self.set_status(id, TrainStatus::Completed).await
    }

    pub async fn cancel_train(&self, id: Uuid) -> Result<(), TrainError> {
        self.set_status(id, TrainStatus::Cancelled).await
    }

    async fn set_status(&self, id: Uuid, status: TrainStatus) -> Result<(), TrainError> {
        self.update_train_fields(id, TrainPatch::status(status)).await?;
        info!("Train {} marked {}", id, status);
        Ok(())
    }

    /// Run a blocking store call off the async runtime.
    async fn blocking<F, T>(&self, f: F) -> Result<T, TrainError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                TrainError::Store(anyhow::anyhow!("store task failed: {}", e))
            })?
            .map_err(TrainError::Store)
    }
}
