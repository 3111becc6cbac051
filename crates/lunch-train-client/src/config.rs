use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::FixedOffset;
use mockable::DefaultClock;
use tracing::info;

use crate::error::ClientError;
use crate::identity::{ClientContext, IdentityStore};
use crate::orchestrator::Orchestrator;
use crate::switch::SwitchConfirmer;
use crate::transport::HttpTrainApi;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub identity_path: PathBuf,
    pub http_timeout: Duration,
    /// Offset the client uses to decide where "today" ends.
    pub utc_offset: FixedOffset,
}

impl ClientConfig {
    /// Read `LUNCH_TRAIN_*` variables, loading `.env` first if present.
    pub fn from_env() -> Result<Self, ClientError> {
        let _ = dotenvy::dotenv();

        let api_url = std::env::var("LUNCH_TRAIN_API_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".into());
        let identity_path: PathBuf = std::env::var("LUNCH_TRAIN_IDENTITY_PATH")
            .unwrap_or_else(|_| "lunch-train-identity.json".into())
            .into();
        let timeout_secs: u64 = std::env::var("LUNCH_TRAIN_HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .map_err(|e| ClientError::Config(format!("LUNCH_TRAIN_HTTP_TIMEOUT_SECS: {}", e)))?;
        let utc_offset: FixedOffset = std::env::var("LUNCH_TRAIN_UTC_OFFSET")
            .unwrap_or_else(|_| "+00:00".into())
            .parse()
            .map_err(|e| ClientError::Config(format!("LUNCH_TRAIN_UTC_OFFSET must look like +HH:MM: {}", e)))?;

        Ok(Self {
            api_url,
            identity_path,
            http_timeout: Duration::from_secs(timeout_secs),
            utc_offset,
        })
    }

    /// Load the identity, connect, and fetch the first board.
    pub async fn connect<C: SwitchConfirmer>(&self, confirmer: C) -> Result<Orchestrator<HttpTrainApi, C>, ClientError> {
        let api = HttpTrainApi::new(&self.api_url, self.http_timeout)?;
        let context = ClientContext::load(IdentityStore::new(self.identity_path.clone()))?;
        info!("Lunch train client for user {} against {}", context.user_id(), self.api_url);

        let orchestrator = Orchestrator::new(api, confirmer, context, Arc::new(DefaultClock), self.utc_offset);
        orchestrator.refresh().await?;
        Ok(orchestrator)
    }
}
