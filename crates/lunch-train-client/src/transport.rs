use std::future::Future;
use std::time::Duration;

use reqwest::{Response, StatusCode};
use tracing::debug;
use uuid::Uuid;

use lunch_train_types::api::{CreateTrainRequest, ErrorResponse, JoinTrainRequest, LeaveTrainRequest};
use lunch_train_types::{CreateTrainInput, Train, TrainPatch};

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    Left,
    /// The leaver was the last rider and the server deleted the train.
    TrainDeleted,
}

/// The lifecycle service as the client sees it across the network.
pub trait TrainApi: Send + Sync {
    fn list_trains(&self) -> impl Future<Output = Result<Vec<Train>, ClientError>> + Send;

    fn create_train(
        &self,
        input: &CreateTrainInput,
        user_id: &str,
    ) -> impl Future<Output = Result<Train, ClientError>> + Send;

    fn join_train(
        &self,
        train_id: Uuid,
        user_id: &str,
        nickname: &str,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// A train the server no longer has comes back as [`ClientError::NotFound`].
    fn leave_train(
        &self,
        train_id: Uuid,
        user_id: &str,
    ) -> impl Future<Output = Result<LeaveOutcome, ClientError>> + Send;

    fn update_train(
        &self,
        train_id: Uuid,
        patch: &TrainPatch,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;
}

/// JSON over HTTP against a lunch train server.
pub struct HttpTrainApi {
    base_url: String,
    http: reqwest::Client,
}

impl HttpTrainApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl TrainApi for HttpTrainApi {
    async fn list_trains(&self) -> Result<Vec<Train>, ClientError> {
        let resp = self.http.get(self.url("/api/trains")).send().await?;
        let trains = check(resp, None).await?.json().await?;
        Ok(trains)
    }

    async fn create_train(&self, input: &CreateTrainInput, user_id: &str) -> Result<Train, ClientError> {
        let body = CreateTrainRequest {
            train: Some(input.clone()),
            user_id: Some(user_id.to_string()),
        };
        let resp = self.http.post(self.url("/api/trains")).json(&body).send().await?;
        let train = check(resp, None).await?.json().await?;
        Ok(train)
    }

    async fn join_train(&self, train_id: Uuid, user_id: &str, nickname: &str) -> Result<(), ClientError> {
        let body = JoinTrainRequest {
            user_id: Some(user_id.to_string()),
            nickname: Some(nickname.to_string()),
        };
        let resp = self
            .http
            .post(self.url(&format!("/api/trains/{}/join", train_id)))
            .json(&body)
            .send()
            .await?;
        check(resp, Some(train_id)).await?;
        Ok(())
    }

    async fn leave_train(&self, train_id: Uuid, user_id: &str) -> Result<LeaveOutcome, ClientError> {
        let body = LeaveTrainRequest {
            user_id: Some(user_id.to_string()),
        };
        let resp = self
            .http
            .post(self.url(&format!("/api/trains/{}/leave", train_id)))
            .json(&body)
            .send()
            .await?;

        let resp = check(resp, Some(train_id)).await?;
        if resp.status() == StatusCode::NO_CONTENT {
            return Ok(LeaveOutcome::TrainDeleted);
        }
        Ok(LeaveOutcome::Left)
    }

    async fn update_train(&self, train_id: Uuid, patch: &TrainPatch) -> Result<(), ClientError> {
        let resp = self
            .http
            .patch(self.url(&format!("/api/trains/{}", train_id)))
            .json(patch)
            .send()
            .await?;
        check(resp, Some(train_id)).await?;
        Ok(())
    }
}

/// Map failure statuses to errors, keeping the server's message when it sent one.
async fn check(resp: Response, train_id: Option<Uuid>) -> Result<Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    if status == StatusCode::NOT_FOUND {
        if let Some(id) = train_id {
            return Err(ClientError::NotFound(id));
        }
    }

    let message = match resp.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(e) => {
            debug!("Error response without a JSON body: {}", e);
            status.canonical_reason().unwrap_or("unknown error").to_string()
        }
    };
    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}
