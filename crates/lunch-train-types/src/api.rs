use serde::{Deserialize, Serialize};

use crate::models::CreateTrainInput;

// -- Trains --

/// Body of `POST /api/trains`. Both fields are optional on the wire so a
/// missing one becomes a 400 instead of a deserialization rejection.
/// Fields this server does not know are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTrainRequest {
    #[serde(default)]
    pub train: Option<CreateTrainInput>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinTrainRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveTrainRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

// -- Generic bodies --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Treats an absent or blank string field as missing.
pub fn required(field: Option<&str>) -> Option<&str> {
    field.filter(|value| !value.trim().is_empty())
}
