use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A train is "departing soon" once its departure is this close (or already past).
pub const DEPARTING_SOON_MINUTES: i64 = 15;

/// A `(userId, nickname)` pair seated in a train's roster.
///
/// Equality is over the whole pair. The store's union and removal work on
/// this equality, so the same user under two nicknames is two entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: String,
    pub nickname: String,
}

impl Participant {
    pub fn new(user_id: impl Into<String>, nickname: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            nickname: nickname.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainStatus {
    #[default]
    Active,
    Completed,
    Cancelled,
}

impl TrainStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TrainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown train status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for TrainStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A scheduled group lunch outing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Train {
    pub id: Uuid,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub departure_place: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub status: TrainStatus,
}

impl Train {
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p.user_id == user_id)
    }

    /// Nickname the creator joined with, if they are still seated.
    pub fn creator_nickname(&self) -> Option<&str> {
        self.participants
            .iter()
            .find(|p| p.user_id == self.created_by)
            .map(|p| p.nickname.as_str())
    }

    pub fn is_departing_soon(&self, now: DateTime<Utc>) -> bool {
        self.departure_time - now <= TimeDelta::minutes(DEPARTING_SOON_MINUTES)
    }
}

/// What a user fills in to start a train.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTrainInput {
    pub departure_place: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub nickname: String,
}

/// Partial update of a train record. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure_place: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participants: Option<Vec<Participant>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TrainStatus>,
}

impl TrainPatch {
    pub fn participants(participants: Vec<Participant>) -> Self {
        Self {
            participants: Some(participants),
            ..Self::default()
        }
    }

    pub fn status(status: TrainStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.departure_place.is_none()
            && self.destination.is_none()
            && self.departure_time.is_none()
            && self.description.is_none()
            && self.participants.is_none()
            && self.status.is_none()
    }

    /// Apply the patch to an in-memory train, as the store would.
    pub fn apply_to(&self, train: &mut Train) {
        if let Some(place) = &self.departure_place {
            train.departure_place = place.clone();
        }
        if let Some(destination) = &self.destination {
            train.destination = destination.clone();
        }
        if let Some(time) = self.departure_time {
            train.departure_time = time;
        }
        if let Some(description) = &self.description {
            train.description = Some(description.clone());
        }
        if let Some(participants) = &self.participants {
            train.participants = participants.clone();
        }
        if let Some(status) = self.status {
            train.status = status;
        }
    }
}
