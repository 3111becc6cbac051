//! Database row types. These map directly to SQLite rows and stay distinct
//! from the lunch-train-types API models to keep the DB layer independent.
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use lunch_train_types::{Participant, Train};

pub struct TrainRow {
    pub id: String,
    pub created_by: String,
    pub created_at: String,
    pub departure_place: String,
    pub destination: String,
    pub departure_time: String,
    pub description: Option<String>,
    pub status: String,
}

pub struct ParticipantRow {
    pub train_id: String,
    pub user_id: String,
    pub nickname: String,
}

/// Result of the array-union primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Added,
    /// An identical `(user_id, nickname)` pair was already seated.
    AlreadyPresent,
    TrainMissing,
}

/// Result of the transactional leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    Left,
    /// The leaver was the last participant; the record is gone.
    TrainDeleted,
    NotSeated,
    TrainMissing,
}

/// Timestamps are stored as fixed-width RFC 3339 UTC text so that string
/// comparison in SQL orders them chronologically.
pub fn encode_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_time(s: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("corrupt timestamp '{}'", s))?;
    Ok(parsed.with_timezone(&Utc))
}

impl TrainRow {
    pub fn into_train(self, participants: Vec<ParticipantRow>) -> Result<Train> {
        Ok(Train {
            id: self
                .id
                .parse()
                .with_context(|| format!("corrupt train id '{}'", self.id))?,
            created_by: self.created_by,
            created_at: decode_time(&self.created_at)?,
            departure_place: self.departure_place,
            destination: self.destination,
            departure_time: decode_time(&self.departure_time)?,
            description: self.description,
            participants: participants
                .into_iter()
                .map(|p| Participant {
                    user_id: p.user_id,
                    nickname: p.nickname,
                })
                .collect(),
            status: self
                .status
                .parse()
                .with_context(|| format!("corrupt status on train '{}'", self.id))?,
        })
    }
}
