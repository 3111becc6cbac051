use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use uuid::Uuid;

use lunch_train_types::{CreateTrainInput, Participant, Train, TrainPatch, TrainStatus, VisibilityWindow};

use crate::Database;
use crate::models::{JoinOutcome, LeaveOutcome, ParticipantRow, TrainRow, encode_time};

const TRAIN_COLUMNS: &str =
    "id, created_by, created_at, departure_place, destination, departure_time, description, status";

impl Database {
    // -- Trains --

    /// Insert a new train with its creator as the only participant.
    /// The store assigns the id; the returned train is read back from disk.
    pub fn insert_train(
        &self,
        input: &CreateTrainInput,
        user_id: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Train> {
        let id = Uuid::new_v4().to_string();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO trains (id, created_by, created_at, departure_place, destination, departure_time, description, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    &id,
                    user_id,
                    encode_time(created_at),
                    &input.departure_place,
                    &input.destination,
                    encode_time(input.departure_time),
                    &input.description,
                    TrainStatus::Active.as_str(),
                ],
            )?;
            tx.execute(
                "INSERT INTO participants (train_id, user_id, nickname) VALUES (?1, ?2, ?3)",
                (&id, user_id, &input.nickname),
            )?;
            tx.commit()?;
            Ok(())
        })?;

        self.get_train(&id)?
            .ok_or_else(|| anyhow::anyhow!("Train {} vanished right after insert", id))
    }

    pub fn get_train(&self, id: &str) -> Result<Option<Train>> {
        self.with_conn(|conn| query_train(conn, id))
    }

    /// Active trains departing inside `window`, earliest first.
    pub fn query_visible(&self, window: &VisibilityWindow) -> Result<Vec<Train>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM trains
                 WHERE status = ?1 AND departure_time >= ?2 AND departure_time < ?3
                 ORDER BY departure_time ASC, created_at ASC",
                TRAIN_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    rusqlite::params![
                        TrainStatus::Active.as_str(),
                        encode_time(window.from),
                        encode_time(window.until),
                    ],
                    map_train_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            // One batched roster query for the whole page (avoids N+1)
            let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
            let mut rosters = query_participants_for(conn, &ids)?;

            rows.into_iter()
                .map(|row| {
                    let roster = rosters.remove(&row.id).unwrap_or_default();
                    row.into_train(roster)
                })
                .collect()
        })
    }

    /// Apply a partial update. Returns `false` when the train does not exist.
    /// A participants patch rewrites the whole roster in the given order.
    pub fn update_train(&self, id: &str, patch: &TrainPatch) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            if !train_exists(&tx, id)? {
                return Ok(false);
            }

            if let Some(place) = &patch.departure_place {
                tx.execute("UPDATE trains SET departure_place = ?1 WHERE id = ?2", (place, id))?;
            }
            if let Some(destination) = &patch.destination {
                tx.execute("UPDATE trains SET destination = ?1 WHERE id = ?2", (destination, id))?;
            }
            if let Some(time) = patch.departure_time {
                tx.execute(
                    "UPDATE trains SET departure_time = ?1 WHERE id = ?2",
                    (encode_time(time), id),
                )?;
            }
            if let Some(description) = &patch.description {
                tx.execute("UPDATE trains SET description = ?1 WHERE id = ?2", (description, id))?;
            }
            if let Some(status) = patch.status {
                tx.execute("UPDATE trains SET status = ?1 WHERE id = ?2", (status.as_str(), id))?;
            }
            if let Some(participants) = &patch.participants {
                tx.execute("DELETE FROM participants WHERE train_id = ?1", [id])?;
                for p in participants {
                    tx.execute(
                        "INSERT OR IGNORE INTO participants (train_id, user_id, nickname) VALUES (?1, ?2, ?3)",
                        (id, &p.user_id, &p.nickname),
                    )?;
                }
            }

            tx.commit()?;
            Ok(true)
        })
    }

    /// Delete a train and its roster. Deleting a missing id is a no-op that
    /// returns `false`.
    pub fn delete_train(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute("DELETE FROM trains WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }

    // -- Roster --

    /// Array-union: seat the pair unless the identical pair is already there.
    pub fn add_participant(&self, id: &str, participant: &Participant) -> Result<JoinOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            if !train_exists(&tx, id)? {
                return Ok(JoinOutcome::TrainMissing);
            }

            let inserted = tx.execute(
                "INSERT OR IGNORE INTO participants (train_id, user_id, nickname) VALUES (?1, ?2, ?3)",
                (id, &participant.user_id, &participant.nickname),
            )?;
            tx.commit()?;

            Ok(if inserted > 0 {
                JoinOutcome::Added
            } else {
                JoinOutcome::AlreadyPresent
            })
        })
    }

    /// Array-remove: drop the entry equal to `participant`. Returns whether
    /// anything was removed.
    pub fn remove_participant(&self, id: &str, participant: &Participant) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute(
                "DELETE FROM participants WHERE train_id = ?1 AND user_id = ?2 AND nickname = ?3",
                (id, &participant.user_id, &participant.nickname),
            )?;
            Ok(removed > 0)
        })
    }

    /// Remove the first roster entry for `user_id`, deleting the whole train
    /// when that entry was the last one. Runs as one immediate transaction so
    /// two concurrent leavers can't both miss the delete.
    pub fn leave_train(&self, id: &str, user_id: &str) -> Result<LeaveOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            if !train_exists(&tx, id)? {
                return Ok(LeaveOutcome::TrainMissing);
            }

            let seat: Option<String> = tx
                .query_row(
                    "SELECT nickname FROM participants WHERE train_id = ?1 AND user_id = ?2 ORDER BY seq LIMIT 1",
                    (id, user_id),
                    |row| row.get(0),
                )
                .optional()?;

            let Some(nickname) = seat else {
                return Ok(LeaveOutcome::NotSeated);
            };

            let remaining: i64 = tx.query_row(
                "SELECT COUNT(*) FROM participants WHERE train_id = ?1",
                [id],
                |row| row.get(0),
            )?;

            let outcome = if remaining <= 1 {
                tx.execute("DELETE FROM trains WHERE id = ?1", [id])?;
                LeaveOutcome::TrainDeleted
            } else {
                tx.execute(
                    "DELETE FROM participants WHERE train_id = ?1 AND user_id = ?2 AND nickname = ?3",
                    (id, user_id, &nickname),
                )?;
                LeaveOutcome::Left
            };

            tx.commit()?;
            Ok(outcome)
        })
    }
}

fn map_train_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TrainRow> {
    Ok(TrainRow {
        id: row.get(0)?,
        created_by: row.get(1)?,
        created_at: row.get(2)?,
        departure_place: row.get(3)?,
        destination: row.get(4)?,
        departure_time: row.get(5)?,
        description: row.get(6)?,
        status: row.get(7)?,
    })
}

fn train_exists(conn: &Connection, id: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM trains WHERE id = ?1", [id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

fn query_train(conn: &Connection, id: &str) -> Result<Option<Train>> {
    let sql = format!("SELECT {} FROM trains WHERE id = ?1", TRAIN_COLUMNS);
    let row = conn.query_row(&sql, [id], map_train_row).optional()?;

    match row {
        Some(row) => {
            let mut rosters = query_participants_for(conn, std::slice::from_ref(&row.id))?;
            let roster = rosters.remove(&row.id).unwrap_or_default();
            Ok(Some(row.into_train(roster)?))
        }
        None => Ok(None),
    }
}

/// Batch-fetch rosters for a set of train ids, keyed by train id, each in
/// seating order.
fn query_participants_for(
    conn: &Connection,
    train_ids: &[String],
) -> Result<HashMap<String, Vec<ParticipantRow>>> {
    let mut rosters: HashMap<String, Vec<ParticipantRow>> = HashMap::new();
    if train_ids.is_empty() {
        return Ok(rosters);
    }

    let placeholders: Vec<String> = (1..=train_ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT train_id, user_id, nickname FROM participants WHERE train_id IN ({}) ORDER BY seq",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::types::ToSql> = train_ids
        .iter()
        .map(|id| id as &dyn rusqlite::types::ToSql)
        .collect();

    let rows = stmt
        .query_map(params.as_slice(), |row| {
            Ok(ParticipantRow {
                train_id: row.get(0)?,
                user_id: row.get(1)?,
                nickname: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    for row in rows {
        rosters.entry(row.train_id.clone()).or_default().push(row);
    }
    Ok(rosters)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use chrono::FixedOffset;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 10, 0, 0).unwrap()
    }

    fn input(nickname: &str, departure_time: DateTime<Utc>) -> CreateTrainInput {
        CreateTrainInput {
            departure_place: "Main lobby".into(),
            destination: "Iso paja".into(),
            departure_time,
            description: None,
            nickname: nickname.into(),
        }
    }

    fn seeded(db: &Database) -> Train {
        db.insert_train(&input("Ada", now() + TimeDelta::minutes(30)), "ada", now())
            .unwrap()
    }

    #[test]
    fn insert_materializes_train() {
        let db = Database::open_in_memory().unwrap();
        let train = seeded(&db);

        assert_eq!(train.created_by, "ada");
        assert_eq!(train.created_at, now());
        assert_eq!(train.status, TrainStatus::Active);
        assert_eq!(train.participants, vec![Participant::new("ada", "Ada")]);

        let fetched = db.get_train(&train.id.to_string()).unwrap().unwrap();
        assert_eq!(fetched, train);
    }

    #[test]
    fn union_is_keyed_on_whole_pair() {
        let db = Database::open_in_memory().unwrap();
        let id = seeded(&db).id.to_string();

        let grace = Participant::new("grace", "Grace");
        assert_eq!(db.add_participant(&id, &grace).unwrap(), JoinOutcome::Added);
        assert_eq!(db.add_participant(&id, &grace).unwrap(), JoinOutcome::AlreadyPresent);

        // Same user, different nickname: a second entry appears.
        let renamed = Participant::new("grace", "Grace H");
        assert_eq!(db.add_participant(&id, &renamed).unwrap(), JoinOutcome::Added);

        let train = db.get_train(&id).unwrap().unwrap();
        assert_eq!(
            train.participants,
            vec![Participant::new("ada", "Ada"), grace, renamed]
        );
    }

    #[test]
    fn add_to_missing_train() {
        let db = Database::open_in_memory().unwrap();
        let missing = Uuid::new_v4().to_string();
        let outcome = db.add_participant(&missing, &Participant::new("x", "X")).unwrap();
        assert_eq!(outcome, JoinOutcome::TrainMissing);
    }

    #[test]
    fn remove_is_exact_value() {
        let db = Database::open_in_memory().unwrap();
        let id = seeded(&db).id.to_string();
        db.add_participant(&id, &Participant::new("grace", "Grace")).unwrap();

        assert!(!db.remove_participant(&id, &Participant::new("grace", "Other")).unwrap());
        assert!(db.remove_participant(&id, &Participant::new("grace", "Grace")).unwrap());
        assert_eq!(db.get_train(&id).unwrap().unwrap().participants.len(), 1);
    }

    #[test]
    fn leave_shrinks_then_deletes() {
        let db = Database::open_in_memory().unwrap();
        let id = seeded(&db).id.to_string();
        db.add_participant(&id, &Participant::new("grace", "Grace")).unwrap();

        assert_eq!(db.leave_train(&id, "nobody").unwrap(), LeaveOutcome::NotSeated);
        assert_eq!(db.leave_train(&id, "ada").unwrap(), LeaveOutcome::Left);
        assert_eq!(
            db.get_train(&id).unwrap().unwrap().participants,
            vec![Participant::new("grace", "Grace")]
        );

        assert_eq!(db.leave_train(&id, "grace").unwrap(), LeaveOutcome::TrainDeleted);
        assert!(db.get_train(&id).unwrap().is_none());
        assert_eq!(db.leave_train(&id, "grace").unwrap(), LeaveOutcome::TrainMissing);
    }

    #[test]
    fn leave_with_duplicate_seats_removes_first_only() {
        let db = Database::open_in_memory().unwrap();
        let id = seeded(&db).id.to_string();
        db.add_participant(&id, &Participant::new("ada", "Ada L")).unwrap();

        assert_eq!(db.leave_train(&id, "ada").unwrap(), LeaveOutcome::Left);
        let train = db.get_train(&id).unwrap().unwrap();
        assert_eq!(train.participants, vec![Participant::new("ada", "Ada L")]);
    }

    #[test]
    fn delete_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let id = seeded(&db).id.to_string();
        assert!(db.delete_train(&id).unwrap());
        assert!(!db.delete_train(&id).unwrap());
    }

    #[test]
    fn update_rewrites_roster_and_status() {
        let db = Database::open_in_memory().unwrap();
        let id = seeded(&db).id.to_string();
        db.add_participant(&id, &Participant::new("grace", "Grace")).unwrap();

        let patch = TrainPatch {
            participants: Some(vec![
                Participant::new("ada", "Countess"),
                Participant::new("grace", "Grace"),
            ]),
            status: Some(TrainStatus::Completed),
            ..TrainPatch::default()
        };
        assert!(db.update_train(&id, &patch).unwrap());

        let train = db.get_train(&id).unwrap().unwrap();
        assert_eq!(train.status, TrainStatus::Completed);
        assert_eq!(train.participants[0], Participant::new("ada", "Countess"));
        assert_eq!(train.participants.len(), 2);

        assert!(!db.update_train(&Uuid::new_v4().to_string(), &patch).unwrap());
    }

    #[test]
    fn visible_query_filters_and_orders() {
        let db = Database::open_in_memory().unwrap();
        let at = |minutes: i64| now() + TimeDelta::minutes(minutes);

        let later = db.insert_train(&input("A", at(90)), "a", now()).unwrap();
        let sooner = db.insert_train(&input("B", at(-9)), "b", now()).unwrap();
        db.insert_train(&input("C", at(-11)), "c", now()).unwrap();
        db.insert_train(&input("D", at(24 * 60)), "d", now()).unwrap();
        let cancelled = db.insert_train(&input("E", at(45)), "e", now()).unwrap();
        db.update_train(&cancelled.id.to_string(), &TrainPatch::status(TrainStatus::Cancelled))
            .unwrap();

        let window = VisibilityWindow::at(now(), FixedOffset::east_opt(0).unwrap());
        let visible = db.query_visible(&window).unwrap();
        let ids: Vec<Uuid> = visible.iter().map(|t| t.id).collect();

        assert_eq!(ids, vec![sooner.id, later.id]);
        assert_eq!(visible[0].participants, vec![Participant::new("b", "B")]);
    }
}
