use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (trains + participants)");
        conn.execute_batch(
            "
            CREATE TABLE trains (
                id              TEXT PRIMARY KEY,
                created_by      TEXT NOT NULL,
                created_at      TEXT NOT NULL,
                departure_place TEXT NOT NULL,
                destination     TEXT NOT NULL,
                departure_time  TEXT NOT NULL,
                description     TEXT,
                status          TEXT NOT NULL DEFAULT 'active'
            );

            CREATE INDEX idx_trains_status_departure
                ON trains(status, departure_time);

            -- Roster order is insertion order (seq). The unique key is the
            -- whole (user_id, nickname) pair, not user_id alone.
            CREATE TABLE participants (
                seq         INTEGER PRIMARY KEY AUTOINCREMENT,
                train_id    TEXT NOT NULL REFERENCES trains(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL,
                nickname    TEXT NOT NULL,
                UNIQUE(train_id, user_id, nickname)
            );

            CREATE INDEX idx_participants_train
                ON participants(train_id, seq);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
