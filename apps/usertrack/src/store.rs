use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use tokio::task::spawn_blocking;

use crate::week::IsoWeek;

const CREATE_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS user_track_data (
    id INTEGER PRIMARY KEY,
    guild_id TEXT,
    week_number INT,
    year INT,
    user_count INT
);
"#;

/// Rows considered for the growth graph.
pub const HISTORY_LIMIT: usize = 26;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("store worker: {0}")]
    Internal(String),
}

/// One weekly sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyCount {
    pub week: IsoWeek,
    pub count: i64,
}

#[derive(Clone)]
pub struct UserTrackStore {
    conn: Arc<Mutex<Connection>>,
}

impl UserTrackStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(CREATE_TABLE_SQL)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<F, T>(&self, func: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Internal("connection lock poisoned".into()))?;
            func(&guard)
        })
        .await
        .map_err(|err| StoreError::Internal(err.to_string()))?
    }

    pub async fn record(&self, guild_id: &str, sample: WeeklyCount) -> Result<(), StoreError> {
        let guild_id = guild_id.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO user_track_data (guild_id, week_number, year, user_count)
                 VALUES (?1, ?2, ?3, ?4)",
                params![guild_id, sample.week.week, sample.week.year, sample.count],
            )?;
            Ok(())
        })
        .await
    }

    /// Count stored for `week`, if any. The first row wins when a week was
    /// recorded more than once.
    pub async fn count_for(
        &self,
        guild_id: &str,
        week: IsoWeek,
    ) -> Result<Option<i64>, StoreError> {
        let guild_id = guild_id.to_string();
        self.with_conn(move |conn| {
            let count = conn
                .query_row(
                    "SELECT user_count FROM user_track_data
                     WHERE guild_id = ?1 AND week_number = ?2 AND year = ?3
                     ORDER BY id LIMIT 1",
                    params![guild_id, week.week, week.year],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(count)
        })
        .await
    }

    /// The most recent `HISTORY_LIMIT` samples, oldest first.
    pub async fn history(&self, guild_id: &str) -> Result<Vec<WeeklyCount>, StoreError> {
        let guild_id = guild_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT year, week_number, user_count FROM user_track_data
                 WHERE guild_id = ?1
                 ORDER BY year DESC, week_number DESC, id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![guild_id, HISTORY_LIMIT as i64], |row| {
                Ok(WeeklyCount {
                    week: IsoWeek::new(row.get(0)?, row.get(1)?),
                    count: row.get(2)?,
                })
            })?;
            let mut samples = rows.collect::<Result<Vec<_>, _>>()?;
            samples.reverse();
            Ok(samples)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(year: i32, week: u8, count: i64) -> WeeklyCount {
        WeeklyCount {
            week: IsoWeek::new(year, week),
            count,
        }
    }

    #[tokio::test]
    async fn counts_are_scoped_by_guild_and_week() {
        let store = UserTrackStore::open_in_memory().unwrap();
        store.record("g1", sample(2024, 10, 100)).await.unwrap();
        store.record("g2", sample(2024, 10, 7)).await.unwrap();

        let week = IsoWeek::new(2024, 10);
        assert_eq!(store.count_for("g1", week).await.unwrap(), Some(100));
        assert_eq!(store.count_for("g2", week).await.unwrap(), Some(7));
        assert_eq!(store.count_for("g1", week.previous()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn history_keeps_the_latest_rows_in_order() {
        let store = UserTrackStore::open_in_memory().unwrap();
        for week in 1..=30u8 {
            store.record("g", sample(2023, week, i64::from(week))).await.unwrap();
        }
        store.record("g", sample(2024, 1, 31)).await.unwrap();

        let history = store.history("g").await.unwrap();
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history[0], sample(2023, 6, 6));
        assert_eq!(history.last(), Some(&sample(2024, 1, 31)));
    }

    #[tokio::test]
    async fn data_survives_reopening_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usertrack.sqlite3");
        UserTrackStore::open(&path)
            .unwrap()
            .record("g", sample(2024, 2, 5))
            .await
            .unwrap();

        let reopened = UserTrackStore::open(&path).unwrap();
        assert_eq!(
            reopened.count_for("g", IsoWeek::new(2024, 2)).await.unwrap(),
            Some(5)
        );
    }
}
