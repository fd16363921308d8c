//! SQLite-backed stats store
//!
//! Manages the `~/.portal-engagement/engagement.db` database. Counters are moved
//! with `INSERT .. ON CONFLICT DO UPDATE SET col = col + ?` so concurrent
//! processes writing the same user never lose increments.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
#[cfg(test)]
use std::sync::MutexGuard;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::models::{BadgeLogEntry, FieldUpdate, NewTransaction, PointTransaction, StatField, UserStats};
use super::store::StatsStore;
use crate::error::{EngagementError, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// How long a write waits for another process's lock before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Stats store on a single shared SQLite connection
#[derive(Clone)]
pub struct SqliteStatsStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStatsStore {
    /// Open or create the database at a specific path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL lets several processes (tabs) share the file
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        Self::from_connection(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    #[cfg(test)]
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `f` on the blocking pool with the connection locked.
    ///
    /// rusqlite calls block (up to the busy timeout while another process
    /// holds the write lock), so they never run on the async executor.
    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().unwrap_or_else(|e| e.into_inner());
            f(&mut conn)
        })
        .await
        .map_err(|e| EngagementError::Store(format!("database task failed: {e}")))?
    }

    fn ensure_row(conn: &Connection, user_id: &str, now: i64) -> Result<()> {
        conn.execute(
            "INSERT OR IGNORE INTO user_stats (user_id, created_at, updated_at) VALUES (?1, ?2, ?2)",
            params![user_id, now],
        )?;
        Ok(())
    }

    fn load_stats(conn: &Connection, user_id: &str) -> Result<UserStats> {
        let stats = conn
            .query_row(
                &format!("SELECT {STATS_COLUMNS} FROM user_stats WHERE user_id = ?1"),
                params![user_id],
                row_to_stats,
            )
            .optional()?;
        stats.ok_or_else(|| EngagementError::Store(format!("stats for {user_id} vanished")))
    }
}

#[async_trait]
impl StatsStore for SqliteStatsStore {
    async fn get_or_create(&self, user_id: &str) -> Result<UserStats> {
        let user_id = user_id.to_string();
        self.run(move |conn| {
            Self::ensure_row(conn, &user_id, now_ms())?;
            Self::load_stats(conn, &user_id)
        })
        .await
    }

    async fn atomic_increment(&self, user_id: &str, field: StatField, delta: u64) -> Result<u64> {
        let col = field.column();
        let sql = format!(
            r#"INSERT INTO user_stats (user_id, {col}, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?3)
               ON CONFLICT(user_id) DO UPDATE SET
                   {col} = {col} + excluded.{col}, updated_at = excluded.updated_at
               RETURNING {col}"#
        );
        let user_id = user_id.to_string();
        self.run(move |conn| {
            let value = conn.query_row(&sql, params![user_id, delta, now_ms()], |r| r.get::<_, u64>(0))?;
            Ok(value)
        })
        .await
    }

    async fn atomic_set_fields(&self, user_id: &str, updates: &[FieldUpdate]) -> Result<()> {
        let user_id = user_id.to_string();
        let updates = updates.to_vec();
        self.run(move |conn| {
            let now = now_ms();
            let tx = conn.transaction()?;
            Self::ensure_row(&tx, &user_id, now)?;

            for update in &updates {
                match update {
                    FieldUpdate::LastLoginDate(date) => {
                        tx.execute(
                            "UPDATE user_stats SET last_login_date = ?2 WHERE user_id = ?1",
                            params![user_id, date.format(DATE_FORMAT).to_string()],
                        )?;
                    }
                    FieldUpdate::ConsecutiveDays(days) => {
                        tx.execute(
                            "UPDATE user_stats SET consecutive_days = ?2 WHERE user_id = ?1",
                            params![user_id, days],
                        )?;
                    }
                    FieldUpdate::HalfHourBonusAt(total) => {
                        tx.execute(
                            "UPDATE user_stats SET half_hour_bonus_at = ?2 WHERE user_id = ?1",
                            params![user_id, total],
                        )?;
                    }
                    FieldUpdate::MergeBadges(ids) => {
                        let raw: String = tx.query_row(
                            "SELECT badges FROM user_stats WHERE user_id = ?1",
                            params![user_id],
                            |r| r.get(0),
                        )?;
                        let mut badges: BTreeSet<String> = serde_json::from_str(&raw).unwrap_or_default();
                        badges.extend(ids.iter().cloned());
                        tx.execute(
                            "UPDATE user_stats SET badges = ?2 WHERE user_id = ?1",
                            params![user_id, serde_json::to_string(&badges)?],
                        )?;
                    }
                }
            }

            tx.execute(
                "UPDATE user_stats SET updated_at = ?2 WHERE user_id = ?1",
                params![user_id, now],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn append_transaction(&self, user_id: &str, txn: NewTransaction) -> Result<PointTransaction> {
        let record = PointTransaction {
            id: uuid::Uuid::new_v4().to_string(),
            points: txn.points,
            reason: txn.reason,
            metadata: txn.metadata,
            created_at: Utc::now(),
        };
        let user_id = user_id.to_string();
        self.run(move |conn| {
            conn.execute(
                r#"INSERT INTO point_transactions (id, user_id, points, reason, metadata, created_at)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
                params![
                    record.id,
                    user_id,
                    record.points,
                    record.reason,
                    serde_json::to_string(&record.metadata)?,
                    record.created_at.timestamp_millis(),
                ],
            )?;
            Ok(record)
        })
        .await
    }

    async fn append_badge_log(
        &self,
        user_id: &str,
        badge_id: &str,
        badge_name: &str,
    ) -> Result<BadgeLogEntry> {
        let user_id = user_id.to_string();
        let entry = BadgeLogEntry {
            badge_id: badge_id.to_string(),
            badge_name: badge_name.to_string(),
            earned_at: Utc::now(),
        };
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO badge_log (user_id, badge_id, badge_name, earned_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    user_id,
                    entry.badge_id,
                    entry.badge_name,
                    entry.earned_at.timestamp_millis()
                ],
            )?;
            Ok(entry)
        })
        .await
    }

    async fn recent_transactions(&self, user_id: &str, limit: usize) -> Result<Vec<PointTransaction>> {
        let user_id = user_id.to_string();
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                r#"SELECT id, points, reason, metadata, created_at FROM point_transactions
                   WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2"#,
            )?;
            let rows = stmt
                .query_map(params![user_id, limit as i64], |row| {
                    let metadata: String = row.get(3)?;
                    Ok(PointTransaction {
                        id: row.get(0)?,
                        points: row.get(1)?,
                        reason: row.get(2)?,
                        metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null),
                        created_at: from_ms(row.get(4)?),
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    async fn badge_log(&self, user_id: &str) -> Result<Vec<BadgeLogEntry>> {
        let user_id = user_id.to_string();
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT badge_id, badge_name, earned_at FROM badge_log WHERE user_id = ?1 ORDER BY id",
            )?;
            let rows = stmt
                .query_map(params![user_id], |row| {
                    Ok(BadgeLogEntry {
                        badge_id: row.get(0)?,
                        badge_name: row.get(1)?,
                        earned_at: from_ms(row.get(2)?),
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }
}

const STATS_COLUMNS: &str = "user_id, total_points, total_portal_time, meetings_total, \
    meetings_on_time, meetings_early, meetings_late, projects_created, projects_updated, \
    evaluations_submitted, papers_read, papers_submitted, database_writes, last_login_date, \
    consecutive_days, half_hour_bonus_at, badges, created_at, updated_at";

fn row_to_stats(row: &Row<'_>) -> rusqlite::Result<UserStats> {
    let last_login: Option<String> = row.get(13)?;
    let badges: String = row.get(16)?;
    Ok(UserStats {
        user_id: row.get(0)?,
        total_points: row.get(1)?,
        total_portal_time: row.get(2)?,
        meetings_total: row.get(3)?,
        meetings_on_time: row.get(4)?,
        meetings_early: row.get(5)?,
        meetings_late: row.get(6)?,
        projects_created: row.get(7)?,
        projects_updated: row.get(8)?,
        evaluations_submitted: row.get(9)?,
        papers_read: row.get(10)?,
        papers_submitted: row.get(11)?,
        database_writes: row.get(12)?,
        last_login_date: last_login.and_then(|d| NaiveDate::parse_from_str(&d, DATE_FORMAT).ok()),
        consecutive_days: row.get(14)?,
        half_hour_bonus_at: row.get(15)?,
        badges: serde_json::from_str(&badges).unwrap_or_default(),
        created_at: from_ms(row.get(17)?),
        updated_at: from_ms(row.get(18)?),
    })
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn from_ms(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

/// SQL schema for the engagement database
const SCHEMA_SQL: &str = r#"
-- Per-user aggregate (one row per user)
CREATE TABLE IF NOT EXISTS user_stats (
    user_id TEXT PRIMARY KEY,
    total_points INTEGER NOT NULL DEFAULT 0,
    total_portal_time INTEGER NOT NULL DEFAULT 0,
    meetings_total INTEGER NOT NULL DEFAULT 0,
    meetings_on_time INTEGER NOT NULL DEFAULT 0,
    meetings_early INTEGER NOT NULL DEFAULT 0,
    meetings_late INTEGER NOT NULL DEFAULT 0,
    projects_created INTEGER NOT NULL DEFAULT 0,
    projects_updated INTEGER NOT NULL DEFAULT 0,
    evaluations_submitted INTEGER NOT NULL DEFAULT 0,
    papers_read INTEGER NOT NULL DEFAULT 0,
    papers_submitted INTEGER NOT NULL DEFAULT 0,
    database_writes INTEGER NOT NULL DEFAULT 0,
    last_login_date TEXT,
    consecutive_days INTEGER NOT NULL DEFAULT 0,
    half_hour_bonus_at INTEGER NOT NULL DEFAULT 0,
    badges TEXT NOT NULL DEFAULT '[]',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- Point awards (append-only)
CREATE TABLE IF NOT EXISTS point_transactions (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    points INTEGER NOT NULL CHECK (points > 0),
    reason TEXT NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_txn_user_created ON point_transactions(user_id, created_at);

-- Badge awards (append-only)
CREATE TABLE IF NOT EXISTS badge_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    badge_id TEXT NOT NULL,
    badge_name TEXT NOT NULL,
    earned_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_badge_log_user ON badge_log(user_id);

-- Schema version
CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);
INSERT OR IGNORE INTO schema_version VALUES (1);
"#;
