use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::{StatsSink, StatsSnapshot};

/// SQLite-backed home of the single aggregate stats record
#[derive(Clone)]
pub struct StatsStore {
    conn: Arc<Mutex<Connection>>,
}

impl StatsStore {
    /// Open or create the database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        // journal_mode PRAGMA always returns the resulting mode, so use query_row
        let _: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;

        Self::run_migrations(&conn)?;

        info!("Stats store initialized at: {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            -- One row only: the aggregate record
            CREATE TABLE IF NOT EXISTS stats (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                total_users INTEGER NOT NULL DEFAULT 0,
                total_messages INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            ",
        )
        .context("Failed to create stats table")?;
        Ok(())
    }

    /// Load the aggregate record, seeding it with zeros when absent
    pub async fn load_or_create(&self) -> Result<StatsSnapshot> {
        let conn = self.conn.lock().await;

        let created = conn
            .execute("INSERT OR IGNORE INTO stats (id) VALUES (1)", [])
            .context("Failed to seed stats record")?;
        if created > 0 {
            info!("Created empty stats record");
        }

        let (total_users, total_messages): (i64, i64) = conn
            .query_row(
                "SELECT total_users, total_messages FROM stats WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .context("Failed to load stats record")?;

        Ok(StatsSnapshot {
            total_users: total_users.max(0) as u64,
            total_messages: total_messages.max(0) as u64,
        })
    }
}

#[async_trait]
impl StatsSink for StatsStore {
    async fn save(&self, snapshot: StatsSnapshot) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO stats (id, total_users, total_messages) VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET
                total_users = excluded.total_users,
                total_messages = excluded.total_messages,
                updated_at = datetime('now')",
            rusqlite::params![
                snapshot.total_users as i64,
                snapshot.total_messages as i64
            ],
        )
        .context("Failed to save stats")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_seeds_zero_record() {
        let store = StatsStore::open_in_memory().unwrap();
        let snapshot = store.load_or_create().await.unwrap();
        assert_eq!(snapshot, StatsSnapshot::default());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = StatsStore::open_in_memory().unwrap();
        store.load_or_create().await.unwrap();

        let saved = StatsSnapshot {
            total_users: 3,
            total_messages: 42,
        };
        store.save(saved).await.unwrap();

        assert_eq!(store.load_or_create().await.unwrap(), saved);
    }

    #[tokio::test]
    async fn test_save_without_seed_creates_record() {
        let store = StatsStore::open_in_memory().unwrap();
        let saved = StatsSnapshot {
            total_users: 0,
            total_messages: 9,
        };
        store.save(saved).await.unwrap();
        assert_eq!(store.load_or_create().await.unwrap(), saved);
    }

    #[tokio::test]
    async fn test_reopen_file_keeps_counts() {
        let path = std::env::temp_dir().join(format!("cmdbot-stats-{}.db", std::process::id()));
        {
            let store = StatsStore::open(&path).unwrap();
            store.load_or_create().await.unwrap();
            store
                .save(StatsSnapshot {
                    total_users: 1,
                    total_messages: 5,
                })
                .await
                .unwrap();
        }

        let reopened = StatsStore::open(&path).unwrap();
        assert_eq!(reopened.load_or_create().await.unwrap().total_messages, 5);

        drop(reopened);
        for suffix in ["", "-wal", "-shm"] {
            std::fs::remove_file(format!("{}{}", path.display(), suffix)).ok();
        }
    }
}
