//! SQLite-backed checkpoint store
//!
//! Durable [`CheckpointStore`] implementation so a thread can be paused and
//! continued across process boundaries. Each thread maps to a single row;
//! a `put` is one upsert statement, so readers never observe a partially
//! written checkpoint.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite, SqlitePool};
use std::path::Path;

use crate::checkpoint::{Checkpoint, CheckpointStore, ThreadId};
use crate::error::Result;

/// A [`CheckpointStore`] that persists checkpoints in a SQLite database.
pub struct SqliteCheckpointStore {
    pool: Pool<Sqlite>,
}

impl SqliteCheckpointStore {
    /// Opens (or creates) the database at `db_path` and runs migrations.
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_url = format!("sqlite:{}?mode=rwc", db_path.as_ref().display());
        let pool = SqlitePool::connect(&db_url).await?;
        Self::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Creates an in-memory store, useful for testing.
    pub async fn new_in_memory() -> Result<Self> {
        let pool = SqlitePool::connect("sqlite::memory:").await?;
        Self::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    async fn run_migrations(pool: &Pool<Sqlite>) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS checkpoints (
                thread_id TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn get(&self, thread_id: &ThreadId) -> Result<Option<Checkpoint>> {
        let row = sqlx::query(
            r#"
            SELECT data
            FROM checkpoints
            WHERE thread_id = ?
            "#,
        )
        .bind(thread_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let data: String = row.get("data");
                Ok(Some(serde_json::from_str(&data)?))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, checkpoint: Checkpoint) -> Result<()> {
        let data = serde_json::to_string(&checkpoint)?;

        sqlx::query(
            r#"
            INSERT INTO checkpoints (thread_id, data, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(thread_id) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(checkpoint.thread_id.as_str())
        .bind(data)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, thread_id: &ThreadId) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM checkpoints
            WHERE thread_id = ?
            "#,
        )
        .bind(thread_id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeId;
    use crate::human::ResumeContext;
    use crate::items::{Conversation, Message};
    use pretty_assertions::assert_eq;

    fn checkpoint(thread: &str, pending: NodeId) -> Checkpoint {
        let mut conversation = Conversation::new();
        conversation.push(Message::human("find me a flight"));
        Checkpoint {
            thread_id: thread.into(),
            conversation,
            pending,
            resume: None,
        }
    }

    #[tokio::test]
    async fn test_round_trip() {
        let store = SqliteCheckpointStore::new_in_memory().await.unwrap();
        let thread: ThreadId = "t1".into();

        assert!(store.get(&thread).await.unwrap().is_none());

        let mut cp = checkpoint("t1", NodeId::Human);
        cp.resume = Some(ResumeContext {
            agent: "flights_advisor".into(),
        });
        store.put(cp).await.unwrap();

        let loaded = store.get(&thread).await.unwrap().unwrap();
        assert_eq!(loaded.pending, NodeId::Human);
        assert_eq!(loaded.resume.unwrap().agent.as_str(), "flights_advisor");
        assert_eq!(loaded.conversation.len(), 1);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = SqliteCheckpointStore::new_in_memory().await.unwrap();

        store
            .put(checkpoint("t1", NodeId::Agent("supervisor".into())))
            .await
            .unwrap();

        let mut updated = checkpoint("t1", NodeId::Human);
        updated.conversation.push(Message::agent("hello!", "supervisor"));
        store.put(updated).await.unwrap();

        let loaded = store.get(&"t1".into()).await.unwrap().unwrap();
        assert_eq!(loaded.pending, NodeId::Human);
        assert_eq!(loaded.conversation.len(), 2);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = SqliteCheckpointStore::new_in_memory().await.unwrap();
        store
            .put(checkpoint("t1", NodeId::Human))
            .await
            .unwrap();

        store.delete(&"t1".into()).await.unwrap();
        assert!(store.get(&"t1".into()).await.unwrap().is_none());
    }
}
