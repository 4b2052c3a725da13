/*!
SQLite-backed implementation of the [`Checkpointer`] trait.

Stores the full step history per thread, which serves both crash recovery
(`load_latest`) and time travel (`load_at`). Serialization goes through
the persistence models (see `runtimes::persistence`); this module is
database I/O only.

## Schema

- `checkpoints.thread_id` / `checkpoints.step` - composite primary key
- `checkpoints.state_json`    - serialized [`PersistedState`]
- `checkpoints.frontier_json` - JSON array of encoded `NodeKind`
- `checkpoints.created_at`    - RFC3339 capture time

Saving an existing `(thread_id, step)` pair overwrites the prior row,
matching the in-memory backend.

## Storage growth

History grows with `threads x steps_per_thread x state_size`. Long-running
deployments should prune old rows periodically, e.g.:

```bash
sqlite3 relaygraph.db "DELETE FROM checkpoints WHERE created_at < datetime('now', '-30 days')"
sqlite3 relaygraph.db "VACUUM"
```
*/

use std::sync::Arc;

use sqlx::{Row, SqlitePool};
use tracing::instrument;

use crate::runtimes::checkpointer::{Checkpoint, Checkpointer, CheckpointerError, Result};
use crate::runtimes::persistence::{deserialize_json, serialize_json, PersistedState};
use crate::state::AgentState;
use crate::types::NodeKind;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS checkpoints (
    thread_id     TEXT    NOT NULL,
    step          INTEGER NOT NULL,
    state_json    TEXT    NOT NULL,
    frontier_json TEXT    NOT NULL,
    created_at    TEXT    NOT NULL,
    PRIMARY KEY (thread_id, step)
);
CREATE INDEX IF NOT EXISTS idx_checkpoints_thread ON checkpoints (thread_id, step DESC);
"#;

/// Durable checkpointer over a SQLite connection pool.
pub struct SQLiteCheckpointer {
    pool: Arc<SqlitePool>,
}

impl std::fmt::Debug for SQLiteCheckpointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SQLiteCheckpointer").finish()
    }
}

impl SQLiteCheckpointer {
    /// Connect to (or create) a SQLite database at `database_url` and apply
    /// the schema. Example URL: `sqlite://relaygraph.db`.
    #[must_use = "checkpointer must be used to persist state"]
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str) -> std::result::Result<Self, CheckpointerError> {
        let pool = SqlitePool::connect(database_url)
            .await
            .map_err(|e| CheckpointerError::Backend {
                message: format!("connect error: {e}"),
            })?;
        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| CheckpointerError::Backend {
                message: format!("schema setup failed: {e}"),
            })?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    fn row_to_checkpoint(row: &sqlx::sqlite::SqliteRow) -> Result<Checkpoint> {
        let thread_id: String = row.try_get("thread_id").map_err(backend)?;
        let step: i64 = row.try_get("step").map_err(backend)?;
        let state_json: String = row.try_get("state_json").map_err(backend)?;
        let frontier_json: String = row.try_get("frontier_json").map_err(backend)?;
        let created_at_raw: String = row.try_get("created_at").map_err(backend)?;

        let persisted: PersistedState = deserialize_json(&state_json, "state").map_err(other)?;
        let frontier_enc: Vec<String> =
            deserialize_json(&frontier_json, "frontier").map_err(other)?;
        let created_at = chrono::DateTime::parse_from_rfc3339(&created_at_raw)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .unwrap_or_else(|_| chrono::Utc::now());

        Ok(Checkpoint {
            thread_id,
            step: step as u64,
            state: AgentState::from(persisted),
            frontier: frontier_enc.iter().map(|s| NodeKind::decode(s)).collect(),
            created_at,
        })
    }
}

fn backend(e: sqlx::Error) -> CheckpointerError {
    CheckpointerError::Backend {
        message: e.to_string(),
    }
}

fn other(e: crate::runtimes::persistence::PersistenceError) -> CheckpointerError {
    CheckpointerError::Other {
        message: e.to_string(),
    }
}

#[async_trait::async_trait]
impl Checkpointer for SQLiteCheckpointer {
    #[instrument(skip(self, checkpoint), err)]
    async fn save(&self, checkpoint: Checkpoint) -> Result<()> {
        let persisted = PersistedState::from(&checkpoint.state);
        let state_json = serialize_json(&persisted, "state").map_err(other)?;
        let frontier_enc: Vec<String> = checkpoint.frontier.iter().map(|k| k.encode()).collect();
        let frontier_json = serialize_json(&frontier_enc, "frontier").map_err(other)?;

        sqlx::query(
            "INSERT OR REPLACE INTO checkpoints \
             (thread_id, step, state_json, frontier_json, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&checkpoint.thread_id)
        .bind(checkpoint.step as i64)
        .bind(&state_json)
        .bind(&frontier_json)
        .bind(checkpoint.created_at.to_rfc3339())
        .execute(self.pool.as_ref())
        .await
        .map_err(backend)?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn load_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        let row = sqlx::query(
            "SELECT thread_id, step, state_json, frontier_json, created_at \
             FROM checkpoints WHERE thread_id = ?1 ORDER BY step DESC LIMIT 1",
        )
        .bind(thread_id)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(backend)?;
        row.as_ref().map(Self::row_to_checkpoint).transpose()
    }

    #[instrument(skip(self), err)]
    async fn load_at(&self, thread_id: &str, step: u64) -> Result<Option<Checkpoint>> {
        let row = sqlx::query(
            "SELECT thread_id, step, state_json, frontier_json, created_at \
             FROM checkpoints WHERE thread_id = ?1 AND step = ?2",
        )
        .bind(thread_id)
        .bind(step as i64)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(backend)?;
        row.as_ref().map(Self::row_to_checkpoint).transpose()
    }

    async fn list_threads(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT DISTINCT thread_id FROM checkpoints ORDER BY thread_id")
            .fetch_all(self.pool.as_ref())
            .await
            .map_err(backend)?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("thread_id").map_err(backend))
            .collect()
    }

    #[instrument(skip(self), err)]
    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM checkpoints WHERE thread_id = ?1")
            .bind(thread_id)
            .execute(self.pool.as_ref())
            .await
            .map_err(backend)?;
        Ok(())
    }
}
