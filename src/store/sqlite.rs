//! Relational-table variant of the task store, on a bounded SQLite pool.
//!
//! Each call checks a connection out of the pool for the duration of the
//! query; the pool returns it on every exit path.

use std::time::Duration;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use tracing::debug;

use super::Backend;
use crate::error::StoreError;
use crate::task::{Task, TaskDraft, TaskId};

pub type DbPool = SqlitePool;

#[derive(Debug, Clone)]
pub struct SqliteBackend {
    pool: DbPool,
}

#[derive(Debug, FromRow)]
struct DbTask {
    id: i64,
    text: String,
    details: Option<String>,
    completed: bool,
    created_date: i64,
    completed_date: Option<i64>,
    modified_date: Option<i64>,
    due_date: Option<i64>,
}

impl From<DbTask> for Task {
    fn from(row: DbTask) -> Self {
        Task {
            id: row.id,
            text: row.text,
            details: row.details,
            completed: row.completed,
            created_date: row.created_date,
            completed_date: row.completed_date,
            modified_date: row.modified_date,
            due_date: row.due_date,
        }
    }
}

const SELECT_TASK: &str = "SELECT id, text, details, completed, created_date, completed_date, modified_date, due_date FROM todos";

impl SqliteBackend {
    /// Opens the pool and creates the table when it does not exist yet.
    pub async fn connect(database_url: &str, max_connections: u32, acquire_timeout: Duration) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await?;
        Self::from_pool(pool).await
    }

    /// A private in-memory database. A single never-recycled connection keeps
    /// the data alive for the life of the pool.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: DbPool) -> Result<Self, StoreError> {
        create_tables(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

async fn create_tables(pool: &DbPool) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS todos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            text TEXT NOT NULL,
            details TEXT,
            completed INTEGER NOT NULL DEFAULT 0,
            created_date INTEGER NOT NULL,
            completed_date INTEGER,
            modified_date INTEGER,
            due_date INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS todos_created_date ON todos (created_date)")
        .execute(pool)
        .await?;

    Ok(())
}

impl Backend for SqliteBackend {
    async fn list(&self) -> Result<Vec<Task>, StoreError> {
        let query = format!("{SELECT_TASK} ORDER BY created_date DESC, id DESC");
        let rows: Vec<DbTask> = sqlx::query_as(&query).fetch_all(&self.pool).await?;
        debug!(count = rows.len(), "loaded tasks");
        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        let query = format!("{SELECT_TASK} WHERE id = ?");
        let row: Option<DbTask> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Task::from))
    }

    async fn insert(&self, draft: TaskDraft) -> Result<Task, StoreError> {
        let result = sqlx::query(
            "INSERT INTO todos (text, details, completed, created_date, completed_date, modified_date, due_date) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&draft.text)
        .bind(&draft.details)
        .bind(draft.completed)
        .bind(draft.created_date)
        .bind(draft.completed_date)
        .bind(draft.modified_date)
        .bind(draft.due_date)
        .execute(&self.pool)
        .await?;

        Ok(draft.into_task(result.last_insert_rowid()))
    }

    async fn replace(&self, task: &Task) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE todos SET text = ?, details = ?, completed = ?, completed_date = ?, modified_date = ?, due_date = ? WHERE id = ?",
        )
        .bind(&task.text)
        .bind(&task.details)
        .bind(task.completed)
        .bind(task.completed_date)
        .bind(task.modified_date)
        .bind(task.due_date)
        .bind(task.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove(&self, id: TaskId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM todos WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_completed(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM todos WHERE completed = 1")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn remove_all(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM todos").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
