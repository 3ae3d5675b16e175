//! Task storage.
//!
//! [`Backend`] is the persistence seam: it only moves whole rows in and out.
//! [`TaskStore`] sits on top and owns the task rules (validation, due-date
//! normalization, completion stamping), so both variants behave identically:
//!
//! * [`sqlite::SqliteBackend`] keeps one row per task in a relational table.
//! * [`file::FileBackend`] keeps the whole list serialized under one key.
//!
//! All trait methods use `impl Future` in their signatures so no extra
//! `async-trait` crate is required.

pub mod file;
pub mod sqlite;

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::info;

use crate::config::{BackendKind, Config};
use crate::error::StoreError;
use crate::task::{NewTask, Task, TaskDraft, TaskId, TaskPatch};

use self::file::FileBackend;
use self::sqlite::SqliteBackend;

/// Row-level persistence. Every mutating call has persisted its effect by the
/// time its future resolves.
pub trait Backend: Send + Sync + 'static {
    /// All tasks, newest `createdDate` first.
    fn list(&self) -> impl Future<Output = Result<Vec<Task>, StoreError>> + Send;

    fn get(&self, id: TaskId) -> impl Future<Output = Result<Option<Task>, StoreError>> + Send;

    /// Stores a new task and assigns its id.
    fn insert(&self, draft: TaskDraft) -> impl Future<Output = Result<Task, StoreError>> + Send;

    /// Overwrites the stored task with the same id. `createdDate` is never
    /// rewritten. Returns `false` when no such task exists.
    fn replace(&self, task: &Task) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Returns `false` when no such task exists.
    fn remove(&self, id: TaskId) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Deletes every completed task and returns how many were removed.
    fn remove_completed(&self) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Deletes every task.
    fn remove_all(&self) -> impl Future<Output = Result<u64, StoreError>> + Send;
}

/// The task capability set, generic over where tasks live.
#[derive(Debug, Clone)]
pub struct TaskStore<B> {
    backend: B,
    tz: Tz,
}

impl<B: Backend> TaskStore<B> {
    pub fn new(backend: B, tz: Tz) -> Self {
        Self { backend, tz }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Current time in the store's local zone.
    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Task>, StoreError> {
        self.backend.list().await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: TaskId) -> Result<Task, StoreError> {
        self.backend.get(id).await?.ok_or(StoreError::NotFound(id))
    }

    pub async fn create(&self, new: NewTask) -> Result<Task, StoreError> {
        self.create_at(new, &self.now()).await
    }

    #[tracing::instrument(skip(self, new, now))]
    pub async fn create_at(&self, new: NewTask, now: &DateTime<Tz>) -> Result<Task, StoreError> {
        let draft = new.into_draft(now)?;
        let task = self.backend.insert(draft).await?;
        info!(id = task.id, "created task");
        Ok(task)
    }

    /// Inserts an already-validated draft as-is. Used by import.
    #[tracing::instrument(skip(self, draft))]
    pub async fn insert_draft(&self, draft: TaskDraft) -> Result<Task, StoreError> {
        let task = self.backend.insert(draft).await?;
        info!(id = task.id, "inserted task");
        Ok(task)
    }

    pub async fn update(&self, id: TaskId, patch: TaskPatch) -> Result<Task, StoreError> {
        self.update_at(id, patch, &self.now()).await
    }

    /// Read-modify-write; two concurrent updates of the same task can lose one.
    #[tracing::instrument(skip(self, patch, now))]
    pub async fn update_at(&self, id: TaskId, patch: TaskPatch, now: &DateTime<Tz>) -> Result<Task, StoreError> {
        let mut task = self.get(id).await?;
        task.apply(patch, now)?;
        if !self.backend.replace(&task).await? {
            return Err(StoreError::NotFound(id));
        }
        info!(id, completed = task.completed, "updated task");
        Ok(task)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: TaskId) -> Result<(), StoreError> {
        if !self.backend.remove(id).await? {
            return Err(StoreError::NotFound(id));
        }
        info!(id, "deleted task");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn clear_completed(&self) -> Result<u64, StoreError> {
        let removed = self.backend.remove_completed().await?;
        info!(removed, "cleared completed tasks");
        Ok(removed)
    }

    #[tracing::instrument(skip(self))]
    pub async fn clear_all(&self) -> Result<u64, StoreError> {
        let removed = self.backend.remove_all().await?;
        info!(removed, "cleared all tasks");
        Ok(removed)
    }
}

/// Either backend, chosen at startup from configuration.
#[derive(Debug, Clone)]
pub enum AnyBackend {
    Sqlite(SqliteBackend),
    File(FileBackend),
}

impl AnyBackend {
    pub async fn open(config: &Config) -> Result<Self, StoreError> {
        match config.backend {
            BackendKind::Sqlite => {
                let backend = SqliteBackend::connect(
                    &config.database_url,
                    config.max_connections,
                    Duration::from_secs(config.acquire_timeout_secs),
                )
                .await?;
                info!(database_url = %config.database_url, "using sqlite backend");
                Ok(AnyBackend::Sqlite(backend))
            }
            BackendKind::File => {
                let path = config.data_file.clone();
                let backend = tokio::task::spawn_blocking(move || FileBackend::open(path)).await??;
                info!(path = %config.data_file.display(), "using file backend");
                Ok(AnyBackend::File(backend))
            }
        }
    }
}

impl TaskStore<AnyBackend> {
    /// Opens whichever backend `config` selects, in the configured local zone.
    pub async fn open(config: &Config) -> Result<Self, StoreError> {
        Ok(Self::new(AnyBackend::open(config).await?, config.timezone()))
    }
}

impl Backend for AnyBackend {
    async fn list(&self) -> Result<Vec<Task>, StoreError> {
        match self {
            AnyBackend::Sqlite(b) => b.list().await,
            AnyBackend::File(b) => b.list().await,
        }
    }

    async fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        match self {
            AnyBackend::Sqlite(b) => b.get(id).await,
            AnyBackend::File(b) => b.get(id).await,
        }
    }

    async fn insert(&self, draft: TaskDraft) -> Result<Task, StoreError> {
        match self {
            AnyBackend::Sqlite(b) => b.insert(draft).await,
            AnyBackend::File(b) => b.insert(draft).await,
        }
    }

    async fn replace(&self, task: &Task) -> Result<bool, StoreError> {
        match self {
            AnyBackend::Sqlite(b) => b.replace(task).await,
            AnyBackend::File(b) => b.replace(task).await,
        }
    }

    async fn remove(&self, id: TaskId) -> Result<bool, StoreError> {
        match self {
            AnyBackend::Sqlite(b) => b.remove(id).await,
            AnyBackend::File(b) => b.remove(id).await,
        }
    }

    async fn remove_completed(&self) -> Result<u64, StoreError> {
        match self {
            AnyBackend::Sqlite(b) => b.remove_completed().await,
            AnyBackend::File(b) => b.remove_completed().await,
        }
    }

    async fn remove_all(&self) -> Result<u64, StoreError> {
        match self {
            AnyBackend::Sqlite(b) => b.remove_all().await,
            AnyBackend::File(b) => b.remove_all().await,
        }
    }
}
