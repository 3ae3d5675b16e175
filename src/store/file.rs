//! Local-persisted variant: the whole task list serialized as one JSON array
//! under a fixed storage key (a file on disk).
//!
//! Every mutation rewrites the full list atomically through a temp file in
//! the same directory before the in-memory copy is updated. The write runs on
//! the blocking pool while the state lock is held, so writers stay ordered.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::Backend;
use crate::error::StoreError;
use crate::task::{Task, TaskDraft, TaskId};

/// Storage key; the file name is `<STORAGE_KEY>.json`.
pub const STORAGE_KEY: &str = "todos";

#[derive(Debug, Clone)]
pub struct FileBackend {
    state: Arc<Mutex<FileState>>,
}

#[derive(Debug)]
struct FileState {
    path: PathBuf,
    tasks: Vec<Task>,
    // Highest id ever handed out by this store, so deletes never free an id.
    last_id: TaskId,
}

impl FileBackend {
    /// Opens the list at `path`, creating its parent directory. A missing or
    /// empty file is an empty list.
    #[tracing::instrument(skip(path))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let mut tasks = load_tasks(&path)?;
        sort_newest_first(&mut tasks);
        let last_id = tasks.iter().map(|t| t.id).max().unwrap_or(0);

        info!(path = %path.display(), count = tasks.len(), "opened task file");

        Ok(Self {
            state: Arc::new(Mutex::new(FileState { path, tasks, last_id })),
        })
    }

    /// Opens `<dir>/todos.json`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open(dir.as_ref().join(format!("{STORAGE_KEY}.json")))
    }
}

impl FileState {
    /// Persists `next` and only then makes it the current list.
    async fn commit(&mut self, next: Vec<Task>) -> Result<(), StoreError> {
        let path = self.path.clone();
        let next = tokio::task::spawn_blocking(move || save_tasks_atomic(&path, &next).map(|()| next)).await??;
        self.tasks = next;
        Ok(())
    }
}

fn sort_newest_first(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| b.created_date.cmp(&a.created_date).then(b.id.cmp(&a.id)));
}

fn load_tasks(path: &Path) -> Result<Vec<Task>, StoreError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let tasks: Vec<Task> = serde_json::from_str(&raw)?;
    debug!(file = %path.display(), count = tasks.len(), "loaded tasks");
    Ok(tasks)
}

fn save_tasks_atomic(path: &Path, tasks: &[Task]) -> Result<(), StoreError> {
    debug!(file = %path.display(), count = tasks.len(), "saving tasks atomically");
    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer(&mut temp, tasks)?;
    temp.flush()?;
    temp.persist(path)?;
    Ok(())
}

impl Backend for FileBackend {
    async fn list(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.state.lock().await.tasks.clone())
    }

    async fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn insert(&self, draft: TaskDraft) -> Result<Task, StoreError> {
        let mut state = self.state.lock().await;
        let id = state.last_id + 1;
        let task = draft.into_task(id);

        let mut next = state.tasks.clone();
        next.push(task.clone());
        sort_newest_first(&mut next);
        state.commit(next).await?;
        state.last_id = id;
        Ok(task)
    }

    async fn replace(&self, task: &Task) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let Some(idx) = state.tasks.iter().position(|t| t.id == task.id) else {
            return Ok(false);
        };

        let mut next = state.tasks.clone();
        let created_date = next[idx].created_date;
        next[idx] = Task {
            created_date,
            ..task.clone()
        };
        state.commit(next).await?;
        Ok(true)
    }

    async fn remove(&self, id: TaskId) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        if !state.tasks.iter().any(|t| t.id == id) {
            return Ok(false);
        }
        let next: Vec<Task> = state.tasks.iter().filter(|t| t.id != id).cloned().collect();
        state.commit(next).await?;
        Ok(true)
    }

    async fn remove_completed(&self) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        let before = state.tasks.len();
        let next: Vec<Task> = state.tasks.iter().filter(|t| !t.completed).cloned().collect();
        let removed = (before - next.len()) as u64;
        if removed > 0 {
            state.commit(next).await?;
        }
        Ok(removed)
    }

    async fn remove_all(&self) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        let removed = state.tasks.len() as u64;
        state.commit(Vec::new()).await?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageCause;
    use tempfile::tempdir;

    fn draft(text: &str, created_date: i64) -> TaskDraft {
        TaskDraft {
            text: text.to_string(),
            details: None,
            completed: false,
            created_date,
            completed_date: None,
            modified_date: None,
            due_date: None,
        }
    }

    #[tokio::test]
    async fn mutations_survive_reopen() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::in_dir(dir.path()).unwrap();
        let a = backend.insert(draft("a", 1_000)).await.unwrap();
        let b = backend.insert(draft("b", 2_000)).await.unwrap();
        assert!(backend.remove(a.id).await.unwrap());

        let reopened = FileBackend::in_dir(dir.path()).unwrap();
        let tasks = reopened.list().await.unwrap();
        assert_eq!(tasks, vec![b]);
    }

    #[tokio::test]
    async fn file_is_a_single_json_array() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::in_dir(dir.path()).unwrap();
        backend.insert(draft("a", 1_000)).await.unwrap();

        let raw = fs::read_to_string(dir.path().join("todos.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(1));
        assert_eq!(value[0]["createdDate"], 1_000);
    }

    #[tokio::test]
    async fn deleted_ids_are_not_reissued() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::in_dir(dir.path()).unwrap();
        let a = backend.insert(draft("a", 1_000)).await.unwrap();
        backend.remove(a.id).await.unwrap();
        let b = backend.insert(draft("b", 1_000)).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts_all_persist() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::in_dir(dir.path()).unwrap();

        let handles: Vec<_> = (0..16)
            .map(|n| {
                let backend = backend.clone();
                tokio::spawn(async move { backend.insert(draft(&format!("task {n}"), 1_000 + n)).await })
            })
            .collect();
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }
        ids.sort_unstable();
        assert_eq!(ids, (1..=16).collect::<Vec<_>>());

        let reopened = FileBackend::in_dir(dir.path()).unwrap();
        assert_eq!(reopened.list().await.unwrap().len(), 16);
    }

    #[test]
    fn garbage_file_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("todos.json");
        fs::write(&path, "not json").unwrap();
        let err = FileBackend::open(&path).unwrap_err();
        assert_eq!(err.cause(), Some(StorageCause::Corrupt));
    }

    #[test]
    fn empty_file_is_empty_list() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("todos.json");
        fs::write(&path, "").unwrap();
        assert!(FileBackend::open(&path).is_ok());
    }
}
