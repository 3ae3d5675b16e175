//! Command interface for a UI binding layer.
//!
//! [`TodoApp`] owns the store, a cached copy of the task list and the current
//! filter selection. Every command talks to the store and then reloads the
//! list, so the cached copy always reflects what was persisted.

use std::fmt;

use chrono::NaiveDate;
use tracing::{error, warn};

use crate::dates;
use crate::error::StoreError;
use crate::filter::{PeriodFilter, StatusFilter};
use crate::store::{Backend, TaskStore};
use crate::task::{NewTask, Task, TaskId, TaskPatch};
use crate::view::{self, View};

/// What the user is told when a command fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The input was rejected; carries the reason.
    Invalid(String),
    /// The task is gone, typically deleted elsewhere.
    Missing(TaskId),
    /// Storage could not be reached at all.
    Unreachable,
    /// Any other storage failure.
    Failed(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Invalid(reason) => f.write_str(reason),
            Notice::Missing(id) => write!(f, "Task {id} no longer exists."),
            Notice::Unreachable => f.write_str("Cannot reach the server. Check that it is running."),
            Notice::Failed(reason) => write!(f, "Something went wrong: {reason}"),
        }
    }
}

impl std::error::Error for Notice {}

impl From<StoreError> for Notice {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(reason) => Notice::Invalid(reason),
            StoreError::NotFound(id) => Notice::Missing(id),
            StoreError::Storage { cause, .. } if cause.is_connectivity() => {
                warn!(%cause, "storage unreachable");
                Notice::Unreachable
            }
            StoreError::Storage { cause, source } => {
                error!(%cause, error = %source, "storage failure");
                Notice::Failed(cause.to_string())
            }
        }
    }
}

pub struct TodoApp<B> {
    store: TaskStore<B>,
    tasks: Vec<Task>,
    status: StatusFilter,
    period: PeriodFilter,
}

impl<B: Backend> TodoApp<B> {
    /// Builds the app and loads the current list.
    pub async fn open(store: TaskStore<B>) -> Result<Self, Notice> {
        let mut app = Self {
            store,
            tasks: Vec::new(),
            status: StatusFilter::default(),
            period: PeriodFilter::default(),
        };
        app.refresh().await?;
        Ok(app)
    }

    pub fn store(&self) -> &TaskStore<B> {
        &self.store
    }

    /// The cached list, newest first.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn status_filter(&self) -> StatusFilter {
        self.status
    }

    pub fn period_filter(&self) -> PeriodFilter {
        self.period
    }

    pub async fn refresh(&mut self) -> Result<(), Notice> {
        self.tasks = self.store.list().await?;
        Ok(())
    }

    /// Adds a task due on `due` (local date), or today when `None`.
    pub async fn add_task(&mut self, text: &str, details: Option<&str>, due: Option<NaiveDate>) -> Result<Task, Notice> {
        let now = self.store.now();
        let due = due.unwrap_or_else(|| now.date_naive());
        let mut new = NewTask::new(text).due(dates::start_of_day(due, &now.timezone()).timestamp_millis());
        if let Some(details) = details {
            new = new.with_details(details);
        }
        let task = self.store.create_at(new, &now).await?;
        self.refresh().await?;
        Ok(task)
    }

    pub async fn toggle_complete(&mut self, id: TaskId) -> Result<Task, Notice> {
        let completed = self.cached(id)?.completed;
        self.patch(id, TaskPatch::completed(!completed)).await
    }

    pub async fn edit_details(&mut self, id: TaskId, details: &str) -> Result<Task, Notice> {
        self.patch(id, TaskPatch::details(Some(details.to_string()))).await
    }

    pub async fn edit_text(&mut self, id: TaskId, text: &str) -> Result<Task, Notice> {
        self.patch(id, TaskPatch::text(text)).await
    }

    pub async fn set_due_date(&mut self, id: TaskId, due: Option<NaiveDate>) -> Result<Task, Notice> {
        let tz = self.store.timezone();
        let due = due.map(|date| dates::start_of_day(date, &tz).timestamp_millis());
        self.patch(id, TaskPatch::due_date(due)).await
    }

    pub async fn delete_task(&mut self, id: TaskId) -> Result<(), Notice> {
        self.store.delete(id).await?;
        self.refresh().await
    }

    /// Removes every completed task. Does not touch storage when the cached
    /// list has none.
    pub async fn clear_completed(&mut self) -> Result<u64, Notice> {
        if !self.tasks.iter().any(|t| t.completed) {
            return Ok(0);
        }
        let removed = self.store.clear_completed().await?;
        self.refresh().await?;
        Ok(removed)
    }

    pub fn set_status_filter(&mut self, status: StatusFilter) {
        self.status = status;
    }

    pub fn set_period_filter(&mut self, period: PeriodFilter) {
        self.period = period;
    }

    /// Renders the cached list with the current filters as of now.
    pub fn view(&self) -> View {
        view::build_view(&self.tasks, self.status, self.period, &self.store.now())
    }

    fn cached(&self, id: TaskId) -> Result<&Task, Notice> {
        self.tasks.iter().find(|t| t.id == id).ok_or(Notice::Missing(id))
    }

    async fn patch(&mut self, id: TaskId, patch: TaskPatch) -> Result<Task, Notice> {
        let task = self.store.update(id, patch).await?;
        self.refresh().await?;
        Ok(task)
    }
}
