use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize};

use crate::dates::{self, Millis};
use crate::error::StoreError;

pub type TaskId = i64;

/// One to-do item. Serialized with the camelCase field names of the REST API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub details: Option<String>,
    pub completed: bool,
    pub created_date: Millis,
    pub completed_date: Option<Millis>,
    pub modified_date: Option<Millis>,
    pub due_date: Option<Millis>,
}

/// Body of a create request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub due_date: Option<Millis>,
}

/// Partial update. For the nullable fields, `Some(None)` means "clear" and
/// `None` means "leave alone".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub details: Option<Option<String>>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default, deserialize_with = "present")]
    pub due_date: Option<Option<Millis>>,
}

/// A task that has not been given an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub text: String,
    pub details: Option<String>,
    pub completed: bool,
    pub created_date: Millis,
    pub completed_date: Option<Millis>,
    pub modified_date: Option<Millis>,
    pub due_date: Option<Millis>,
}

fn present<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

pub(crate) fn clean_text(text: &str) -> Result<String, StoreError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(StoreError::Validation("Please enter a task".to_string()));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn clean_details(details: Option<String>) -> Option<String> {
    details
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

/// Zero stands in for "absent" the same way it does on the wire. A timestamp
/// with no calendar date is rejected.
pub(crate) fn clean_due(due: Option<Millis>, tz: &Tz) -> Result<Option<Millis>, StoreError> {
    due.filter(|ms| *ms != 0)
        .map(|ms| {
            dates::normalize_to_midnight(ms, tz)
                .ok_or_else(|| StoreError::Validation(format!("Invalid due date: {ms}")))
        })
        .transpose()
}

impl NewTask {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn due(mut self, due_date: Millis) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Validates and normalizes the request. A missing due date becomes
    /// today's local midnight.
    pub fn into_draft(self, now: &DateTime<Tz>) -> Result<TaskDraft, StoreError> {
        let tz = now.timezone();
        let text = clean_text(&self.text)?;
        let due_date = clean_due(self.due_date, &tz)?.unwrap_or_else(|| dates::today_midnight(now));
        Ok(TaskDraft {
            text,
            details: clean_details(self.details),
            completed: false,
            created_date: now.timestamp_millis(),
            completed_date: None,
            modified_date: None,
            due_date: Some(due_date),
        })
    }
}

impl TaskPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn details(details: Option<String>) -> Self {
        Self {
            details: Some(details),
            ..Self::default()
        }
    }

    pub fn due_date(due_date: Option<Millis>) -> Self {
        Self {
            due_date: Some(due_date),
            ..Self::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

impl TaskDraft {
    pub fn into_task(self, id: TaskId) -> Task {
        Task {
            id,
            text: self.text,
            details: self.details,
            completed: self.completed,
            created_date: self.created_date,
            completed_date: self.completed_date,
            modified_date: self.modified_date,
            due_date: self.due_date,
        }
    }
}

impl Task {
    /// Applies `patch` as of `now`. Nothing is modified when validation fails.
    ///
    /// `completedDate` is stamped on the first transition to completed and
    /// cleared whenever the task is reopened. `modifiedDate` is always stamped.
    pub fn apply(&mut self, patch: TaskPatch, now: &DateTime<Tz>) -> Result<(), StoreError> {
        let text = patch.text.as_deref().map(clean_text).transpose()?;
        let due_date = patch
            .due_date
            .map(|due| clean_due(due, &now.timezone()))
            .transpose()?;
        let now_ms = now.timestamp_millis();

        if let Some(text) = text {
            self.text = text;
        }
        if let Some(details) = patch.details {
            self.details = clean_details(details);
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
            if !completed {
                self.completed_date = None;
            } else if self.completed_date.is_none() {
                self.completed_date = Some(now_ms);
            }
        }
        if let Some(due) = due_date {
            self.due_date = due;
        }
        self.modified_date = Some(now_ms);
        Ok(())
    }

    /// Incomplete and due strictly before today's local midnight.
    pub fn is_overdue(&self, now: &DateTime<Tz>) -> bool {
        if self.completed {
            return false;
        }
        let tz = now.timezone();
        self.due_date
            .and_then(|due| dates::normalize_to_midnight(due, &tz))
            .is_some_and(|due| due < dates::today_midnight(now))
    }

    pub fn has_details(&self) -> bool {
        self.details.as_deref().is_some_and(|d| !d.trim().is_empty())
    }
}
