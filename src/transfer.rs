//! Whole-collection JSON export and merge-style JSON import.

use chrono::DateTime;
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::info;

use crate::dates::Millis;
use crate::error::StoreError;
use crate::store::{Backend, TaskStore};
use crate::task::{self, Task, TaskDraft};

/// A Task-shaped object from an import file. Everything but `text` may be
/// missing; ids are always reassigned.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub created_date: Option<Millis>,
    #[serde(default)]
    pub completed_date: Option<Millis>,
    #[serde(default)]
    pub due_date: Option<Millis>,
}

impl ImportRecord {
    /// Missing or zero `createdDate` becomes `now`; `dueDate` is cut to local
    /// midnight but never defaulted.
    pub fn into_draft(self, now: &DateTime<Tz>) -> Result<TaskDraft, StoreError> {
        let tz = now.timezone();
        let now_ms = now.timestamp_millis();
        let text = task::clean_text(self.text.as_deref().unwrap_or_default())?;
        let completed = self.completed.unwrap_or(false);
        Ok(TaskDraft {
            text,
            details: task::clean_details(self.details),
            completed,
            created_date: self.created_date.filter(|ms| *ms != 0).unwrap_or(now_ms),
            completed_date: completed.then(|| self.completed_date.filter(|ms| *ms != 0).unwrap_or(now_ms)),
            modified_date: None,
            due_date: task::clean_due(self.due_date, &tz)?,
        })
    }
}

pub fn export_json(tasks: &[Task]) -> Result<String, StoreError> {
    Ok(serde_json::to_string_pretty(tasks)?)
}

/// Parses an import file. Anything but a JSON array is rejected.
pub fn parse_import(raw: &str) -> Result<Vec<ImportRecord>, StoreError> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|err| StoreError::Validation(format!("Invalid file: {err}")))?;
    if !value.is_array() {
        return Err(StoreError::Validation("Invalid file: expected a JSON array of tasks".to_string()));
    }
    serde_json::from_value(value).map_err(|err| StoreError::Validation(format!("Invalid file: {err}")))
}

/// Adds every record as a new task. All records are validated before the
/// first one is written.
#[tracing::instrument(skip(store, records), fields(count = records.len()))]
pub async fn import<B: Backend>(store: &TaskStore<B>, records: Vec<ImportRecord>) -> Result<Vec<Task>, StoreError> {
    let now = store.now();
    let drafts = records
        .into_iter()
        .enumerate()
        .map(|(idx, record)| {
            record.into_draft(&now).map_err(|err| match err {
                StoreError::Validation(reason) => StoreError::Validation(format!("Record {}: {reason}", idx + 1)),
                other => other,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut created = Vec::with_capacity(drafts.len());
    for draft in drafts {
        created.push(store.insert_draft(draft).await?);
    }
    info!(imported = created.len(), "imported tasks");
    Ok(created)
}
