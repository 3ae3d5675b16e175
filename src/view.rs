//! View models for whatever UI binding sits in front of the store.
//!
//! [`build_view`] runs the filters and, for the month period, the calendar
//! projection, then formats every timestamp for display.

use chrono::{DateTime, Datelike};
use chrono_tz::Tz;
use serde::Serialize;

use crate::calendar::{self, CalendarMonth};
use crate::dates;
use crate::filter::{self, PeriodFilter, StatusFilter};
use crate::task::{Task, TaskId};

pub const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: TaskId,
    pub text: String,
    pub details: Option<String>,
    pub has_details: bool,
    pub completed: bool,
    pub overdue: bool,
    /// Date only.
    pub created: String,
    /// Date only.
    pub due: Option<String>,
    /// Date and time.
    pub modified: Option<String>,
    /// Date and time.
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    pub can_clear_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayView {
    pub day: u32,
    pub date: String,
    pub is_today: bool,
    pub items: Vec<TaskView>,
    pub hidden_completed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarView {
    /// `YYYY-MM`.
    pub title: String,
    pub year: i32,
    pub month: u32,
    pub weekdays: [&'static str; 7],
    pub leading_blanks: u32,
    pub days: Vec<DayView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Layout {
    List {
        items: Vec<TaskView>,
        #[serde(rename = "emptyMessage")]
        empty_message: Option<String>,
    },
    Calendar(CalendarView),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub status: StatusFilter,
    pub period: PeriodFilter,
    pub stats: Stats,
    pub layout: Layout,
}

impl TaskView {
    pub fn new(task: &Task, now: &DateTime<Tz>) -> Self {
        let tz = now.timezone();
        Self {
            id: task.id,
            text: task.text.clone(),
            details: task.details.clone(),
            has_details: task.has_details(),
            completed: task.completed,
            overdue: task.is_overdue(now),
            created: dates::format_date(task.created_date, &tz),
            due: task.due_date.map(|ms| dates::format_date(ms, &tz)),
            modified: task.modified_date.map(|ms| dates::format_date_time(ms, &tz)),
            completed_at: task.completed_date.map(|ms| dates::format_date_time(ms, &tz)),
        }
    }
}

impl Stats {
    /// Counts over the whole collection, ignoring filters.
    pub fn of(tasks: &[Task]) -> Self {
        let completed = tasks.iter().filter(|t| t.completed).count();
        Self {
            total: tasks.len(),
            completed,
            active: tasks.len() - completed,
            can_clear_completed: completed > 0,
        }
    }
}

impl CalendarView {
    pub fn new(month: &CalendarMonth<'_>, now: &DateTime<Tz>) -> Self {
        let days = month
            .days
            .iter()
            .map(|day| DayView {
                day: day.date.day(),
                date: day.date.format("%Y-%m-%d").to_string(),
                is_today: day.is_today,
                items: day
                    .entries
                    .iter()
                    .map(|entry| TaskView::new(entry.task, now))
                    .collect(),
                hidden_completed: day.hidden_completed,
            })
            .collect();

        Self {
            title: format!("{}-{:02}", month.year, month.month),
            year: month.year,
            month: month.month,
            weekdays: WEEKDAYS,
            leading_blanks: month.leading_blanks,
            days,
        }
    }
}

pub fn empty_message(status: StatusFilter) -> &'static str {
    match status {
        StatusFilter::All => "No tasks yet. Add a new one!",
        StatusFilter::Active => "No active tasks.",
        StatusFilter::Completed => "No completed tasks.",
    }
}

/// Flat list for `all`/`week`, calendar grid for `month`.
pub fn build_view(tasks: &[Task], status: StatusFilter, period: PeriodFilter, now: &DateTime<Tz>) -> View {
    let visible = filter::select_visible(tasks, status, period, now);

    let layout = match period {
        PeriodFilter::Month => {
            let month = calendar::project_month(&visible, now);
            Layout::Calendar(CalendarView::new(&month, now))
        }
        PeriodFilter::All | PeriodFilter::Week => {
            let items: Vec<TaskView> = visible.iter().map(|task| TaskView::new(task, now)).collect();
            let empty_message = items.is_empty().then(|| empty_message(status).to_string());
            Layout::List { items, empty_message }
        }
    };

    View {
        status,
        period,
        stats: Stats::of(tasks),
        layout,
    }
}
