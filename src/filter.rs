//! Status and period filters over an in-memory task list.
//!
//! Both filters are independent predicates combined with AND. The status
//! filter runs first, then the period filter. Period windows always look at
//! `createdDate`, never at the due date.

use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::dates::{self, Window};
use crate::task::Task;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodFilter {
    #[default]
    All,
    Week,
    Month,
}

impl StatusFilter {
    pub const ALL: [StatusFilter; 3] = [StatusFilter::All, StatusFilter::Active, StatusFilter::Completed];

    pub fn matches(self, task: &Task) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => !task.completed,
            StatusFilter::Completed => task.completed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Active => "active",
            StatusFilter::Completed => "completed",
        }
    }
}

impl PeriodFilter {
    pub const ALL: [PeriodFilter; 3] = [PeriodFilter::All, PeriodFilter::Week, PeriodFilter::Month];

    /// The `createdDate` window for this period, or `None` for no restriction.
    pub fn window(self, now: &DateTime<Tz>) -> Option<Window> {
        match self {
            PeriodFilter::All => None,
            PeriodFilter::Week => Some(dates::week_window(now)),
            PeriodFilter::Month => Some(dates::month_window(now)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PeriodFilter::All => "all",
            PeriodFilter::Week => "week",
            PeriodFilter::Month => "month",
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PeriodFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatusFilter::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown status filter '{s}'"))
    }
}

impl FromStr for PeriodFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PeriodFilter::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown period filter '{s}'"))
    }
}

/// Tasks passing both filters, in their original order.
pub fn select_visible<'a>(
    tasks: &'a [Task],
    status: StatusFilter,
    period: PeriodFilter,
    now: &DateTime<Tz>,
) -> Vec<&'a Task> {
    let by_status = tasks.iter().filter(|task| status.matches(task));
    match period.window(now) {
        None => by_status.collect(),
        Some(window) => by_status
            .filter(|task| window.contains(task.created_date))
            .collect(),
    }
}
