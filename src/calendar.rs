//! Month grid for the calendar view.
//!
//! The grid always covers the month containing `now`. Tasks are bucketed by
//! the local calendar date of their `createdDate`.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Days, NaiveDate};
use chrono_tz::Tz;

use crate::dates;
use crate::task::Task;

/// Completed tasks shown per day; the rest are hidden, not deleted.
pub const MAX_COMPLETED_PER_DAY: usize = 2;

#[derive(Debug, Clone)]
pub struct CalendarMonth<'a> {
    pub year: i32,
    pub month: u32,
    /// Empty cells before day 1 in a Sunday-first week (0 = Sunday).
    pub leading_blanks: u32,
    pub days: Vec<CalendarDay<'a>>,
}

#[derive(Debug, Clone)]
pub struct CalendarDay<'a> {
    pub date: NaiveDate,
    pub is_today: bool,
    pub entries: Vec<CalendarEntry<'a>>,
    pub hidden_completed: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct CalendarEntry<'a> {
    pub task: &'a Task,
    pub overdue: bool,
}

/// Incomplete before completed; completed by `completedDate` ascending with a
/// missing date as 0; incomplete tasks keep their relative order.
fn day_order(a: &Task, b: &Task) -> Ordering {
    match (a.completed, b.completed) {
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        (true, true) => a.completed_date.unwrap_or(0).cmp(&b.completed_date.unwrap_or(0)),
        (false, false) => Ordering::Equal,
    }
}

pub fn project_month<'a>(tasks: &[&'a Task], now: &DateTime<Tz>) -> CalendarMonth<'a> {
    let tz = now.timezone();
    let today = now.date_naive();
    let first = dates::first_of_month(today);
    let last = dates::last_of_month(today);

    let mut by_date: BTreeMap<NaiveDate, Vec<&'a Task>> = BTreeMap::new();
    for task in tasks.iter().copied() {
        // A zero createdDate counts as missing.
        if task.created_date == 0 {
            continue;
        }
        if let Some(date) = dates::local_date(task.created_date, &tz) {
            by_date.entry(date).or_default().push(task);
        }
    }

    let mut days = Vec::with_capacity(last.day() as usize);
    let mut date = first;
    while date <= last {
        let mut bucket = by_date.remove(&date).unwrap_or_default();
        bucket.sort_by(|a, b| day_order(a, b));

        let mut entries = Vec::with_capacity(bucket.len());
        let mut shown_completed = 0;
        let mut hidden_completed = 0;
        for task in bucket {
            if task.completed {
                if shown_completed == MAX_COMPLETED_PER_DAY {
                    hidden_completed += 1;
                    continue;
                }
                shown_completed += 1;
            }
            entries.push(CalendarEntry {
                task,
                overdue: task.is_overdue(now),
            });
        }

        days.push(CalendarDay {
            date,
            is_today: date == today,
            entries,
            hidden_completed,
        });
        date = date + Days::new(1);
    }

    CalendarMonth {
        year: first.year(),
        month: first.month(),
        leading_blanks: first.weekday().num_days_from_sunday(),
        days,
    }
}
