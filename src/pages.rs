//! Server-rendered homepage showing the same view model as `/api/view`.

use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use hypertext::{prelude::*, Raw};

use crate::api::{SharedState, ViewQuery};
use crate::error::StoreError;
use crate::filter::{PeriodFilter, StatusFilter};
use crate::store::Backend;
use crate::view::{self, CalendarView, DayView, Layout, TaskView, View};

pub fn router<B: Backend>() -> Router<SharedState<B>> {
    Router::new().route("/", get(homepage::<B>))
}

// GET /?status=&period=
pub async fn homepage<B: Backend>(
    State(state): State<SharedState<B>>,
    Query(query): Query<ViewQuery>,
) -> Result<Html<String>, StoreError> {
    let (status, period) = query.filters();
    let tasks = state.store.list().await?;
    let view = view::build_view(&tasks, status, period, &state.store.now());
    Ok(Html(render_page(&view)))
}

fn filter_href(status: StatusFilter, period: PeriodFilter) -> String {
    format!("/?status={status}&period={period}")
}

fn render_page(view: &View) -> String {
    let body = match &view.layout {
        Layout::List { items, empty_message } => render_list(items, empty_message.as_deref()),
        Layout::Calendar(calendar) => render_calendar(calendar),
    };
    let summary = format!(
        "{} total, {} active, {} completed",
        view.stats.total, view.stats.active, view.stats.completed
    );

    maud! {
        !DOCTYPE
        html {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "Todos" }
            }
            body {
                div .homepage id="homepage" {
                    h1 { "Todos" }

                    nav .filters {
                        div .filter-group {
                            @for status in StatusFilter::ALL {
                                @if status == view.status {
                                    strong .filter-active { (status.as_str()) }
                                } @else {
                                    a href=(filter_href(status, view.period)) { (status.as_str()) }
                                }
                                " "
                            }
                        }
                        div .filter-group {
                            @for period in PeriodFilter::ALL {
                                @if period == view.period {
                                    strong .filter-active { (period.as_str()) }
                                } @else {
                                    a href=(filter_href(view.status, period)) { (period.as_str()) }
                                }
                                " "
                            }
                        }
                    }

                    p .stats { (summary) }

                    (Raw::dangerously_create(&body))
                }
            }
        }
    }
    .render()
    .into_inner()
}

fn render_item(item: &TaskView) -> String {
    let mut class = "task-item".to_string();
    if item.completed {
        class.push_str(" task-item-completed");
    }
    if item.overdue {
        class.push_str(" task-item-overdue");
    }
    let created = format!("Created {}", item.created);

    maud! {
        li class=(class) {
            span .task-text { (item.text) }
            @if let Some(details) = &item.details {
                @if item.has_details {
                    div .task-details { (details) }
                }
            }
            div .task-dates {
                span { (created) }
                @if let Some(due) = &item.due {
                    span .task-due { " · Due " (due) }
                }
                @if let Some(done) = &item.completed_at {
                    span .task-done { " · Done " (done) }
                }
            }
        }
    }
    .render()
    .into_inner()
}

fn render_list(items: &[TaskView], empty_message: Option<&str>) -> String {
    if let Some(message) = empty_message {
        return maud! {
            div .task-list-empty {
                p { (message) }
            }
        }
        .render()
        .into_inner();
    }

    let rendered: Vec<String> = items.iter().map(render_item).collect();
    maud! {
        ul .task-list {
            (Raw::dangerously_create(&rendered.join("\n")))
        }
    }
    .render()
    .into_inner()
}

/// Rows of seven cells; `None` is a blank before day 1 or after the last day.
fn calendar_rows(calendar: &CalendarView) -> Vec<Vec<Option<&DayView>>> {
    let mut cells: Vec<Option<&DayView>> = (0..calendar.leading_blanks).map(|_| None).collect();
    cells.extend(calendar.days.iter().map(Some));
    while cells.len() % 7 != 0 {
        cells.push(None);
    }
    cells.chunks(7).map(<[_]>::to_vec).collect()
}

fn render_day(day: &DayView) -> String {
    let class = if day.is_today {
        "calendar-cell calendar-cell-today"
    } else {
        "calendar-cell"
    };
    let number = day.day.to_string();
    let hidden = (day.hidden_completed > 0).then(|| format!("+{} more completed", day.hidden_completed));

    maud! {
        div class=(class) {
            span .calendar-day-number { (number) }
            @for item in &day.items {
                @if item.completed {
                    div class="calendar-task calendar-task-completed" { (item.text) }
                } @else if item.overdue {
                    div class="calendar-task calendar-task-overdue" { (item.text) }
                } @else {
                    div .calendar-task { (item.text) }
                }
            }
            @if let Some(hidden) = &hidden {
                div .calendar-hidden { (hidden) }
            }
        }
    }
    .render()
    .into_inner()
}

fn render_calendar(calendar: &CalendarView) -> String {
    let rows: Vec<String> = calendar_rows(calendar)
        .into_iter()
        .map(|row| {
            let cells: Vec<String> = row
                .into_iter()
                .map(|cell| match cell {
                    Some(day) => render_day(day),
                    None => r#"<div class="calendar-cell calendar-cell-empty"></div>"#.to_string(),
                })
                .collect();
            format!(r#"<div class="calendar-row">{}</div>"#, cells.join(""))
        })
        .collect();

    maud! {
        section .calendar {
            h2 { (calendar.title) }
            div .calendar-header-row {
                @for weekday in calendar.weekdays {
                    div .calendar-header-cell { (weekday) }
                }
            }
            (Raw::dangerously_create(&rows.join("\n")))
        }
    }
    .render()
    .into_inner()
}
