// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use chrono::{Datelike, NaiveDate};
use common::{Progress, Task};
use serde::Serialize;

use crate::kv::KeyValueStore;
use crate::progress::summarize;
use crate::session::Session;
use crate::tasks::TaskStore;

/// How many tasks a calendar cell shows before collapsing into `+N more`.
pub const TASKS_PER_DAY: usize = 3;

/// Landing page summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub progress: Progress,
    pub today: Vec<Task>,
    /// Due after today, earliest first.
    pub upcoming: Vec<Task>,
}

/// One day cell of the month calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: String,
    pub day: u32,
    /// At most [`TASKS_PER_DAY`] tasks, in stored order.
    pub tasks: Vec<Task>,
    pub total: usize,
    pub overflow: usize,
}

/// A month laid out Sunday-first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthGrid {
    pub title: String,
    pub year: i32,
    pub month: u32,
    /// Empty cells before the 1st.
    pub leading_blanks: u32,
    pub days: Vec<CalendarDay>,
}

/// Overall progress of the session's partition plus today's and upcoming
/// tasks.
pub fn dashboard<S: KeyValueStore>(
    tasks: &TaskStore<S>,
    session: &Session,
    today: NaiveDate,
) -> Dashboard {
    let all = tasks.get_all_tasks(session);
    let today = today.to_string();

    let due_today = all.iter().filter(|t| t.due_date == today).cloned().collect();
    let mut upcoming: Vec<Task> = all.iter().filter(|t| t.due_date > today).cloned().collect();
    upcoming.sort_by(|a, b| a.due_date.cmp(&b.due_date));

    Dashboard {
        progress: summarize(&all),
        today: due_today,
        upcoming,
    }
}

/// Calendar layout of `month` in `year`. Only tasks owned by the session's
/// user appear. `None` for a month outside 1..=12.
pub fn month_grid<S: KeyValueStore>(
    tasks: &TaskStore<S>,
    session: &Session,
    year: i32,
    month: u32,
) -> Option<MonthGrid> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let user = session.user_id().as_str();
    let owned: Vec<Task> = tasks
        .get_all_tasks(session)
        .into_iter()
        .filter(|t| t.is_owned_by(user))
        .collect();

    let days = first
        .iter_days()
        .take_while(|d| d.month() == month)
        .map(|d| {
            let date = d.to_string();
            let on_day: Vec<&Task> = owned.iter().filter(|t| t.due_date == date).collect();
            let total = on_day.len();
            CalendarDay {
                day: d.day(),
                tasks: on_day.into_iter().take(TASKS_PER_DAY).cloned().collect(),
                total,
                overflow: total.saturating_sub(TASKS_PER_DAY),
                date,
            }
        })
        .collect();

    Some(MonthGrid {
        title: first.format("%B %Y").to_string(),
        year,
        month,
        leading_blanks: first.weekday().num_days_from_sunday(),
        days,
    })
}
