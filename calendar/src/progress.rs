// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use common::{Progress, Task};
use serde::Serialize;

use crate::kv::KeyValueStore;
use crate::session::Session;
use crate::tasks::TaskStore;

/// How many previously completed tasks the weekly report lists.
pub const WEEKLY_HISTORY_LIMIT: usize = 20;
/// How many previously completed tasks the monthly report lists.
pub const MONTHLY_HISTORY_LIMIT: usize = 50;

/// First day of a weekly window.
///
/// Both conventions are in use: the progress bar counts Sunday to Saturday,
/// the progress page lists Monday to Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    Sunday,
    Monday,
}

impl WeekStart {
    fn weekday(self) -> Weekday {
        match self {
            WeekStart::Sunday => Weekday::Sun,
            WeekStart::Monday => Weekday::Mon,
        }
    }
}

/// `round(100 * completed / total)`, rounding halves up; 0 for no tasks.
pub fn percentage(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((200 * completed + total) / (2 * total)) as u32
}

/// Counts a window of tasks.
pub fn summarize<'a, I>(tasks: I) -> Progress
where
    I: IntoIterator<Item = &'a Task>,
{
    let (total, completed) = tasks.into_iter().fold((0, 0), |(total, completed), task| {
        (total + 1, completed + usize::from(task.is_completed()))
    });

    Progress {
        total,
        completed,
        pending: total - completed,
        percentage: percentage(completed, total),
    }
}

/// Lenient ownership filter used by every progress window: without a user
/// filter everything passes; with one, tasks owned by that user and tasks
/// with no owner at all pass.
pub fn is_visible_to(task: &Task, user: Option<&str>) -> bool {
    match user.filter(|u| !u.is_empty()) {
        None => true,
        Some(user) => task.user_id.as_deref().is_none_or(|owner| owner == user),
    }
}

pub fn overall(tasks: &[Task], user: Option<&str>) -> Progress {
    summarize(tasks.iter().filter(|t| is_visible_to(t, user)))
}

/// Tasks whose due date starts with `month` (`YYYY-MM`).
pub fn monthly(tasks: &[Task], user: Option<&str>, month: &str) -> Progress {
    summarize(
        tasks
            .iter()
            .filter(|t| is_visible_to(t, user))
            .filter(|t| !t.due_date.is_empty() && t.due_date.starts_with(month)),
    )
}

/// Tasks due in the week containing `date`.
pub fn weekly(tasks: &[Task], user: Option<&str>, date: NaiveDate, start: WeekStart) -> Progress {
    let (first, last) = week_bounds(date, start);
    summarize(
        tasks
            .iter()
            .filter(|t| is_visible_to(t, user))
            .filter(|t| due_within(t, &first, &last)),
    )
}

/// Tasks due exactly on `date` (`YYYY-MM-DD`, compared as text).
pub fn daily(tasks: &[Task], user: Option<&str>, date: &str) -> Progress {
    summarize(
        tasks
            .iter()
            .filter(|t| is_visible_to(t, user))
            .filter(|t| t.due_date == date),
    )
}

/// First and last day of the week containing `date`.
pub fn week_range(date: NaiveDate, start: WeekStart) -> (NaiveDate, NaiveDate) {
    let week = date.week(start.weekday());
    (week.first_day(), week.last_day())
}

/// `YYYY-MM` key for a month.
pub fn month_key(year: i32, month: u32) -> String {
    format!("{:04}-{:02}", year, month)
}

/// `YYYY-MM` key of the month containing `date`.
pub fn month_of(date: NaiveDate) -> String {
    month_key(date.year(), date.month())
}

fn week_bounds(date: NaiveDate, start: WeekStart) -> (String, String) {
    let (first, last) = week_range(date, start);
    (first.to_string(), last.to_string())
}

fn due_within(task: &Task, first: &str, last: &str) -> bool {
    !task.due_date.is_empty() && task.due_date.as_str() >= first && task.due_date.as_str() <= last
}

/// Which listing a [`PeriodReport`] covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Weekly,
    Monthly,
}

/// Progress page listing for one window: what was completed inside it and
/// what had been completed before it started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodReport {
    pub period: Period,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub progress: Progress,
    pub completed: Vec<Task>,
    /// Most recently stored first.
    pub previously_completed: Vec<Task>,
}

/// Monday-to-Sunday report for the week containing `today`. Only tasks
/// explicitly owned by `user` are listed.
pub fn weekly_report(tasks: &[Task], user: &str, today: NaiveDate) -> PeriodReport {
    let (start, end) = week_range(today, WeekStart::Monday);
    let (first, last) = (start.to_string(), end.to_string());

    let in_window: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.is_owned_by(user))
        .filter(|t| t.due_date.as_str() >= first.as_str() && t.due_date.as_str() <= last.as_str())
        .collect();

    build_report(Period::Weekly, start, end, tasks, user, in_window, WEEKLY_HISTORY_LIMIT)
}

/// Calendar-month report for the month containing `today`. Only tasks
/// explicitly owned by `user` are listed.
pub fn monthly_report(tasks: &[Task], user: &str, today: NaiveDate) -> PeriodReport {
    let start = today - Days::new(u64::from(today.day0()));
    let end = start + Months::new(1) - Days::new(1);
    let month = month_of(today);

    let in_window: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.is_owned_by(user))
        .filter(|t| !t.due_date.is_empty() && t.due_date.starts_with(&month))
        .collect();

    build_report(Period::Monthly, start, end, tasks, user, in_window, MONTHLY_HISTORY_LIMIT)
}

fn build_report(
    period: Period,
    start: NaiveDate,
    end: NaiveDate,
    tasks: &[Task],
    user: &str,
    in_window: Vec<&Task>,
    history_limit: usize,
) -> PeriodReport {
    let first = start.to_string();
    let progress = summarize(in_window.iter().copied());
    let completed = in_window
        .into_iter()
        .filter(|t| t.is_completed())
        .cloned()
        .collect();

    let earlier: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.is_owned_by(user) && t.is_completed() && t.due_date < first)
        .collect();
    let previously_completed = earlier
        .iter()
        .rev()
        .take(history_limit)
        .map(|t| (*t).clone())
        .collect();

    PeriodReport {
        period,
        start,
        end,
        progress,
        completed,
        previously_completed,
    }
}

/// Progress windows over the session user's partition.
///
/// Every call re-reads the partition through the task store.
pub struct ProgressAggregator<'a, S> {
    tasks: &'a TaskStore<S>,
    session: &'a Session,
}

impl<'a, S: KeyValueStore> ProgressAggregator<'a, S> {
    pub fn new(tasks: &'a TaskStore<S>, session: &'a Session) -> Self {
        Self { tasks, session }
    }

    fn snapshot(&self) -> Vec<Task> {
        self.tasks.get_all_tasks(self.session)
    }

    /// Unfiltered progress of the whole partition.
    pub fn calculate_progress(&self) -> Progress {
        summarize(&self.snapshot())
    }

    pub fn overall(&self, user: Option<&str>) -> Progress {
        overall(&self.snapshot(), user)
    }

    pub fn monthly(&self, user: Option<&str>, month: &str) -> Progress {
        monthly(&self.snapshot(), user, month)
    }

    pub fn weekly(&self, user: Option<&str>, date: NaiveDate, start: WeekStart) -> Progress {
        weekly(&self.snapshot(), user, date, start)
    }

    pub fn weekly_sunday_start(&self, user: Option<&str>, date: NaiveDate) -> Progress {
        self.weekly(user, date, WeekStart::Sunday)
    }

    pub fn weekly_monday_start(&self, user: Option<&str>, date: NaiveDate) -> Progress {
        self.weekly(user, date, WeekStart::Monday)
    }

    pub fn daily(&self, user: Option<&str>, date: &str) -> Progress {
        daily(&self.snapshot(), user, date)
    }

    pub fn weekly_report(&self, today: NaiveDate) -> PeriodReport {
        weekly_report(&self.snapshot(), self.session.user_id().as_str(), today)
    }

    pub fn monthly_report(&self, today: NaiveDate) -> PeriodReport {
        monthly_report(&self.snapshot(), self.session.user_id().as_str(), today)
    }
}

impl<S: KeyValueStore> TaskStore<S> {
    /// Progress windows for `session`.
    pub fn progress<'a>(&'a self, session: &'a Session) -> ProgressAggregator<'a, S> {
        ProgressAggregator::new(self, session)
    }
}
