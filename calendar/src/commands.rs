// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use common::NewTask;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::accounts::{Accounts, ProfileUpdate, SignUp};
use crate::agenda;
use crate::config::Config;
use crate::kv::{FileStore, KeyValueStore};
use crate::progress::WeekStart;
use crate::session::Session;
use crate::tasks::TaskStore;

/// Personal task calendar backed by a local storage file.
#[derive(Parser, Debug)]
#[command(name = "calendar", version)]
pub struct Cli {
    /// Directory holding the storage file (overrides CALENDAR_DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create an account
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Agree to the Terms & Conditions
        #[arg(long)]
        accept_terms: bool,
    },
    /// Log in and remember the user for later commands
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    /// Show or edit the logged-in profile
    Profile {
        #[command(subcommand)]
        action: Option<ProfileAction>,
    },
    /// Add a task for the current user
    Add {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Due date, YYYY-MM-DD
        #[arg(long)]
        due: String,
    },
    /// Switch a task between pending and completed
    Toggle { id: i64 },
    Delete { id: i64 },
    /// List the current user's tasks, optionally only those due on a date
    List {
        #[arg(long)]
        date: Option<String>,
    },
    Progress {
        #[command(subcommand)]
        window: Window,
    },
    /// Completed tasks of this week or month, and those completed before it
    Report {
        #[arg(value_enum)]
        period: ReportPeriod,
    },
    /// Calendar layout of a month
    Month {
        /// YYYY-MM, defaults to the current month
        #[arg(long)]
        month: Option<String>,
    },
    Dashboard,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ProfileAction {
    Show,
    Edit {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        year_course: String,
    },
}

/// Owner filter shared by the progress windows.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct OwnerFilter {
    /// Count tasks of this user (defaults to the current user)
    #[arg(long)]
    user: Option<String>,
    /// Count every task in the partition regardless of owner
    #[arg(long, conflicts_with = "user")]
    all_users: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Window {
    Overall {
        #[command(flatten)]
        owner: OwnerFilter,
    },
    Monthly {
        #[command(flatten)]
        owner: OwnerFilter,
        /// YYYY-MM, defaults to the current month
        #[arg(long)]
        month: Option<String>,
    },
    Weekly {
        #[command(flatten)]
        owner: OwnerFilter,
        /// Any day of the week, YYYY-MM-DD; defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, value_enum, default_value_t = WeekStart::Sunday)]
        week_start: WeekStart,
    },
    Daily {
        #[command(flatten)]
        owner: OwnerFilter,
        /// YYYY-MM-DD, defaults to today
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPeriod {
    Weekly,
    Monthly,
}

/// Opens the configured store and runs one command as a fresh session.
pub fn run(command: Command, config: &Config) -> Result<Value> {
    let path = config.store_path();
    let store = Arc::new(
        FileStore::open(&path)
            .with_context(|| format!("Failed to open storage file {}", path.display()))?,
    );

    let mut tasks = TaskStore::new(Arc::clone(&store));
    tasks.subscribe(|event| {
        info!("{}: task {} ({})", event.name(), event.task().id, event.task().title)
    });
    let accounts = Accounts::new(store);

    execute(command, &tasks, &accounts, Utc::now().date_naive())
}

/// Dispatches one command against the given stores. `today` anchors every
/// default date.
pub fn execute<S: KeyValueStore>(
    command: Command,
    tasks: &TaskStore<S>,
    accounts: &Accounts<S>,
    today: NaiveDate,
) -> Result<Value> {
    let session = tasks.session();
    let migrated = tasks
        .initialize_tasks(&session)
        .context("Failed to migrate legacy tasks")?;
    if migrated > 0 {
        info!("Migrated {} legacy tasks for {}", migrated, session.user_id());
    }
    debug!("Session user: {}", session.user_id());

    match command {
        Command::Signup {
            name,
            email,
            password,
            accept_terms,
        } => {
            let user = accounts.sign_up(SignUp {
                full_name: name,
                email,
                password,
                accepted_terms: accept_terms,
            })?;
            to_json(&user)
        }
        Command::Login { email, password } => {
            let user = accounts.log_in(&email, &password)?;
            let session = tasks.session();
            tasks
                .initialize_tasks(&session)
                .context("Failed to migrate legacy tasks")?;
            to_json(&user)
        }
        Command::Logout => {
            accounts.log_out()?;
            Ok(json!({ "loggedOut": true }))
        }
        Command::Profile { action } => match action.unwrap_or(ProfileAction::Show) {
            ProfileAction::Show => to_json(&accounts.current_profile()?),
            ProfileAction::Edit {
                name,
                email,
                year_course,
            } => to_json(&accounts.update_profile(ProfileUpdate {
                full_name: name,
                email,
                year_course,
            })?),
        },
        Command::Add {
            title,
            description,
            due,
        } => {
            let task = tasks
                .add_task(
                    &session,
                    NewTask {
                        title,
                        description,
                        due_date: due,
                    },
                )
                .context("Failed to save the new task")?;
            to_json(&task)
        }
        Command::Toggle { id } => {
            let updated = tasks
                .update_task_status(&session, id)
                .context("Failed to save the task status")?;
            if updated.is_none() {
                warn!("Task with ID {} not found", id);
            }
            Ok(json!({ "updated": updated }))
        }
        Command::Delete { id } => {
            let deleted = tasks
                .delete_task(&session, id)
                .context("Failed to delete the task")?;
            if deleted.is_none() {
                warn!("Task with ID {} not found for deletion", id);
            }
            Ok(json!({ "deleted": deleted }))
        }
        Command::List { date } => match date {
            Some(date) => to_json(&tasks.get_tasks_by_date(&session, &date)),
            None => to_json(&tasks.get_all_tasks(&session)),
        },
        Command::Progress { window } => {
            let progress = tasks.progress(&session);
            let result = match window {
                Window::Overall { owner } => progress.overall(owner.resolve(&session).as_deref()),
                Window::Monthly { owner, month } => {
                    let month = month.unwrap_or_else(|| crate::progress::month_of(today));
                    progress.monthly(owner.resolve(&session).as_deref(), &month)
                }
                Window::Weekly {
                    owner,
                    date,
                    week_start,
                } => progress.weekly(
                    owner.resolve(&session).as_deref(),
                    date.unwrap_or(today),
                    week_start,
                ),
                Window::Daily { owner, date } => {
                    let date = date.unwrap_or_else(|| today.to_string());
                    progress.daily(owner.resolve(&session).as_deref(), &date)
                }
            };
            to_json(&result)
        }
        Command::Report { period } => {
            let progress = tasks.progress(&session);
            match period {
                ReportPeriod::Weekly => to_json(&progress.weekly_report(today)),
                ReportPeriod::Monthly => to_json(&progress.monthly_report(today)),
            }
        }
        Command::Month { month } => {
            let first = match month {
                Some(month) => parse_month(&month)?,
                None => today,
            };
            let grid = agenda::month_grid(tasks, &session, first.year(), first.month())
                .context("Invalid month")?;
            to_json(&grid)
        }
        Command::Dashboard => to_json(&agenda::dashboard(tasks, &session, today)),
    }
}

impl OwnerFilter {
    fn resolve(&self, session: &Session) -> Option<String> {
        if self.all_users {
            return None;
        }
        Some(
            self.user
                .clone()
                .unwrap_or_else(|| session.user_id().to_string()),
        )
    }
}

/// Parses `YYYY-MM` into the first day of that month.
fn parse_month(month: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d")
        .with_context(|| format!("Month must look like YYYY-MM, got {}", month))
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    serde_json::to_value(value).context("Failed to encode the command output")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;

    fn stores() -> (TaskStore<Arc<MemoryStore>>, Accounts<Arc<MemoryStore>>) {
        let store = Arc::new(MemoryStore::new());
        (TaskStore::new(Arc::clone(&store)), Accounts::new(store))
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 18).unwrap()
    }

    #[test]
    fn test_cli_parses_progress_window() {
        let cli = Cli::try_parse_from([
            "calendar",
            "--data-dir",
            "/tmp/cal",
            "progress",
            "weekly",
            "--date",
            "2026-02-18",
            "--week-start",
            "monday",
        ])
        .unwrap();

        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/cal")));
        match cli.command {
            Command::Progress {
                window:
                    Window::Weekly {
                        date, week_start, ..
                    },
            } => {
                assert_eq!(date, Some(today()));
                assert_eq!(week_start, WeekStart::Monday);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_rejects_conflicting_owner_flags() {
        let result = Cli::try_parse_from([
            "calendar",
            "progress",
            "overall",
            "--user",
            "u_1",
            "--all-users",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_add_toggle_and_progress() {
        let (tasks, accounts) = stores();
        let add = Command::Add {
            title: "Essay".to_string(),
            description: String::new(),
            due: "2026-02-18".to_string(),
        };

        let created = execute(add, &tasks, &accounts, today()).unwrap();
        assert_eq!(created["id"], 1);
        assert_eq!(created["userId"], "default_user");

        let toggled = execute(Command::Toggle { id: 1 }, &tasks, &accounts, today()).unwrap();
        assert_eq!(toggled["updated"]["status"], "completed");

        let missing = execute(Command::Toggle { id: 9 }, &tasks, &accounts, today()).unwrap();
        assert_eq!(missing["updated"], Value::Null);

        let weekly = Command::Progress {
            window: Window::Weekly {
                owner: OwnerFilter::default(),
                date: None,
                week_start: WeekStart::Sunday,
            },
        };
        let progress = execute(weekly, &tasks, &accounts, today()).unwrap();
        assert_eq!(
            progress,
            json!({ "total": 1, "completed": 1, "pending": 0, "percentage": 100 })
        );
    }

    #[test]
    fn test_signup_login_and_profile() {
        let (tasks, accounts) = stores();
        let signup = Command::Signup {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "secret1".to_string(),
            accept_terms: true,
        };
        let user = execute(signup, &tasks, &accounts, today()).unwrap();

        let login = Command::Login {
            email: "ada@example.com".to_string(),
            password: "secret1".to_string(),
        };
        execute(login, &tasks, &accounts, today()).unwrap();
        assert_eq!(tasks.session().user_id().as_str(), user["id"].as_str().unwrap());

        let profile = execute(Command::Profile { action: None }, &tasks, &accounts, today()).unwrap();
        assert_eq!(profile["email"], "ada@example.com");

        execute(Command::Logout, &tasks, &accounts, today()).unwrap();
        let err = execute(Command::Profile { action: None }, &tasks, &accounts, today()).unwrap_err();
        assert_eq!(err.to_string(), "No user logged in");
    }

    #[test]
    fn test_month_argument_is_validated() {
        let (tasks, accounts) = stores();

        let grid = execute(
            Command::Month {
                month: Some("2026-04".to_string()),
            },
            &tasks,
            &accounts,
            today(),
        )
        .unwrap();
        assert_eq!(grid["title"], "April 2026");
        assert_eq!(grid["leadingBlanks"], 3);

        let err = execute(
            Command::Month {
                month: Some("April".to_string()),
            },
            &tasks,
            &accounts,
            today(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("YYYY-MM"));
    }
}
