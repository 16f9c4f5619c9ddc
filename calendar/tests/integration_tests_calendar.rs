use std::fs;
use std::path::Path;

use calendar::commands::{self, Command, ProfileAction, ReportPeriod};
use calendar::config::Config;
use calendar::{FileStore, KeyValueStore, Session, TaskStore};
use common::{NewTask, Task};
use serde_json::{Value, json};
use tempfile::tempdir;

/// Config pointing at a fresh storage file inside `dir`.
fn config_in(dir: &Path) -> Config {
    Config::default().with_data_dir(Some(dir.join("database")))
}

fn run(config: &Config, command: Command) -> Value {
    commands::run(command, config).expect("command failed")
}

fn add(title: &str, due: &str) -> Command {
    Command::Add {
        title: title.to_string(),
        description: format!("{} description", title),
        due: due.to_string(),
    }
}

/// Writes a raw storage file, as a previous version of the app would have.
fn seed_storage(config: &Config, entries: Value) {
    let path = config.store_path();
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_string(&entries).unwrap()).unwrap();
}

#[test]
fn test_signup_login_and_task_lifecycle() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());

    // Arrange: create an account and log in
    let user = run(
        &config,
        Command::Signup {
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password: "secret1".to_string(),
            accept_terms: true,
        },
    );
    let user_id = user["id"].as_str().unwrap().to_string();
    run(
        &config,
        Command::Login {
            email: "ada@example.com".to_string(),
            password: "secret1".to_string(),
        },
    );

    // Act: add three tasks and complete one
    let first = run(&config, add("Essay", "2026-02-15"));
    run(&config, add("Lab report", "2026-02-16"));
    run(&config, add("Reading", "2026-03-01"));
    run(&config, Command::Toggle { id: 1 });

    // Assert: every task is owned by the logged-in user, ids start at 1
    assert_eq!(first["id"], 1);
    assert_eq!(first["userId"], user_id.as_str());
    assert_eq!(first["status"], "pending");

    let overall = run(
        &config,
        Command::Progress {
            window: commands::Window::Overall {
                owner: Default::default(),
            },
        },
    );
    assert_eq!(
        overall,
        json!({ "total": 3, "completed": 1, "pending": 2, "percentage": 33 })
    );

    let on_date = run(
        &config,
        Command::List {
            date: Some("2026-02-15".to_string()),
        },
    );
    assert_eq!(on_date.as_array().unwrap().len(), 1);
    assert_eq!(on_date[0]["status"], "completed");

    // Act: delete one, and one that does not exist
    let deleted = run(&config, Command::Delete { id: 2 });
    assert_eq!(deleted["deleted"]["title"], "Lab report");
    let missing = run(&config, Command::Delete { id: 42 });
    assert_eq!(missing["deleted"], Value::Null);

    // Assert: the partition on disk holds the remaining two tasks
    let store = FileStore::open(config.store_path()).unwrap();
    let stored: Vec<Task> =
        serde_json::from_str(&store.get(&format!("calendarTasks_{}", user_id)).unwrap()).unwrap();
    assert_eq!(stored.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 3]);
}

#[test]
fn test_wrong_password_is_rejected() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    run(
        &config,
        Command::Signup {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "secret1".to_string(),
            accept_terms: true,
        },
    );

    let err = commands::run(
        Command::Login {
            email: "ada@example.com".to_string(),
            password: "nope".to_string(),
        },
        &config,
    )
    .unwrap_err();

    assert_eq!(err.to_string(), "Invalid email or password");
}

#[test]
fn test_legacy_tasks_are_migrated_once() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    let legacy = json!([
        { "id": 1, "title": "mine", "dueDate": "2026-02-01", "status": "completed", "userId": "ada@example.com" },
        { "id": 2, "title": "theirs", "dueDate": "2026-02-01", "status": "pending", "userId": "bob@example.com" },
        { "id": 3, "title": "mine too", "dueDate": "2026-02-02", "status": "Completed", "userId": "u_1" }
    ]);
    seed_storage(
        &config,
        json!({
            "currentUser": json!({ "id": "u_1", "email": "ada@example.com" }).to_string(),
            "calendarTasks": legacy.to_string(),
        }),
    );

    // Act: the first session start migrates, the second changes nothing
    let first = run(&config, Command::List { date: None });
    let second = run(&config, Command::List { date: None });

    // Assert
    let titles: Vec<&str> = first
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["mine", "mine too"]);
    assert_eq!(first, second);

    // The legacy list is still there, untouched.
    let store = FileStore::open(config.store_path()).unwrap();
    assert_eq!(store.get("calendarTasks"), Some(legacy.to_string()));

    // New tasks continue after the migrated ids.
    let created = run(&config, add("after migration", "2026-02-03"));
    assert_eq!(created["id"], 4);
}

#[test]
fn test_profile_email_change_moves_tasks() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    let tasks = json!([
        { "id": 1, "title": "Essay", "dueDate": "2026-02-15", "status": "pending", "userId": "ada@example.com" }
    ]);
    seed_storage(
        &config,
        json!({
            "currentUser": "ada@example.com",
            "users": json!([{ "fullName": "Ada", "email": "ada@example.com", "password": "secret1" }]).to_string(),
            "calendarTasks_ada@example.com": tasks.to_string(),
        }),
    );

    // Before the edit the tasks are keyed by the email
    let before = run(&config, Command::List { date: None });
    assert_eq!(before.as_array().unwrap().len(), 1);

    // Act
    let change = run(
        &config,
        Command::Profile {
            action: Some(ProfileAction::Edit {
                name: "Ada King".to_string(),
                email: "ada.king@example.com".to_string(),
                year_course: "3rd Year".to_string(),
            }),
        },
    );

    // Assert: the partition now lives under the generated id
    assert_eq!(change["migratedFrom"], "ada@example.com");
    let new_id = change["user"]["id"].as_str().unwrap().to_string();

    let after = run(&config, Command::List { date: None });
    assert_eq!(after[0]["title"], "Essay");
    assert_eq!(after[0]["userId"], new_id.as_str());

    let profile = run(&config, Command::Profile { action: None });
    assert_eq!(profile["email"], "ada.king@example.com");
    assert_eq!(profile["password"], "secret1");
}

#[test]
fn test_reports_and_calendar_views() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    let today = chrono::Utc::now().date_naive();

    run(&config, add("today", &today.to_string()));
    run(&config, Command::Toggle { id: 1 });

    let weekly = run(
        &config,
        Command::Report {
            period: ReportPeriod::Weekly,
        },
    );
    assert_eq!(weekly["period"], "weekly");
    assert_eq!(weekly["progress"]["completed"], 1);
    assert_eq!(weekly["completed"][0]["title"], "today");

    let dashboard = run(&config, Command::Dashboard);
    assert_eq!(dashboard["today"][0]["title"], "today");
    assert_eq!(dashboard["progress"]["percentage"], 100);

    let month = run(&config, Command::Month { month: None });
    let total: u64 = month["days"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["total"].as_u64().unwrap())
        .sum();
    assert_eq!(total, 1);
}

#[test]
fn test_task_store_over_reopened_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("local_storage.json");
    let session = Session::for_user("u_1");

    {
        let tasks = TaskStore::new(FileStore::open(&path).unwrap());
        for title in ["a", "b"] {
            tasks
                .add_task(
                    &session,
                    NewTask {
                        title: title.to_string(),
                        description: String::new(),
                        due_date: "2026-02-01".to_string(),
                    },
                )
                .unwrap();
        }
    }

    let tasks = TaskStore::new(FileStore::open(&path).unwrap());
    assert_eq!(tasks.get_tasks_by_user("u_1").len(), 2);
    let progress = tasks.progress(&session).monthly(Some("u_1"), "2026-02");
    assert_eq!((progress.total, progress.pending), (2, 2));
}
