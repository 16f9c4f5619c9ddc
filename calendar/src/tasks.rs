// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::colors;
use crate::error::StoreError;
use crate::kv::KeyValueStore;
use crate::session::{LEGACY_TASKS_KEY, Session, UserId, partition_key};

use chrono::Utc;
use common::{NewTask, Task, TaskStatus};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Change notification emitted by the task mutators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    Added(Task),
    Updated(Task),
    Deleted(Task),
}

impl TaskEvent {
    /// The event name listeners have always subscribed to.
    pub fn name(&self) -> &'static str {
        match self {
            TaskEvent::Added(_) => "taskAdded",
            TaskEvent::Updated(_) => "taskUpdated",
            TaskEvent::Deleted(_) => "taskDeleted",
        }
    }

    pub fn task(&self) -> &Task {
        match self {
            TaskEvent::Added(task) | TaskEvent::Updated(task) | TaskEvent::Deleted(task) => task,
        }
    }
}

type Listener = Box<dyn Fn(&TaskEvent)>;

/// Per-user task repository on top of a key-value store.
///
/// Every read re-parses the stored partition; nothing is cached between
/// calls. Each user's tasks live under `calendarTasks_<user id>`.
pub struct TaskStore<S> {
    store: S,
    listeners: Vec<Listener>,
}

impl<S: KeyValueStore> TaskStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            listeners: Vec::new(),
        }
    }

    /// The underlying persistence medium.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Registers a listener called after every successful mutation.
    pub fn subscribe(&mut self, listener: impl Fn(&TaskEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Loads the session of whoever is stored as the current user.
    pub fn session(&self) -> Session {
        Session::load(&self.store)
    }

    pub fn resolve_current_user_id(&self) -> UserId {
        self.session().user_id().clone()
    }

    /// Copies the current user's tasks out of the legacy global list.
    ///
    /// Runs only when the legacy list is non-empty and the user has no
    /// partition yet; the partition is written only if at least one legacy
    /// task matches one of the session's candidate identifiers. The legacy
    /// list itself is left untouched. Returns the number of tasks copied.
    #[allow(clippy::uninlined_format_args)]
    pub fn initialize_tasks(&self, session: &Session) -> Result<usize, StoreError> {
        let legacy = read_task_list(&self.store, LEGACY_TASKS_KEY).tasks;
        if legacy.is_empty() {
            return Ok(0);
        }

        let key = session.partition_key();
        if self.store.get(&key).is_some() {
            debug!("Partition {} already exists, skipping legacy migration", key);
            return Ok(0);
        }

        let candidates = session.candidate_ids();
        let owned: Vec<Task> = legacy
            .into_iter()
            .filter(|task| {
                task.user_id
                    .as_deref()
                    .is_some_and(|owner| candidates.iter().any(|c| c.as_str() == owner))
            })
            .collect();

        if owned.is_empty() {
            debug!("No legacy tasks belong to {}", session.user_id());
            return Ok(0);
        }

        let count = owned.len();
        write_task_list(&self.store, &key, &TaskList::from(owned))?;
        info!("Migrated {} legacy tasks into partition {}", count, key);
        Ok(count)
    }

    /// Creates a pending task for the session's user and appends it to the
    /// partition. The id is one more than the largest id in the partition.
    pub fn add_task(&self, session: &Session, payload: NewTask) -> Result<Task, StoreError> {
        let user_id = session.user_id();
        let key = session.partition_key();
        let mut list = read_task_list(&self.store, &key);

        let new_task = Task {
            id: next_task_id(&list.tasks),
            title: payload.title,
            description: payload.description,
            due_date: payload.due_date,
            status: TaskStatus::Pending,
            user_id: Some(user_id.to_string()),
            color: colors::random_task_color(),
            created_date: Utc::now().date_naive().to_string(),
        };

        debug!(
            "Insert values: id={}, title={}, due_date={}, color={}, user_id={}",
            new_task.id, new_task.title, new_task.due_date, new_task.color, user_id
        );

        list.tasks.push(new_task.clone());
        write_task_list(&self.store, &key, &list)?;

        info!("Task created successfully with ID: {}", new_task.id);
        self.emit(TaskEvent::Added(new_task.clone()));
        Ok(new_task)
    }

    /// Toggles `pending` and `completed` on the task with `task_id`.
    /// Returns `None` and writes nothing when no such task exists.
    #[allow(clippy::uninlined_format_args)]
    pub fn update_task_status(
        &self,
        session: &Session,
        task_id: i64,
    ) -> Result<Option<Task>, StoreError> {
        let key = session.partition_key();
        let mut list = read_task_list(&self.store, &key);
        let Some(task) = list.tasks.iter_mut().find(|t| t.id == task_id) else {
            debug!("Task with ID {} not found for status update", task_id);
            return Ok(None);
        };

        task.status = task.status.toggled();
        let updated = task.clone();
        write_task_list(&self.store, &key, &list)?;

        info!("Task {} is now {}", task_id, updated.status.as_str());
        self.emit(TaskEvent::Updated(updated.clone()));
        Ok(Some(updated))
    }

    /// Removes the task with `task_id`. Returns the removed task, or `None`
    /// (and writes nothing) when no such task exists.
    #[allow(clippy::uninlined_format_args)]
    pub fn delete_task(&self, session: &Session, task_id: i64) -> Result<Option<Task>, StoreError> {
        let key = session.partition_key();
        let mut list = read_task_list(&self.store, &key);
        let Some(index) = list.tasks.iter().position(|t| t.id == task_id) else {
            debug!("Task with ID {} not found for deletion", task_id);
            return Ok(None);
        };

        let deleted = list.tasks.remove(index);
        write_task_list(&self.store, &key, &list)?;

        info!("Task with ID {} deleted successfully.", task_id);
        self.emit(TaskEvent::Deleted(deleted.clone()));
        Ok(Some(deleted))
    }

    /// Every readable task in `user_id`'s partition; empty when the
    /// partition is absent or is not a list.
    pub fn get_tasks_by_user(&self, user_id: &str) -> Vec<Task> {
        read_task_list(&self.store, &partition_key(user_id)).tasks
    }

    /// Tasks of the session's user due exactly on `date`, in stored order.
    pub fn get_tasks_by_date(&self, session: &Session, date: &str) -> Vec<Task> {
        self.get_all_tasks(session)
            .into_iter()
            .filter(|task| task.due_date == date)
            .collect()
    }

    pub fn get_all_tasks(&self, session: &Session) -> Vec<Task> {
        self.get_tasks_by_user(session.user_id().as_str())
    }

    fn emit(&self, event: TaskEvent) {
        for listener in &self.listeners {
            listener(&event);
        }
    }
}

/// Next id for a partition: one more than the largest id, or 1.
pub fn next_task_id(tasks: &[Task]) -> i64 {
    tasks.iter().map(|t| t.id).max().unwrap_or(0).max(0) + 1
}

/// A partition as read from the store.
///
/// Entries that do not read as a task are kept verbatim and written back
/// after the tasks. A value that is not a list at all is remembered so the
/// next write can save it under `<key>.bak` before replacing it.
#[derive(Debug, Default)]
pub(crate) struct TaskList {
    pub(crate) tasks: Vec<Task>,
    pub(crate) unreadable: Vec<Value>,
    pub(crate) replaced: Option<String>,
}

impl From<Vec<Task>> for TaskList {
    fn from(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            ..Self::default()
        }
    }
}

/// Reads the list stored under `key`, one entry at a time.
#[allow(clippy::uninlined_format_args)]
pub(crate) fn read_task_list<S: KeyValueStore + ?Sized>(store: &S, key: &str) -> TaskList {
    let Some(raw) = store.get(key) else {
        return TaskList::default();
    };

    let entries = match serde_json::from_str::<Vec<Value>>(&raw) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Ignoring malformed task list under {}: {}", key, e);
            return TaskList {
                replaced: Some(raw),
                ..TaskList::default()
            };
        }
    };

    let mut list = TaskList::default();
    for entry in entries {
        match Task::deserialize(&entry) {
            Ok(task) => list.tasks.push(task),
            Err(e) => {
                warn!("Keeping unreadable entry under {} as is: {}", key, e);
                list.unreadable.push(entry);
            }
        }
    }
    list
}

#[allow(clippy::uninlined_format_args)]
pub(crate) fn write_task_list<S: KeyValueStore + ?Sized>(
    store: &S,
    key: &str,
    list: &TaskList,
) -> Result<(), StoreError> {
    let encode = |source| StoreError::Encode {
        key: key.to_string(),
        source,
    };

    let mut entries = Vec::with_capacity(list.tasks.len() + list.unreadable.len());
    for task in &list.tasks {
        entries.push(serde_json::to_value(task).map_err(encode)?);
    }
    entries.extend(list.unreadable.iter().cloned());
    let data = serde_json::to_string(&entries).map_err(encode)?;

    if let Some(previous) = &list.replaced {
        let backup = format!("{}.bak", key);
        store.set(&backup, previous)?;
        warn!("Saved the malformed value of {} to {}", key, backup);
    }
    store.set(key, &data)
}
