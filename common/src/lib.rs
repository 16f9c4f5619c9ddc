// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Represents a task stored in a user's partition.
///
/// The JSON shape is the one persisted in the key-value store:
/// `{id, title, description, dueDate, status, userId, color, createdDate}`.
/// Dates are kept as the `YYYY-MM-DD` text they were entered with; nothing
/// validates them, and every date comparison is done on that text.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,

    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub title: String,

    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub description: String,

    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub due_date: String,

    #[serde(default, deserialize_with = "deserialize_status")]
    pub status: TaskStatus,

    // Legacy tasks may carry no owner, or a numeric one.
    #[serde(
        default,
        deserialize_with = "deserialize_lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<String>,

    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub color: String,

    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub created_date: String,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Returns true when the task is explicitly owned by `user_id`.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id.as_deref() == Some(user_id)
    }
}

/// Completion state of a task.
///
/// `"completed"` is matched case-insensitively and `"pending"` exactly.
/// Any other stored value is kept as written; it counts as not completed
/// and toggles to pending.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
    Other(String),
}

impl TaskStatus {
    /// Only `pending` becomes `completed`; everything else becomes `pending`.
    pub fn toggled(&self) -> Self {
        match self {
            TaskStatus::Pending => TaskStatus::Completed,
            _ => TaskStatus::Pending,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
            TaskStatus::Other(value) => value,
        }
    }
}

impl From<String> for TaskStatus {
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case("completed") {
            TaskStatus::Completed
        } else if value == "pending" {
            TaskStatus::Pending
        } else {
            TaskStatus::Other(value)
        }
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Other(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

/// Structure used to receive task creation data from a front end.
/// Title, description and due date are stored exactly as given.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub due_date: String,
}

/// A registered user, as kept in the `users` list and in `currentUser`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(
        default,
        deserialize_with = "deserialize_lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,

    #[serde(default)]
    pub full_name: String,

    #[serde(default)]
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_course: Option<String>,

    // Plaintext, as the stored records always were.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Completion statistics for a window of tasks.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub percentage: u32,
}

/// Reads a text field that older records may hold as `null` or a number.
fn deserialize_lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

fn deserialize_status<'de, D>(deserializer: D) -> Result<TaskStatus, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => TaskStatus::from(s),
        Value::Null => TaskStatus::Pending,
        other => TaskStatus::Other(other.to_string()),
    })
}

/// Accepts an identifier written as a string or as a number.
/// `null`, empty strings and any other JSON type read as absent.
fn deserialize_lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
