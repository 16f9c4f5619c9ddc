// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::kv::KeyValueStore;

/// Key holding the logged-in user record (or a bare identifier string).
pub const CURRENT_USER_KEY: &str = "currentUser";
/// Key holding the list of registered users.
pub const USERS_KEY: &str = "users";
/// Key of the legacy, global task list. Only ever read.
pub const LEGACY_TASKS_KEY: &str = "calendarTasks";
/// Identifier used when nobody is logged in.
pub const DEFAULT_USER_ID: &str = "default_user";

/// The canonical string that keys a user's task partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Storage key of the task partition owned by `user_id`.
pub fn partition_key(user_id: &str) -> String {
    format!("{}_{}", LEGACY_TASKS_KEY, user_id)
}

/// Resolves the current user identifier from the raw `currentUser` value.
///
/// Precedence: `id`, then `uid`, then `email` of a structured record,
/// otherwise the raw text verbatim. Absent or empty input resolves to
/// [`DEFAULT_USER_ID`].
pub fn resolve_user_id(raw: Option<&str>) -> UserId {
    let raw = match raw {
        Some(raw) if !raw.is_empty() => raw,
        _ => return UserId::from(DEFAULT_USER_ID),
    };

    if let Ok(Value::Object(record)) = serde_json::from_str::<Value>(raw) {
        let resolved = ["id", "uid", "email"]
            .iter()
            .find_map(|field| record.get(*field).and_then(present_id));
        if let Some(id) = resolved {
            return UserId::new(id);
        }
    }

    UserId::from(raw)
}

/// An identifier field counts only when it is a non-empty string or a
/// non-zero number.
fn present_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

/// Explicit session context handed to every task and progress operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    raw: Option<String>,
    user_id: UserId,
}

impl Session {
    /// Reads `currentUser` from the store and resolves it.
    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Self {
        Self::from_raw(store.get(CURRENT_USER_KEY))
    }

    pub fn from_raw(raw: Option<String>) -> Self {
        let user_id = resolve_user_id(raw.as_deref());
        Self { raw, user_id }
    }

    /// A session for a known identifier, without any stored record.
    pub fn for_user(user_id: impl Into<UserId>) -> Self {
        let user_id = user_id.into();
        Self {
            raw: Some(user_id.to_string()),
            user_id,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    pub fn partition_key(&self) -> String {
        partition_key(self.user_id.as_str())
    }

    /// Every identifier that may have been written as `userId` on this
    /// user's legacy tasks: `id`, `email` and `username` of a structured
    /// record (or the raw text when it does not parse), plus the resolved id.
    pub fn candidate_ids(&self) -> Vec<UserId> {
        let mut candidates: Vec<UserId> = Vec::new();

        if let Some(raw) = self.raw.as_deref().filter(|r| !r.is_empty()) {
            match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(record)) => {
                    for field in ["id", "email", "username"] {
                        if let Some(id) = record.get(field).and_then(present_id) {
                            candidates.push(UserId::new(id));
                        }
                    }
                }
                Ok(_) => {}
                Err(_) => candidates.push(UserId::from(raw)),
            }
        }

        if !candidates.contains(&self.user_id) {
            candidates.push(self.user_id.clone());
        }
        candidates
    }
}
