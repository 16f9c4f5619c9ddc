// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use chrono::Utc;
use common::User;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{AccountError, StoreError};
use crate::kv::KeyValueStore;
use crate::session::{CURRENT_USER_KEY, USERS_KEY, UserId, partition_key};
use crate::tasks::{read_task_list, write_task_list};

/// Shortest password accepted at sign-up.
pub const MIN_PASSWORD_LEN: usize = 6;
/// Name shown for a profile that never had one.
pub const DEFAULT_DISPLAY_NAME: &str = "Student Name";

/// Sign-up form contents.
#[derive(Debug, Clone)]
pub struct SignUp {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub accepted_terms: bool,
}

/// Editable profile fields.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub full_name: String,
    pub email: String,
    pub year_course: String,
}

/// Result of a profile edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileChange {
    pub user: User,
    /// Identifier whose task partition was moved to the user's id, if any.
    pub migrated_from: Option<UserId>,
}

/// The profile currently logged in, along with how it was stored.
struct LoadedProfile {
    user: User,
    original_email: Option<String>,
    original_identifier: String,
}

/// User registration, login and profile management.
pub struct Accounts<S> {
    store: S,
}

impl<S: KeyValueStore> Accounts<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// All registered users; empty when the list is absent or malformed.
    pub fn users(&self) -> Vec<User> {
        self.store
            .get(USERS_KEY)
            .and_then(|raw| match serde_json::from_str(&raw) {
                Ok(users) => Some(users),
                Err(e) => {
                    warn!("Ignoring malformed user list: {}", e);
                    None
                }
            })
            .unwrap_or_default()
    }

    /// Registers a new user with a freshly generated id and an empty task
    /// partition.
    #[allow(clippy::uninlined_format_args)]
    pub fn sign_up(&self, form: SignUp) -> Result<User, AccountError> {
        let full_name = form.full_name.trim();
        let email = form.email.trim();

        if full_name.is_empty() {
            return Err(AccountError::MissingField("full name"));
        }
        if email.is_empty() {
            return Err(AccountError::MissingField("email"));
        }
        if form.password.is_empty() {
            return Err(AccountError::MissingField("password"));
        }
        if form.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AccountError::PasswordTooShort {
                min: MIN_PASSWORD_LEN,
            });
        }
        if !form.accepted_terms {
            return Err(AccountError::TermsNotAccepted);
        }

        let mut users = self.users();
        if users.iter().any(|u| u.email == email) {
            return Err(AccountError::EmailTaken(email.to_string()));
        }

        let user = User {
            id: Some(generate_user_id()),
            full_name: full_name.to_string(),
            email: email.to_string(),
            password: Some(form.password),
            ..User::default()
        };

        users.push(user.clone());
        self.write_json(USERS_KEY, &users)?;

        // Give the new id an empty partition so later migrations see it.
        // The account exists either way.
        let key = partition_key(user.id.as_deref().unwrap_or_default());
        if self.store.get(&key).is_none() {
            if let Err(e) = self.store.set(&key, "[]") {
                warn!("Failed to create task partition {}: {}", key, e);
            }
        }

        info!("Account created for {}", user.email);
        Ok(user)
    }

    /// Checks the credentials against the registered users and stores the
    /// matching record as the current user.
    pub fn log_in(&self, email: &str, password: &str) -> Result<User, AccountError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AccountError::MissingField("email and password"));
        }

        let user = self
            .users()
            .into_iter()
            .find(|u| u.email == email && u.password.as_deref() == Some(password))
            .ok_or(AccountError::InvalidCredentials)?;

        self.write_json(CURRENT_USER_KEY, &user)?;
        info!("Login successful for {}", user.email);
        Ok(user)
    }

    pub fn log_out(&self) -> Result<(), AccountError> {
        self.store.remove(CURRENT_USER_KEY)?;
        debug!("Current user cleared");
        Ok(())
    }

    /// The logged-in profile, with the display name defaulted.
    pub fn current_profile(&self) -> Result<User, AccountError> {
        let mut user = self.load_profile()?.user;
        if user.full_name.is_empty() {
            user.full_name = DEFAULT_DISPLAY_NAME.to_string();
        }
        Ok(user)
    }

    /// Saves the edited profile and, when the user's id has no task
    /// partition yet, moves the partition stored under the original email
    /// or original identifier to it.
    ///
    /// The move is best-effort: when neither old partition exists nothing
    /// is migrated, and a failure while moving is logged, not returned.
    #[allow(clippy::uninlined_format_args)]
    pub fn update_profile(&self, update: ProfileUpdate) -> Result<ProfileChange, AccountError> {
        let full_name = update.full_name.trim();
        let email = update.email.trim();
        let year_course = update.year_course.trim();
        if full_name.is_empty() {
            return Err(AccountError::MissingField("full name"));
        }
        if email.is_empty() {
            return Err(AccountError::MissingField("email"));
        }

        let LoadedProfile {
            mut user,
            original_email,
            original_identifier,
        } = self.load_profile()?;

        user.full_name = full_name.to_string();
        user.email = email.to_string();
        user.year_course = Some(year_course.to_string());
        let user_id = user.id.get_or_insert_with(generate_user_id).clone();

        self.write_json(CURRENT_USER_KEY, &user)?;

        let mut users = self.users();
        let existing = users.iter().position(|u| {
            original_email.as_deref().is_some_and(|e| u.email == e)
                || u.email == original_identifier
                || u.username.as_deref() == Some(original_identifier.as_str())
        });
        match existing {
            Some(idx) => users[idx] = user.clone(),
            None => users.push(user.clone()),
        }
        self.write_json(USERS_KEY, &users)?;

        let mut from_candidates: Vec<&str> = Vec::new();
        if let Some(email) = original_email.as_deref() {
            from_candidates.push(email);
        }
        if !original_identifier.is_empty() {
            from_candidates.push(&original_identifier);
        }

        let migrated_from = match self.migrate_partition(&user_id, &from_candidates) {
            Ok(from) => from,
            Err(e) => {
                warn!("Failed migrating per-user data after profile change: {}", e);
                None
            }
        };

        info!("Profile updated for {}", user_id);
        Ok(ProfileChange {
            user,
            migrated_from,
        })
    }

    fn load_profile(&self) -> Result<LoadedProfile, AccountError> {
        let raw = self
            .store
            .get(CURRENT_USER_KEY)
            .filter(|raw| !raw.is_empty())
            .ok_or(AccountError::NotLoggedIn)?;

        if let Ok(user) = serde_json::from_str::<User>(&raw) {
            let original_email = Some(user.email.clone()).filter(|e| !e.is_empty());
            return Ok(LoadedProfile {
                user,
                original_email,
                original_identifier: raw,
            });
        }

        // Stored as a bare identifier (email or username).
        let found = self
            .users()
            .into_iter()
            .find(|u| u.email == raw || u.username.as_deref() == Some(raw.as_str()));
        let (user, original_email) = match found {
            Some(user) => {
                let email = Some(user.email.clone()).filter(|e| !e.is_empty());
                (user, email)
            }
            None => (
                User {
                    full_name: raw.clone(),
                    ..User::default()
                },
                None,
            ),
        };

        Ok(LoadedProfile {
            user,
            original_email,
            original_identifier: raw,
        })
    }

    fn migrate_partition(
        &self,
        to_id: &str,
        from_candidates: &[&str],
    ) -> Result<Option<UserId>, StoreError> {
        let new_key = partition_key(to_id);
        if self.store.get(&new_key).is_some() {
            return Ok(None);
        }

        for from_id in from_candidates {
            let old_key = partition_key(from_id);
            if self.store.get(&old_key).is_none() {
                continue;
            }

            let mut list = read_task_list(&self.store, &old_key);
            match list.replaced.take() {
                // Not a list: move the value as it is.
                Some(raw) => self.store.set(&new_key, &raw)?,
                None => {
                    for task in &mut list.tasks {
                        task.user_id = Some(to_id.to_string());
                    }
                    write_task_list(&self.store, &new_key, &list)?;
                }
            }
            self.store.remove(&old_key)?;

            info!("Moved task partition {} to {}", old_key, new_key);
            return Ok(Some(UserId::from(*from_id)));
        }

        debug!("No earlier task partition found for {}", to_id);
        Ok(None)
    }

    fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let data = serde_json::to_string(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.store.set(key, &data)
    }
}

/// `u_<unix millis>_<0..10000>`
fn generate_user_id() -> String {
    format!(
        "u_{}_{}",
        Utc::now().timestamp_millis(),
        rand::rng().random_range(0..10000)
    )
}
