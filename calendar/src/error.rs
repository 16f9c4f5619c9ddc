// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::path::PathBuf;

/// Failure of the persistence medium itself.
///
/// Malformed stored data is never reported through this type: every read
/// site falls back to an empty value instead.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage quota of {quota} bytes exceeded while writing `{key}` ({needed} bytes needed)")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },

    #[error("failed to access storage file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode value for `{key}`: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors surfaced by sign-up, login and profile editing.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Please fill in the {0} field")]
    MissingField(&'static str),

    #[error("Password must be at least {min} characters long")]
    PasswordTooShort { min: usize },

    #[error("Please agree to the Terms & Conditions")]
    TermsNotAccepted,

    #[error("The email {0} is already registered")]
    EmailTaken(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("No user logged in")]
    NotLoggedIn,

    #[error(transparent)]
    Store(#[from] StoreError),
}
