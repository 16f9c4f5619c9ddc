// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
pub mod accounts;
pub mod agenda;
pub mod colors;
pub mod commands;
pub mod config;
pub mod error;
pub mod kv;
pub mod progress;
pub mod session;
pub mod tasks;

pub use accounts::Accounts;
pub use error::{AccountError, StoreError};
pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use progress::{ProgressAggregator, WeekStart};
pub use session::{Session, UserId};
pub use tasks::{TaskEvent, TaskStore};
