// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::env;
use std::path::PathBuf;

// Directory and file the key-value store lives in unless overridden.
const DEFAULT_DATA_DIR: &str = "database";
const DEFAULT_STORE_FILE: &str = "local_storage.json";

/// Where the application keeps its data, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `CALENDAR_DATA_DIR`, default `database`
    pub data_dir: PathBuf,
    /// `CALENDAR_STORE_FILE`, default `local_storage.json`
    pub store_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            store_file: DEFAULT_STORE_FILE.to_string(),
        }
    }
}

impl Config {
    /// Loads `.env` if present, then reads the environment.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source. Unset or blank
    /// variables fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            data_dir: var("CALENDAR_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            store_file: var("CALENDAR_STORE_FILE").unwrap_or_else(|| DEFAULT_STORE_FILE.to_string()),
        }
    }

    /// Replaces the data directory, e.g. from a command-line flag.
    pub fn with_data_dir(mut self, data_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        self
    }

    /// Full path of the store file.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(&self.store_file)
    }
}
