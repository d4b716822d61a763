use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

use crate::core::{Result, SurqlError};

fn default_scope() -> String {
    "same".to_string()
}

/// Connection configuration parsed from a TOML file or the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the database's HTTP endpoint, e.g. `http://localhost:8000`.
    pub host: String,
    pub user: String,
    pub password: String,
    #[serde(default = "default_scope")]
    pub namespace: String,
    #[serde(default = "default_scope")]
    pub database: String,
}

impl Config {
    /// Loads connection settings from the environment variables
    /// `SurrealDB_HOST`, `SurrealDB_USER` and `SurrealDB_PASSWORD`.
    /// Namespace and database fall back to their defaults.
    pub fn from_env() -> Result<Config> {
        let var = |name: &str| {
            env::var(name).map_err(|_| SurqlError::Config(format!("{} is not set", name)))
        };
        Ok(Config {
            host: var("SurrealDB_HOST")?,
            user: var("SurrealDB_USER")?,
            password: var("SurrealDB_PASSWORD")?,
            namespace: default_scope(),
            database: default_scope(),
        })
    }
}

/// Loads configuration from a TOML file at the given path.
///
/// # Arguments
///
/// * `path` - The file path to the TOML configuration file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| SurqlError::Config(e.to_string()))
}
