use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

const DB_VAR: &str = "BARGANHA_DB";
const LOG_VAR: &str = "BARGANHA_LOG";
const DEFAULT_LOG_FILTER: &str = "info";

pub(crate) struct Config {
    pub(crate) db_path: PathBuf,
    pub(crate) log_filter: String,
}

impl Config {
    /// Read settings from the environment, falling back to defaults.
    ///
    /// Fallbacks are collected in `notes` rather than logged, since the
    /// logger is configured from the result.
    pub(crate) fn load() -> Result<(Self, Vec<String>)> {
        let mut notes = Vec::new();

        let db_path = match var(DB_VAR) {
            Some(path) => PathBuf::from(path),
            None => {
                let path = default_db_path()?;
                notes.push(format!("{DB_VAR} not set, using default: {}", path.display()));
                path
            }
        };
        let log_filter = var(LOG_VAR).unwrap_or_else(|| {
            notes.push(format!("{LOG_VAR} not set, using default: {DEFAULT_LOG_FILTER}"));
            DEFAULT_LOG_FILTER.to_string()
        });

        Ok((
            Self {
                db_path,
                log_filter,
            },
            notes,
        ))
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn default_db_path() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "barganha", "Barganha")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    Ok(data_dir.join("barganha.db"))
}
