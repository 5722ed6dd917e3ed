//! Server configuration read from the environment.

use std::path::PathBuf;
use std::str::FromStr;

use twistale_game::application::services::WritePolicy;
use twistale_game::domain::views::DEFAULT_MIN_PLAYERS;

use crate::error::AppError;

/// Settings resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Interface to bind (`HOST`).
    pub host: String,
    /// Port to bind (`PORT`).
    pub port: u16,
    /// PostgreSQL URL (`DATABASE_URL`); rooms are kept in memory when unset.
    pub database_url: Option<String>,
    /// Directory drawings are written under (`BLOB_ROOT`).
    pub blob_root: PathBuf,
    /// Base URL drawing links are built from (`PUBLIC_BASE_URL`).
    pub public_base_url: String,
    /// JSON file for active-room preferences (`PREFERENCES_PATH`); kept in
    /// memory when unset.
    pub preferences_path: Option<PathBuf>,
    /// Players needed to start (`MIN_PLAYERS`).
    pub min_players: usize,
    /// Commit mode for room updates (`WRITE_POLICY`).
    pub write_policy: WritePolicy,
}

fn parse<T: FromStr>(name: &str, raw: &str) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| AppError::Config(format!("{name} is invalid: {e}")))
}

impl AppConfig {
    /// Builds the configuration from a variable lookup. Blank values count
    /// as unset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` naming the first invalid variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = match var("PORT") {
            Some(raw) => parse("PORT", &raw)?,
            None => 3000,
        };
        let min_players: usize = match var("MIN_PLAYERS") {
            Some(raw) => parse("MIN_PLAYERS", &raw)?,
            None => DEFAULT_MIN_PLAYERS,
        };
        if min_players < 2 {
            return Err(AppError::Config(format!(
                "MIN_PLAYERS must be at least 2, got {min_players}"
            )));
        }
        let write_policy = match var("WRITE_POLICY") {
            Some(raw) => parse("WRITE_POLICY", &raw)?,
            None => WritePolicy::default(),
        };

        Ok(Self {
            database_url: var("DATABASE_URL"),
            blob_root: var("BLOB_ROOT").map_or_else(|| PathBuf::from("./data/blobs"), PathBuf::from),
            public_base_url: var("PUBLIC_BASE_URL")
                .unwrap_or_else(|| format!("http://localhost:{port}")),
            preferences_path: var("PREFERENCES_PATH").map(PathBuf::from),
            host,
            port,
            min_players,
            write_policy,
        })
    }

    /// Builds the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` naming the first invalid variable.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }
}
