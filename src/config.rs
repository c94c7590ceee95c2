//! Configuration for the Foresight backend
//!
//! Settings are layered: built-in defaults, then an optional
//! `foresight.toml` file, then `FORESIGHT_*` environment variables.

use crate::error::Result;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Runtime settings for the server and the risk model
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Address the HTTP server binds to
    pub listen_addr: String,
    /// Path to the SQLite database file
    pub database_path: String,
    /// Path to the persisted model artifact. When absent (or the file is
    /// missing/corrupt) the model is trained fresh on synthetic data at
    /// startup.
    pub model_path: Option<PathBuf>,
    /// Static bearer token required on /api/v1 routes. When absent the
    /// API is served without authentication.
    pub api_token: Option<String>,
}

impl Settings {
    /// Load settings from defaults, an optional config file, and the
    /// environment
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("listen_addr", "127.0.0.1:8000")?
            .set_default("database_path", "foresight.db")?;

        builder = match config_file {
            Some(path) => builder.add_source(File::from(path)),
            None => builder.add_source(File::with_name("foresight").required(false)),
        };

        builder = builder.add_source(Environment::with_prefix("FORESIGHT"));

        let settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8000".to_string(),
            database_path: "foresight.db".to_string(),
            model_path: None,
            api_token: None,
        }
    }
}
