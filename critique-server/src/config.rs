use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Clone)]
pub struct Config {
    pub openai_api_key: String,
    /// Model identifier passed to the reasoning service.
    pub openai_model: String,
    pub port: u16,
    /// Directory for persistent state (SQLite database).
    /// Defaults to current working directory.
    pub state_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let openai_api_key = env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY environment variable is required")?;

        let openai_model =
            env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let port = parse_port(env::var("PORT").ok())?;

        let state_dir = env::var("STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        Ok(Config {
            openai_api_key,
            openai_model,
            port,
            state_dir,
        })
    }
}

/// Parse PORT from an optional string value, falling back to the default.
pub fn parse_port(value: Option<String>) -> Result<u16> {
    match value {
        Some(raw) => raw.parse::<u16>().context("PORT must be a valid number"),
        None => Ok(DEFAULT_PORT),
    }
}
