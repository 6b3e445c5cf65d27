use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::domain::identity::User;

/// Settings read from the environment (and `.env`, when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub log_file: Option<PathBuf>,
    /// Profile the terminal client signs in with when nobody is remembered.
    pub local_user: User,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let database_url = var("DATABASE_URL").unwrap_or_else(|| "sqlite://taskmaster.db".to_string());
        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| "127.0.0.1:3000".to_string())
            .parse()
            .context("BIND_ADDR must be a socket address")?;
        let uid = var("TASKMASTER_UID").unwrap_or_else(|| "local".to_string());
        let email = var("TASKMASTER_EMAIL").unwrap_or_else(|| format!("{uid}@localhost"));
        Ok(Self {
            database_url,
            bind_addr,
            log_file: var("TASKMASTER_LOG_FILE").map(PathBuf::from),
            local_user: User { uid, email, display_name: var("TASKMASTER_NAME") },
        })
    }
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
