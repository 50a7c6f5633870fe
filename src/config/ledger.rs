//! Ledger configuration structures.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::AppResult;

/// Environment variable holding the audit buffer size.
pub const ENV_AUDIT_BUFFER_EVENTS: &str = "LEDGER_AUDIT_BUFFER_EVENTS";
/// Environment variable toggling request dumps.
pub const ENV_SHOW_REQUESTS: &str = "LEDGER_SHOW_REQUESTS";
/// Environment variable selecting the file store directory.
pub const ENV_STORE_PATH: &str = "LEDGER_STORE_PATH";

/// Persistence backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PersistenceBackendConfig {
    /// In-memory store for development/testing.
    #[default]
    InMemory,
    /// Append-only JSON-lines log under a directory.
    File {
        /// Directory holding the log.
        path: PathBuf,
    },
}

/// Per-ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Audit events retained in memory; 0 disables auditing.
    pub audit_buffer_events: usize,
    /// Log a debug dump of the request table after each update.
    pub show_requests: bool,
    /// Persistence backend.
    pub persistence: PersistenceBackendConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            audit_buffer_events: 1024,
            show_requests: false,
            persistence: PersistenceBackendConfig::InMemory,
        }
    }
}

impl LedgerConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if let PersistenceBackendConfig::File { path } = &self.persistence {
            if path.as_os_str().is_empty() {
                return Err("file persistence requires a non-empty path".into());
            }
        }
        Ok(())
    }

    /// Parse ledger configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from the process environment, loading `.env` first.
    ///
    /// Unset variables keep their defaults. A set `LEDGER_STORE_PATH` selects
    /// the file backend.
    pub fn from_env() -> AppResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(raw) = lookup(ENV_AUDIT_BUFFER_EVENTS) {
            cfg.audit_buffer_events = raw
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("{ENV_AUDIT_BUFFER_EVENTS}={raw}: {e}"))?;
        }
        if let Some(raw) = lookup(ENV_SHOW_REQUESTS) {
            cfg.show_requests = parse_flag(&raw)
                .ok_or_else(|| anyhow::anyhow!("{ENV_SHOW_REQUESTS}={raw}: expected a boolean"))?;
        }
        if let Some(raw) = lookup(ENV_STORE_PATH) {
            cfg.persistence = PersistenceBackendConfig::File {
                path: PathBuf::from(raw),
            };
        }
        cfg.validate().map_err(anyhow::Error::msg)?;
        Ok(cfg)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
