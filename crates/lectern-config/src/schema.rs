//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Service-level settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Presentations inserted when the store is empty
    #[serde(default)]
    pub presentations: Vec<RawPresentation>,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// IPC socket path (default: $XDG_RUNTIME_DIR/lecternd/lecternd.sock)
    pub socket_path: Option<PathBuf>,

    /// Data directory for the store
    pub data_dir: Option<PathBuf>,

    /// Seconds between periodic status refreshes (default: 60)
    pub refresh_interval_seconds: Option<u64>,
}

/// Raw seed presentation
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawPresentation {
    pub project_id: String,
    pub project_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    /// Local time, `YYYY-MM-DDTHH:MM[:SS]` or RFC 3339
    pub start_time: String,
    pub end_time: String,
}
