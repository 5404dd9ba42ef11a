//! Default paths for lecternd components
//!
//! Paths are user-writable by default (no root required):
//! - Socket: `$XDG_RUNTIME_DIR/lecternd/lecternd.sock` or `/tmp/lecternd-$USER/lecternd.sock`
//! - Data: `$XDG_DATA_HOME/lecternd` or `~/.local/share/lecternd`
//! - Config: `$XDG_CONFIG_HOME/lectern/config.toml` or `~/.config/lectern/config.toml`

use std::path::PathBuf;

const SOCKET_FILENAME: &str = "lecternd.sock";
const APP_DIR: &str = "lecternd";
const CONFIG_DIR: &str = "lectern";
const CONFIG_FILENAME: &str = "config.toml";

/// Get the default socket path.
///
/// `LECTERN_SOCKET` is handled by the CLI layer, not here.
pub fn default_socket_path() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join(APP_DIR).join(SOCKET_FILENAME);
    }

    let username = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    PathBuf::from(format!("/tmp/{}-{}", APP_DIR, username)).join(SOCKET_FILENAME)
}

/// Get the default data directory.
pub fn default_data_dir() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

/// Get the default configuration file path.
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(CONFIG_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(CONFIG_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from("/etc").join(CONFIG_DIR).join(CONFIG_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_path_contains_lecternd() {
        let path = default_socket_path();
        assert!(path.to_string_lossy().contains("lecternd"));
        assert!(path.to_string_lossy().ends_with(".sock"));
    }

    #[test]
    fn data_dir_contains_lecternd() {
        let path = default_data_dir();
        assert!(path.to_string_lossy().contains("lecternd"));
    }

    #[test]
    fn config_path_is_toml() {
        let path = default_config_path();
        assert_eq!(path.file_name().unwrap(), "config.toml");
        assert!(path.to_string_lossy().contains("lectern"));
    }
}
