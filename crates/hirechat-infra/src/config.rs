//! Configuration and data-directory resolution for hirechat.
//!
//! Reads `config.toml` from the data directory (`~/.hirechat/` in
//! production) and deserializes it into [`MessagingConfig`]. Falls back to
//! defaults when the file is missing or malformed.

use std::path::{Path, PathBuf};

use hirechat_types::config::MessagingConfig;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "HIRECHAT_DATA_DIR";

/// Resolve the data directory: `HIRECHAT_DATA_DIR`, else `~/.hirechat`,
/// else `./.hirechat`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".hirechat");
    }

    PathBuf::from(".hirechat")
}

/// Load configuration from `{data_dir}/config.toml`.
///
/// - Missing file: defaults.
/// - Unreadable or unparsable file: a warning and defaults.
pub async fn load_config(data_dir: &Path) -> MessagingConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return MessagingConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return MessagingConfig::default();
        }
    };

    match toml::from_str::<MessagingConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            MessagingConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).await;
        assert_eq!(config, MessagingConfig::default());
    }

    #[tokio::test]
    async fn valid_toml_is_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
bus_capacity = 32

[reconnect]
initial_delay_ms = 100

[server]
port = 9000
"#,
        )
        .await
        .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.bus_capacity, 32);
        assert_eq!(config.reconnect.initial_delay_ms, 100);
        assert_eq!(config.reconnect.max_delay_ms, 30_000);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[tokio::test]
    async fn invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config, MessagingConfig::default());
    }

    #[test]
    fn data_dir_ends_with_hirechat_by_default() {
        if std::env::var(DATA_DIR_ENV).is_err() {
            assert!(resolve_data_dir().ends_with(".hirechat"));
        }
    }
}
