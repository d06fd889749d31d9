//! Settings file parser for feedsink.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde but logged as warnings, since they are
//! usually typos. CLI flags and `DATABASE_URL` take precedence over values
//! read here; that merge happens in `main`.
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Ingestion settings.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
///
/// SEC-015: Custom Debug impl masks `database_url`, which may embed
/// credentials.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of feeds fetched and stored at the same time.
    /// 1 processes URLs strictly in OPML order.
    pub concurrency: usize,

    /// Size of the storage connection pool.
    pub max_connections: u32,

    /// Per-request HTTP timeout in seconds.
    pub timeout_secs: u64,

    /// Largest feed body accepted, in bytes.
    pub max_feed_bytes: usize,

    /// User-Agent header sent with every request.
    pub user_agent: String,

    /// Whether feeds on localhost or private address ranges may be fetched.
    pub allow_private_hosts: bool,

    /// Storage connection string (alternative to `--database` / `DATABASE_URL`).
    pub database_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: 4,
            max_connections: 3,
            timeout_secs: 30,
            max_feed_bytes: 10 * 1024 * 1024,
            user_agent: concat!("feedsink/", env!("CARGO_PKG_VERSION")).to_string(),
            allow_private_hosts: true,
            database_url: None,
        }
    }
}

/// SEC-015: Mask database_url in Debug output to prevent secret leakage.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("concurrency", &self.concurrency)
            .field("max_connections", &self.max_connections)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_feed_bytes", &self.max_feed_bytes)
            .field("user_agent", &self.user_agent)
            .field("allow_private_hosts", &self.allow_private_hosts)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 7] = [
        "concurrency",
        "max_connections",
        "timeout_secs",
        "max_feed_bytes",
        "user_agent",
        "allow_private_hosts",
        "database_url",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Zero concurrency, pool size or timeout → `Err(ConfigError::Invalid)`
    /// - Unknown keys → silently accepted (serde default behavior), logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // SEC-014: Check file size before reading to prevent memory exhaustion
        // from a maliciously large or corrupted config file.
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse the TOML content first as a raw table to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        tracing::info!(
            path = %path.display(),
            concurrency = config.concurrency,
            max_connections = config.max_connections,
            "Loaded configuration"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".into()));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "max_connections must be at least 1".into(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be at least 1".into()));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, content: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("feedsink_config_test_{}", name));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn cleanup(path: &Path) {
        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.max_connections, 3);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_feed_bytes, 10 * 1024 * 1024);
        assert!(config.user_agent.starts_with("feedsink/"));
        assert!(config.allow_private_hosts);
        assert!(config.database_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/feedsink_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.concurrency, 4);
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let path = write_config("whitespace", "   \n  \n  ");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.max_connections, 3);
        cleanup(&path);
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let path = write_config("partial", "concurrency = 1\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.max_connections, 3);
        assert_eq!(config.timeout_secs, 30);
        cleanup(&path);
    }

    #[test]
    fn test_full_config() {
        let content = r#"
concurrency = 8
max_connections = 5
timeout_secs = 10
max_feed_bytes = 2048
user_agent = "custom-agent/1.0"
allow_private_hosts = false
database_url = "sqlite:///var/lib/feeds.db"
"#;
        let path = write_config("full", content);
        let config = Config::load(&path).unwrap();
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.max_feed_bytes, 2048);
        assert_eq!(config.user_agent, "custom-agent/1.0");
        assert!(!config.allow_private_hosts);
        assert_eq!(
            config.database_url.as_deref(),
            Some("sqlite:///var/lib/feeds.db")
        );
        cleanup(&path);
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let path = write_config("invalid", "this is not [valid toml");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
        cleanup(&path);
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let path = write_config("wrongtype", "concurrency = \"many\"\n");
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
        cleanup(&path);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let path = write_config("zero", "concurrency = 0\n");
        assert!(matches!(Config::load(&path), Err(ConfigError::Invalid(_))));
        cleanup(&path);
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let path = write_config("unknown", "concurrency = 2\ntotally_fake_key = 1\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.concurrency, 2);
        cleanup(&path);
    }

    // SEC-014: File size limit
    #[test]
    fn test_too_large_file_rejected() {
        let path = write_config("too_large", &"a".repeat(1_048_577));
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));
        cleanup(&path);
    }

    // SEC-015: Debug output masks the connection string
    #[test]
    fn test_debug_masks_database_url() {
        let config = Config {
            database_url: Some("postgres://user:hunter2@db/feeds".to_string()),
            ..Config::default()
        };

        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("hunter2"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
