use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::sync::SyncConfig;

/// Main configuration structure for dlvery
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DlveryConfig {
    /// Delivery backend connection
    pub store: StoreConfig,
    /// Offline queue persistence
    pub offline: OfflineConfig,
    /// Signature canvas settings
    pub signature: SignatureConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
    /// Signed-in agent defaults
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Base URL of the delivery backend
    pub base_url: String,
    pub request_timeout_seconds: u64,
    /// Rate limiting settings
    pub requests_per_second: u32,
    pub burst_capacity: u32,
    /// How long list responses are served from cache
    pub cache_ttl_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OfflineConfig {
    /// Directory holding the queue, mirror and last sync files
    pub storage_dir: String,
    /// Age after which the local mirror is flagged as stale
    pub stale_after_minutes: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignatureConfig {
    /// Pen width in pixels; the canvas itself is always 300 x 150
    pub stroke_width: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level
    pub log_level: String,
    /// Emit JSON lines instead of human readable output
    pub json_logs: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AgentConfig {
    /// Agent identity used when `--agent` is not given
    pub id: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout_seconds: 10,
            requests_per_second: 10,
            burst_capacity: 20,
            cache_ttl_seconds: 30,
        }
    }
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            storage_dir: ".dlvery/offline".to_string(),
            stale_after_minutes: 60,
        }
    }
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            stroke_width: 2.0,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: true,
        }
    }
}

impl Default for DlveryConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            offline: OfflineConfig::default(),
            signature: SignatureConfig::default(),
            observability: ObservabilityConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}

impl DlveryConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (dlvery.toml, .dlvery-rc)
    /// 3. Environment variables (prefixed with DLVERY_, nested with __)
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Same as [`DlveryConfig::load`] with the configuration files looked up in `dir`
    pub fn load_from(dir: &Path) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&DlveryConfig::default())?);

        let toml_file = dir.join("dlvery.toml");
        if toml_file.exists() {
            builder = builder.add_source(File::from(toml_file));
        }

        let rc_file = dir.join(".dlvery-rc");
        if rc_file.exists() {
            builder = builder.add_source(File::from(rc_file).format(config::FileFormat::Toml));
        }

        // Override with environment variables
        builder = builder.add_source(
            Environment::with_prefix("DLVERY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    pub fn storage_dir(&self) -> PathBuf {
        PathBuf::from(&self.offline.storage_dir)
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig::with_stale_after_minutes(self.offline.stale_after_minutes)
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<DlveryConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        // Load .env file first
        let _ = DlveryConfig::load_env_file();
        DlveryConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static DlveryConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_files() {
        let dir = TempDir::new().unwrap();
        let config = DlveryConfig::load_from(dir.path()).unwrap();

        assert_eq!(config.store.base_url, "http://localhost:8080");
        assert_eq!(config.offline.stale_after_minutes, 60);
        assert_eq!(config.signature.stroke_width, 2.0);
    }

    #[test]
    fn test_toml_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("dlvery.toml"),
            "[store]\nbase_url = \"https://dispatch.example.com\"\n\n[agent]\nid = \"kavya@example.com\"\n",
        )
        .unwrap();

        let config = DlveryConfig::load_from(dir.path()).unwrap();
        assert_eq!(config.store.base_url, "https://dispatch.example.com");
        assert_eq!(config.store.request_timeout_seconds, 10);
        assert_eq!(config.agent.id.as_deref(), Some("kavya@example.com"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let mut config = DlveryConfig::default();
        config.offline.stale_after_minutes = 15;
        config.save_to_file(dir.path().join("dlvery.toml")).unwrap();

        let reloaded = DlveryConfig::load_from(dir.path()).unwrap();
        assert_eq!(reloaded.offline.stale_after_minutes, 15);
        assert_eq!(reloaded.sync_config().stale_after, chrono::Duration::minutes(15));
    }

    #[test]
    fn test_unusable_stale_threshold_falls_back_to_default() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("dlvery.toml"), "[offline]\nstale_after_minutes = -5\n").unwrap();

        let config = DlveryConfig::load_from(dir.path()).unwrap();
        assert_eq!(config.sync_config(), SyncConfig::default());

        let mut config = DlveryConfig::default();
        config.offline.stale_after_minutes = i64::MAX;
        assert_eq!(config.sync_config(), SyncConfig::default());
    }
}
