use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for Concordat
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConcordatConfig {
    /// Logging settings
    pub observability: ObservabilityConfig,
    /// Approval workflow settings
    pub workflow: WorkflowConfig,
    /// Workspace snapshot used by the CLI
    pub workspace: WorkspaceConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is not set
    pub log_level: String,
    /// Emit JSON log lines instead of human readable ones
    pub json_logs: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowConfig {
    /// Compare-and-swap attempts before a status update gives up
    pub max_status_retries: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkspaceConfig {
    /// Path of the JSON workspace snapshot
    pub snapshot_path: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_status_retries: 5,
        }
    }
}

impl Default for ConcordatConfig {
    fn default() -> Self {
        Self {
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                json_logs: false,
            },
            workflow: WorkflowConfig::default(),
            workspace: WorkspaceConfig {
                snapshot_path: ".concordat/workspace.json".to_string(),
            },
        }
    }
}

impl ConcordatConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (concordat.toml, .concordat-rc)
    /// 3. Environment variables (prefixed with CONCORDAT_)
    pub fn load() -> Result<Self> {
        let defaults = Config::try_from(&ConcordatConfig::default())?;
        let mut builder = Config::builder().add_source(defaults);

        if Path::new("concordat.toml").exists() {
            builder = builder.add_source(File::with_name("concordat"));
        }

        if Path::new(".concordat-rc").exists() {
            builder = builder.add_source(
                File::with_name(".concordat-rc").format(config::FileFormat::Toml),
            );
        }

        // CONCORDAT_WORKFLOW__MAX_STATUS_RETRIES=3
        builder = builder.add_source(
            Environment::with_prefix("CONCORDAT")
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
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<ConcordatConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = ConcordatConfig::load_env_file();
        ConcordatConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static ConcordatConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConcordatConfig::default();
        assert_eq!(config.workflow.max_status_retries, 5);
        assert_eq!(config.observability.log_level, "info");
        assert!(!config.observability.json_logs);
        assert_eq!(config.workspace.snapshot_path, ".concordat/workspace.json");
    }

    #[test]
    fn test_save_and_reload_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("concordat.toml");
        let mut config = ConcordatConfig::default();
        config.workflow.max_status_retries = 9;
        config.save_to_file(&path).unwrap();

        let loaded: ConcordatConfig =
            toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.workflow.max_status_retries, 9);
        assert_eq!(loaded.workspace.snapshot_path, config.workspace.snapshot_path);
    }
}
