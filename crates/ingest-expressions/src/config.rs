//! Engine configuration and its loader

use crate::error::{ExpressionError, Result};
use crate::evaluator::EvaluatorConfig;
use crate::performance::PerformanceConfig;
use crate::security::SecurityConfig;
use config::{Environment, File, FileFormat};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default environment variable prefix, e.g.
/// `INNGEST_EXPRESSIONS__SECURITY__MAX_NESTING_DEPTH=32`
pub const ENV_PREFIX: &str = "INNGEST_EXPRESSIONS";

/// Complete expression engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Setters)]
#[serde(default)]
pub struct EngineConfig {
    pub security: SecurityConfig,
    pub performance: PerformanceConfig,
    pub evaluator: EvaluatorConfig,
}

impl EngineConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.security.validate()?;
        if self.performance.cache_enabled && self.performance.cache_size == 0 {
            return Err(ExpressionError::configuration_error(
                "performance.cache_size must be greater than zero when caching is enabled",
            ));
        }
        Ok(())
    }
}

/// Loads [`EngineConfig`] from defaults, TOML files and the environment,
/// later sources overriding earlier ones
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    env_prefix: String,
    files: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            env_prefix: ENV_PREFIX.to_string(),
            files: Vec::new(),
        }
    }

    /// Add a TOML configuration file
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.files.push(path.as_ref().to_path_buf());
        self
    }

    /// Set environment variable prefix
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = prefix.to_string();
        self
    }

    /// Load configuration from all sources
    pub fn load(&self) -> Result<EngineConfig> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&EngineConfig::default())?);

        for path in &self.files {
            if !path.exists() {
                return Err(ExpressionError::configuration_error(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix(&self.env_prefix)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: EngineConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        tracing::debug!(
            files = self.files.len(),
            env_prefix = %self.env_prefix,
            "loaded expression engine configuration"
        );
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
