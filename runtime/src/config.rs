//! Runtime configuration
//!
//! The ambient facts of a participating site (how many sites take part and
//! which one this process is) plus logging settings, stored as TOML at
//! `~/.tensor-runtime/runtime.toml` by default.

use crate::errors::{Result, RuntimeError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for a runtime site
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuntimeConfig {
    pub site: SiteConfig,
    pub logging: LoggingConfig,
}

/// Identity of this site within the computation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteConfig {
    /// Total number of participating sites
    pub site_count: usize,
    /// Index of this site, in `[0, site_count)`
    pub this_site: usize,
}

impl SiteConfig {
    /// Single-site configuration
    pub fn single() -> Self {
        Self {
            site_count: 1,
            this_site: 0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.site_count == 0 {
            return Err(RuntimeError::Config("site_count must be at least 1".into()));
        }
        if self.this_site >= self.site_count {
            return Err(RuntimeError::Config(format!(
                "this_site {} must be less than site_count {}",
                self.this_site, self.site_count
            )));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub log_to_file: bool,
    /// Directory for rotated log files (defaults to `~/.tensor-runtime/logs`)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_file: false,
            log_dir: None,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            site: SiteConfig::single(),
            logging: LoggingConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Get default configuration file path: `~/.tensor-runtime/runtime.toml`
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| RuntimeError::Config("Cannot determine home directory".into()))?;
        Ok(home.join(".tensor-runtime").join("runtime.toml"))
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        tracing::info!(path = %path.display(), "Loading configuration");

        let content = std::fs::read_to_string(path).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Failed to read config file");
            e
        })?;

        let config: RuntimeConfig = toml::from_str(&content)?;
        config.validate()?;

        tracing::info!(
            site_count = config.site.site_count,
            this_site = config.site.this_site,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.site.validate()?;

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(RuntimeError::Config(
                    "log level must be one of: trace, debug, info, warn, error".into(),
                ))
            }
        }

        Ok(())
    }

    /// Save configuration to file (atomic write)
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;

        // Write to temp file, then rename
        let temp_path = path.with_extension("toml.tmp");
        std::fs::write(&temp_path, &toml_string)?;
        std::fs::rename(&temp_path, path)?;

        tracing::debug!(path = %path.display(), "Configuration saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();
        assert_eq!(config.site.site_count, 1);
        assert_eq!(config.site.this_site, 0);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_site_validation() {
        let mut config = RuntimeConfig::default();
        config.site = SiteConfig {
            site_count: 4,
            this_site: 4,
        };
        assert!(matches!(config.validate(), Err(RuntimeError::Config(_))));

        config.site.site_count = 0;
        config.site.this_site = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = RuntimeConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("runtime.toml");

        let mut config = RuntimeConfig::default();
        config.site = SiteConfig {
            site_count: 3,
            this_site: 2,
        };
        config.logging.log_dir = Some(temp.path().join("logs"));

        config.save(&path).unwrap();
        let loaded = RuntimeConfig::load(&path).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_rejects_invalid_site() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("runtime.toml");
        std::fs::write(
            &path,
            "[site]\nsite_count = 2\nthis_site = 5\n\n[logging]\nlevel = \"info\"\nlog_to_file = false\n",
        )
        .unwrap();

        assert!(RuntimeConfig::load(&path).is_err());
    }
}
