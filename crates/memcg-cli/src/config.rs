use memcg_core::{ResourceSpec, DEFAULT_MOUNT_ROOT, SWAPPINESS_UNSET};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for memcg
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Cgroup mount configuration
    #[serde(default)]
    pub cgroup: CgroupConfig,

    /// Default memory limits applied by `apply` and `update`
    #[serde(default)]
    pub memory: ResourceSpec,

    /// Logging configuration
    #[serde(default)]
    pub logging: LogConfig,
}

/// Cgroup mount configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CgroupConfig {
    /// Root of the cgroup filesystem (default: /sys/fs/cgroup)
    pub mount_root: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter used when RUST_LOG is not set (default: info)
    pub level: String,

    /// Directory for a log file; stderr only when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// Log file name inside `log_dir` (default: memcg.log)
    pub log_file: String,
}

impl Default for CgroupConfig {
    fn default() -> Self {
        Self {
            mount_root: PathBuf::from(DEFAULT_MOUNT_ROOT),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
            log_file: "memcg.log".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    ///
    /// # Example
    /// ```no_run
    /// use memcg_cli::config::Config;
    ///
    /// let config = Config::load_from_file("/etc/memcg/config.toml").unwrap();
    /// println!("Memory limit: {}", config.memory.memory);
    /// ```
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        let memory = &self.memory;

        if memory.memory < -1 {
            return Err(format!("Memory limit must be >= -1, got: {}", memory.memory));
        }

        if memory.memory_reservation < -1 {
            return Err(format!(
                "Memory reservation must be >= -1, got: {}",
                memory.memory_reservation
            ));
        }

        if memory.memory_swappiness != SWAPPINESS_UNSET
            && !(0..=100).contains(&memory.memory_swappiness)
        {
            return Err(format!(
                "Memory swappiness must be 0-100 or -1, got: {}",
                memory.memory_swappiness
            ));
        }

        if self.cgroup.mount_root.as_os_str().is_empty() {
            return Err("Cgroup mount root must not be empty".to_string());
        }

        if self.logging.level.trim().is_empty() {
            return Err("Log level must not be empty".to_string());
        }

        Ok(())
    }

    /// Get full path to the log file, if file logging is enabled
    pub fn log_path(&self) -> Option<PathBuf> {
        self.logging
            .log_dir
            .as_ref()
            .map(|dir| dir.join(&self.logging.log_file))
    }
}
