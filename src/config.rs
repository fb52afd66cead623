// Tue Jan 13 2026 - Alex

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub correlation: CorrelationConfig,
    pub shared_memory: SharedMemoryConfig,
    pub instance: InstanceConfig,
}

/// Settings for the text command/response driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    pub host: String,
    pub port: u16,
    pub timeout_ms: u64,
    pub delay_ms: u64,
    /// Largest span requested by a single read command.
    pub max_read_length: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharedMemoryConfig {
    pub host: String,
    pub port: u16,
    pub memory_dir: PathBuf,
    pub memory_name: String,
    pub setup_timeout_ms: u64,
    pub liveness_retries: u32,
    pub liveness_interval_ms: u64,
    pub frame_skip: i32,
    pub delay_ms: u64,
    pub probe_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceConfig {
    pub auto_reconnect: bool,
    pub reconnect_delay_ms: u64,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 55355,
            timeout_ms: 64,
            delay_ms: 5,
            max_read_length: 2048,
        }
    }
}

impl Default for SharedMemoryConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 55356,
            memory_dir: PathBuf::from("/dev/shm"),
            memory_name: "GAMESTATE_BRIDGE_MEMORY".to_string(),
            setup_timeout_ms: 1000,
            liveness_retries: 2,
            liveness_interval_ms: 250,
            frame_skip: -1,
            delay_ms: 5,
            probe_timeout_ms: 100,
        }
    }
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            reconnect_delay_ms: 2000,
        }
    }
}

impl CorrelationConfig {
    pub fn peer(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl SharedMemoryConfig {
    pub fn peer(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn memory_path(&self) -> PathBuf {
        self.memory_dir.join(&self.memory_name)
    }

    pub fn setup_timeout(&self) -> Duration {
        Duration::from_millis(self.setup_timeout_ms)
    }

    pub fn liveness_interval(&self) -> Duration {
        Duration::from_millis(self.liveness_interval_ms)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl InstanceConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config {}: {}", path.display(), e))?;
        let config: Config = serde_json::from_str(&text)
            .map_err(|e| format!("Failed to parse config {}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.instance.auto_reconnect = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.correlation.host.is_empty() || self.shared_memory.host.is_empty() {
            return Err("Peer host must not be empty".to_string());
        }
        if self.correlation.timeout_ms == 0 {
            return Err("correlation.timeout_ms must be greater than 0".to_string());
        }
        if self.correlation.max_read_length == 0 {
            return Err("correlation.max_read_length must be greater than 0".to_string());
        }
        if self.shared_memory.memory_name.is_empty() {
            return Err("shared_memory.memory_name must not be empty".to_string());
        }
        if self.shared_memory.setup_timeout_ms == 0 {
            return Err("shared_memory.setup_timeout_ms must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.correlation.peer(), "127.0.0.1:55355");
        assert_eq!(config.shared_memory.liveness_retries, 2);
        assert!(config.instance.auto_reconnect);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "correlation": {{ "port": 4000 }}, "instance": {{ "auto_reconnect": false }} }}"#).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.correlation.port, 4000);
        assert_eq!(config.correlation.timeout_ms, 64);
        assert!(!config.instance.auto_reconnect);
        assert_eq!(config.shared_memory, SharedMemoryConfig::default());
    }

    #[test]
    fn test_validate_rejects_zero_read_length() {
        let mut config = Config::default();
        config.correlation.max_read_length = 0;
        assert!(config.validate().is_err());
    }
}
