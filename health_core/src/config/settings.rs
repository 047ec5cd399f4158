use crate::metadata::Metadata;
use crate::monitor::{MonitorOptions, SubsystemSpec};
use crate::probe::{FilesystemProbe, DEFAULT_PROBE_INTERVAL};
use crate::status::StatusLevel;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Looked up in the working directory by [`AppConfig::load`].
pub const DEFAULT_CONFIG_FILE: &str = "health.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub subsystems: Vec<SubsystemConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Used by probed subsystems that don't set their own interval.
    pub default_probe_interval_seconds: u64,
}

/// One subsystem as declared in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubsystemConfig {
    pub name: String,
    #[serde(default)]
    pub status: StatusLevel,
    #[serde(default)]
    pub non_critical: bool,
    /// Zero means the monitor default.
    #[serde(default)]
    pub probe_interval_seconds: u64,
    /// Checked by a filesystem probe when non-empty.
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            default_probe_interval_seconds: DEFAULT_PROBE_INTERVAL.as_secs(),
        }
    }
}

impl MonitorConfig {
    pub fn default_probe_interval(&self) -> Duration {
        Duration::from_secs(self.default_probe_interval_seconds)
    }

    /// Options without listeners or a clock override.
    pub fn options(&self) -> MonitorOptions {
        MonitorOptions {
            default_probe_interval: self.default_probe_interval(),
            ..MonitorOptions::default()
        }
    }
}

impl SubsystemConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StatusLevel::Good,
            non_critical: false,
            probe_interval_seconds: 0,
            paths: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn to_spec(&self) -> SubsystemSpec {
        let mut spec = SubsystemSpec::new(self.name.clone())
            .with_status(self.status)
            .with_probe_interval(Duration::from_secs(self.probe_interval_seconds))
            .with_metadata(Metadata::from_map(self.metadata.clone()));

        if self.non_critical {
            spec = spec.non_critical();
        }
        if !self.paths.is_empty() {
            spec = spec.with_probe(Arc::new(FilesystemProbe::new(self.paths.clone())));
        }
        spec
    }
}

impl AppConfig {
    /// Loads defaults, then `health.toml` if present, then `APP_` variables.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Path::new(DEFAULT_CONFIG_FILE);
        Self::load_from(path.exists().then_some(path))
    }

    /// Like [`AppConfig::load`], with an explicit configuration file.
    ///
    /// Environment variables use `__` between levels, so
    /// `APP_SERVER__PORT=8080` sets `server.port`.
    pub fn load_from(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

        if let Some(file) = file {
            builder = builder.add_source(File::from(file));
        }

        builder = builder.add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        app_config.validate()?;

        Ok(app_config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("Server port cannot be 0".to_string()));
        }

        let mut names = HashSet::new();
        for subsystem in &self.subsystems {
            if subsystem.name.trim().is_empty() {
                return Err(ConfigError::Message(
                    "Subsystem name cannot be empty".to_string(),
                ));
            }
            if !names.insert(subsystem.name.as_str()) {
                return Err(ConfigError::Message(format!(
                    "Subsystem [{}] is declared more than once",
                    subsystem.name
                )));
            }
        }

        if self.monitor.default_probe_interval_seconds == 0 {
            tracing::warn!(
                "Default probe interval is 0, using {}s",
                DEFAULT_PROBE_INTERVAL.as_secs()
            );
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Subsystem specs in declaration order.
    pub fn subsystem_specs(&self) -> Vec<SubsystemSpec> {
        self.subsystems.iter().map(SubsystemConfig::to_spec).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::io::Write;

    // Loading reads the process environment, so loads and env changes take turns.
    static ENV_LOCK: Mutex<()> = parking_lot::const_mutex(());

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.monitor.default_probe_interval(), DEFAULT_PROBE_INTERVAL);
        assert!(config.subsystems.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.subsystems.push(SubsystemConfig::new("  "));
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.subsystems.push(SubsystemConfig::new("database"));
        config.subsystems.push(SubsystemConfig::new("cache"));
        assert!(config.validate().is_ok());
        config.subsystems.push(SubsystemConfig::new("database"));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("[database]"));
    }

    #[test]
    fn test_bind_address() {
        let config = AppConfig::default();
        assert_eq!(config.bind_address(), "127.0.0.1:3000");

        let mut config = AppConfig::default();
        config.server.host = "0.0.0.0".to_string();
        config.server.port = 8080;
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_subsystem_specs() {
        let mut cache = SubsystemConfig::new("cache");
        cache.non_critical = true;
        cache.status = StatusLevel::Warn;
        cache.metadata.insert("region".to_string(), serde_json::json!("eu-west-1"));

        let mut uploads = SubsystemConfig::new("uploads");
        uploads.paths.push(PathBuf::from("/var/lib/uploads"));
        uploads.probe_interval_seconds = 30;

        let config = AppConfig {
            subsystems: vec![SubsystemConfig::new("database"), cache, uploads],
            ..AppConfig::default()
        };

        let specs = config.subsystem_specs();
        assert_eq!(specs.len(), 3);

        assert_eq!(specs[0].name, "database");
        assert!(!specs[0].non_critical);
        assert!(specs[0].probe.is_none());

        assert!(specs[1].non_critical);
        assert_eq!(specs[1].status, StatusLevel::Warn);
        assert_eq!(
            specs[1].metadata.get("region"),
            Some(&serde_json::json!("eu-west-1"))
        );

        assert!(specs[2].probe.is_some());
        assert_eq!(specs[2].probe_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("health.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[server]
host = "0.0.0.0"

[[subsystems]]
name = "database"

[[subsystems]]
name = "cache"
status = "warn"
non_critical = true
paths = ["/tmp"]

[subsystems.metadata]
region = "eu-west-1"
"#
        )
        .unwrap();

        let config = {
            let _env = ENV_LOCK.lock();
            AppConfig::load_from(Some(&path)).expect("Should load configuration file")
        };

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.monitor.default_probe_interval(), DEFAULT_PROBE_INTERVAL);
        assert_eq!(config.subsystems.len(), 2);
        assert_eq!(config.subsystems[0].name, "database");
        assert_eq!(config.subsystems[0].status, StatusLevel::Good);
        assert_eq!(config.subsystems[1].status, StatusLevel::Warn);
        assert!(config.subsystems[1].non_critical);
        assert_eq!(config.subsystems[1].paths, vec![PathBuf::from("/tmp")]);
        assert_eq!(
            config.subsystems[1].metadata["region"],
            serde_json::json!("eu-west-1")
        );
    }

    #[test]
    fn test_load_rejects_duplicate_subsystems() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("health.toml");
        std::fs::write(
            &path,
            "[[subsystems]]\nname = \"db\"\n\n[[subsystems]]\nname = \"db\"\n",
        )
        .unwrap();

        let _env = ENV_LOCK.lock();
        assert!(AppConfig::load_from(Some(&path)).is_err());
    }

    #[test]
    fn test_environment_variable_support() {
        let _env = ENV_LOCK.lock();
        std::env::set_var("APP_MONITOR__DEFAULT_PROBE_INTERVAL_SECONDS", "45");
        let config = AppConfig::load_from(None);
        std::env::remove_var("APP_MONITOR__DEFAULT_PROBE_INTERVAL_SECONDS");

        let config = config.expect("Should load configuration");
        assert_eq!(config.monitor.default_probe_interval(), Duration::from_secs(45));
        assert!(config.validate().is_ok());
    }
}
