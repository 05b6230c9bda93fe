/// Configuration management for proxysql-sync
use crate::core::RoutingGroup;
use crate::topology::{CardinalityPolicy, DiscoveryScope};
pub use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Environment variable carrying the pod namespace
pub const NAMESPACE_ENV: &str = "NAMESPACE";
/// Environment variable carrying the service group name
pub const SERVICE_GROUP_NAME_ENV: &str = "SERVICE_GROUP_NAME";
/// Environment variable carrying this pod's IP, used as management address
pub const INTERNAL_IP_ENV: &str = "INTERNAL_IP";

/// Main proxysql-sync configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Proxy admin interface
    pub admin: EndpointConfig,
    /// Pod discovery and hostgroup layout
    pub topology: TopologyConfig,
    /// Upstream account catalog
    pub accounts: AccountsConfig,
    /// Pass-level settings
    pub sync: SyncConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// A MySQL-protocol endpoint with credentials
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6032,
            username: "admin".to_string(),
            password: String::new(),
        }
    }
}

/// Backend server type; only MySQL is supported by the proxy tables used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServerType {
    #[default]
    Mysql,
}

impl ServerType {
    /// Workload type label value and database container name
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerType::Mysql => "mysql",
        }
    }
}

/// Pod discovery and hostgroup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Namespace the database pods live in
    pub namespace: String,
    /// Service group name, also used as the hostgroup comment
    pub group_name: String,
    pub server_type: ServerType,
    pub group_label_key: String,
    pub type_label_key: String,
    /// Read-only discriminator label; unset means every endpoint is a writer
    pub role_label_key: Option<String>,
    pub cardinality: CardinalityPolicy,
    pub writer_hostgroup: u32,
    pub reader_hostgroup: u32,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            group_name: String::new(),
            server_type: ServerType::Mysql,
            group_label_key: "dbscale.service.group".to_string(),
            type_label_key: "dbscale.service.image.name".to_string(),
            role_label_key: Some("dbscale.service.read-only".to_string()),
            cardinality: CardinalityPolicy::SingleWriter,
            writer_hostgroup: 10,
            reader_hostgroup: 20,
        }
    }
}

impl TopologyConfig {
    pub fn scope(&self) -> DiscoveryScope {
        DiscoveryScope {
            namespace: self.namespace.clone(),
            group_label_key: self.group_label_key.clone(),
            group_name: self.group_name.clone(),
            type_label_key: self.type_label_key.clone(),
            workload_type: self.server_type.as_str().to_string(),
            role_label_key: self.role_label_key.clone(),
            policy: self.cardinality,
        }
    }

    pub fn routing_group(&self) -> RoutingGroup {
        RoutingGroup::new(
            self.writer_hostgroup,
            self.reader_hostgroup,
            self.group_name.clone(),
        )
    }
}

/// Upstream account catalog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountsConfig {
    /// Only accounts granted to this host are mirrored
    pub management_address: String,
    pub default_hostgroup: u32,
    pub max_connections: u32,
    /// Upstream database holding the user catalog
    pub upstream: EndpointConfig,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            management_address: String::new(),
            default_hostgroup: 10,
            max_connections: 1024,
            upstream: EndpointConfig {
                host: "127.0.0.1".to_string(),
                port: 6033,
                username: "check".to_string(),
                password: String::new(),
            },
        }
    }
}

/// Pass-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Upper bound on a whole pass, in seconds
    pub deadline_sec: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { deadline_sec: 10 }
    }
}

impl SyncConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_sec)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (json, text)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Apply deployment-injected environment values.
    ///
    /// `lookup` is `std::env::var` in production; tests pass a map.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(namespace) = lookup(NAMESPACE_ENV).filter(|v| !v.is_empty()) {
            self.topology.namespace = namespace;
        }
        if let Some(group) = lookup(SERVICE_GROUP_NAME_ENV).filter(|v| !v.is_empty()) {
            self.topology.group_name = group;
        }
        if let Some(ip) = lookup(INTERNAL_IP_ENV).filter(|v| !v.is_empty()) {
            self.accounts.management_address = ip;
        }
    }

    /// Validate settings common to every command
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.deadline_sec == 0 {
            return Err(ConfigError::ValidationError(
                "deadline_sec must be greater than 0".to_string(),
            ));
        }

        let topology = &self.topology;
        if topology.writer_hostgroup == topology.reader_hostgroup {
            return Err(ConfigError::ValidationError(format!(
                "writer_hostgroup and reader_hostgroup must differ, both are {}",
                topology.writer_hostgroup
            )));
        }

        if topology.group_label_key.is_empty() || topology.type_label_key.is_empty() {
            return Err(ConfigError::ValidationError(
                "label keys cannot be empty".to_string(),
            ));
        }

        if self.accounts.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "max_connections must be greater than 0".to_string(),
            ));
        }

        match self.logging.level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {}",
                    self.logging.level
                )))
            }
        }

        match self.logging.format.as_str() {
            "json" | "text" => {}
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {}",
                    self.logging.format
                )))
            }
        }

        Ok(())
    }

    /// Validate what a server sync needs on top of `validate`
    pub fn validate_for_servers(&self) -> Result<(), ConfigError> {
        self.validate()?;

        if self.topology.namespace.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "namespace is not set (config or {} environment variable)",
                NAMESPACE_ENV
            )));
        }

        if self.topology.group_name.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "group_name is not set (config or {} environment variable)",
                SERVICE_GROUP_NAME_ENV
            )));
        }

        Ok(())
    }

    /// Validate what a user sync needs on top of `validate`
    pub fn validate_for_users(&self) -> Result<(), ConfigError> {
        self.validate()?;

        if self.accounts.management_address.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "management_address is not set (config or {} environment variable)",
                INTERNAL_IP_ENV
            )));
        }

        Ok(())
    }

    /// Create example configuration file
    pub fn create_example_config<P: AsRef<Path>>(path: P) -> Result<(), ConfigError> {
        let config = Config {
            topology: TopologyConfig {
                namespace: "databases".to_string(),
                group_name: "orders".to_string(),
                ..Default::default()
            },
            accounts: AccountsConfig {
                management_address: "10.1.1.5".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        config.save_to_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.admin.port, 6032);
        assert_eq!(config.accounts.upstream.port, 6033);
        assert_eq!(config.sync.deadline(), Duration::from_secs(10));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.topology.reader_hostgroup = config.topology.writer_hostgroup;
        assert!(config.validate().is_err());

        config.topology.reader_hostgroup = 20;
        config.sync.deadline_sec = 0;
        assert!(config.validate().is_err());

        config.sync.deadline_sec = 10;
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "debug".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_command_specific_validation() {
        let mut config = Config::default();
        assert!(config.validate_for_servers().is_err());
        assert!(config.validate_for_users().is_err());

        config.topology.namespace = "databases".to_string();
        config.topology.group_name = "orders".to_string();
        assert!(config.validate_for_servers().is_ok());

        config.accounts.management_address = "10.1.1.5".to_string();
        assert!(config.validate_for_users().is_ok());
    }

    #[test]
    fn test_apply_env_overrides() {
        let env: HashMap<&str, &str> = [
            (NAMESPACE_ENV, "databases"),
            (SERVICE_GROUP_NAME_ENV, "orders"),
            (INTERNAL_IP_ENV, ""),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.accounts.management_address = "10.9.9.9".to_string();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.topology.namespace, "databases");
        assert_eq!(config.topology.group_name, "orders");
        // empty values do not clobber configured ones
        assert_eq!(config.accounts.management_address, "10.9.9.9");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [topology]
            namespace = "databases"
            group_name = "orders"
            cardinality = "any"
            "#,
        )
        .unwrap();

        assert_eq!(config.topology.cardinality, CardinalityPolicy::Any);
        assert_eq!(config.topology.writer_hostgroup, 10);
        assert_eq!(config.admin.username, "admin");
        assert!(config.validate_for_servers().is_ok());
    }

    #[test]
    fn test_unsupported_server_type_rejected() {
        let result: Result<Config, _> = toml::from_str(
            r#"
            [topology]
            server_type = "postgres"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_masks_password() {
        let mut config = Config::default();
        config.admin.password = "hunter2".to_string();
        assert!(!format!("{:?}", config).contains("hunter2"));
    }

    #[test]
    fn test_config_file_operations() {
        let temp_file = NamedTempFile::new().unwrap();

        Config::create_example_config(temp_file.path()).unwrap();
        let loaded_config = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(loaded_config.topology.group_name, "orders");
        assert!(loaded_config.validate_for_servers().is_ok());
        assert!(loaded_config.validate_for_users().is_ok());
    }
}
