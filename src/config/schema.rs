//! Configuration schema definitions.
//!
//! Two typed sections drive the framework itself (`[server]`,
//! `[observability]`). Every other top-level table is kept verbatim as a
//! free-form section and handed to providers read-only.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A free-form configuration section: key → scalar value.
pub type Section = BTreeMap<String, toml::Value>;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Transport and application settings.
    pub server: ServerConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,

    /// Application sections (e.g. `[database]`, `[templates]`).
    #[serde(flatten)]
    pub sections: BTreeMap<String, Section>,
}

impl AppConfig {
    /// Value of `key` in `section`, rendered as a string.
    ///
    /// Arrays and tables have no scalar form and return `None`.
    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        match self.get_value(section, key)? {
            toml::Value::String(s) => Some(s.clone()),
            toml::Value::Integer(i) => Some(i.to_string()),
            toml::Value::Float(f) => Some(f.to_string()),
            toml::Value::Boolean(b) => Some(b.to_string()),
            toml::Value::Datetime(d) => Some(d.to_string()),
            toml::Value::Array(_) | toml::Value::Table(_) => None,
        }
    }

    pub fn get_value(&self, section: &str, key: &str) -> Option<&toml::Value> {
        self.sections.get(section)?.get(key)
    }

    pub fn section(&self, section: &str) -> Option<&Section> {
        self.sections.get(section)
    }
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8001").
    pub bind_address: String,

    /// Application root; static assets live in `<root>/static`.
    pub root: String,

    /// Show error detail on 500 pages.
    pub debug: bool,

    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,

    /// Transport-level request timeout in seconds (0 disables it).
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8001".to_string(),
            root: ".".to_string(),
            debug: false,
            max_body_bytes: 2 * 1024 * 1024, // 2MB
            request_timeout_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json: bool,

    /// Emit one access log line per request.
    pub access_log: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
            access_log: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_and_typed_tables() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            bind_address = "0.0.0.0:9000"
            debug = true

            [database]
            host = "db.internal"
            port = 3306
            pooled = true
            replicas = ["a", "b"]

            [templates]
            path = "templates"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind_address, "0.0.0.0:9000");
        assert!(config.server.debug);
        assert_eq!(config.server.root, ".");
        assert_eq!(config.observability.log_level, "info");

        assert_eq!(config.get("database", "host").as_deref(), Some("db.internal"));
        assert_eq!(config.get("database", "port").as_deref(), Some("3306"));
        assert_eq!(config.get("database", "pooled").as_deref(), Some("true"));
        assert_eq!(config.get("database", "replicas"), None);
        assert!(config.get_value("database", "replicas").is_some());
        assert_eq!(config.get("templates", "path").as_deref(), Some("templates"));
        assert_eq!(config.get("missing", "path"), None);
        assert!(!config.sections.contains_key("server"));
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:8001");
        assert!(config.observability.access_log);
        assert!(config.sections.is_empty());
    }
}
