//! Runtime configuration.
//!
//! Options are loaded from a YAML file (path from the `CONFIG_PATH`
//! environment variable or the default location). Keys the core does not
//! consume directly (browser credentials, crash-reporter DSNs) are parsed
//! and carried for the external collaborators that do.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_SITE: &str = "https://www.pinnacle.com";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    pub kafka_address: String,
    pub kafka_port: String,
    pub kafka_topic: String,
    pub db_connection: String,
    pub login: String,
    pub password: String,
    pub site: String,
    pub cookie_dir: String,
    pub user_agent: String,
    pub log_path: String,
    pub test_mode: bool,
    #[serde(rename = "remoteChromeURL")]
    pub remote_chrome_url: String,
    pub producer_sentry: String,
    pub consumer_sentry: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            kafka_address: "localhost".into(),
            kafka_port: "9092".into(),
            kafka_topic: String::new(),
            db_connection: String::new(),
            login: String::new(),
            password: String::new(),
            site: DEFAULT_SITE.into(),
            cookie_dir: String::new(),
            user_agent: DEFAULT_USER_AGENT.into(),
            log_path: String::new(),
            test_mode: false,
            remote_chrome_url: String::new(),
            producer_sentry: String::new(),
            consumer_sentry: String::new(),
        }
    }
}

impl Options {
    /// Load configuration from a YAML file.
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let yaml_content = std::fs::read_to_string(config_path)?;
        Self::from_yaml(&yaml_content)
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml(yaml_content: &str) -> Result<Self> {
        let config: Options = serde_yaml::from_str(yaml_content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.kafka_topic.is_empty() {
            return Err(ConfigError::ValidationError(
                "kafkaTopic must be set".to_string(),
            ));
        }
        if self.kafka_address.is_empty() || self.kafka_port.is_empty() {
            return Err(ConfigError::ValidationError(
                "kafkaAddress and kafkaPort must be set".to_string(),
            ));
        }
        Ok(())
    }

    /// Broker bootstrap endpoint.
    pub fn kafka_endpoint(&self) -> String {
        format!("{}:{}", self.kafka_address, self.kafka_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_spec_keys_and_fills_defaults() {
        let yaml = r#"
kafkaTopic: odds
dbConnection: postgres://localhost/odds
testMode: true
remoteChromeURL: http://chrome:9222
"#;
        let opts = Options::from_yaml(yaml).unwrap();
        assert_eq!(opts.kafka_topic, "odds");
        assert_eq!(opts.kafka_endpoint(), "localhost:9092");
        assert_eq!(opts.site, DEFAULT_SITE);
        assert!(opts.test_mode);
        assert_eq!(opts.remote_chrome_url, "http://chrome:9222");
    }

    #[test]
    fn missing_topic_fails_validation() {
        let err = Options::from_yaml("dbConnection: x").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let opts = Options::from_yaml("kafkaTopic: odds\nsomethingElse: 1").unwrap();
        assert_eq!(opts.kafka_topic, "odds");
    }
}
