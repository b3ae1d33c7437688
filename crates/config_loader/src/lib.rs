//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse properties/TOML/JSON configuration files
//! - Validate configuration legality
//! - Produce immutable `Settings`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let settings = ConfigLoader::load_from_path(Path::new("bridge.properties")).unwrap();
//! println!("Topic: {}", settings.topic());
//! ```

mod parser;
mod validator;

pub use contracts::Settings;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;
use tracing::debug;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Detects format from the file extension (.properties / .toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure (a missing credential is an `Authentication` error)
    pub fn load_from_path(path: &Path) -> Result<Settings, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        let settings = Self::load_from_str(&content, format)?;
        debug!(
            path = %path.display(),
            format = ?format,
            keys = settings.len(),
            "Configuration loaded"
        );
        Ok(settings)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<Settings, ContractError> {
        Self::parse_and_validate(content, format)
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(content: &str, format: ConfigFormat) -> Result<Settings, ContractError> {
        let settings = Settings::new(parser::parse(content, format)?);
        validator::validate(&settings)?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL_PROPERTIES: &str = r#"
consumer.key=ck
consumer.secret=cs
token=t
token.secret=ts
stream.host=127.0.0.1:7000
bootstrap.servers=localhost:9092
"#;

    #[test]
    fn test_load_from_str_properties() {
        let settings =
            ConfigLoader::load_from_str(MINIMAL_PROPERTIES, ConfigFormat::Properties).unwrap();
        assert_eq!(settings.topic(), "feed_raw");
        assert_eq!(settings.get("bootstrap.servers"), Some("localhost:9092"));
    }

    #[test]
    fn test_same_settings_from_toml() {
        let toml = r#"
token = "t"
"token.secret" = "ts"
bootstrap.servers = "localhost:9092"

[consumer]
key = "ck"
secret = "cs"

[stream]
host = "127.0.0.1:7000"
"#;
        let from_props =
            ConfigLoader::load_from_str(MINIMAL_PROPERTIES, ConfigFormat::Properties).unwrap();
        let from_toml = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap();
        assert_eq!(from_props, from_toml);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = "consumer.key=ck\nconsumer.secret=cs\ntoken=t\n";
        let err = ConfigLoader::load_from_str(content, ConfigFormat::Properties).unwrap_err();
        assert!(err.is_authentication());
        assert!(err.to_string().contains("token.secret"));
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::Builder::new()
            .suffix(".properties")
            .tempfile()
            .unwrap();
        write!(file, "{MINIMAL_PROPERTIES}topic=t1\nterms=a,b\n").unwrap();

        let settings = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(settings.topic(), "t1");
        assert_eq!(settings.filter_terms().terms(), &["a", "b"]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = ConfigLoader::load_from_path(Path::new("/nonexistent/bridge.properties"))
            .unwrap_err();
        assert!(matches!(err, ContractError::Io(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = ConfigLoader::load_from_path(Path::new("bridge.yaml")).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }
}
