use std::fs;
use std::path::Path;

use thiserror::Error;
use validator::Validate;

use crate::config::schema::Config;

/// Anything that keeps the process from starting to serve.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Unparseable { path: String, message: String },

    #[error("unsupported config file extension: {0}")]
    UnsupportedExtension(String),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),

    #[error("no proxy source configured: set predefined_proxies or url_template")]
    NoProxySource,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads and validates a config file, picking the parser by extension.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.display().to_string(),
            source,
        })?;

        let config = Self::parse(path, &content)?;
        config.validate()?;
        Ok(config)
    }

    fn parse(path: &Path, content: &str) -> Result<Config, ConfigError> {
        let unparseable = |message: String| ConfigError::Unparseable {
            path: path.display().to_string(),
            message,
        };

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(content).map_err(|e| unparseable(e.to_string())),
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(content).map_err(|e| unparseable(e.to_string()))
            }
            Some("toml") => toml::from_str(content).map_err(|e| unparseable(e.to_string())),
            _ => Err(ConfigError::UnsupportedExtension(path.display().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_toml_and_fills_defaults() {
        let file = write_config(".toml", r#"url_template = "http://provider/api?type=%s""#);
        let cfg = ConfigLoader::load(file.path()).unwrap();

        assert_eq!(cfg.url_template, "http://provider/api?type=%s");
        assert_eq!(cfg.listen_addr, "127.0.0.1:8080");
        assert_eq!(cfg.proxy_type, "socks5");
        assert_eq!(cfg.method, "GET");
        assert_eq!(cfg.valid_period_minutes, 0);
        assert!(cfg.predefined_proxies.is_empty());
        assert!(cfg.exclude_countries.is_empty());
    }

    #[test]
    fn loads_yaml_by_extension() {
        let file = write_config(".yml", "listen_addr: \"0.0.0.0:9000\"\ntype: https\n");
        let cfg = ConfigLoader::load(file.path()).unwrap();

        assert_eq!(cfg.listen_addr, "0.0.0.0:9000");
        assert_eq!(cfg.proxy_type, "https");
    }

    #[test]
    fn loads_json_by_extension() {
        let file = write_config(".json", r#"{"predefined_proxies": ["socks5://10.0.0.1:1080"]}"#);
        let cfg = ConfigLoader::load(file.path()).unwrap();

        assert_eq!(cfg.predefined_proxies, vec!["socks5://10.0.0.1:1080".to_string()]);
    }

    #[test]
    fn rejects_unknown_extension() {
        let file = write_config(".ini", "listen_addr = \"127.0.0.1:8080\"");
        assert!(matches!(
            ConfigLoader::load(file.path()),
            Err(ConfigError::UnsupportedExtension(_))
        ));
    }

    #[test]
    fn rejects_malformed_file() {
        let file = write_config(".toml", "listen_addr = [not toml");
        assert!(matches!(
            ConfigLoader::load(file.path()),
            Err(ConfigError::Unparseable { .. })
        ));
    }

    #[test]
    fn rejects_unrecognized_proxy_type() {
        let file = write_config(".toml", r#"type = "ftp""#);
        assert!(matches!(
            ConfigLoader::load(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }
}
