use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Proxy types the service knows how to hand out.
const PROXY_TYPES: [&str; 3] = ["socks5", "http", "https"];

/// Service configuration, deserialized from a TOML, YAML or JSON file.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Config {
    /// ip:port the feed listens on.
    #[serde(default = "default_listen_addr")]
    #[validate(length(min = 1))]
    pub listen_addr: String,

    /// Fixed proxy list in `scheme://ip:port` form. A non-empty list (after
    /// sanitization) switches the service to static mode and the provider
    /// settings below are ignored.
    #[serde(default)]
    pub predefined_proxies: Vec<String>,

    /// Proxy type to request from the provider; also the scheme prepended to
    /// addresses that arrive without one.
    #[serde(rename = "type", default = "default_proxy_type")]
    #[validate(custom(function = validate_proxy_type))]
    pub proxy_type: String,

    /// How long a fetched batch stays valid before it is rotated out.
    /// Zero refills only once the pool runs dry.
    #[serde(default)]
    pub valid_period_minutes: u64,

    /// Comma-separated ISO 3166-1 alpha-2 codes the provider should skip.
    #[serde(default)]
    pub exclude_countries: String,

    /// Provider API URL with up to two `%s` slots, filled with the proxy
    /// type and the country exclusions in that order.
    #[serde(default)]
    pub url_template: String,

    /// HTTP method for provider calls.
    #[serde(default = "default_method")]
    pub method: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            predefined_proxies: Vec::new(),
            proxy_type: default_proxy_type(),
            valid_period_minutes: 0,
            exclude_countries: String::new(),
            url_template: String::new(),
            method: default_method(),
        }
    }
}

fn validate_proxy_type(proxy_type: &str) -> Result<(), ValidationError> {
    if PROXY_TYPES.contains(&proxy_type) {
        Ok(())
    } else {
        Err(ValidationError::new("unrecognized_proxy_type"))
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_proxy_type() -> String {
    "socks5".to_string()
}

fn default_method() -> String {
    "GET".to_string()
}
