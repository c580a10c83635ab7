use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Method};

use crate::address;
use crate::config::loader::ConfigError;
use crate::config::schema::Config;
use crate::extract;

/// One refill capability: produce the next batch of proxy addresses.
///
/// Sources communicate absence, not failure: a source that cannot produce
/// anything this cycle returns an empty batch.
#[async_trait]
pub trait ProxySource: Send + Sync {
    async fn refresh(&self) -> Vec<String>;
}

/// Fixed operator-supplied list; every refresh hands back the same batch.
pub struct StaticSource {
    addresses: Vec<String>,
}

impl StaticSource {
    /// The batch is kept reversed so that pool pops (newest first) serve
    /// entries in the order the operator listed them.
    pub fn new(mut addresses: Vec<String>) -> Self {
        addresses.reverse();
        Self { addresses }
    }
}

#[async_trait]
impl ProxySource for StaticSource {
    async fn refresh(&self) -> Vec<String> {
        self.addresses.clone()
    }
}

/// Remote provider API, called afresh for every refill over one shared
/// client.
pub struct ProviderSource {
    client: Client,
    url: String,
    method: Method,
}

impl ProviderSource {
    pub fn new(url: String, method: Method) -> Self {
        Self {
            client: Client::new(),
            url,
            method,
        }
    }

    async fn fetch(&self) -> Result<Vec<String>> {
        let body = self
            .client
            .request(self.method.clone(), &self.url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(extract::addresses(&body))
    }
}

#[async_trait]
impl ProxySource for ProviderSource {
    /// Failures stop here: a refused connection, an error status or an
    /// unreadable body is just an empty batch for this cycle.
    async fn refresh(&self) -> Vec<String> {
        match self.fetch().await {
            Ok(batch) => batch,
            Err(err) => {
                tracing::warn!("Proxy provider fetch failed: {:#}", err);
                Vec::new()
            }
        }
    }
}

/// Picks the refill mode from config: a predefined list with at least one
/// valid entry wins and never expires; otherwise the provider URL template
/// must be present. Returns the source together with the effective TTL.
pub fn configure(cfg: &Config) -> Result<(Box<dyn ProxySource>, Duration), ConfigError> {
    let predefined = address::sanitize_list(&cfg.predefined_proxies, &cfg.proxy_type);
    if !predefined.is_empty() {
        tracing::info!("Static proxy list mode: {} entries", predefined.len());
        // Expiring a fixed list only resets the rotation position, so the
        // validity period is ignored in this mode.
        return Ok((Box::new(StaticSource::new(predefined)), Duration::ZERO));
    }

    if cfg.url_template.is_empty() {
        return Err(ConfigError::NoProxySource);
    }

    let url = fill_template(&cfg.url_template, &[&cfg.proxy_type, &cfg.exclude_countries]);
    let method: Method = cfg.method.to_uppercase().parse().unwrap_or_else(|_| {
        tracing::warn!("Unsupported provider method {:?}, falling back to GET", cfg.method);
        Method::GET
    });
    tracing::info!("Provider API mode: {} {}", method, url);

    let ttl = Duration::from_secs(cfg.valid_period_minutes * 60);
    Ok((Box::new(ProviderSource::new(url, method)), ttl))
}

/// Positional `%s` substitution for the provider URL template. Arguments
/// beyond the available placeholders are dropped; placeholders beyond the
/// available arguments stay literal.
fn fill_template(template: &str, args: &[&str]) -> String {
    let mut filled = String::with_capacity(template.len());
    let mut rest = template;
    for arg in args {
        match rest.find("%s") {
            Some(at) => {
                filled.push_str(&rest[..at]);
                filled.push_str(arg);
                rest = &rest[at + 2..];
            }
            None => break,
        }
    }
    filled.push_str(rest);
    filled
}
