use anyhow::{Context, Result};
use url::Url;

/// Schemes an address may carry without being rewritten.
const RECOGNIZED_SCHEMES: [&str; 3] = ["socks5://", "https://", "http://"];

const DEFAULT_SCHEME: &str = "socks5";

/// Normalizes a proxy address to `scheme://host:port` form.
///
/// Surrounding whitespace is trimmed and `fallback_scheme` is prepended when
/// the address carries none of the recognized schemes. The result is parsed
/// as a URL purely to reject garbage; the returned string is the prefixed
/// input itself, so `4.4.4.4:1080` becomes `http://4.4.4.4:1080` and an
/// already-prefixed address comes back unchanged.
pub fn normalize(addr: &str, fallback_scheme: &str) -> Result<String> {
    let trimmed = addr.trim();
    if trimmed.is_empty() {
        anyhow::bail!("empty proxy address");
    }

    let candidate = if has_recognized_scheme(trimmed) {
        trimmed.to_string()
    } else {
        let scheme = if fallback_scheme.is_empty() {
            DEFAULT_SCHEME
        } else {
            fallback_scheme
        };
        format!("{}://{}", scheme, trimmed)
    };

    Url::parse(&candidate)
        .with_context(|| format!("invalid proxy address: {:?}", candidate))?;
    Ok(candidate)
}

fn has_recognized_scheme(addr: &str) -> bool {
    RECOGNIZED_SCHEMES
        .iter()
        .any(|scheme| addr.starts_with(scheme))
}

/// Normalizes every entry of a configured proxy list, dropping the ones that
/// do not survive [`normalize`]. Used once at startup on the predefined list.
pub fn sanitize_list(addrs: &[String], fallback_scheme: &str) -> Vec<String> {
    addrs
        .iter()
        .filter_map(|addr| match normalize(addr, fallback_scheme) {
            Ok(normalized) => Some(normalized),
            Err(err) => {
                tracing::warn!("Dropping malformed proxy address {:?}: {:#}", addr, err);
                None
            }
        })
        .collect()
}
