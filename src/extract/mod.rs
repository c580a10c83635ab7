use serde_json::{Map, Value};

/// Wrapper objects nested deeper than this contribute nothing.
const MAX_DEPTH: usize = 16;

/// Recovers `host:port` strings from a provider response of unknown shape.
///
/// The body is first read as a JSON object and searched recursively for
/// `ip`/`port` key pairs, wherever the provider chose to nest them. Anything
/// that is not a JSON object (plain text lists, top-level arrays, scalars) is
/// split on commas and newlines instead. Nothing here fails: a response with
/// no recognizable pair simply yields an empty batch.
pub fn addresses(body: &[u8]) -> Vec<String> {
    match serde_json::from_slice::<Map<String, Value>>(body) {
        Ok(object) => dig_object(&object, 0),
        Err(_) => split_plain_text(body),
    }
}

fn dig_object(object: &Map<String, Value>, depth: usize) -> Vec<String> {
    if depth >= MAX_DEPTH {
        return Vec::new();
    }

    let mut found = Vec::new();
    let mut host: Option<String> = None;
    let mut port: Option<String> = None;

    for (key, value) in object {
        match key.as_str() {
            "ip" => {
                if let Value::String(s) = value {
                    host = Some(s.clone());
                }
            }
            "port" => match value {
                Value::String(s) => port = Some(s.clone()),
                Value::Number(n) => port = Some(n.to_string()),
                _ => {}
            },
            _ => match value {
                Value::Object(inner) => found.extend(dig_object(inner, depth + 1)),
                // A list is only followed while no pair is half-captured, and
                // only through its first element. Records hiding in later
                // elements are a known blind spot.
                Value::Array(items) if host.is_none() && port.is_none() => {
                    if let Some(Value::Object(first)) = items.first() {
                        found.extend(dig_object(first, depth + 1));
                    }
                }
                _ => {}
            },
        }

        if let (Some(h), Some(p)) = (&host, &port) {
            found.push(format!("{}:{}", h, p));
            host = None;
            port = None;
        }
    }

    found
}

fn split_plain_text(body: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(body)
        .trim()
        .replace(',', "\n")
        .lines()
        .map(str::trim)
        .filter(|record| !record.is_empty())
        .map(str::to_string)
        .collect()
}
