//! Resolving server reload requests against the current location

use serde_json::Value;
use trellis_protocol::ReloadRequest;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Reload the current page as is
    Reload,
    /// Replace the current page with another location
    Replace(Url),
}

/// Work out where a `reload_page` request goes.
///
/// A missing location keeps the current origin and path; missing parameters
/// keep the current query string.
pub fn resolve_reload(current: &Url, request: &ReloadRequest) -> Result<Navigation, url::ParseError> {
    if request.is_plain_reload() {
        return Ok(Navigation::Reload);
    }

    let mut target = match &request.location {
        Some(location) => current.join(location)?,
        None => current.clone(),
    };
    target.set_fragment(None);

    match &request.get_params {
        None => target.set_query(current.query()),
        Some(params) => {
            target.set_query(None);
            if !params.is_empty() {
                let mut pairs = target.query_pairs_mut();
                for (key, value) in params {
                    match value {
                        Value::Array(items) => {
                            let key = format!("{key}[]");
                            for item in items {
                                pairs.append_pair(&key, &param_value(item));
                            }
                        }
                        other => {
                            pairs.append_pair(key, &param_value(other));
                        }
                    }
                }
            }
        }
    }

    Ok(Navigation::Replace(target))
}

fn param_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
