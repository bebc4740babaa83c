use std::env;

use tracing::warn;

const FALLBACK_LANGUAGE: &str = "en";

/// Locale tag taken from the POSIX locale variables, e.g. `zh_CN.UTF-8` becomes `zh-CN`.
pub fn system_language() -> String {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|var| env::var(var).ok())
        .find_map(|raw| language_tag_from_posix(&raw))
        .unwrap_or_else(|| FALLBACK_LANGUAGE.to_string())
}

/// IANA identifier of the zone the host is configured for.
pub fn local_timezone() -> String {
    match iana_time_zone::get_timezone() {
        Ok(zone) => zone,
        Err(err) => {
            warn!(error = %err, "local timezone unavailable, using UTC");
            "UTC".to_string()
        }
    }
}

fn language_tag_from_posix(raw: &str) -> Option<String> {
    let base = raw
        .split(['.', '@'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() || base == "C" || base == "POSIX" {
        return None;
    }
    Some(base.replace('_', "-"))
}
