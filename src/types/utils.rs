//! Small shared helpers

use std::fmt::Display;

/// Convert a `Result` into an `Option`, logging the error at debug level.
///
/// Use where a failure only means "skip this item", e.g. a manifest that
/// cannot be parsed while other manifests still can.
pub fn log_filter_error<T, E: Display>(result: Result<T, E>, context: &str) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::debug!("{}: {}", context, e);
            None
        }
    }
}

/// Like log_filter_error but logs at warn level for more important operations.
pub fn log_filter_warn<T, E: Display>(result: Result<T, E>, context: &str) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("{}: {}", context, e);
            None
        }
    }
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Truncate to at most `max_chars` characters, appending `...` when cut
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_error() {
        let ok: Result<u8, String> = Ok(1);
        let err: Result<u8, String> = Err("bad".to_string());
        assert_eq!(log_filter_error(ok, "ctx"), Some(1));
        assert_eq!(log_filter_warn(err, "ctx"), None);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.666_666, 2), 0.67);
        assert_eq!(round_to(0.125, 1), 0.1);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        let cut = truncate_chars("abcdefghijklmnop", 8);
        assert_eq!(cut, "abcde...");
        assert_eq!(cut.chars().count(), 8);
    }
}
