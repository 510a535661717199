//! Path normalization and prefix matching
//!
//! Directory-style routes are always slash-terminated; asset paths keep
//! whatever extension they carry.

/// Paths under this prefix go to the static file handler
pub const STATIC_PREFIX: &str = "/static/";

/// Append a trailing `/` to a path that has neither one nor a `.`
pub fn normalize_path(path: &str) -> String {
    if path.ends_with('/') || path.contains('.') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

/// Check if a normalized path falls under the static prefix
pub fn is_static_path(normalized: &str) -> bool {
    normalized.starts_with(STATIC_PREFIX)
}
