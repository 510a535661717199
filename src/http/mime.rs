//! MIME type detection module
//!
//! Returns the corresponding Content-Type based on file extension.

/// Fallback for unrecognized extensions
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Get MIME Content-Type based on file extension
///
/// # Examples
/// ```
/// use gateway_pages::http::mime::get_content_type;
/// assert_eq!(get_content_type(Some("html")), "text/html");
/// assert_eq!(get_content_type(Some("jpeg")), "image/jpeg");
/// assert_eq!(get_content_type(None), "application/octet-stream");
/// ```
pub fn get_content_type(extension: Option<&str>) -> &'static str {
    match extension {
        Some("html" | "htm") => "text/html",
        Some("txt") => "text/plain",
        Some("css") => "text/css",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// Extension implied by a request path.
///
/// Directory-style paths (trailing slash, or no `.` at all) are pages and
/// count as `html`; otherwise the text after the last `.` of the final
/// segment.
pub fn extension_for_path(path: &str) -> Option<&str> {
    if path.ends_with('/') || !path.contains('.') {
        return Some("html");
    }
    let last_segment = path.rsplit('/').next().unwrap_or(path);
    last_segment.rsplit_once('.').map(|(_, ext)| ext)
}

/// Content-Type for a request path
pub fn content_type_for_path(path: &str) -> &'static str {
    get_content_type(extension_for_path(path))
}
