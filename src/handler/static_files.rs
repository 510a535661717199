//! Static file serving module
//!
//! Maps `/static/<rel>` onto `<static_dir>/<rel>` with index file support and
//! MIME type detection. Anything that cannot be served is `ResourceMissing`.

use crate::error::AppError;
use crate::handler::Handler;
use crate::http::response::CONTENT_TYPE;
use crate::http::{mime, Request, Response};
use crate::routing::{normalize_path, STATIC_PREFIX};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub struct StaticFiles {
    root: PathBuf,
    index_files: Vec<String>,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>, index_files: Vec<String>) -> Self {
        Self {
            root: root.into(),
            index_files,
        }
    }

    /// Load a file relative to the static root
    pub fn load(&self, relative_path: &str) -> Result<(Vec<u8>, &'static str), AppError> {
        let missing = || AppError::ResourceMissing(format!("{STATIC_PREFIX}{relative_path}"));

        // Traversal is caught by the canonical root check below
        let clean_path = relative_path.trim_start_matches('/');
        let mut file_path = self.root.join(clean_path);

        let root_canonical = self.root.canonicalize().map_err(|e| {
            tracing::warn!(
                root = %self.root.display(),
                error = %e,
                "Static directory not found or inaccessible"
            );
            missing()
        })?;

        // Check if path is a directory, try index files
        if clean_path.is_empty() || clean_path.ends_with('/') || file_path.is_dir() {
            file_path = self
                .find_index(&file_path)
                .ok_or_else(missing)?;
        }

        // File not found is common (404), no need to log at warning level
        let file_canonical = file_path.canonicalize().map_err(|_| missing())?;
        if !file_canonical.starts_with(&root_canonical) {
            tracing::warn!(
                path = relative_path,
                resolved = %file_canonical.display(),
                "Path traversal attempt blocked"
            );
            return Err(missing());
        }

        let content = fs::read(&file_canonical).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => missing(),
            _ => AppError::HandlerFailure(format!(
                "Failed to read file '{}': {e}",
                file_canonical.display()
            )),
        })?;

        let content_type = mime::get_content_type(file_path.extension().and_then(|e| e.to_str()));
        Ok((content, content_type))
    }

    fn find_index(&self, dir: &Path) -> Option<PathBuf> {
        self.index_files
            .iter()
            .map(|index_file| dir.join(index_file))
            .find(|candidate| candidate.is_file())
    }
}

impl Handler for StaticFiles {
    fn get_response(&self, request: &Request) -> Result<Response, AppError> {
        let normalized = normalize_path(request.path());
        let relative = normalized.strip_prefix(STATIC_PREFIX).unwrap_or(&normalized);
        let (content, content_type) = self.load(relative)?;
        Ok(Response::ok(content).with_header(CONTENT_TYPE, content_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::test_environ;
    use tempfile::TempDir;

    fn site() -> (TempDir, StaticFiles) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("static");
        fs::create_dir_all(root.join("css")).unwrap();
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::write(root.join("css/site.css"), "body {}").unwrap();
        fs::write(root.join("logo.png"), [0x89, b'P', b'N', b'G']).unwrap();
        fs::write(root.join("data.bin"), [0u8, 1, 2]).unwrap();
        fs::write(root.join("docs/index.html"), "<h1>docs</h1>").unwrap();
        fs::write(dir.path().join("secret.txt"), "top secret").unwrap();
        let files = StaticFiles::new(root, vec!["index.html".to_string()]);
        (dir, files)
    }

    fn get(files: &StaticFiles, path: &str) -> Result<Response, AppError> {
        let req = Request::from_environ(&mut test_environ("GET", path)).unwrap();
        files.get_response(&req)
    }

    #[test]
    fn test_serves_file_with_mime() {
        let (_dir, files) = site();
        let resp = get(&files, "/static/css/site.css").unwrap();
        assert_eq!(resp.body.as_ref(), b"body {}");
        assert_eq!(resp.header(CONTENT_TYPE), Some("text/css"));

        let resp = get(&files, "/static/logo.png").unwrap();
        assert_eq!(resp.header(CONTENT_TYPE), Some("image/png"));

        let resp = get(&files, "/static/data.bin").unwrap();
        assert_eq!(resp.header(CONTENT_TYPE), Some("application/octet-stream"));
    }

    #[test]
    fn test_directory_uses_index_file() {
        let (_dir, files) = site();
        let resp = get(&files, "/static/docs").unwrap();
        assert_eq!(resp.body.as_ref(), b"<h1>docs</h1>");
        assert_eq!(resp.header(CONTENT_TYPE), Some("text/html"));
    }

    #[test]
    fn test_directory_without_index_is_missing() {
        let (_dir, files) = site();
        assert!(matches!(
            get(&files, "/static/css/"),
            Err(AppError::ResourceMissing(_))
        ));
        assert!(matches!(
            get(&files, "/static/"),
            Err(AppError::ResourceMissing(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let (_dir, files) = site();
        assert!(matches!(
            get(&files, "/static/nope.css"),
            Err(AppError::ResourceMissing(p)) if p == "/static/nope.css"
        ));
    }

    #[test]
    fn test_traversal_blocked() {
        let (_dir, files) = site();
        assert!(matches!(
            files.load("../secret.txt"),
            Err(AppError::ResourceMissing(_))
        ));
    }

    #[test]
    fn test_double_dot_inside_file_name() {
        let (dir, files) = site();
        fs::write(dir.path().join("static/jquery..min.css"), "/* min */").unwrap();
        let resp = get(&files, "/static/jquery..min.css").unwrap();
        assert_eq!(resp.body.as_ref(), b"/* min */");
        assert_eq!(resp.header(CONTENT_TYPE), Some("text/css"));
    }

    #[test]
    fn test_traversal_through_subdirectory_blocked() {
        let (_dir, files) = site();
        assert!(matches!(
            get(&files, "/static/css/../../secret.txt"),
            Err(AppError::ResourceMissing(_))
        ));
    }

    #[test]
    fn test_missing_root() {
        let files = StaticFiles::new("/definitely/not/here", vec![]);
        assert!(matches!(
            files.load("a.css"),
            Err(AppError::ResourceMissing(_))
        ));
    }
}
