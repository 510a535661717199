//! Request dispatch module
//!
//! Normalizes the path, resolves it against the route table and invokes the
//! handler. This is the single error boundary: every failure after the
//! gateway is turned into a 404 or 500 response here and nowhere else.

use crate::error::AppError;
use crate::handler::Handler;
use crate::http::response::CONTENT_TYPE;
use crate::http::{date, mime, Request, Response};
use crate::routing::{normalize_path, RouteTable};
use hyper::body::Bytes;
use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

const NOT_FOUND_PAGE: &str = "404.html";
const SERVER_ERROR_PAGE: &str = "500.html";
const ERROR_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Fixed bodies for the two error responses, read once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPages {
    pub not_found: Bytes,
    pub server_error: Bytes,
}

impl ErrorPages {
    pub fn builtin() -> Self {
        Self {
            not_found: Bytes::from_static(b"<h1>404 Not Found</h1>"),
            server_error: Bytes::from_static(b"<h1>500 Internal Server Error</h1>"),
        }
    }

    /// Load `404.html` and `500.html` from the template directory, keeping
    /// the built-in body for any page that cannot be read
    pub fn load(template_dir: &Path) -> Self {
        let builtin = Self::builtin();
        Self {
            not_found: read_page(template_dir, NOT_FOUND_PAGE).unwrap_or(builtin.not_found),
            server_error: read_page(template_dir, SERVER_ERROR_PAGE)
                .unwrap_or(builtin.server_error),
        }
    }
}

fn read_page(dir: &Path, name: &str) -> Option<Bytes> {
    let path = dir.join(name);
    match fs::read(&path) {
        Ok(content) => Some(Bytes::from(content)),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Error page unavailable, using built-in body"
            );
            None
        }
    }
}

pub struct Dispatcher {
    routes: RouteTable,
    error_pages: ErrorPages,
    server_name: String,
}

impl Dispatcher {
    pub fn new(routes: RouteTable, error_pages: ErrorPages, server_name: impl Into<String>) -> Self {
        Self {
            routes,
            error_pages,
            server_name: server_name.into(),
        }
    }

    pub const fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Produce the response for a request. Never fails and never panics
    /// outward: routing misses and handler failures become error responses.
    pub fn create_response(&self, request: &Request) -> Response {
        let normalized = normalize_path(request.path());
        let result = self
            .routes
            .resolve(&normalized)
            .and_then(|handler| invoke(handler, request));

        match result {
            Ok(mut response) => {
                response.set_header_if_absent(CONTENT_TYPE, mime::content_type_for_path(request.path()));
                self.add_common_headers(response)
            }
            Err(err) => {
                log_failure(&err, request.path());
                self.error_response(&err)
            }
        }
    }

    /// Response for a failure raised before dispatch, e.g. while parsing the
    /// request out of the gateway environment
    pub fn failure_response(&self, err: &AppError) -> Response {
        log_failure(err, "-");
        self.error_response(err)
    }

    fn error_response(&self, err: &AppError) -> Response {
        let response = if err.is_not_found() {
            Response::not_found(self.error_pages.not_found.clone())
        } else {
            Response::server_error(self.error_pages.server_error.clone())
        };
        self.add_common_headers(response.with_header(CONTENT_TYPE, ERROR_CONTENT_TYPE))
    }

    fn add_common_headers(&self, mut response: Response) -> Response {
        response.set_header_if_absent("Date", date::now());
        response.set_header_if_absent("Server", self.server_name.as_str());
        response.set_header_if_absent("Connection", "close");
        response
    }
}

/// Run the handler, turning a panic into `HandlerFailure`
fn invoke(handler: &dyn Handler, request: &Request) -> Result<Response, AppError> {
    panic::catch_unwind(AssertUnwindSafe(|| handler.get_response(request)))
        .unwrap_or_else(|payload| Err(AppError::HandlerFailure(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("handler panicked: {message}")
    } else {
        "handler panicked".to_string()
    }
}

fn log_failure(err: &AppError, path: &str) {
    match err {
        AppError::RouteNotFound(_) | AppError::ResourceMissing(_) => {
            tracing::debug!(path, error = %err, "Not found");
        }
        AppError::MalformedInput { .. } | AppError::HandlerFailure(_) => {
            tracing::error!(path, error = ?err, "Request failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::test_environ;
    use tracing_test::traced_test;

    fn request(method: &str, path: &str) -> Request {
        Request::from_environ(&mut test_environ(method, path)).unwrap()
    }

    fn dispatcher() -> Dispatcher {
        let routes = RouteTable::builder(|_: &Request| -> Result<Response, AppError> {
            Ok(Response::ok("asset"))
        })
        .route("/", |_: &Request| -> Result<Response, AppError> {
            Ok(Response::ok("home"))
        })
        .route("/user", |req: &Request| -> Result<Response, AppError> {
            Ok(Response::ok(format!("user {}", req.path())))
        })
        .route("/fails", |_: &Request| -> Result<Response, AppError> {
            Err(AppError::HandlerFailure("database exploded".to_string()))
        })
        .route("/panics", |_: &Request| -> Result<Response, AppError> {
            panic!("secret internal detail")
        })
        .route("/missing", |_: &Request| -> Result<Response, AppError> {
            Err(AppError::ResourceMissing("missing.html".to_string()))
        })
        .route("/styled", |_: &Request| -> Result<Response, AppError> {
            Ok(Response::ok("body { }").with_header("Content-type", "text/css"))
        })
        .build();
        Dispatcher::new(routes, ErrorPages::builtin(), "TestServer")
    }

    #[test]
    fn test_dispatch_normalizes_path() {
        let resp = dispatcher().create_response(&request("GET", "/user"));
        assert_eq!(resp.status, "200 OK");
        assert_eq!(resp.body.as_ref(), b"user /user");
    }

    #[test]
    fn test_unregistered_path_is_not_found() {
        let resp = dispatcher().create_response(&request("GET", "/nope/"));
        assert_eq!(resp.status, "404 Not Found");
        assert_eq!(resp.body, ErrorPages::builtin().not_found);
        assert_eq!(resp.header(CONTENT_TYPE), Some(ERROR_CONTENT_TYPE));
    }

    #[test]
    fn test_dotted_path_not_routed_by_table() {
        let resp = dispatcher().create_response(&request("GET", "/style.css"));
        assert_eq!(resp.status, "404 Not Found");
    }

    #[test]
    fn test_static_prefix_dispatch() {
        let resp = dispatcher().create_response(&request("GET", "/static/logo.png"));
        assert_eq!(resp.body.as_ref(), b"asset");
        assert_eq!(resp.header(CONTENT_TYPE), Some("image/png"));
    }

    #[test]
    fn test_resource_missing_is_not_found() {
        let resp = dispatcher().create_response(&request("GET", "/missing/"));
        assert_eq!(resp.status, "404 Not Found");
    }

    #[traced_test]
    #[test]
    fn test_handler_failure_logged_not_leaked() {
        let resp = dispatcher().create_response(&request("GET", "/fails/"));
        assert_eq!(resp.status, "500 Internal Server Error");
        assert_eq!(resp.body, ErrorPages::builtin().server_error);
        assert!(!String::from_utf8_lossy(&resp.body).contains("database exploded"));
        assert!(logs_contain("database exploded"));
    }

    #[traced_test]
    #[test]
    fn test_panic_becomes_server_error() {
        let resp = dispatcher().create_response(&request("GET", "/panics"));
        assert_eq!(resp.status, "500 Internal Server Error");
        assert!(!String::from_utf8_lossy(&resp.body).contains("secret internal detail"));
        assert!(logs_contain("secret internal detail"));
    }

    #[test]
    fn test_common_headers() {
        let resp = dispatcher().create_response(&request("GET", "/"));
        assert_eq!(resp.header(CONTENT_TYPE), Some("text/html"));
        assert_eq!(resp.header("Server"), Some("TestServer"));
        assert_eq!(resp.header("Connection"), Some("close"));
        assert!(resp.header("Date").is_some_and(|d| d.ends_with("GMT")));
    }

    #[test]
    fn test_handler_content_type_kept() {
        let resp = dispatcher().create_response(&request("GET", "/styled/"));
        assert_eq!(resp.header("Content-Type"), Some("text/css"));
        assert_eq!(
            resp.headers
                .keys()
                .filter(|k| k.eq_ignore_ascii_case("content-type"))
                .count(),
            1
        );
    }

    #[test]
    fn test_failure_response_before_dispatch() {
        let resp = dispatcher().failure_response(&AppError::malformed("cookie", "'x'"));
        assert_eq!(resp.status, "500 Internal Server Error");
        assert!(resp.header(CONTENT_TYPE).is_some());
    }

    #[test]
    fn test_dispatch_is_idempotent() {
        let dispatcher = dispatcher();
        let req = request("GET", "/user/");
        let mut first = dispatcher.create_response(&req);
        let mut second = dispatcher.create_response(&req);
        first.headers.shift_remove("Date");
        second.headers.shift_remove("Date");
        assert_eq!(first, second);
    }

    #[test]
    fn test_error_pages_fall_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(NOT_FOUND_PAGE), "custom 404").unwrap();
        let pages = ErrorPages::load(dir.path());
        assert_eq!(pages.not_found.as_ref(), b"custom 404");
        assert_eq!(pages.server_error, ErrorPages::builtin().server_error);
    }
}
