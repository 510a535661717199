// Connection handling module
// Serves one TCP connection and converts each hyper request into a gateway call

use std::convert::Infallible;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{self, HeaderMap};
use hyper::http::request::Parts;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode, Version};
use hyper_util::rt::TokioIo;

use crate::config::Config;
use crate::gateway::environ::{
    CONTENT_LENGTH, CONTENT_TYPE, HTTP_PREFIX, PATH_INFO, QUERY_STRING, REMOTE_ADDR,
    REQUEST_METHOD, SERVER_PROTOCOL,
};
use crate::gateway::{Application, Environ};
use crate::http::response::parse_status_code;
use crate::logger::{self, AccessLogEntry};

/// Per-connection settings taken from the configuration
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    pub remote_addr: SocketAddr,
    pub max_body_size: u64,
    pub access_log: bool,
    pub access_log_format: String,
}

impl ConnectionContext {
    pub fn new(remote_addr: SocketAddr, config: &Config) -> Self {
        Self {
            remote_addr,
            max_body_size: config.http.max_body_size,
            access_log: config.logging.access_log,
            access_log_format: config.logging.access_log_format.clone(),
        }
    }
}

/// Accept a connection, enforcing the connection limit, and serve it in a
/// spawned task
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    app: &Arc<Application>,
    config: &Arc<Config>,
    conn_counter: &Arc<AtomicUsize>,
) {
    // Increment counter first, then check limit (prevents race condition)
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            tracing::warn!(
                active = prev_count,
                max = max_conn,
                "Max connections reached, connection rejected"
            );
            drop(stream);
            return;
        }
    }

    tracing::debug!(peer = %peer_addr, "Connection accepted");

    let ctx = ConnectionContext::new(peer_addr, config);
    let app = Arc::clone(app);
    let conn_counter = Arc::clone(conn_counter);
    let keep_alive = config.performance.keep_alive;
    let timeout_duration = Duration::from_secs(config.performance.read_timeout);

    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let mut builder = http1::Builder::new();
        builder.keep_alive(keep_alive);

        let conn = builder.serve_connection(
            io,
            service_fn(move |req| serve_request(req, Arc::clone(&app), ctx.clone())),
        );

        match tokio::time::timeout(timeout_duration, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::error!(error = ?err, "Failed to serve connection"),
            Err(_) => tracing::warn!(
                peer = %peer_addr,
                "Connection timeout after {} seconds",
                timeout_duration.as_secs()
            ),
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Serve one request through the application
pub async fn serve_request<B>(
    req: Request<B>,
    app: Arc<Application>,
    ctx: ConnectionContext,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn Error + Send + Sync>>,
{
    let started = Instant::now();
    let (parts, body) = req.into_parts();
    let mut entry = access_entry(&parts, &ctx);

    let response = if let Some(resp) = check_body_size(&parts.headers, ctx.max_body_size) {
        resp
    } else {
        // bodies without Content-Length (chunked) are bounded here
        let limit = usize::try_from(ctx.max_body_size).unwrap_or(usize::MAX);
        match Limited::new(body, limit).collect().await {
            Ok(collected) => {
                let environ = environ_from_parts(&parts, ctx.remote_addr, collected.to_bytes());
                call_application(app, environ).await
            }
            Err(e) if e.is::<LengthLimitError>() => {
                tracing::error!(max = ctx.max_body_size, "Request body too large");
                plain_response(StatusCode::PAYLOAD_TOO_LARGE, "413 Payload Too Large")
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read request body");
                plain_response(StatusCode::BAD_REQUEST, "400 Bad Request")
            }
        }
    };

    if ctx.access_log {
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or_default();
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &ctx.access_log_format);
    }

    Ok(response)
}

/// Run the synchronous application on the blocking pool
async fn call_application(app: Arc<Application>, environ: Environ) -> Response<Full<Bytes>> {
    let outcome = tokio::task::spawn_blocking(move || {
        let mut started = None;
        let chunks = app.call(environ, |status, headers| {
            started = Some((status.to_string(), headers));
        });
        (started, chunks)
    })
    .await;

    match outcome {
        Ok((Some((status, headers)), chunks)) => build_response(&status, headers, chunks),
        Ok((None, _)) => {
            tracing::error!("Application returned without starting a response");
            plain_response(StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error")
        }
        Err(e) => {
            tracing::error!(error = %e, "Application task failed");
            plain_response(StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error")
        }
    }
}

/// Build the gateway environment for a request
pub fn environ_from_parts(parts: &Parts, remote_addr: SocketAddr, body: Bytes) -> Environ {
    let mut environ = Environ::new()
        .with_var(REQUEST_METHOD, parts.method.as_str())
        .with_var(PATH_INFO, parts.uri.path())
        .with_var(QUERY_STRING, parts.uri.query().unwrap_or_default())
        .with_var(CONTENT_TYPE, header_str(&parts.headers, &header::CONTENT_TYPE))
        .with_var(CONTENT_LENGTH, header_str(&parts.headers, &header::CONTENT_LENGTH))
        .with_var(REMOTE_ADDR, remote_addr.ip().to_string())
        .with_var(SERVER_PROTOCOL, format!("HTTP/{}", version_str(parts.version)))
        .with_input(body);

    for name in parts.headers.keys() {
        if name == header::CONTENT_TYPE || name == header::CONTENT_LENGTH {
            continue;
        }
        // repeated Cookie headers fold into one cookie string
        let separator = if name == header::COOKIE { "; " } else { ", " };
        let value = parts
            .headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join(separator);
        let var = format!(
            "{HTTP_PREFIX}{}",
            name.as_str().to_ascii_uppercase().replace('-', "_")
        );
        environ.set_var(var, value);
    }

    environ
}

/// Turn the gateway's status line, header pairs and body chunks into a
/// hyper response. Repeated header names (`Set-Cookie`) are all kept.
pub fn build_response(
    status_line: &str,
    headers: Vec<(String, String)>,
    chunks: Vec<Bytes>,
) -> Response<Full<Bytes>> {
    let Some(status) = parse_status_code(status_line).and_then(|c| StatusCode::from_u16(c).ok())
    else {
        tracing::error!(status = status_line, "Application returned an invalid status line");
        return plain_response(StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error");
    };

    let body = match <[Bytes; 1]>::try_from(chunks) {
        Ok([chunk]) => chunk,
        Err(chunks) => Bytes::from(chunks.concat()),
    };

    let mut builder = Response::builder().status(status);
    for (name, value) in headers {
        builder = builder.header(name, value);
    }
    builder.body(Full::new(body)).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to build {status} response");
        plain_response(StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error")
    })
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size(headers: &HeaderMap, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let size_str = headers.get(header::CONTENT_LENGTH)?.to_str().ok()?;
    match size_str.parse::<u64>() {
        Ok(size) if size > max_body_size => {
            tracing::error!(size, max = max_body_size, "Request body too large");
            Some(plain_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                "413 Payload Too Large",
            ))
        }
        Err(_) => {
            tracing::warn!(value = size_str, "Invalid Content-Length value, skipping size check");
            None
        }
        _ => None,
    }
}

/// Response produced by the gateway itself, outside the application
fn plain_response(status: StatusCode, text: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(text.as_bytes())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/plain"),
    );
    response
}

fn access_entry(parts: &Parts, ctx: &ConnectionContext) -> AccessLogEntry {
    let mut entry = AccessLogEntry::new(
        ctx.remote_addr.ip().to_string(),
        parts.method.to_string(),
        parts.uri.path().to_string(),
    );
    entry.query = parts.uri.query().map(ToString::to_string);
    entry.http_version = version_str(parts.version).to_string();
    entry.referer = parts
        .headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);
    entry.user_agent = parts
        .headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);
    entry
}

fn header_str<'a>(headers: &'a HeaderMap, name: &header::HeaderName) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn version_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::handler::{Dispatcher, ErrorPages};
    use crate::http;
    use crate::routing::RouteTable;

    fn app() -> Arc<Application> {
        let routes = RouteTable::builder(|_: &http::Request| -> Result<http::Response, AppError> {
            Err(AppError::ResourceMissing("asset".to_string()))
        })
        .route("/form", |req: &http::Request| -> Result<http::Response, AppError> {
            let name = req.form_params().get("name").cloned().unwrap_or_default();
            Ok(http::Response::ok(format!("hi {name}"))
                .with_cookie("a", "1")
                .with_cookie("b", "2"))
        })
        .route("/echo", |req: &http::Request| -> Result<http::Response, AppError> {
            Ok(http::Response::ok(format!(
                "{} {}",
                req.header("HTTP_USER_AGENT").unwrap_or("-"),
                req.cookies().len()
            )))
        })
        .build();
        Arc::new(Application::new(Dispatcher::new(
            routes,
            ErrorPages::builtin(),
            "Test",
        )))
    }

    fn ctx() -> ConnectionContext {
        ConnectionContext {
            remote_addr: "127.0.0.1:5000".parse().unwrap(),
            max_body_size: 64,
            access_log: false,
            access_log_format: "combined".to_string(),
        }
    }

    async fn body_string(resp: Response<Full<Bytes>>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_form_post_with_cookies() {
        let req = Request::post("/form")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Content-Length", "8")
            .body(Full::new(Bytes::from("name=ada")))
            .unwrap();

        let resp = serve_request(req, app(), ctx()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let cookies: Vec<_> = resp
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
        assert_eq!(resp.headers()[header::CONNECTION], "close");
        assert_eq!(body_string(resp).await, "hi ada");
    }

    #[tokio::test]
    async fn test_headers_and_cookies_reach_application() {
        let req = Request::get("/echo")
            .header("User-Agent", "curl/8.0")
            .header("Cookie", "a=1")
            .header("Cookie", "b=2")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let resp = serve_request(req, app(), ctx()).await.unwrap();
        assert_eq!(body_string(resp).await, "curl/8.0 2");
    }

    #[tokio::test]
    async fn test_not_found_status() {
        let req = Request::get("/nope/")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let resp = serve_request(req, app(), ctx()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_body_too_large_without_content_length() {
        let req = Request::post("/form")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Full::new(Bytes::from(vec![b'a'; 1000])))
            .unwrap();
        assert!(req.headers().get(header::CONTENT_LENGTH).is_none());

        let resp = serve_request(req, app(), ctx()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_body_at_limit_without_content_length() {
        let req = Request::post("/form")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Full::new(Bytes::from(format!("name={}", "a".repeat(59)))))
            .unwrap();

        let resp = serve_request(req, app(), ctx()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_body_too_large() {
        let req = Request::post("/form")
            .header("Content-Length", "1000")
            .body(Full::new(Bytes::from(vec![b'a'; 1000])))
            .unwrap();
        let resp = serve_request(req, app(), ctx()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_environ_from_parts() {
        let (parts, ()) = Request::get("/a/b?x=1&y=2")
            .header("X-Custom-Header", "v")
            .header("Content-Type", "text/plain")
            .body(())
            .unwrap()
            .into_parts();
        let mut environ =
            environ_from_parts(&parts, "10.0.0.1:80".parse().unwrap(), Bytes::from("body"));

        assert_eq!(environ.get(REQUEST_METHOD), Some("GET"));
        assert_eq!(environ.get(PATH_INFO), Some("/a/b"));
        assert_eq!(environ.get(QUERY_STRING), Some("x=1&y=2"));
        assert_eq!(environ.get(CONTENT_TYPE), Some("text/plain"));
        assert_eq!(environ.get(CONTENT_LENGTH), Some(""));
        assert_eq!(environ.get("HTTP_X_CUSTOM_HEADER"), Some("v"));
        assert_eq!(environ.get("HTTP_CONTENT_TYPE"), None);
        assert_eq!(environ.get(REMOTE_ADDR), Some("10.0.0.1"));
        assert_eq!(environ.get(SERVER_PROTOCOL), Some("HTTP/1.1"));
        assert_eq!(environ.read_input().unwrap(), b"body");
    }

    #[test]
    fn test_build_response_status_and_chunks() {
        let resp = build_response(
            "404 Not Found",
            vec![("Content-Type".to_string(), "text/html".to_string())],
            vec![Bytes::from("a"), Bytes::from("b")],
        );
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(resp.body().size_hint().exact(), Some(2));

        let resp = build_response("nonsense", vec![], vec![]);
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
