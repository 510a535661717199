//! Page handlers
//!
//! The fixed page set behind the route table: template-backed pages and
//! pages that echo parts of the request back as HTML.

use crate::error::AppError;
use crate::handler::Handler;
use crate::http::response::CONTENT_TYPE;
use crate::http::{date, Request, Response};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const HTML: &str = "text/html; charset=utf-8";

/// Placeholder replaced by the current time on the now page
const NOW_PLACEHOLDER: &str = "$now";

/// `/`: the index template
pub struct IndexPage {
    template: PathBuf,
}

impl IndexPage {
    pub fn new(template_dir: &Path) -> Self {
        Self {
            template: template_dir.join("index.html"),
        }
    }
}

impl Handler for IndexPage {
    fn get_response(&self, _request: &Request) -> Result<Response, AppError> {
        let content = read_template(&self.template)?;
        Ok(Response::ok(content).with_header(CONTENT_TYPE, HTML))
    }
}

/// `/now/`: the now template with the current UTC time filled in
pub struct NowPage {
    template: PathBuf,
}

impl NowPage {
    pub fn new(template_dir: &Path) -> Self {
        Self {
            template: template_dir.join("now").join("index.html"),
        }
    }
}

impl Handler for NowPage {
    fn get_response(&self, _request: &Request) -> Result<Response, AppError> {
        let content = String::from_utf8(read_template(&self.template)?).map_err(|e| {
            AppError::HandlerFailure(format!("{}: {e}", self.template.display()))
        })?;
        let rendered = content.replace(NOW_PLACEHOLDER, &date::now());
        Ok(Response::ok(rendered).with_header(CONTENT_TYPE, HTML))
    }
}

/// `/headers/`: request headers
pub struct HeadersPage;

impl Handler for HeadersPage {
    fn get_response(&self, request: &Request) -> Result<Response, AppError> {
        let body = render_page("Headers", &[("Request headers", request.headers())]);
        Ok(Response::ok(body).with_header(CONTENT_TYPE, HTML))
    }
}

/// `/parameters/`: query and form parameters
pub struct ParametersPage;

impl Handler for ParametersPage {
    fn get_response(&self, request: &Request) -> Result<Response, AppError> {
        let body = render_page(
            "Parameters",
            &[
                ("Query parameters", request.query_params()),
                ("Form parameters", request.form_params()),
            ],
        );
        Ok(Response::ok(body).with_header(CONTENT_TYPE, HTML))
    }
}

/// `/cookies/`: shows request cookies and sets every query parameter as a
/// response cookie
pub struct CookiesPage;

impl Handler for CookiesPage {
    fn get_response(&self, request: &Request) -> Result<Response, AppError> {
        let body = render_page(
            "Cookies",
            &[
                ("Received cookies", request.cookies()),
                ("Cookies set by this response", request.query_params()),
            ],
        );
        let mut response = Response::ok(body).with_header(CONTENT_TYPE, HTML);
        // sorted so the Set-Cookie order does not depend on hash order
        for (name, value) in sorted(request.query_params()) {
            response = response.with_cookie(name, value);
        }
        Ok(response)
    }
}

/// `/user/`: looks up `?id=` in the configured user directory, or lists all
/// users when no id is given
pub struct UserPage {
    users: HashMap<String, String>,
}

impl UserPage {
    pub const fn new(users: HashMap<String, String>) -> Self {
        Self { users }
    }
}

impl Handler for UserPage {
    fn get_response(&self, request: &Request) -> Result<Response, AppError> {
        let body = match request.query_params().get("id") {
            Some(id) => {
                let name = self
                    .users
                    .get(id)
                    .ok_or_else(|| AppError::ResourceMissing(format!("user '{id}'")))?;
                let mut body = String::new();
                open_document(&mut body, "User");
                body.push_str(&format!(
                    "<p>User {}: <strong>{}</strong></p>\n",
                    escape_html(id),
                    escape_html(name)
                ));
                close_document(&mut body);
                body
            }
            None => render_page("Users", &[("Users", &self.users)]),
        };
        Ok(Response::ok(body).with_header(CONTENT_TYPE, HTML))
    }
}

/// Read a template, mapping a missing file to `ResourceMissing`
fn read_template(path: &Path) -> Result<Vec<u8>, AppError> {
    fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => AppError::ResourceMissing(path.display().to_string()),
        _ => AppError::HandlerFailure(format!("Failed to read '{}': {e}", path.display())),
    })
}

fn sorted(map: &HashMap<String, String>) -> Vec<(&String, &String)> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort();
    entries
}

fn open_document(out: &mut String, title: &str) {
    out.push_str(&format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>\n<h1>{title}</h1>\n"
    ));
}

fn close_document(out: &mut String) {
    out.push_str("</body>\n</html>\n");
}

/// Render titled sections of key/value lists as an HTML document
fn render_page(title: &str, sections: &[(&str, &HashMap<String, String>)]) -> String {
    let mut out = String::new();
    open_document(&mut out, title);
    for (heading, entries) in sections {
        out.push_str(&format!("<h2>{heading}</h2>\n"));
        if entries.is_empty() {
            out.push_str("<p>(none)</p>\n");
            continue;
        }
        out.push_str("<ul>\n");
        for (name, value) in sorted(entries) {
            out.push_str(&format!(
                "<li><code>{}</code>: {}</li>\n",
                escape_html(name),
                escape_html(value)
            ));
        }
        out.push_str("</ul>\n");
    }
    close_document(&mut out);
    out
}

/// Escape text for inclusion in HTML
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
