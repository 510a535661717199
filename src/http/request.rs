//! Request model
//!
//! Parses a gateway environment into method, path, headers, cookies and
//! query/form parameters. A `Request` is never modified after construction.

use crate::error::AppError;
use crate::gateway::environ::{
    Environ, CONTENT_LENGTH, CONTENT_TYPE, HTTP_COOKIE, PATH_INFO, QUERY_STRING, REQUEST_METHOD,
};
use crate::http::params::{parse_pairs, COOKIE_SEPARATOR, PAIR_SEPARATOR};
use hyper::body::Bytes;
use hyper::Method;
use std::collections::HashMap;

/// The only content type whose body is parsed into form parameters
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    path: String,
    headers: HashMap<String, String>,
    cookies: HashMap<String, String>,
    query_params: HashMap<String, String>,
    form_params: HashMap<String, String>,
    body: Bytes,
}

impl Request {
    /// Build a request from a gateway environment, reading the body to the end
    pub fn from_environ(env: &mut Environ) -> Result<Self, AppError> {
        let method_str = required(env, REQUEST_METHOD)?;
        let method = Method::from_bytes(method_str.as_bytes())
            .map_err(|_| AppError::malformed("request method", method_str.clone()))?;

        let path = match required(env, PATH_INFO)? {
            p if p.is_empty() => "/".to_string(),
            p => p,
        };

        let body = Bytes::from(env.read_input()?);

        let mut headers: HashMap<String, String> = env
            .http_vars()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        let content_type = env.get(CONTENT_TYPE).unwrap_or_default();
        headers.insert(CONTENT_TYPE.to_string(), content_type.to_string());
        headers.insert(
            CONTENT_LENGTH.to_string(),
            env.get(CONTENT_LENGTH).unwrap_or_default().to_string(),
        );

        let cookies = match env.get(HTTP_COOKIE) {
            Some(raw) => parse_pairs(raw, COOKIE_SEPARATOR, "cookie")?,
            None => HashMap::new(),
        };

        let query_string = env.get(QUERY_STRING).unwrap_or_default();
        let query_params = if method == Method::GET && !query_string.is_empty() {
            parse_pairs(query_string, PAIR_SEPARATOR, "query pair")?
        } else {
            HashMap::new()
        };

        let form_params = if method == Method::POST && content_type == FORM_CONTENT_TYPE {
            let text = std::str::from_utf8(&body)
                .map_err(|e| AppError::malformed("form body", e.to_string()))?;
            parse_pairs(text, PAIR_SEPARATOR, "form pair")?
        } else {
            HashMap::new()
        };

        Ok(Self {
            method,
            path,
            headers,
            cookies,
            query_params,
            form_params,
            body,
        })
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub const fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub const fn cookies(&self) -> &HashMap<String, String> {
        &self.cookies
    }

    pub const fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    pub const fn form_params(&self) -> &HashMap<String, String> {
        &self.form_params
    }

    pub const fn body(&self) -> &Bytes {
        &self.body
    }
}

fn required(env: &Environ, name: &'static str) -> Result<String, AppError> {
    env.get(name)
        .map(ToString::to_string)
        .ok_or_else(|| AppError::malformed("environment", format!("missing {name}")))
}

/// Test helper: a minimal environment for `method path`
#[cfg(test)]
pub(crate) fn test_environ(method: &str, path: &str) -> Environ {
    Environ::new()
        .with_var(REQUEST_METHOD, method)
        .with_var(PATH_INFO, path)
        .with_var(QUERY_STRING, "")
        .with_var(CONTENT_TYPE, "")
        .with_var(CONTENT_LENGTH, "")
}
