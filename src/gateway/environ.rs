//! Gateway environment
//!
//! The per-request mapping a gateway hands to the application: CGI-style
//! variables plus a readable input stream carrying the request body.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Cursor, Read};

pub const REQUEST_METHOD: &str = "REQUEST_METHOD";
pub const PATH_INFO: &str = "PATH_INFO";
pub const QUERY_STRING: &str = "QUERY_STRING";
pub const CONTENT_TYPE: &str = "CONTENT_TYPE";
pub const CONTENT_LENGTH: &str = "CONTENT_LENGTH";
pub const HTTP_COOKIE: &str = "HTTP_COOKIE";
pub const REMOTE_ADDR: &str = "REMOTE_ADDR";
pub const SERVER_PROTOCOL: &str = "SERVER_PROTOCOL";

/// Prefix of variables carrying inbound HTTP headers
pub const HTTP_PREFIX: &str = "HTTP_";

pub struct Environ {
    vars: HashMap<String, String>,
    input: Box<dyn Read + Send>,
}

impl Environ {
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
            input: Box::new(io::empty()),
        }
    }

    #[must_use]
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_var(name, value);
        self
    }

    #[must_use]
    pub fn with_input(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.input = Box::new(Cursor::new(body.into()));
        self
    }

    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Variables carrying HTTP headers (`HTTP_*`), in no particular order
    pub fn http_vars(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars
            .iter()
            .filter(|(name, _)| name.starts_with(HTTP_PREFIX))
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Read the whole input stream
    pub fn read_input(&mut self) -> io::Result<Vec<u8>> {
        let mut body = Vec::new();
        self.input.read_to_end(&mut body)?;
        Ok(body)
    }
}

impl Default for Environ {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Environ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environ")
            .field("vars", &self.vars)
            .finish_non_exhaustive()
    }
}
