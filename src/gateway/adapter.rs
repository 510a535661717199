//! Gateway adapter
//!
//! The application entry point a gateway calls once per request, and the
//! translation of a `Response` into the gateway's status/headers/body calls.

use crate::config::Config;
use crate::gateway::environ::Environ;
use crate::handler::{self, Dispatcher};
use crate::http::{Request, Response};
use hyper::body::Bytes;

pub const SET_COOKIE: &str = "Set-Cookie";

pub struct Application {
    dispatcher: Dispatcher,
}

impl Application {
    pub const fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Application serving the configured site
    pub fn from_config(config: &Config) -> Self {
        Self::new(handler::site_dispatcher(config))
    }

    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Handle one gateway invocation.
    ///
    /// `start_response` is called exactly once; the returned body sequence
    /// always holds a single chunk.
    pub fn call<F>(&self, mut environ: Environ, start_response: F) -> Vec<Bytes>
    where
        F: FnOnce(&str, Vec<(String, String)>),
    {
        let response = match Request::from_environ(&mut environ) {
            Ok(request) => self.dispatcher.create_response(&request),
            Err(err) => self.dispatcher.failure_response(&err),
        };
        emit(response, start_response)
    }
}

/// Explicit headers in order, then one `Set-Cookie` per cookie
pub fn header_pairs(response: &Response) -> Vec<(String, String)> {
    response
        .headers
        .iter()
        .map(|(name, value)| (name.clone(), value.clone()))
        .chain(
            response
                .cookies
                .iter()
                .map(|(name, value)| (SET_COOKIE.to_string(), format!("{name}={value}"))),
        )
        .collect()
}

/// Start the gateway response and hand back the body as one chunk
pub fn emit<F>(response: Response, start_response: F) -> Vec<Bytes>
where
    F: FnOnce(&str, Vec<(String, String)>),
{
    start_response(&response.status, header_pairs(&response));
    vec![response.body]
}
