//! Error taxonomy for request processing
//!
//! Every failure downstream of the gateway is one of these kinds. The
//! dispatcher is the only place that turns them into responses.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AppError {
    /// A cookie/query/form pair without exactly one `=`, or a gateway
    /// environment that lacks a required variable.
    #[error("malformed {source_kind}: {detail}")]
    MalformedInput {
        source_kind: &'static str,
        detail: String,
    },

    /// Normalized path matches neither the static prefix nor the route table
    #[error("no route for path '{0}'")]
    RouteNotFound(String),

    /// A handler's backing resource does not exist
    #[error("resource not found: {0}")]
    ResourceMissing(String),

    /// Anything else raised while producing a response
    #[error("handler failure: {0}")]
    HandlerFailure(String),
}

impl AppError {
    pub fn malformed(source_kind: &'static str, detail: impl Into<String>) -> Self {
        Self::MalformedInput {
            source_kind,
            detail: detail.into(),
        }
    }

    /// Whether this failure surfaces as `404 Not Found` rather than `500`
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::RouteNotFound(_) | Self::ResourceMissing(_))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::HandlerFailure(err.to_string())
    }
}
