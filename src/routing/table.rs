//! Route table
//!
//! Exact path → handler map plus the static prefix rule. Built once at
//! startup and only read afterwards, so it is shared across requests as is.

use super::matcher::{is_static_path, normalize_path};
use crate::error::AppError;
use crate::handler::Handler;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub struct RouteTable {
    routes: HashMap<String, Arc<dyn Handler>>,
    static_handler: Arc<dyn Handler>,
}

impl RouteTable {
    pub fn builder(static_handler: impl Handler + 'static) -> RouteTableBuilder {
        RouteTableBuilder {
            routes: HashMap::new(),
            static_handler: Arc::new(static_handler),
        }
    }

    /// Resolve an already normalized path.
    ///
    /// The static prefix wins over the exact-match table.
    pub fn resolve(&self, normalized: &str) -> Result<&dyn Handler, AppError> {
        if is_static_path(normalized) {
            return Ok(self.static_handler.as_ref());
        }
        self.routes
            .get(normalized)
            .map(|handler| handler.as_ref())
            .ok_or_else(|| AppError::RouteNotFound(normalized.to_string()))
    }

    /// Registered exact-match paths, sorted
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("routes", &self.paths())
            .finish_non_exhaustive()
    }
}

pub struct RouteTableBuilder {
    routes: HashMap<String, Arc<dyn Handler>>,
    static_handler: Arc<dyn Handler>,
}

impl RouteTableBuilder {
    /// Register a handler; the path is normalized first so `/user` and
    /// `/user/` name the same route.
    #[must_use]
    pub fn route(mut self, path: &str, handler: impl Handler + 'static) -> Self {
        self.routes.insert(normalize_path(path), Arc::new(handler));
        self
    }

    pub fn build(self) -> RouteTable {
        RouteTable {
            routes: self.routes,
            static_handler: self.static_handler,
        }
    }
}
