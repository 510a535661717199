//! Routing module
//!
//! Provides path-based dispatch:
//! - Trailing-slash normalization of directory-style paths
//! - The `/static/` prefix rule
//! - Exact-match route table

mod matcher;
mod table;

pub use matcher::{is_static_path, normalize_path, STATIC_PREFIX};
pub use table::{RouteTable, RouteTableBuilder};
