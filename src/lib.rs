//! Gateway-hosted page server
//!
//! A small request-handling core: requests are built from a gateway
//! environment, resolved against a route table, handled by page handlers and
//! returned to the gateway as status, headers and one body chunk. The
//! `server` module hosts the core behind a tokio/hyper HTTP/1 listener.

pub mod config;
pub mod error;
pub mod gateway;
pub mod handler;
pub mod http;
pub mod logger;
pub mod routing;
pub mod server;

pub use error::AppError;
pub use gateway::{Application, Environ};
