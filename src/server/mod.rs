//! Hosting gateway
//!
//! A tokio/hyper HTTP/1 server that turns each inbound request into a
//! gateway environment and invokes the application once per request.

pub mod connection;
pub mod listener;

// `loop` is a keyword, so the module is named server_loop
#[path = "loop.rs"]
pub mod server_loop;

pub use listener::create_reusable_listener;
pub use server_loop::run;
