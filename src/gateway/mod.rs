//! Gateway interface
//!
//! The application side of the server-gateway contract: the environment it
//! receives and the adapter that answers through `start_response`.

pub mod adapter;
pub mod environ;

pub use adapter::{emit, header_pairs, Application};
pub use environ::Environ;
