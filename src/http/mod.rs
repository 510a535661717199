//! HTTP value layer
//!
//! Request and response models plus the parsing helpers they share. Nothing
//! here knows about routing or the hosting server.

pub mod date;
pub mod mime;
pub mod params;
pub mod request;
pub mod response;

pub use request::Request;
pub use response::Response;
