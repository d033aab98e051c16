//! Transports handed to the traverser.

pub mod http;

pub use http::HttpRequester;
