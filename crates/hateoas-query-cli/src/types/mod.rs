//! Shared types for the command-line front end.

pub mod error;

pub use error::*;
