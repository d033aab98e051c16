//! Query session management.

pub mod manager;

pub use manager::QuerySession;
