//! hq — command-line traversal of hypermedia APIs with dotted selectors.

pub mod config;
pub mod repl;
pub mod session;
pub mod transport;
pub mod types;

pub use config::{load_config, resolve_base_url, resolve_config_path, CliConfig};
pub use session::QuerySession;
pub use transport::HttpRequester;
pub use types::{CliError, CliResult};
