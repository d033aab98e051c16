//! Error types and process exit codes for the CLI.

use hateoas_query::QueryError;

/// Process exit codes.
pub mod exit_codes {
    pub const FAILURE: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const UNRESOLVED: i32 = 3;
    pub const TRANSPORT: i32 = 4;
}

/// All errors that can occur in the CLI.
#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Relative path `{0}` needs a base URL (--base-url or HQ_BASE_URL)")]
    NoBaseUrl(String),

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Request has neither a path nor an href: {0}")]
    NoTarget(String),

    #[error("Invalid request parameters: {0}")]
    InvalidParams(String),

    #[error("{method} {url} returned {status}")]
    Status {
        method: String,
        url: String,
        status: u16,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        use exit_codes::*;
        match self {
            CliError::Config(_)
            | CliError::Url(_)
            | CliError::NoBaseUrl(_)
            | CliError::InvalidMethod(_)
            | CliError::InvalidParams(_) => USAGE,
            CliError::Query(QueryError::Unresolved { .. }) => UNRESOLVED,
            // Errors raised by the HTTP transport come back boxed.
            CliError::Query(QueryError::Transport(inner)) => inner
                .downcast_ref::<CliError>()
                .map_or(TRANSPORT, CliError::exit_code),
            CliError::Status { .. }
            | CliError::Http(_)
            | CliError::NoTarget(_) => TRANSPORT,
            CliError::Query(_) | CliError::Io(_) | CliError::Json(_) => FAILURE,
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;
