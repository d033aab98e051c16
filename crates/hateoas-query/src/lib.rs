//! hateoas-query — follow dotted selectors through hypermedia API graphs.
//!
//! ```text
//! traverser.query(&user, "accounts[].invoices[]", &options, &responses)
//!   → every invoice of every account, each pointing back at its account
//! ```

pub mod access;
pub mod options;
pub mod reduce;
pub mod selector;
pub mod transport;
pub mod traverse;
pub mod types;

pub use options::{Only, QueryOptions, TraversalConfig};
pub use reduce::reduce;
pub use selector::{Iteration, Step};
pub use transport::Requester;
pub use traverse::Traverser;
pub use types::*;
