//! Core data types: request descriptors, traversal results and errors.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key under which [`Hit::to_json`] renders the origin back-reference.
pub const ORIGIN_KEY: &str = "_origin";

/// Boxed error returned by transports.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// What the transport is asked to do for a link or action step.
///
/// Links produce `{ path }`. Actions are deserialized from the node's action
/// descriptor, so any extra fields it carries (`method`, `href`, ...) are kept
/// in `extra` and handed to the transport untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RequestDescriptor {
    /// Descriptor for following a link.
    pub fn link(href: impl Into<String>) -> Self {
        Self {
            path: Some(href.into()),
            ..Self::default()
        }
    }

    /// Whether the descriptor names something the transport can act on.
    ///
    /// An empty path or a falsy action identifier counts as unresolved.
    pub fn is_resolved(&self) -> bool {
        self.path.as_deref().is_some_and(|p| !p.is_empty())
            || self.action.as_ref().is_some_and(crate::access::truthy)
    }
}

/// A node reached by a traversal, with the node it was produced from.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub value: Value,
    pub origin: Option<Arc<Value>>,
}

impl Hit {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            origin: None,
        }
    }

    /// Replace the origin back-reference.
    pub fn with_origin(mut self, origin: Arc<Value>) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn origin(&self) -> Option<&Value> {
        self.origin.as_deref()
    }

    /// Render the hit as JSON.
    ///
    /// With `with_origin`, object values get an `_origin` entry holding a copy
    /// of the origin node. Non-object values are returned as they are.
    pub fn to_json(&self, with_origin: bool) -> Value {
        match (&self.value, &self.origin) {
            (Value::Object(map), Some(origin)) if with_origin => {
                let mut map = map.clone();
                map.insert(ORIGIN_KEY.to_string(), origin.as_ref().clone());
                Value::Object(map)
            }
            _ => self.value.clone(),
        }
    }
}

/// Unreduced result of a traversal branch.
#[derive(Debug, Clone, PartialEq)]
pub enum Traversal {
    /// The branch could not be traversed and was pruned.
    Absent,
    /// The branch ended on a single node.
    Node(Hit),
    /// The branch fanned out; one entry per selected item.
    Branches(Vec<Traversal>),
}

impl Traversal {
    /// Point a single-node result at `origin`.
    ///
    /// Fan-out results keep the origins assigned by their own fan-out.
    pub fn tag(self, origin: &Arc<Value>) -> Self {
        match self {
            Traversal::Node(hit) => Traversal::Node(hit.with_origin(Arc::clone(origin))),
            other => other,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Traversal::Absent)
    }

    /// Render as JSON, keeping fan-out nesting as nested arrays.
    pub fn to_json(&self, with_origin: bool) -> Value {
        match self {
            Traversal::Absent => Value::Null,
            Traversal::Node(hit) => hit.to_json(with_origin),
            Traversal::Branches(branches) => Value::Array(
                branches.iter().map(|b| b.to_json(with_origin)).collect(),
            ),
        }
    }
}

/// Reduced result of a traversal.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Absent,
    One(Hit),
    Many(Vec<Hit>),
}

impl Outcome {
    pub fn is_absent(&self) -> bool {
        matches!(self, Outcome::Absent)
    }

    /// All hits, in order. `One` yields a single-element slice.
    pub fn hits(&self) -> &[Hit] {
        match self {
            Outcome::Absent => &[],
            Outcome::One(hit) => std::slice::from_ref(hit),
            Outcome::Many(hits) => hits,
        }
    }

    pub fn into_hits(self) -> Vec<Hit> {
        match self {
            Outcome::Absent => Vec::new(),
            Outcome::One(hit) => vec![hit],
            Outcome::Many(hits) => hits,
        }
    }

    /// Values of all hits, without origins.
    pub fn values(&self) -> Vec<&Value> {
        self.hits().iter().map(|h| &h.value).collect()
    }

    /// Render as JSON: `null`, a single value, or an array.
    pub fn to_json(&self, with_origin: bool) -> Value {
        match self {
            Outcome::Absent => Value::Null,
            Outcome::One(hit) => hit.to_json(with_origin),
            Outcome::Many(hits) => {
                Value::Array(hits.iter().map(|h| h.to_json(with_origin)).collect())
            }
        }
    }
}

impl From<Outcome> for Traversal {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Absent => Traversal::Absent,
            Outcome::One(hit) => Traversal::Node(hit),
            Outcome::Many(hits) => {
                Traversal::Branches(hits.into_iter().map(Traversal::Node).collect())
            }
        }
    }
}

/// Every response met during a traversal, most recent first.
///
/// Appended to by concurrent branches; never read while traversing.
#[derive(Debug, Default)]
pub struct Responses {
    inner: Mutex<VecDeque<Value>>,
}

impl Responses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, response: Value) {
        self.lock().push_front(response);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the recorded responses.
    pub fn snapshot(&self) -> Vec<Value> {
        self.lock().iter().cloned().collect()
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.inner
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .into()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Value>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Errors that can occur while traversing.
#[derive(thiserror::Error, Debug)]
pub enum QueryError {
    /// A step matched no link, action or attribute while in strict mode.
    #[error("[Strict mode] Could not traverse `{selector}`")]
    Unresolved { selector: String },

    /// Failure raised by the transport, passed through as is.
    #[error(transparent)]
    Transport(BoxError),

    #[error("No request function configured to fetch `{target}`")]
    NoTransport { target: String },

    #[error("Malformed action descriptor: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueryError {
    pub fn is_unresolved(&self) -> bool {
        matches!(self, QueryError::Unresolved { .. })
    }
}

/// Convenience result type.
pub type QueryResult<T> = Result<T, QueryError>;
