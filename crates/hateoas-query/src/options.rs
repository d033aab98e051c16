//! Traversal configuration and per-call options.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Settings shared by every traversal made through one traverser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalConfig {
    /// Fail on unresolved steps instead of pruning the branch.
    pub strict: bool,
    /// Key of the node's link mapping.
    pub links_key: String,
    /// Key of the node's action mapping.
    pub actions_key: String,
    /// Key of the item sequence in collection responses.
    pub items_key: String,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            strict: false,
            links_key: "links".to_string(),
            actions_key: "actions".to_string(),
            items_key: "items".to_string(),
        }
    }
}

impl TraversalConfig {
    /// Underscore-prefixed keys (`_links`, `_actions`) as used by HAL-style APIs.
    pub fn hal() -> Self {
        let mut config = Self::default();
        config.use_hal_keys();
        config
    }

    /// Switch to the HAL-style link and action keys, leaving the rest as is.
    pub fn use_hal_keys(&mut self) {
        self.links_key = "_links".to_string();
        self.actions_key = "_actions".to_string();
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Predicate used by [`Only::Predicate`].
pub type KeyPredicate = Arc<dyn Fn(&str, &Value) -> bool + Send + Sync>;

/// Restriction applied to the final node of a traversal.
#[derive(Clone)]
pub enum Only {
    /// Keep the listed keys.
    Keys(Vec<String>),
    /// Keep entries for which the predicate holds.
    Predicate(KeyPredicate),
}

impl Only {
    /// Restrict `node` to the selected entries.
    ///
    /// Non-object nodes have no entries to keep and yield an empty object.
    pub fn apply(&self, node: &Value) -> Value {
        let Value::Object(map) = node else {
            return Value::Object(Map::new());
        };
        let picked: Map<String, Value> = match self {
            Only::Keys(keys) => keys
                .iter()
                .filter_map(|k| map.get(k).map(|v| (k.clone(), v.clone())))
                .collect(),
            Only::Predicate(keep) => map
                .iter()
                .filter(|(k, v)| keep(k, v))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };
        Value::Object(picked)
    }
}

impl fmt::Debug for Only {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Only::Keys(keys) => f.debug_tuple("Keys").field(keys).finish(),
            Only::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Options for a single query.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Sent as `params` when a step is an action.
    pub action_params: Option<Value>,
    /// Restriction applied once the selector is exhausted.
    pub only: Option<Only>,
    /// Overrides the traverser's strictness for this call.
    pub strict: Option<bool>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn action_params(mut self, params: Value) -> Self {
        self.action_params = Some(params);
        self
    }

    pub fn only_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only = Some(Only::Keys(keys.into_iter().map(Into::into).collect()));
        self
    }

    pub fn only_matching<F>(mut self, keep: F) -> Self
    where
        F: Fn(&str, &Value) -> bool + Send + Sync + 'static,
    {
        self.only = Some(Only::Predicate(Arc::new(keep)));
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }
}
