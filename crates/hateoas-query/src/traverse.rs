//! Traversal executor. Walks a node graph one selector step at a time.
//!
//! Each step resolves to a link or action (sent through the transport) or,
//! failing that, to a plain attribute of the current node. Iterable steps
//! fan out over the response's items; branches run concurrently and are
//! joined fail-fast.

use std::sync::Arc;

use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, warn};

use crate::access;
use crate::options::{QueryOptions, TraversalConfig};
use crate::reduce::reduce;
use crate::selector::{self, Iteration, Step};
use crate::transport::Requester;
use crate::types::{Hit, Outcome, QueryError, QueryResult, RequestDescriptor, Responses, Traversal};

/// A transport bound to a traversal configuration.
#[derive(Clone)]
pub struct Traverser {
    transport: Option<Arc<dyn Requester>>,
    config: TraversalConfig,
}

impl std::fmt::Debug for Traverser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Traverser")
            .field("transport", &self.transport.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl Traverser {
    pub fn new<R>(transport: R, config: TraversalConfig) -> Self
    where
        R: Requester + 'static,
    {
        Self::with_transport(Arc::new(transport), config)
    }

    pub fn with_transport(transport: Arc<dyn Requester>, config: TraversalConfig) -> Self {
        Self {
            transport: Some(transport),
            config,
        }
    }

    /// A traverser without transport; only attribute steps can be followed.
    pub fn detached(config: TraversalConfig) -> Self {
        Self {
            transport: None,
            config,
        }
    }

    pub fn config(&self) -> &TraversalConfig {
        &self.config
    }

    /// Traverse `selector` from `node` and flatten the result.
    pub async fn query(
        &self,
        node: &Value,
        selector: &str,
        options: &QueryOptions,
        responses: &Responses,
    ) -> QueryResult<Outcome> {
        let raw = self
            .query_isolated(node, selector, options, responses)
            .await?;
        Ok(reduce(raw))
    }

    /// Traverse `selector` from `node`, keeping fan-out nesting.
    pub async fn query_isolated(
        &self,
        node: &Value,
        selector: &str,
        options: &QueryOptions,
        responses: &Responses,
    ) -> QueryResult<Traversal> {
        let walk = Walk {
            transport: self.transport.as_deref(),
            config: &self.config,
            options,
            responses,
            selector,
            strict: options.strict.unwrap_or(self.config.strict),
        };
        walk.descend(Arc::new(node.clone()), selector).await
    }

    /// Like [`Traverser::query`], returning the recorded responses too.
    pub async fn query_with(
        &self,
        node: &Value,
        selector: &str,
        options: &QueryOptions,
    ) -> QueryResult<(Outcome, Vec<Value>)> {
        let responses = Responses::new();
        let outcome = self.query(node, selector, options, &responses).await?;
        Ok((outcome, responses.into_vec()))
    }

    /// Like [`Traverser::query_isolated`], returning the recorded responses too.
    pub async fn query_isolated_with(
        &self,
        node: &Value,
        selector: &str,
        options: &QueryOptions,
    ) -> QueryResult<(Traversal, Vec<Value>)> {
        let responses = Responses::new();
        let raw = self
            .query_isolated(node, selector, options, &responses)
            .await?;
        Ok((raw, responses.into_vec()))
    }
}

/// State threaded through one top-level traversal.
struct Walk<'a> {
    transport: Option<&'a dyn Requester>,
    config: &'a TraversalConfig,
    options: &'a QueryOptions,
    responses: &'a Responses,
    /// Full selector of the top-level call, for error reporting.
    selector: &'a str,
    strict: bool,
}

impl<'a> Walk<'a> {
    fn descend<'s>(&'s self, node: Arc<Value>, selector: &'s str) -> BoxFuture<'s, QueryResult<Traversal>> {
        async move {
            let Some((step, rest)) = selector::split_head(selector) else {
                return Ok(Traversal::Node(Hit::new(self.leaf(node))));
            };
            debug!(step = %step, remaining = rest, "resolving step");

            let mut descriptor = self.resolve(&node, &step)?;
            if !descriptor.is_resolved() {
                return self.descend_attribute(node, &step, rest).await;
            }
            if step.is_action() {
                descriptor.params = self.options.action_params.clone();
            }

            let response = self.send(descriptor).await?;
            self.responses.record(response.clone());

            match step.iteration() {
                None => self.descend(Arc::new(response), rest).await,
                Some(iteration) => self.fan_out(node, response, iteration, rest).await,
            }
        }
        .boxed()
    }

    fn leaf(&self, node: Arc<Value>) -> Value {
        match &self.options.only {
            Some(only) => only.apply(&node),
            None => Arc::try_unwrap(node).unwrap_or_else(|shared| shared.as_ref().clone()),
        }
    }

    /// Build the request descriptor a step points at; it may be unresolved.
    fn resolve(&self, node: &Value, step: &Step) -> QueryResult<RequestDescriptor> {
        if step.is_action() {
            let action = node
                .get(&self.config.actions_key)
                .and_then(|actions| actions.get(step.name()));
            return match action {
                Some(descriptor @ Value::Object(_)) => {
                    Ok(serde_json::from_value(descriptor.clone())?)
                }
                _ => Ok(RequestDescriptor::default()),
            };
        }

        let href = node
            .get(&self.config.links_key)
            .and_then(|links| links.get(step.name()))
            .and_then(|link| match link {
                Value::String(href) => Some(href.as_str()),
                Value::Object(_) => link.get("href").and_then(Value::as_str),
                _ => None,
            });
        Ok(href.map(RequestDescriptor::link).unwrap_or_default())
    }

    async fn descend_attribute(
        &self,
        node: Arc<Value>,
        step: &Step,
        rest: &str,
    ) -> QueryResult<Traversal> {
        let Some(child) = access::lookup_key(&node, step.name()).cloned() else {
            if self.strict {
                return Err(QueryError::Unresolved {
                    selector: self.selector.to_string(),
                });
            }
            warn!(selector = self.selector, step = %step, "could not traverse, pruning branch");
            return Ok(Traversal::Absent);
        };

        self.responses.record(child.clone());
        let result = self.descend(Arc::new(child), rest).await?;
        Ok(result.tag(&node))
    }

    async fn send(&self, descriptor: RequestDescriptor) -> QueryResult<Value> {
        let Some(transport) = self.transport else {
            let target = descriptor
                .path
                .clone()
                .or_else(|| descriptor.action.as_ref().map(Value::to_string))
                .unwrap_or_default();
            return Err(QueryError::NoTransport { target });
        };
        debug!(path = ?descriptor.path, action = ?descriptor.action, "sending request");
        transport
            .request(descriptor)
            .await
            .map_err(QueryError::Transport)
    }

    async fn fan_out(
        &self,
        node: Arc<Value>,
        response: Value,
        iteration: Iteration,
        rest: &str,
    ) -> QueryResult<Traversal> {
        let items = match response {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove(&self.config.items_key) {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };
        let selected: Vec<Value> = match iteration {
            Iteration::All => items,
            Iteration::Index(n) => items.into_iter().nth(n).into_iter().collect(),
        };
        debug!(count = selected.len(), remaining = rest, "fanning out");

        let branches = selected.into_iter().map(|item| {
            let origin = Arc::clone(&node);
            async move {
                let result = self.descend(Arc::new(item), rest).await?;
                Ok::<_, QueryError>(result.tag(&origin))
            }
        });
        Ok(Traversal::Branches(try_join_all(branches).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detached() -> Traverser {
        Traverser::detached(TraversalConfig::default())
    }

    #[tokio::test]
    async fn test_empty_selector_returns_node() {
        let node = json!({ "id": 7 });
        let outcome = detached()
            .query(&node, "", &QueryOptions::new(), &Responses::new())
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::One(Hit::new(node)));
    }

    #[tokio::test]
    async fn test_only_applies_at_leaf() {
        let node = json!({ "user": { "id": 1, "name": "Ada", "email": "a@b.c" } });
        let options = QueryOptions::new().only_keys(["id", "name"]);
        let outcome = detached()
            .query(&node, "user", &options, &Responses::new())
            .await
            .unwrap();
        assert_eq!(outcome.values(), vec![&json!({ "id": 1, "name": "Ada" })]);
    }

    #[tokio::test]
    async fn test_falsy_attribute_is_followed() {
        let node = json!({ "flag": false, "nothing": null });
        let traverser = detached();
        let strict = QueryOptions::new().strict(true);
        let flag = traverser
            .query(&node, "flag", &strict, &Responses::new())
            .await
            .unwrap();
        assert_eq!(flag.values(), vec![&json!(false)]);

        let nothing = traverser
            .query(&node, "nothing", &strict, &Responses::new())
            .await
            .unwrap();
        assert_eq!(nothing.values(), vec![&json!(null)]);
    }

    #[tokio::test]
    async fn test_attribute_descend_tags_origin() {
        let node = json!({ "a": { "b": 1 } });
        let outcome = detached()
            .query(&node, "a", &QueryOptions::new(), &Responses::new())
            .await
            .unwrap();
        let Outcome::One(hit) = outcome else {
            panic!("expected a single hit");
        };
        assert_eq!(hit.value, json!({ "b": 1 }));
        assert_eq!(hit.origin(), Some(&node));
    }

    #[tokio::test]
    async fn test_link_without_transport_fails() {
        let node = json!({ "links": { "next": "/page/2" } });
        let err = detached()
            .query(&node, "next", &QueryOptions::new(), &Responses::new())
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::NoTransport { ref target } if target == "/page/2"));
    }

    #[tokio::test]
    async fn test_strict_override_per_call() {
        let node = json!({});
        let traverser = Traverser::detached(TraversalConfig::default().with_strict(true));
        let lenient = traverser
            .query(&node, "missing", &QueryOptions::new().strict(false), &Responses::new())
            .await
            .unwrap();
        assert!(lenient.is_absent());

        let err = traverser
            .query(&node, "missing", &QueryOptions::new(), &Responses::new())
            .await
            .unwrap_err();
        assert!(err.is_unresolved());
    }

    #[tokio::test]
    async fn test_malformed_action_descriptor() {
        let node = json!({ "actions": { "pay": { "path": 42 } } });
        let transport = |_: RequestDescriptor| async move { Ok::<_, crate::BoxError>(json!({})) };
        let err = Traverser::new(transport, TraversalConfig::default())
            .query(&node, "@pay", &QueryOptions::new(), &Responses::new())
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Json(_)));
    }
}
