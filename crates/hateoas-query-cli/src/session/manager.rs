//! Query session: transport, traverser and the current root node.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};

use hateoas_query::{Outcome, QueryOptions, Traversal, TraversalConfig, Traverser};

use crate::config::CliConfig;
use crate::transport::HttpRequester;
use crate::types::{CliError, CliResult};

/// Holds everything needed to run selectors against one API.
pub struct QuerySession {
    http: Arc<HttpRequester>,
    traverser: Traverser,
    root: Value,
    root_source: String,
}

impl QuerySession {
    /// Build the transport from the config and load the root node.
    ///
    /// `root` may be `-` (stdin), a JSON file, or an href. Without it the
    /// base URL itself is fetched.
    pub async fn open(
        config: &CliConfig,
        base_url: Option<&str>,
        root: Option<&str>,
    ) -> CliResult<Self> {
        let http = Arc::new(HttpRequester::new(
            base_url,
            config.timeout_ms(),
            &config.headers,
        )?);
        let traverser = Traverser::with_transport(http.clone(), config.traversal.clone());

        let mut session = Self {
            http,
            traverser,
            root: Value::Null,
            root_source: String::new(),
        };
        session.load_root(root).await?;
        Ok(session)
    }

    /// Replace the root node.
    pub async fn load_root(&mut self, source: Option<&str>) -> CliResult<()> {
        let (root, label) = match source {
            Some("-") => (read_json(tokio::io::stdin()).await?, "<stdin>".to_string()),
            Some(path) if Path::new(path).is_file() => {
                let file = tokio::fs::File::open(path).await?;
                (read_json(file).await?, path.to_string())
            }
            Some(href) => {
                let url = self.http.resolve(href)?;
                (self.http.get(url.as_str()).await?, url.to_string())
            }
            None => {
                let url = self.http.base().cloned().ok_or_else(|| {
                    CliError::Config("no root given and no base URL configured".to_string())
                })?;
                (self.http.get(url.as_str()).await?, url.to_string())
            }
        };
        tracing::info!("Root loaded from {label}");
        self.root = root;
        self.root_source = label;
        Ok(())
    }

    /// Use an already-built node as root.
    pub fn set_root(&mut self, root: Value, label: impl Into<String>) {
        self.root = root;
        self.root_source = label.into();
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn root_source(&self) -> &str {
        &self.root_source
    }

    pub fn config(&self) -> &TraversalConfig {
        self.traverser.config()
    }

    /// Run a selector from the root and flatten the result.
    pub async fn query(
        &self,
        selector: &str,
        options: &QueryOptions,
    ) -> CliResult<(Outcome, Vec<Value>)> {
        tracing::debug!("query `{selector}` from {}", self.root_source);
        Ok(self.traverser.query_with(&self.root, selector, options).await?)
    }

    /// Run a selector from the root, keeping fan-out nesting.
    pub async fn query_isolated(
        &self,
        selector: &str,
        options: &QueryOptions,
    ) -> CliResult<(Traversal, Vec<Value>)> {
        tracing::debug!("isolated query `{selector}` from {}", self.root_source);
        Ok(self
            .traverser
            .query_isolated_with(&self.root, selector, options)
            .await?)
    }
}

/// Read a whole JSON document from an async reader.
async fn read_json<R: AsyncRead + Unpin>(mut reader: R) -> CliResult<Value> {
    let mut text = String::new();
    reader.read_to_string(&mut text).await?;
    Ok(serde_json::from_str(&text)?)
}
