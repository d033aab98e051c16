//! HTTP transport wrapping reqwest.
//!
//! Links are fetched with `GET`. Actions use the descriptor's `method`
//! (default `POST`) and send `params` as a JSON body, or as the query string
//! for `GET`. No retries and no caching.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::Method;
use serde_json::Value;
use url::Url;

use hateoas_query::{BoxError, RequestDescriptor, Requester};

use crate::types::{CliError, CliResult};

/// Transport that resolves hrefs against a base URL and speaks JSON.
#[derive(Debug, Clone)]
pub struct HttpRequester {
    client: reqwest::Client,
    base: Option<Url>,
}

impl HttpRequester {
    /// Create a client with the given base URL, timeout and extra headers.
    pub fn new(
        base_url: Option<&str>,
        timeout_ms: u64,
        headers: &BTreeMap<String, String>,
    ) -> CliResult<Self> {
        let base = base_url.map(Url::parse).transpose()?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| CliError::Config(format!("invalid header name `{name}`: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| CliError::Config(format!("invalid value for header `{name}`: {e}")))?;
            default_headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(concat!("hq/", env!("CARGO_PKG_VERSION")))
            .default_headers(default_headers)
            .build()?;

        Ok(Self { client, base })
    }

    pub fn base(&self) -> Option<&Url> {
        self.base.as_ref()
    }

    /// Turn an href into an absolute URL.
    pub fn resolve(&self, href: &str) -> CliResult<Url> {
        match Url::parse(href) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.base {
                Some(base) => Ok(base.join(href)?),
                None => Err(CliError::NoBaseUrl(href.to_string())),
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch a single resource with `GET`.
    pub async fn get(&self, href: &str) -> CliResult<Value> {
        let url = self.resolve(href)?;
        self.send(Method::GET, url, None).await
    }

    /// Perform the request a descriptor describes.
    pub async fn fetch(&self, descriptor: RequestDescriptor) -> CliResult<Value> {
        let href = descriptor
            .path
            .as_deref()
            .or_else(|| descriptor.extra.get("href").and_then(Value::as_str))
            .ok_or_else(|| {
                CliError::NoTarget(serde_json::to_string(&descriptor).unwrap_or_default())
            })?;
        let url = self.resolve(href)?;

        let method = match descriptor.extra.get("method").and_then(Value::as_str) {
            Some(name) => Method::from_bytes(name.to_uppercase().as_bytes())
                .map_err(|_| CliError::InvalidMethod(name.to_string()))?,
            None if descriptor.action.is_some() => Method::POST,
            None => Method::GET,
        };

        self.send(method, url, descriptor.params).await
    }

    async fn send(&self, method: Method, url: Url, params: Option<Value>) -> CliResult<Value> {
        tracing::debug!("{method} {url}");
        let mut builder = self.client.request(method.clone(), url.clone());
        match params {
            None | Some(Value::Null) if method == Method::GET => {}
            Some(Value::Object(map)) if method == Method::GET => {
                let pairs: Vec<(String, String)> = map
                    .into_iter()
                    .map(|(k, v)| match v {
                        Value::String(s) => (k, s),
                        other => (k, other.to_string()),
                    })
                    .collect();
                builder = builder.query(&pairs);
            }
            Some(other) if method == Method::GET => {
                return Err(CliError::InvalidParams(format!(
                    "GET {url} needs an object to build a query string, got {other}"
                )));
            }
            Some(body) => builder = builder.json(&body),
            None => {}
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CliError::Status {
                method: method.to_string(),
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl Requester for HttpRequester {
    async fn request(&self, descriptor: RequestDescriptor) -> Result<Value, BoxError> {
        self.fetch(descriptor).await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requester(base: Option<&str>) -> HttpRequester {
        HttpRequester::new(base, 1000, &BTreeMap::new()).unwrap()
    }

    #[test]
    fn test_resolve_relative_against_base() {
        let http = requester(Some("https://api.example.com/v1/"));
        assert_eq!(
            http.resolve("orders/7").unwrap().as_str(),
            "https://api.example.com/v1/orders/7"
        );
        assert_eq!(
            http.resolve("/root").unwrap().as_str(),
            "https://api.example.com/root"
        );
    }

    #[test]
    fn test_resolve_absolute_ignores_base() {
        let http = requester(Some("https://api.example.com/"));
        assert_eq!(
            http.resolve("https://other.example.com/x").unwrap().as_str(),
            "https://other.example.com/x"
        );
    }

    #[test]
    fn test_relative_without_base_fails() {
        let err = requester(None).resolve("/orders").unwrap_err();
        assert!(matches!(err, CliError::NoBaseUrl(ref p) if p == "/orders"));
    }

    #[test]
    fn test_invalid_header_is_config_error() {
        let mut headers = BTreeMap::new();
        headers.insert("bad header".to_string(), "x".to_string());
        let err = HttpRequester::new(None, 1000, &headers).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn test_descriptor_without_target() {
        let http = requester(Some("https://api.example.com/"));
        let descriptor = RequestDescriptor {
            action: Some(Value::String("refresh".into())),
            ..RequestDescriptor::default()
        };
        let err = tokio_test::block_on(http.fetch(descriptor)).unwrap_err();
        assert!(matches!(err, CliError::NoTarget(ref d) if d.contains("refresh")));
    }
}
