//! Transport abstraction: how link and action steps reach the network.

use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;

use crate::types::{BoxError, RequestDescriptor};

/// Sends a request descriptor and returns the response node.
///
/// Implementations own timeouts, retries and caching; the traverser only
/// awaits the result and passes failures through.
#[async_trait]
pub trait Requester: Send + Sync {
    async fn request(&self, descriptor: RequestDescriptor) -> Result<Value, BoxError>;
}

#[async_trait]
impl<F, Fut> Requester for F
where
    F: Fn(RequestDescriptor) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
{
    async fn request(&self, descriptor: RequestDescriptor) -> Result<Value, BoxError> {
        self(descriptor).await
    }
}
