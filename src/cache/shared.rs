//! Shared remote cache client
//!
//! A deployment-wide cache service sitting between the local tier and the
//! authoritative record store: `POST {action, cacheKey, sourceQuery}`
//! returning `{data}`. The service is optional; its absence or any error
//! degrades silently to a direct store fetch.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{Result, SatchelError};

/// Trait for the shared cache tier (allows stubbing in tests)
#[async_trait::async_trait]
pub trait SharedCache: Send + Sync {
    /// Look up a cached payload; `Ok(None)` is a miss
    async fn lookup(&self, cache_key: &str, source_query: &str) -> Result<Option<String>>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupBody<'a> {
    action: &'a str,
    cache_key: &'a str,
    source_query: &'a str,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    data: Option<String>,
}

/// Shared cache service reached over HTTP
pub struct HttpSharedCache {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpSharedCache {
    pub fn new(endpoint: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            endpoint: endpoint.into(),
            client,
        }
    }
}

#[async_trait::async_trait]
impl SharedCache for HttpSharedCache {
    async fn lookup(&self, cache_key: &str, source_query: &str) -> Result<Option<String>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&LookupBody {
                action: "get",
                cache_key,
                source_query,
            })
            .send()
            .await
            .map_err(|e| SatchelError::Remote(format!("Shared cache request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(SatchelError::Remote(format!(
                "Shared cache HTTP {}",
                response.status()
            )));
        }

        let body: LookupResponse = response
            .json()
            .await
            .map_err(|e| SatchelError::Remote(format!("Shared cache body read failed: {e}")))?;

        debug!(
            cache_key = cache_key,
            hit = body.data.is_some(),
            "Shared cache lookup"
        );

        Ok(body.data)
    }
}
