//! HTTP implementation of the record store interface
//!
//! Talks to the platform's record API. One request per operation; no
//! retries here (the retry layer owns that).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::store::{FieldFilter, RecordStore};
use crate::types::{FieldMap, RemoteRecord, Result, SatchelError};

/// Record store backed by the platform's HTTP record API
pub struct HttpRecordStore {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct QueryBody {
    filter: FieldMap,
}

#[derive(Debug, Deserialize)]
struct RecordBody {
    id: String,
    fields: FieldMap,
}

impl HttpRecordStore {
    /// Create a store client against `base_url` (no trailing slash)
    pub fn new(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn post_json<B: Serialize>(&self, url: &str, body: &B) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| SatchelError::Remote(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(SatchelError::Remote(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        Ok(response)
    }
}

#[async_trait::async_trait]
impl RecordStore for HttpRecordStore {
    async fn query(&self, collection: &str, filter: &FieldFilter) -> Result<Vec<RemoteRecord>> {
        let url = self.url(&format!("records/{collection}/query"));

        let mut filter_fields = FieldMap::new();
        for (field, value) in filter.clauses() {
            filter_fields.insert(field.to_string(), value.clone());
        }

        let response = self
            .post_json(&url, &QueryBody {
                filter: filter_fields,
            })
            .await?;

        let records: Vec<RecordBody> = response
            .json()
            .await
            .map_err(|e| SatchelError::Remote(format!("Body read failed: {e}")))?;

        debug!(
            collection = collection,
            count = records.len(),
            "Record query completed"
        );

        Ok(records
            .into_iter()
            .map(|r| RemoteRecord::new(r.id, r.fields))
            .collect())
    }

    async fn create(&self, collection: &str, fields: FieldMap) -> Result<RemoteRecord> {
        let url = self.url(&format!("records/{collection}"));
        let response = self.post_json(&url, &Value::Object(fields)).await?;

        let record: RecordBody = response
            .json()
            .await
            .map_err(|e| SatchelError::Remote(format!("Body read failed: {e}")))?;

        debug!(collection = collection, id = %record.id, "Record created");

        Ok(RemoteRecord::new(record.id, record.fields))
    }

    async fn update(&self, collection: &str, id: &str, fields: FieldMap) -> Result<()> {
        let url = self.url(&format!("records/{collection}/{id}"));
        self.post_json(&url, &Value::Object(fields)).await?;

        debug!(collection = collection, id = id, "Record updated");
        Ok(())
    }
}
