//! HTTP client for the record service.
//!
//! The service is a single JSON collection: `GET {base}` lists every
//! record, `{base}{id}` addresses one. Students and teachers share it.

use async_trait::async_trait;
use reqwest::{header, Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::Record;

use super::{ApiError, RecordApi};

/// API client for the record service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the endpoint and timeout in `config`.
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> &str {
        &self.base_url
    }

    fn item_url(&self, id: &str) -> String {
        format!("{}{}", self.base_url, id.trim_matches('/'))
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Read the body as text and decode it, so a malformed body is reported
    /// as a decode error rather than a transport error.
    async fn parse<T: DeserializeOwned>(response: Response, url: &str) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            warn!(url = url, error = %e, "Failed to parse response body");
            ApiError::Decode(e)
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<T, ApiError> {
        let response = request.send().await?;
        let response = Self::check_response(response).await?;
        Self::parse(response, url).await
    }
}

/// Decode the collection leniently: entries with an unknown category are
/// skipped instead of failing the whole list.
fn records_from_values(values: Vec<serde_json::Value>) -> Vec<Record> {
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<Record>(value.clone()) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(
                    id = ?value.get("id"),
                    category = ?value.get("category"),
                    error = %e,
                    "Skipping unrecognized record"
                );
                None
            }
        })
        .collect()
}

#[async_trait]
impl RecordApi for ApiClient {
    async fn list(&self) -> Result<Vec<Record>, ApiError> {
        let url = self.collection_url();
        debug!(url = url, "GET collection");
        let values: Vec<serde_json::Value> = self.send_json(self.client.get(url), url).await?;
        let total = values.len();
        let records = records_from_values(values);
        debug!(total, kept = records.len(), "Collection received");
        Ok(records)
    }

    async fn get(&self, id: &str) -> Result<Record, ApiError> {
        let url = self.item_url(id);
        debug!(url = %url, "GET record");
        self.send_json(self.client.get(&url), &url).await
    }

    async fn create(&self, record: &Record) -> Result<Record, ApiError> {
        let url = self.collection_url();
        debug!(url = url, category = %record.category(), "POST record");
        let request = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&record.without_id());
        self.send_json(request, url).await
    }

    async fn replace(&self, id: &str, record: &Record) -> Result<Record, ApiError> {
        let url = self.item_url(id);
        debug!(url = %url, category = %record.category(), "PUT record");
        let request = self
            .client
            .put(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(record);
        self.send_json(request, &url).await
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let url = self.item_url(id);
        debug!(url = %url, "DELETE record");
        let response = self.client.delete(&url).send().await?;
        // The deleted record comes back in the body; nothing needs it
        Self::check_response(response).await?;
        Ok(())
    }
}
