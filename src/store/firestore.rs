use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::client::DocumentStore;
use super::config::StoreConfig;
use super::types::Document;

/// Minimal REST client for a Firestore-style document store.
pub struct FirestoreClient {
    http: reqwest::Client,
    config: StoreConfig,
}

#[derive(Debug, Deserialize)]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

/// Wire shape of one stored document: a full resource name plus fields
/// wrapped in the store's typed value envelope.
#[derive(Debug, Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl FirestoreClient {
    const PAGE_SIZE: u32 = 300;

    pub fn new(config: StoreConfig) -> anyhow::Result<Self> {
        let timeout = Duration::from_millis(config.http_timeout_ms.max(1));
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build document store HTTP client")?;

        Ok(Self { http, config })
    }

    fn collection_url(&self, collection: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!(
            "{base}/projects/{}/databases/{}/documents/{}",
            self.config.project_id, self.config.database, collection
        )
    }

    fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.config.api_token {
            builder.bearer_auth(token)
        } else {
            builder
        }
    }

    async fn fetch_page(
        &self,
        collection: &str,
        page_token: Option<&str>,
    ) -> anyhow::Result<ListDocumentsResponse> {
        let mut request = self
            .apply_auth(self.http.get(self.collection_url(collection)))
            .query(&[("pageSize", Self::PAGE_SIZE.to_string())]);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Document store request for '{collection}' failed"))?
            .error_for_status()
            .with_context(|| format!("Document store returned error status for '{collection}'"))?;

        response
            .json::<ListDocumentsResponse>()
            .await
            .with_context(|| format!("Failed to deserialize document list for '{collection}'"))
    }
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn list_all(&self, collection: &str) -> anyhow::Result<Vec<Document>> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.fetch_page(collection, page_token.as_deref()).await?;
            documents.extend(page.documents.iter().map(|raw| {
                Document::new(document_id(&raw.name), flatten_fields(&raw.fields))
            }));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(collection, count = documents.len(), "Fetched collection");
        Ok(documents)
    }
}

/// The store names documents as `projects/.../documents/<collection>/<id>`;
/// only the trailing segment is the record key.
fn document_id(name: &str) -> String {
    name.rsplit('/').next().unwrap_or(name).to_string()
}

fn flatten_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), flatten_value(value)))
        .collect()
}

/// Collapse the store's typed value envelope (`{"stringValue": ...}` and
/// friends) into plain JSON values.
fn flatten_value(value: &Value) -> Value {
    let Some(envelope) = value.as_object() else {
        return Value::Null;
    };

    if let Some(text) = envelope.get("stringValue") {
        return text.clone();
    }
    if let Some(raw) = envelope.get("integerValue") {
        // Integers arrive as decimal strings to survive 64-bit precision.
        return raw
            .as_str()
            .and_then(|digits| digits.parse::<i64>().ok())
            .map(Value::from)
            .unwrap_or_else(|| raw.clone());
    }
    if let Some(number) = envelope.get("doubleValue") {
        return number.clone();
    }
    if let Some(flag) = envelope.get("booleanValue") {
        return flag.clone();
    }
    if envelope.contains_key("nullValue") {
        return Value::Null;
    }
    if let Some(raw) = envelope.get("timestampValue") {
        return Value::String(normalize_timestamp(raw));
    }
    if let Some(reference) = envelope.get("referenceValue") {
        return reference.clone();
    }
    if let Some(array) = envelope.get("arrayValue") {
        let items = array
            .get("values")
            .and_then(Value::as_array)
            .map(|values| values.iter().map(flatten_value).collect())
            .unwrap_or_default();
        return Value::Array(items);
    }
    if let Some(map) = envelope.get("mapValue") {
        let fields = map
            .get("fields")
            .and_then(Value::as_object)
            .map(flatten_fields)
            .unwrap_or_default();
        return Value::Object(fields);
    }

    Value::Null
}

fn normalize_timestamp(raw: &Value) -> String {
    let text = raw.as_str().unwrap_or_default();
    match DateTime::parse_from_rfc3339(text) {
        Ok(timestamp) => timestamp.to_rfc3339(),
        Err(_) => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_id_strips_resource_path() {
        let name = "projects/demo/databases/(default)/documents/events/ev42";
        assert_eq!(document_id(name), "ev42");
        assert_eq!(document_id("bare"), "bare");
    }

    #[test]
    fn scalar_envelopes_flatten_to_plain_json() {
        assert_eq!(
            flatten_value(&json!({ "stringValue": "Campus Hall" })),
            json!("Campus Hall")
        );
        assert_eq!(flatten_value(&json!({ "integerValue": "50000" })), json!(50000));
        assert_eq!(flatten_value(&json!({ "doubleValue": 0.5 })), json!(0.5));
        assert_eq!(flatten_value(&json!({ "booleanValue": true })), json!(true));
        assert_eq!(flatten_value(&json!({ "nullValue": null })), Value::Null);
    }

    #[test]
    fn nested_envelopes_flatten_recursively() {
        let value = json!({
            "mapValue": {
                "fields": {
                    "tags": { "arrayValue": { "values": [
                        { "stringValue": "tech" },
                        { "integerValue": "7" },
                    ]}},
                }
            }
        });

        assert_eq!(flatten_value(&value), json!({ "tags": ["tech", 7] }));
    }

    #[test]
    fn timestamps_are_normalized_when_parseable() {
        let parsed = flatten_value(&json!({ "timestampValue": "2024-12-01T10:00:00Z" }));
        assert_eq!(parsed, json!("2024-12-01T10:00:00+00:00"));

        let passthrough = flatten_value(&json!({ "timestampValue": "not-a-date" }));
        assert_eq!(passthrough, json!("not-a-date"));
    }

    #[test]
    fn unknown_envelopes_become_null() {
        assert_eq!(flatten_value(&json!({ "geoPointValue": {} })), Value::Null);
        assert_eq!(flatten_value(&json!("bare string")), Value::Null);
    }
}
