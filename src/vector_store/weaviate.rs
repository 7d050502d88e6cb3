//! Weaviate GraphQL client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use serde_json::Value;
use tracing::debug;
use tracing::info;

use super::CandidateRecord;
use super::VectorStore;
use crate::config::AppConfig;
use crate::errors::Result;
use crate::errors::VedaRagError;

const RECORD_FIELDS: &str = "content source page category";

/// Read-only Weaviate client for one class
pub struct WeaviateStore {
    base_url: String,
    class_name: String,
    api_key: Option<String>,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    content: Option<String>,
    source: Option<String>,
    page: Option<i64>,
    category: Option<String>,
    #[serde(rename = "_additional", default)]
    additional: Option<Additional>,
}

#[derive(Debug, Deserialize)]
struct Additional {
    distance: Option<f32>,
    certainty: Option<f32>,
    /// BM25 score, Weaviate returns it as a string
    score: Option<Value>,
}

impl WeaviateStore {
    pub fn new(
        base_url: &str,
        class_name: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VedaRagError::HttpError(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            class_name: class_name.to_string(),
            api_key,
            client,
        })
    }

    /// Create from the `[vector_store]` config section
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            &config.vector_store.url,
            &config.vector_store.class_name,
            config.vector_store.api_key.clone(),
            config.vector_search_timeout(),
        )
    }

    fn near_vector_query(&self, embedding: &[f32], limit: usize) -> String {
        let vector = embedding
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "{{ Get {{ {class}(nearVector: {{vector: [{vector}]}}, limit: {limit}) \
             {{ {RECORD_FIELDS} _additional {{ distance certainty }} }} }} }}",
            class = self.class_name,
        )
    }

    fn bm25_query(&self, keywords: &str, limit: usize) -> String {
        // JSON string literals are valid GraphQL string literals
        let quoted = Value::String(keywords.to_string()).to_string();
        format!(
            "{{ Get {{ {class}(bm25: {{query: {quoted}}}, limit: {limit}) \
             {{ {RECORD_FIELDS} _additional {{ score }} }} }} }}",
            class = self.class_name,
        )
    }

    fn aggregate_query(&self) -> String {
        format!(
            "{{ Aggregate {{ {class}(groupBy: [\"category\"]) \
             {{ groupedBy {{ value }} meta {{ count }} }} }} }}",
            class = self.class_name,
        )
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn graphql(&self, query: String) -> Result<Value> {
        let url = format!("{}/v1/graphql", self.base_url);
        let response = self
            .request(self.client.post(&url))
            .json(&json!({ "query": query }))
            .send()
            .await
            .map_err(|e| VedaRagError::VectorStoreError(format!("Weaviate unreachable: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(VedaRagError::VectorStoreError(format!(
                "Weaviate error ({status}): {error_text}"
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            VedaRagError::VectorStoreError(format!("Failed to parse Weaviate response: {e}"))
        })?;

        if let Some(errors) = body.get("errors").filter(|e| !e.is_null()) {
            return Err(VedaRagError::VectorStoreError(format!(
                "GraphQL errors: {errors}"
            )));
        }

        Ok(body)
    }

    fn records_from(&self, body: &Value, root: &str) -> Result<Vec<RawRecord>> {
        let records = body
            .get("data")
            .and_then(|d| d.get(root))
            .and_then(|g| g.get(&self.class_name))
            .cloned()
            .ok_or_else(|| {
                VedaRagError::VectorStoreError(format!(
                    "Unexpected result structure, missing data.{root}.{}",
                    self.class_name
                ))
            })?;

        if records.is_null() {
            return Ok(Vec::new());
        }

        Ok(serde_json::from_value(records)?)
    }
}

/// Cosine distance to similarity, certainty when distance is absent
fn vector_relevance(additional: Option<&Additional>) -> f32 {
    match additional {
        Some(Additional {
            distance: Some(distance),
            ..
        }) => 1.0 - distance,
        Some(Additional {
            certainty: Some(certainty),
            ..
        }) => *certainty,
        _ => 0.0,
    }
}

/// Squash an unbounded BM25 score into [0, 1)
fn bm25_relevance(additional: Option<&Additional>) -> f32 {
    let score = additional
        .and_then(|a| a.score.as_ref())
        .and_then(|s| match s {
            Value::String(text) => text.parse::<f32>().ok(),
            Value::Number(n) => n.as_f64().map(|v| v as f32),
            _ => None,
        })
        .unwrap_or(0.0)
        .max(0.0);
    score / (1.0 + score)
}

fn into_candidates(records: Vec<RawRecord>, relevance: fn(Option<&Additional>) -> f32) -> Vec<CandidateRecord> {
    records
        .into_iter()
        .map(|record| CandidateRecord {
            relevance: relevance(record.additional.as_ref()),
            content: record.content.unwrap_or_default(),
            source: record.source.unwrap_or_default(),
            page: record.page.unwrap_or(0),
            category: record.category,
        })
        .collect()
}

#[async_trait]
impl VectorStore for WeaviateStore {
    async fn query(
        &self,
        embedding: &[f32],
        keywords: Option<&str>,
        top_n: usize,
    ) -> Result<Vec<CandidateRecord>> {
        debug!("Weaviate nearVector search, limit {}", top_n);
        let body = self.graphql(self.near_vector_query(embedding, top_n)).await?;
        let records = self.records_from(&body, "Get")?;

        if !records.is_empty() {
            return Ok(into_candidates(records, vector_relevance));
        }

        match keywords.map(str::trim).filter(|k| !k.is_empty()) {
            Some(keywords) => {
                info!("Vector search returned nothing, trying keyword-based fallback");
                let body = self.graphql(self.bm25_query(keywords, top_n)).await?;
                let records = self.records_from(&body, "Get")?;
                debug!("Keyword fallback found {} results", records.len());
                Ok(into_candidates(records, bm25_relevance))
            }
            None => Ok(Vec::new()),
        }
    }

    async fn count_by_category(&self) -> Result<Vec<(String, u64)>> {
        #[derive(Deserialize)]
        struct Group {
            #[serde(rename = "groupedBy")]
            grouped_by: GroupedBy,
            meta: Meta,
        }

        #[derive(Deserialize)]
        struct GroupedBy {
            value: Value,
        }

        #[derive(Deserialize)]
        struct Meta {
            count: u64,
        }

        let body = self.graphql(self.aggregate_query()).await?;
        let groups = body
            .get("data")
            .and_then(|d| d.get("Aggregate"))
            .and_then(|a| a.get(&self.class_name))
            .cloned()
            .unwrap_or(Value::Array(Vec::new()));
        let groups: Vec<Group> = serde_json::from_value(groups)?;

        Ok(groups
            .into_iter()
            .map(|group| {
                let label = match group.grouped_by.value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (label, group.meta.count)
            })
            .collect())
    }

    async fn health(&self) -> Result<()> {
        let url = format!("{}/v1/meta", self.base_url);
        let response = self
            .request(self.client.get(&url))
            .send()
            .await
            .map_err(|e| VedaRagError::VectorStoreError(format!("Weaviate unreachable: {e}")))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(VedaRagError::VectorStoreError(format!(
                "Weaviate is not accessible ({})",
                response.status()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> WeaviateStore {
        WeaviateStore::new(
            "http://localhost:8080/",
            "SpiritualText",
            None,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_near_vector_query_shape() {
        let query = store().near_vector_query(&[0.5, -0.25], 15);
        assert!(query.contains("SpiritualText(nearVector: {vector: [0.5,-0.25]}, limit: 15)"));
        assert!(query.contains("_additional { distance certainty }"));
    }

    #[test]
    fn test_bm25_query_escapes_keywords() {
        let query = store().bm25_query("karma \"yoga\"", 5);
        assert!(query.contains(r#"bm25: {query: "karma \"yoga\""}"#));
    }

    #[test]
    fn test_records_from_parses_get_payload() {
        let body = json!({
            "data": { "Get": { "SpiritualText": [
                {
                    "content": "Yoga is skill in action.",
                    "source": "gita.pdf",
                    "page": 12,
                    "category": "Gita",
                    "_additional": { "distance": 0.2, "certainty": 0.9 }
                },
                {
                    "content": "Untagged",
                    "source": "misc.pdf",
                    "page": null,
                    "category": null,
                    "_additional": { "distance": null, "certainty": 0.4 }
                }
            ]}}
        });

        let records = store().records_from(&body, "Get").unwrap();
        let candidates = into_candidates(records, vector_relevance);

        assert_eq!(candidates.len(), 2);
        assert!((candidates[0].relevance - 0.8).abs() < 1e-6);
        assert_eq!(candidates[0].category.as_deref(), Some("Gita"));
        assert_eq!(candidates[1].page, 0);
        assert!((candidates[1].relevance - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_records_from_missing_class_is_error() {
        let body = json!({ "data": { "Get": {} } });
        assert!(store().records_from(&body, "Get").is_err());
    }

    #[test]
    fn test_bm25_relevance_squashes_string_scores() {
        let additional = Additional {
            distance: None,
            certainty: None,
            score: Some(Value::String("3".to_string())),
        };
        assert!((bm25_relevance(Some(&additional)) - 0.75).abs() < 1e-6);
        assert!(bm25_relevance(None).abs() < f32::EPSILON);
    }
}
