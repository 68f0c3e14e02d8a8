//! GraphQL indexer transport. One of two interchangeable back-ends behind
//! the adapter contract; any failure here makes the adapter fall back to
//! its RPC path.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::ReadError;

/// Per-call timeout for indexer reads.
pub const INDEXER_TIMEOUT: Duration = Duration::from_secs(15);

/// A GraphQL query transport keyed by subgraph id.
#[async_trait]
pub trait Indexer: Send + Sync {
    async fn request(
        &self,
        subgraph_id: &str,
        query: &str,
        variables: Value,
    ) -> Result<Value, ReadError>;
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// The Graph gateway client. Requires an API key; without one the config
/// layer never enables the indexer path.
pub struct GraphClient {
    http: reqwest::Client,
    api_key: String,
    timeout: Duration,
}

impl GraphClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        GraphClient {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            timeout: INDEXER_TIMEOUT,
        }
    }
}

#[async_trait]
impl Indexer for GraphClient {
    async fn request(
        &self,
        subgraph_id: &str,
        query: &str,
        variables: Value,
    ) -> Result<Value, ReadError> {
        let url = format!(
            "https://gateway.thegraph.com/api/{}/subgraphs/id/{subgraph_id}",
            self.api_key
        );
        let body = json!({ "query": query, "variables": variables });

        let send = self.http.post(&url).json(&body).send();
        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| ReadError::IndexerUnavailable("timed out".to_string()))?
            .map_err(|e| ReadError::IndexerUnavailable(e.to_string()))?;

        let parsed: GraphQlResponse = response
            .json()
            .await
            .map_err(|e| ReadError::IndexerUnavailable(e.to_string()))?;

        if let Some(errors) = parsed.errors {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(ReadError::IndexerUnavailable(messages.join("; ")));
        }
        match parsed.data {
            Some(data) => {
                debug!(subgraph_id, "indexer query ok");
                Ok(data)
            }
            None => Err(ReadError::IndexerUnavailable(
                "response carried no data".to_string(),
            )),
        }
    }
}
