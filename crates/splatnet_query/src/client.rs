use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::{QueryClient, QueryError, QueryResponse};

const DEFAULT_USER_AGENT: &str = "xrank-live/0.1";

#[derive(Debug, Clone)]
pub struct HttpQueryConfig {
    /// GraphQL endpoint, e.g. `https://api.lp1.av5ja.srv.nintendo.net/api/graphql`
    pub endpoint: String,
    /// Bearer token minted by whatever handles the upstream login flow.
    pub bearer_token: String,
    pub timeout: Duration,
    pub user_agent: String,
    pub language: String,
}

impl HttpQueryConfig {
    pub fn new(endpoint: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            bearer_token: bearer_token.into(),
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            language: "en-US".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GqlEnvelope {
    data: Option<Value>,
    errors: Option<Vec<GqlError>>,
}

#[derive(Debug, Deserialize)]
struct GqlError {
    message: String,
}

/// GraphQL-over-HTTP client. One POST per query, no retries.
pub struct HttpQueryClient {
    client: reqwest::Client,
    endpoint: String,
    bearer_token: String,
}

impl HttpQueryClient {
    pub fn new(cfg: HttpQueryConfig) -> Result<Self, QueryError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Ok(lang) = HeaderValue::from_str(&cfg.language) {
            headers.insert(ACCEPT_LANGUAGE, lang);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(cfg.timeout)
            .user_agent(cfg.user_agent)
            .build()?;

        Ok(Self {
            client,
            endpoint: cfg.endpoint,
            bearer_token: cfg.bearer_token,
        })
    }
}

#[async_trait]
impl QueryClient for HttpQueryClient {
    async fn query(&self, name: &str, variables: Value) -> Result<QueryResponse, QueryError> {
        debug!(query = name, %variables, "splatnet query");

        let body = json!({ "operationName": name, "variables": variables });
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.bearer_token)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(QueryError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let envelope: GqlEnvelope = serde_json::from_str(&text)?;
        unwrap_envelope(envelope)
    }
}

/// Any GraphQL `errors` entry fails the whole query; otherwise `data` becomes the response root.
fn unwrap_envelope(envelope: GqlEnvelope) -> Result<QueryResponse, QueryError> {
    if let Some(errors) = envelope.errors.filter(|e| !e.is_empty()) {
        let msg = errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(QueryError::Graphql(msg));
    }

    match envelope.data {
        Some(data) if !data.is_null() => Ok(QueryResponse::new(data)),
        _ => Err(QueryError::Graphql("response carried no data".to_string())),
    }
}
