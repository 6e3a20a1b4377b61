//! SplatNet GraphQL query client
//!
//! Executes named queries with JSON variables and hands back a [`QueryResponse`]
//! addressed by path. Token minting and persisted-query hashing live outside
//! this crate; [`HttpQueryClient`] just POSTs the operation with a bearer token.

use async_trait::async_trait;
use serde_json::Value;

mod client;
mod response;

pub use client::{HttpQueryClient, HttpQueryConfig};
pub use response::{PathSeg, QueryResponse};

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("upstream GraphQL error: {0}")]
    Graphql(String),

    #[error("response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("path not found in response: {path}")]
    PathNotFound { path: String },

    #[error("unexpected value at {path}: expected {expected}")]
    UnexpectedType { path: String, expected: &'static str },
}

/// Anything that can run a named upstream query.
#[async_trait]
pub trait QueryClient: Send + Sync {
    async fn query(&self, name: &str, variables: Value) -> Result<QueryResponse, QueryError>;
}
