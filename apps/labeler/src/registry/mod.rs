//! Dataset registry access: paginated row reads against an external dataset server.
//!
//! Loaders only see the `DatasetRegistry` trait; `ResilientFetchClient` is the
//! production implementation and owns all retry/timeout behaviour.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

pub mod client;
pub mod transport;

pub use client::{FetchOptions, ResilientFetchClient};
pub use transport::{HttpReply, HttpTransport, ReqwestTransport};

/// The registry serves at most this many rows per page.
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("registry returned retriable status {status}: {message}")]
    RetriableStatus { status: u16, message: String },

    #[error("registry returned status {status}: {message}")]
    NonRetriable { status: u16, message: String },

    #[error("malformed registry payload: {0}")]
    Malformed(String),

    #[error("invalid registry url: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Whether another attempt at the same request could plausibly succeed.
    pub fn is_retriable(&self) -> bool {
        match self {
            FetchError::Transport(_)
            | FetchError::Timeout(_)
            | FetchError::RetriableStatus { .. }
            | FetchError::Malformed(_) => true,
            FetchError::NonRetriable { .. } | FetchError::InvalidUrl(_) => false,
        }
    }
}

/// One page request: `GET /rows?dataset=..&config=..&split=..&offset=..&length=..`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub dataset: String,
    pub subset: String,
    pub split: String,
    pub offset: usize,
    pub length: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageResponse {
    #[serde(default)]
    pub rows: Vec<RegistryRow>,
    #[serde(default)]
    pub num_rows_total: Option<u64>,
    #[serde(default)]
    pub num_rows_per_page: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryRow {
    #[serde(default)]
    pub row_idx: Option<u64>,
    pub row: serde_json::Value,
}

/// Row count of one split, from `GET /info?dataset=..`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetInfo {
    pub dataset: String,
    pub num_rows: Option<u64>,
}

#[async_trait]
pub trait DatasetRegistry: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResponse, FetchError>;

    async fn dataset_info(
        &self,
        dataset: &str,
        subset: &str,
        split: &str,
    ) -> Result<DatasetInfo, FetchError>;
}
