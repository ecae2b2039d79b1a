//! In-memory registry double shared by loader, pairing and generator tests.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::registry::{
    DatasetInfo, DatasetRegistry, FetchError, PageRequest, PageResponse, RegistryRow,
};

pub(crate) struct InMemoryRegistry {
    rows: Vec<Value>,
    fail_at: Option<usize>,
    requests: Mutex<Vec<PageRequest>>,
}

impl InMemoryRegistry {
    pub(crate) fn new(rows: Vec<Value>) -> Self {
        Self {
            rows,
            fail_at: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Page requests starting at `offset` fail with a 502.
    pub(crate) fn failing_at(mut self, offset: usize) -> Self {
        self.fail_at = Some(offset);
        self
    }

    pub(crate) fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl DatasetRegistry for InMemoryRegistry {
    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResponse, FetchError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail_at == Some(request.offset) {
            return Err(FetchError::RetriableStatus {
                status: 502,
                message: "bad gateway".to_string(),
            });
        }

        let start = request.offset.min(self.rows.len());
        let end = (request.offset + request.length).min(self.rows.len());
        Ok(PageResponse {
            rows: self.rows[start..end]
                .iter()
                .enumerate()
                .map(|(i, row)| RegistryRow {
                    row_idx: Some((start + i) as u64),
                    row: row.clone(),
                })
                .collect(),
            num_rows_total: Some(self.rows.len() as u64),
            num_rows_per_page: Some(request.length as u64),
        })
    }

    async fn dataset_info(
        &self,
        dataset: &str,
        _subset: &str,
        _split: &str,
    ) -> Result<DatasetInfo, FetchError> {
        Ok(DatasetInfo {
            dataset: dataset.to_string(),
            num_rows: Some(self.rows.len() as u64),
        })
    }
}
