//! Dataset loaders: lazy, paginated pulls of domain records from a `DatasetRegistry`.
//!
//! Every loader returns a finite, single-pass stream. Nothing is fetched until the
//! caller polls; dropping the stream stops further page requests. Rows that fail
//! mapping or validation are skipped, but a page fetch failure ends the stream with
//! a `LoadError` naming the dataset and offset.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::registry::{DatasetRegistry, FetchError, PageRequest, MAX_PAGE_SIZE};

pub mod jobs;
pub mod resumes;

#[cfg(test)]
pub(crate) mod test_support;

pub use jobs::{JobDescriptionLoader, JobRowMapping};
pub use resumes::ResumeLoader;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to fetch page of '{dataset}' at offset {offset}: {source}")]
    Fetch {
        dataset: String,
        offset: usize,
        #[source]
        source: FetchError,
    },
}

/// Which dataset, subset and split a loader pages through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSource {
    pub dataset: String,
    pub subset: String,
    pub split: String,
}

impl DatasetSource {
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            subset: "default".to_string(),
            split: "train".to_string(),
        }
    }

    pub fn with_subset(mut self, subset: impl Into<String>) -> Self {
        self.subset = subset.into();
        self
    }

    pub fn with_split(mut self, split: impl Into<String>) -> Self {
        self.split = split.into();
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Maximum number of records yielded (not rows fetched).
    pub limit: usize,
    /// Registry row offset the pull starts from.
    pub offset: usize,
    /// Case-insensitive substrings; when non-empty a record is kept only if its
    /// category contains one of them.
    pub categories: Vec<String>,
}

impl LoadOptions {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    /// A record without a category only passes when no filter is set.
    pub fn matches_category(&self, category: Option<&str>) -> bool {
        if self.categories.is_empty() {
            return true;
        }
        let Some(category) = category else {
            return false;
        };
        let category = category.to_lowercase();
        self.categories
            .iter()
            .any(|wanted| category.contains(&wanted.to_lowercase()))
    }
}

/// Returns the first non-blank value among `fields`, rendering numbers as text.
pub(crate) fn first_text(row: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| match row.get(*field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

struct Pager<F> {
    registry: Arc<dyn DatasetRegistry>,
    source: DatasetSource,
    offset: usize,
    limit: usize,
    yielded: usize,
    buffer: VecDeque<Value>,
    total: Option<usize>,
    finished: bool,
    /// Set once rows can be dropped by `map`; the remaining count then no
    /// longer predicts how many rows are needed.
    full_pages: bool,
    map: F,
}

impl<F> Pager<F> {
    fn next_request(&self) -> PageRequest {
        PageRequest {
            dataset: self.source.dataset.clone(),
            subset: self.source.subset.clone(),
            split: self.source.split.clone(),
            offset: self.offset,
            length: if self.full_pages {
                MAX_PAGE_SIZE
            } else {
                (self.limit - self.yielded).min(MAX_PAGE_SIZE)
            },
        }
    }

    fn source_exhausted(&self) -> bool {
        self.total.is_some_and(|total| self.offset >= total)
    }
}

/// Pages through `source` in registry order, mapping each row with `map` until
/// `options.limit` records have been yielded or the registry runs out of rows.
pub(crate) fn paged_records<T, F>(
    registry: Arc<dyn DatasetRegistry>,
    source: DatasetSource,
    options: &LoadOptions,
    map: F,
) -> BoxStream<'static, Result<T, LoadError>>
where
    T: Send + 'static,
    F: FnMut(Value) -> Option<T> + Send + 'static,
{
    let pager = Pager {
        registry,
        source,
        offset: options.offset,
        limit: options.limit,
        yielded: 0,
        buffer: VecDeque::new(),
        total: None,
        finished: false,
        full_pages: !options.categories.is_empty(),
        map,
    };

    stream::unfold(pager, |mut pager| async move {
        loop {
            if pager.finished || pager.yielded >= pager.limit {
                return None;
            }

            if let Some(row) = pager.buffer.pop_front() {
                if let Some(record) = (pager.map)(row) {
                    pager.yielded += 1;
                    return Some((Ok(record), pager));
                }
                pager.full_pages = true;
                continue;
            }

            if pager.source_exhausted() {
                return None;
            }

            let request = pager.next_request();
            match pager.registry.fetch_page(&request).await {
                Ok(page) => {
                    if page.rows.is_empty() {
                        debug!(
                            dataset = %pager.source.dataset,
                            offset = pager.offset,
                            "registry returned an empty page, stopping"
                        );
                        return None;
                    }
                    pager.offset += page.rows.len();
                    pager.total = page.num_rows_total.map(|n| n as usize);
                    pager.buffer.extend(page.rows.into_iter().map(|r| r.row));
                }
                Err(source) => {
                    pager.finished = true;
                    let err = LoadError::Fetch {
                        dataset: pager.source.dataset.clone(),
                        offset: request.offset,
                        source,
                    };
                    return Some((Err(err), pager));
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::test_support::InMemoryRegistry;
    use super::*;
    use futures::TryStreamExt;
    use serde_json::json;

    fn numbered(n: usize) -> Vec<Value> {
        (0..n).map(|i| json!({ "n": i })).collect()
    }

    fn pull(
        registry: &Arc<InMemoryRegistry>,
        options: &LoadOptions,
    ) -> BoxStream<'static, Result<u64, LoadError>> {
        paged_records(
            registry.clone(),
            DatasetSource::new("acme/rows"),
            options,
            |row| row["n"].as_u64(),
        )
    }

    #[tokio::test]
    async fn test_pages_in_batches_of_at_most_one_hundred() {
        let registry = Arc::new(InMemoryRegistry::new(numbered(250)));
        let records: Vec<u64> = pull(&registry, &LoadOptions::new(1000))
            .try_collect()
            .await
            .unwrap();

        assert_eq!(records, (0..250).collect::<Vec<_>>());
        let requests = registry.requests();
        let windows: Vec<(usize, usize)> = requests.iter().map(|r| (r.offset, r.length)).collect();
        assert_eq!(windows, vec![(0, 100), (100, 100), (200, 100)]);
    }

    #[tokio::test]
    async fn test_stops_at_limit_and_shrinks_last_page() {
        let registry = Arc::new(InMemoryRegistry::new(numbered(250)));
        let records: Vec<u64> = pull(&registry, &LoadOptions::new(130).with_offset(10))
            .try_collect()
            .await
            .unwrap();

        assert_eq!(records.len(), 130);
        assert_eq!(records[0], 10);
        let windows: Vec<(usize, usize)> =
            registry.requests().iter().map(|r| (r.offset, r.length)).collect();
        assert_eq!(windows, vec![(10, 100), (110, 30)]);
    }

    #[tokio::test]
    async fn test_skipped_rows_switch_to_full_pages() {
        let mut rows = numbered(250);
        rows[0] = json!({"x": 0});
        let registry = Arc::new(InMemoryRegistry::new(rows));
        let records: Vec<u64> = pull(&registry, &LoadOptions::new(100))
            .try_collect()
            .await
            .unwrap();

        assert_eq!(records.len(), 100);
        assert_eq!(records[99], 100);
        let windows: Vec<(usize, usize)> =
            registry.requests().iter().map(|r| (r.offset, r.length)).collect();
        assert_eq!(windows, vec![(0, 100), (100, 100)]);
    }

    #[tokio::test]
    async fn test_category_filter_requests_full_pages() {
        let registry = Arc::new(InMemoryRegistry::new(numbered(250)));
        let options = LoadOptions::new(5).with_categories(vec!["sales".to_string()]);
        let records: Vec<u64> = pull(&registry, &options).try_collect().await.unwrap();

        assert_eq!(records.len(), 5);
        let windows: Vec<(usize, usize)> =
            registry.requests().iter().map(|r| (r.offset, r.length)).collect();
        assert_eq!(windows, vec![(0, 100)]);
    }

    #[tokio::test]
    async fn test_same_options_yield_same_sequence() {
        let registry = Arc::new(InMemoryRegistry::new(numbered(40)));
        let options = LoadOptions::new(25).with_offset(5);
        let first: Vec<u64> = pull(&registry, &options).try_collect().await.unwrap();
        let second: Vec<u64> = pull(&registry, &options).try_collect().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_unmapped_rows_are_skipped_and_do_not_count() {
        let rows = vec![json!({"n": 1}), json!({"x": 0}), json!({"n": 2}), json!({"n": 3})];
        let registry = Arc::new(InMemoryRegistry::new(rows));
        let records: Vec<u64> = pull(&registry, &LoadOptions::new(3))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(records, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_page_failure_names_dataset_and_offset() {
        let registry = Arc::new(InMemoryRegistry::new(numbered(250)).failing_at(100));
        let mut stream = pull(&registry, &LoadOptions::new(1000));

        let mut ok = 0;
        let mut failure = None;
        while let Some(item) = stream.next().await {
            match item {
                Ok(_) => ok += 1,
                Err(e) => failure = Some(e),
            }
        }

        assert_eq!(ok, 100);
        let LoadError::Fetch { dataset, offset, .. } = failure.expect("fetch failure surfaced");
        assert_eq!(dataset, "acme/rows");
        assert_eq!(offset, 100);
        assert_eq!(registry.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_early_stop_issues_no_further_requests() {
        let registry = Arc::new(InMemoryRegistry::new(numbered(500)));
        let taken: Vec<_> = pull(&registry, &LoadOptions::new(500)).take(5).collect().await;
        assert_eq!(taken.len(), 5);
        assert_eq!(registry.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_nothing_fetched_until_polled() {
        let registry = Arc::new(InMemoryRegistry::new(numbered(10)));
        let _stream = pull(&registry, &LoadOptions::new(10));
        assert!(registry.requests().is_empty());
    }

    #[tokio::test]
    async fn test_reported_total_avoids_trailing_request() {
        let registry = Arc::new(InMemoryRegistry::new(numbered(100)));
        let records: Vec<u64> = pull(&registry, &LoadOptions::new(500))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(records.len(), 100);
        assert_eq!(registry.requests().len(), 1);
    }

    #[test]
    fn test_category_filter_is_case_insensitive_substring() {
        let options = LoadOptions::new(1).with_categories(vec!["engineer".to_string()]);
        assert!(options.matches_category(Some("Software ENGINEERING")));
        assert!(!options.matches_category(Some("Sales")));
        assert!(!options.matches_category(None));
        assert!(LoadOptions::new(1).matches_category(None));
    }

    #[test]
    fn test_first_text_skips_blank_and_renders_numbers() {
        let row = json!({"a": "  ", "b": 7, "c": "x"});
        assert_eq!(first_text(&row, &["a", "b", "c"]).as_deref(), Some("7"));
        assert_eq!(first_text(&row, &["missing"]), None);
    }
}
