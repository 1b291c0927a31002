//! The fetch collaborator contract.
//!
//! A [`PageFetcher`] is the only way the controller reaches the backend. It
//! returns an empty page with `total_items == 0` for "no results" and reserves
//! errors for genuine failures.

use std::future::Future;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::paginator::PageRequest;

/// One record as handed to the row renderer. The controller never looks inside.
pub type Row = Map<String, Value>;

/// One page of rows plus the backend's authoritative item count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    pub data: Vec<Row>,
    pub total_items: usize,
}

impl PageResult {
    /// An empty result set.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

/// A fetch that could not produce a page.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The backend could not be reached.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with a failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Supplies pages of rows for one table.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches at most `request.limit` rows starting at `request.offset`.
    async fn fetch_page(&self, request: PageRequest) -> Result<PageResult, FetchError>;
}

#[async_trait]
impl<T: PageFetcher + ?Sized> PageFetcher for std::sync::Arc<T> {
    async fn fetch_page(&self, request: PageRequest) -> Result<PageResult, FetchError> {
        (**self).fetch_page(request).await
    }
}

/// [`PageFetcher`] backed by a closure returning a future.
pub struct FnFetcher<F> {
    f: F,
}

/// Wraps a closure as a [`PageFetcher`].
///
/// ```rust
/// use paging::fetch::{PageFetcher, PageResult, fetcher_fn};
///
/// let fetcher = fetcher_fn(|request| async move {
///     assert_eq!(request.limit, 10);
///     Ok(PageResult::empty())
/// });
/// # let _ = &fetcher as &dyn PageFetcher;
/// ```
pub fn fetcher_fn<F, Fut>(f: F) -> FnFetcher<F>
where
    F: Fn(PageRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<PageResult, FetchError>> + Send + 'static,
{
    FnFetcher { f }
}

#[async_trait]
impl<F, Fut> PageFetcher for FnFetcher<F>
where
    F: Fn(PageRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<PageResult, FetchError>> + Send + 'static,
{
    async fn fetch_page(&self, request: PageRequest) -> Result<PageResult, FetchError> {
        (self.f)(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_result_wire_shape() {
        let parsed: PageResult = serde_json::from_value(json!({
            "data": [{"id": 1, "name": "Ada"}],
            "totalItems": 57
        }))
        .unwrap();
        assert_eq!(parsed.total_items, 57);
        assert_eq!(parsed.data.len(), 1);
        assert_eq!(parsed.data[0]["name"], json!("Ada"));
    }

    #[test]
    fn test_fetch_error_display() {
        assert_eq!(
            FetchError::Transport("connection reset".into()).to_string(),
            "transport error: connection reset"
        );
    }
}
