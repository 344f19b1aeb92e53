//! Lookup service
//!
//! Read-only access to person records, including pending ones.

use crate::error::AppError;
use crate::registry::{PersonRecord, RecordStore};
use futures_util::Stream;
use std::sync::Arc;

/// Default number of records fetched per store round-trip
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Record lookup
pub struct LookupService {
    store: Arc<dyn RecordStore>,
    page_size: usize,
}

impl LookupService {
    /// Create a new lookup service
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self::with_page_size(store, DEFAULT_PAGE_SIZE)
    }

    /// Create a lookup service that pages through the store `page_size` records at a time
    pub fn with_page_size(store: Arc<dyn RecordStore>, page_size: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
        }
    }

    /// Get a record by key, in whatever state it currently is
    pub async fn get_by_key(&self, key: &str) -> Result<PersonRecord, AppError> {
        self.store
            .get(key)
            .await?
            .ok_or_else(|| AppError::NotFound(key.to_string()))
    }

    /// One page of records, ascending by key, starting after `after`
    pub async fn list_page(
        &self,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PersonRecord>, AppError> {
        Ok(self.store.list_page(after, limit).await?)
    }

    /// Every record, ascending by key
    ///
    /// The stream is lazy: pages are fetched as it is polled. It ends after
    /// the first short page or the first error. Call again to restart.
    pub fn list_all(&self) -> impl Stream<Item = Result<PersonRecord, AppError>> + Send + 'static {
        let store = Arc::clone(&self.store);
        let page_size = self.page_size;

        async_stream::try_stream! {
            let mut after: Option<String> = None;
            loop {
                let page = store.list_page(after.as_deref(), page_size).await?;
                let exhausted = page.len() < page_size;
                if let Some(last) = page.last() {
                    after = Some(last.key.clone());
                }
                for record in page {
                    yield record;
                }
                if exhausted {
                    break;
                }
            }
        }
    }
}
