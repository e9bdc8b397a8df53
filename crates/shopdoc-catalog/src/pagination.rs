//! Cursor-driven accumulation of catalog pages.
//!
//! The catalog hands back an opaque `endCursor` and a `hasNextPage` flag with
//! every page. [`Paginator`] threads that cursor through a
//! [`PaginationState`] until the source reports no further pages, appending
//! each page's products in order.
//!
//! A page failure stops the loop immediately. [`Paginator::fetch_all`] then
//! discards what was collected; [`Paginator::run`] keeps it alongside the
//! error for callers that explicitly opt into a best-effort export.

use std::future::Future;
use std::time::Duration;

use crate::error::CatalogError;
use crate::types::{PageResult, RawProduct};

/// Default loop guard: at 100 products per page this covers 100k products.
pub const DEFAULT_MAX_PAGES: usize = 1_000;

/// A paginated product source.
pub trait ProductSource {
    /// Fetches the page that follows `cursor` (`None` means from the start).
    fn fetch_page(
        &self,
        cursor: Option<&str>,
        page_size: u32,
    ) -> impl Future<Output = Result<PageResult, CatalogError>> + Send;
}

/// Cursor and accumulator for one pagination run.
#[derive(Debug, Default)]
pub struct PaginationState {
    cursor: Option<String>,
    products: Vec<RawProduct>,
    pages: usize,
    done: bool,
}

impl PaginationState {
    /// Starts a run. An empty `start_cursor` means "from the beginning".
    #[must_use]
    pub fn new(start_cursor: Option<&str>) -> Self {
        Self {
            cursor: start_cursor
                .filter(|c| !c.is_empty())
                .map(str::to_owned),
            ..Self::default()
        }
    }

    /// Cursor for the next request.
    #[must_use]
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Number of pages applied so far.
    #[must_use]
    pub fn pages(&self) -> usize {
        self.pages
    }

    #[must_use]
    pub fn products(&self) -> &[RawProduct] {
        &self.products
    }

    /// Appends `page` and advances the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::BrokenCursor`] when the page claims more
    /// results but its cursor is missing or did not move. The state is left
    /// untouched, so resuming from [`Self::cursor`] refetches that page
    /// without duplicating what was already collected.
    pub fn apply(&mut self, page: PageResult) -> Result<(), CatalogError> {
        let next_cursor = if page.has_next_page {
            match page.next_cursor.filter(|c| !c.is_empty()) {
                Some(next) if self.cursor.as_deref() != Some(next.as_str()) => Some(next),
                _ => {
                    return Err(CatalogError::BrokenCursor {
                        page: self.pages + 1,
                    })
                }
            }
        } else {
            self.done = true;
            page.next_cursor
        };

        self.pages += 1;
        self.products.extend(page.products);
        if next_cursor.is_some() {
            self.cursor = next_cursor;
        }
        Ok(())
    }

    #[must_use]
    pub fn into_products(self) -> Vec<RawProduct> {
        self.products
    }
}

/// Result of a pagination run, successful or not.
#[derive(Debug)]
pub struct FetchOutcome {
    /// Products from every page applied before the run stopped.
    pub products: Vec<RawProduct>,
    /// Pages successfully fetched.
    pub pages: usize,
    /// Cursor after the last applied page. Resuming from it refetches the
    /// page that failed.
    pub last_cursor: Option<String>,
    pub error: Option<CatalogError>,
}

impl FetchOutcome {
    /// All-or-nothing view of the outcome.
    ///
    /// # Errors
    ///
    /// Returns the error that stopped the run, discarding partial products.
    pub fn into_result(self) -> Result<Vec<RawProduct>, CatalogError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.products),
        }
    }
}

/// Drives a [`ProductSource`] page by page.
#[derive(Debug, Clone)]
pub struct Paginator {
    page_size: u32,
    max_pages: usize,
    inter_request_delay_ms: u64,
}

impl Paginator {
    #[must_use]
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size,
            max_pages: DEFAULT_MAX_PAGES,
            inter_request_delay_ms: 0,
        }
    }

    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Pause between page requests (not applied before the first).
    #[must_use]
    pub fn with_inter_request_delay_ms(mut self, delay_ms: u64) -> Self {
        self.inter_request_delay_ms = delay_ms;
        self
    }

    /// Fetches every page, returning all products in source order.
    ///
    /// **All-or-nothing**: on any page failure the already-fetched products
    /// are dropped and the error is returned.
    ///
    /// # Errors
    ///
    /// Propagates the first page error, [`CatalogError::BrokenCursor`], or
    /// [`CatalogError::PaginationLimit`].
    pub async fn fetch_all<S: ProductSource>(
        &self,
        source: &S,
        start_cursor: Option<&str>,
    ) -> Result<Vec<RawProduct>, CatalogError> {
        self.run(source, start_cursor).await.into_result()
    }

    /// Fetches pages until the source is exhausted or a request fails,
    /// keeping whatever was collected.
    pub async fn run<S: ProductSource>(
        &self,
        source: &S,
        start_cursor: Option<&str>,
    ) -> FetchOutcome {
        let mut state = PaginationState::new(start_cursor);
        let error = self.drive(source, &mut state).await.err();

        if let Some(err) = &error {
            tracing::error!(
                pages = state.pages(),
                products = state.products().len(),
                resume_cursor = state.cursor().unwrap_or(""),
                error = %err,
                "catalog pagination stopped"
            );
        }

        FetchOutcome {
            pages: state.pages(),
            last_cursor: state.cursor().map(str::to_owned),
            products: state.into_products(),
            error,
        }
    }

    async fn drive<S: ProductSource>(
        &self,
        source: &S,
        state: &mut PaginationState,
    ) -> Result<(), CatalogError> {
        while !state.is_done() {
            if state.pages() >= self.max_pages {
                return Err(CatalogError::PaginationLimit {
                    max_pages: self.max_pages,
                });
            }

            if state.pages() > 0 && self.inter_request_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.inter_request_delay_ms)).await;
            }

            let page = source.fetch_page(state.cursor(), self.page_size).await?;
            let fetched = page.products.len();
            let has_next_page = page.has_next_page;
            state.apply(page)?;

            tracing::info!(
                page = state.pages(),
                products = fetched,
                total = state.products().len(),
                has_next_page,
                cursor = state.cursor().unwrap_or(""),
                "fetched catalog page"
            );
        }
        Ok(())
    }
}
