//! The paginated table controller.
//!
//! One controller owns the paging state of one table. Every state change
//! (init, refresh, page change, page-size change) takes a ticket and runs a
//! fetch-render cycle. A cycle whose ticket is no longer the latest when its
//! fetch resolves is discarded, so the screen always reflects the most recently
//! requested state, not the fastest response.
//!
//! # Example
//!
//! ```rust
//! use paging::{PaginatedTableController, TableConfig, CycleOutcome};
//! use paging::fetch::{PageResult, fetcher_fn};
//! use stage::{Document, EventBus};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let document = Document::new();
//! let root = document.content_root();
//! document
//!     .set_inner_html(&root, r#"<div id="users-table"></div><div id="users-pager"></div>"#)
//!     .unwrap();
//!
//! let fetcher = fetcher_fn(|_request| async { Ok(PageResult::empty()) });
//! let table = PaginatedTableController::new(
//!     document.clone(),
//!     EventBus::new(),
//!     TableConfig::new("users-table", "users-pager").page_key("users"),
//!     fetcher,
//! )
//! .unwrap();
//!
//! assert_eq!(table.init().await, CycleOutcome::Empty);
//! assert_eq!(document.content_of("users-table").unwrap(), "No data available");
//! # });
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use stage::{Document, DocumentError, ElementRef, EventBus, Subscription};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, error, warn};

use crate::controls::TextPagination;
use crate::events::{PageChange, RowsPerPageChange};
use crate::fetch::{FetchError, PageFetcher};
use crate::paginator::{
    DEFAULT_PAGE_SIZE, PageRequest, PaginationState, is_allowed_page_size,
};
use crate::render::{
    FETCH_FAILED_TEXT, LOADING_TEXT, PaginationRenderer, RowRenderer, TableView,
};
use crate::table::TextTable;

/// Serial number of the first row of a dataset unless configured otherwise.
pub const DEFAULT_START_SERIAL: u64 = 1001;

/// Static description of one paginated table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    /// Id of the element rows are rendered into.
    pub table_container: String,
    /// Id of the element pagination controls are rendered into.
    pub pagination_container: String,
    pub headers: Vec<String>,
    pub dropdown_actions: Vec<String>,
    pub page_key: String,
    pub start_serial: u64,
    /// Page size `init()` resets to.
    pub default_items_per_page: usize,
    pub has_select_column: bool,
}

impl TableConfig {
    /// Config for the given containers with default paging.
    pub fn new(table_container: impl Into<String>, pagination_container: impl Into<String>) -> Self {
        Self {
            table_container: table_container.into(),
            pagination_container: pagination_container.into(),
            headers: Vec::new(),
            dropdown_actions: Vec::new(),
            page_key: String::new(),
            start_serial: DEFAULT_START_SERIAL,
            default_items_per_page: DEFAULT_PAGE_SIZE,
            has_select_column: false,
        }
    }

    /// Sets the column headers.
    #[must_use]
    pub fn headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the per-row actions.
    #[must_use]
    pub fn dropdown_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dropdown_actions = actions.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the tag carried by row actions.
    #[must_use]
    pub fn page_key(mut self, key: impl Into<String>) -> Self {
        self.page_key = key.into();
        self
    }

    /// Sets the serial number of the first row.
    #[must_use]
    pub fn start_serial(mut self, serial: u64) -> Self {
        self.start_serial = serial;
        self
    }

    /// Sets the initial page size.
    #[must_use]
    pub fn items_per_page(mut self, n: usize) -> Self {
        self.default_items_per_page = n.max(1);
        self
    }

    /// Adds a trailing select column.
    #[must_use]
    pub fn select_column(mut self, enabled: bool) -> Self {
        self.has_select_column = enabled;
        self
    }
}

/// Errors raised while setting up a table.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TableError {
    /// A container the table renders into is not in the document.
    #[error("table container #{0} not found")]
    MissingContainer(String),
}

/// How one fetch-render cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Rows and pagination were drawn for `request`.
    Rendered { request: PageRequest, rows: usize },
    /// The backend reported no items; placeholders were drawn.
    Empty,
    /// The fetch failed; the error placeholder was drawn.
    Failed(FetchError),
    /// A newer request was made while this one was in flight.
    Superseded,
    /// The table's containers left the document.
    Detached,
    /// The request was invalid and nothing was fetched.
    Rejected,
}

#[derive(Debug, Clone, Copy)]
enum Intent {
    Reset,
    Refresh,
    Page(usize),
    PageSize(usize),
}

/// Decrements the in-flight counter when dropped.
struct InFlight {
    counter: Arc<watch::Sender<usize>>,
}

impl InFlight {
    fn begin(counter: &Arc<watch::Sender<usize>>) -> Self {
        counter.send_modify(|n| *n += 1);
        Self {
            counter: Arc::clone(counter),
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.counter.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Keeps one table's rows and pagination consistent with the backend.
pub struct PaginatedTableController {
    config: TableConfig,
    document: Document,
    bus: EventBus,
    fetcher: Arc<dyn PageFetcher>,
    row_renderer: Arc<dyn RowRenderer>,
    pagination_renderer: Arc<dyn PaginationRenderer>,
    table: ElementRef,
    pager: ElementRef,
    state: Mutex<PaginationState>,
    ticket: AtomicU64,
    bindings: Mutex<Vec<Subscription>>,
    in_flight: Arc<watch::Sender<usize>>,
    this: Weak<Self>,
}

impl fmt::Debug for PaginatedTableController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaginatedTableController")
            .field("page_key", &self.config.page_key)
            .field("state", &*self.state.lock())
            .field("ticket", &self.ticket.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl PaginatedTableController {
    /// Creates a controller drawing with [`TextTable`] and [`TextPagination`].
    pub fn new(
        document: Document,
        bus: EventBus,
        config: TableConfig,
        fetcher: impl PageFetcher + 'static,
    ) -> Result<Arc<Self>, TableError> {
        Self::with_renderers(
            document,
            bus,
            config,
            Arc::new(fetcher),
            Arc::new(TextTable::new()),
            Arc::new(TextPagination::new()),
        )
    }

    /// Creates a controller with explicit collaborators.
    ///
    /// Fails when either container is missing from the document.
    pub fn with_renderers(
        document: Document,
        bus: EventBus,
        config: TableConfig,
        fetcher: Arc<dyn PageFetcher>,
        row_renderer: Arc<dyn RowRenderer>,
        pagination_renderer: Arc<dyn PaginationRenderer>,
    ) -> Result<Arc<Self>, TableError> {
        let table = document
            .get_element_by_id(&config.table_container)
            .ok_or_else(|| TableError::MissingContainer(config.table_container.clone()))?;
        let pager = document
            .get_element_by_id(&config.pagination_container)
            .ok_or_else(|| TableError::MissingContainer(config.pagination_container.clone()))?;
        let (in_flight, _) = watch::channel(0);
        let state = PaginationState::new(config.default_items_per_page);

        Ok(Arc::new_cyclic(|this| Self {
            config,
            document,
            bus,
            fetcher,
            row_renderer,
            pagination_renderer,
            table,
            pager,
            state: Mutex::new(state),
            ticket: AtomicU64::new(0),
            bindings: Mutex::new(Vec::new()),
            in_flight: Arc::new(in_flight),
            this: this.clone(),
        }))
    }

    /// The table's configuration.
    #[must_use]
    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Snapshot of the paging state.
    #[must_use]
    pub fn state(&self) -> PaginationState {
        *self.state.lock()
    }

    /// Element rows are rendered into.
    #[must_use]
    pub fn table_element(&self) -> &ElementRef {
        &self.table
    }

    /// Element pagination controls are rendered into.
    #[must_use]
    pub fn pagination_element(&self) -> &ElementRef {
        &self.pager
    }

    /// Resets to page 1 at the default page size and runs a cycle.
    pub async fn init(&self) -> CycleOutcome {
        self.run(Intent::Reset).await
    }

    /// Re-fetches the current page, keeping page and page size.
    pub async fn refresh(&self) -> CycleOutcome {
        self.run(Intent::Refresh).await
    }

    /// Moves to page `n`. Out-of-range pages are rejected with a warning.
    pub async fn go_to_page(&self, n: usize) -> CycleOutcome {
        self.run(Intent::Page(n)).await
    }

    /// Changes the page size and returns to page 1.
    ///
    /// Sizes outside [`crate::paginator::PAGE_SIZES`] are rejected.
    pub async fn set_items_per_page(&self, n: usize) -> CycleOutcome {
        self.run(Intent::PageSize(n)).await
    }

    /// Resolves once no cycle is in flight, including ones started by events.
    pub async fn wait_idle(&self) {
        let mut rx = self.in_flight.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    async fn run(&self, intent: Intent) -> CycleOutcome {
        let _guard = InFlight::begin(&self.in_flight);
        match self.apply(intent) {
            Some(ticket) => self.cycle(ticket).await,
            None => CycleOutcome::Rejected,
        }
    }

    /// Applies `intent` to the state and takes a ticket for the cycle.
    fn apply(&self, intent: Intent) -> Option<u64> {
        let mut state = self.state.lock();
        match intent {
            Intent::Reset => {
                *state = PaginationState::new(self.config.default_items_per_page);
            }
            Intent::Refresh => {}
            Intent::Page(n) => {
                if !state.is_valid_page(n) {
                    warn!(
                        page_key = %self.config.page_key,
                        page = n,
                        total_pages = state.total_pages(),
                        "invalid page number"
                    );
                    return None;
                }
                state.current_page = n;
            }
            Intent::PageSize(n) => {
                if !is_allowed_page_size(n) {
                    warn!(page_key = %self.config.page_key, size = n, "page size not offered");
                    return None;
                }
                state.items_per_page = n;
                state.current_page = 1;
            }
        }
        Some(self.ticket.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.ticket.load(Ordering::SeqCst) == ticket
    }

    /// Starts a cycle from an event handler without awaiting it.
    fn dispatch(&self, intent: Intent) {
        let Ok(handle) = Handle::try_current() else {
            warn!(page_key = %self.config.page_key, ?intent, "no runtime to run the table update");
            return;
        };
        let Some(this) = self.this.upgrade() else {
            return;
        };
        let guard = InFlight::begin(&self.in_flight);
        let Some(ticket) = self.apply(intent) else {
            return;
        };
        handle.spawn(async move {
            let _guard = guard;
            this.cycle(ticket).await;
        });
    }

    async fn cycle(&self, ticket: u64) -> CycleOutcome {
        let mut request = {
            let state = self.state.lock();
            if !self.is_current(ticket) {
                return CycleOutcome::Superseded;
            }
            if let Err(err) = self.show_loading() {
                return self.detached(&err);
            }
            state.request()
        };

        loop {
            debug!(
                page_key = %self.config.page_key,
                ticket,
                limit = request.limit,
                offset = request.offset,
                "fetching page"
            );
            let result = self.fetcher.fetch_page(request).await;

            let mut state = self.state.lock();
            if !self.is_current(ticket) {
                debug!(page_key = %self.config.page_key, ticket, "stale page discarded");
                return CycleOutcome::Superseded;
            }

            let page = match result {
                Ok(page) => page,
                Err(err) => {
                    error!(page_key = %self.config.page_key, error = %err, "failed to load page");
                    let shown = self
                        .document
                        .set_text(&self.table, FETCH_FAILED_TEXT)
                        .and_then(|_| self.document.clear(&self.pager));
                    if let Err(detach) = shown {
                        return self.detached(&detach);
                    }
                    return CycleOutcome::Failed(err);
                }
            };

            state.total_items = page.total_items;
            let total_pages = state.total_pages();
            if total_pages == 0 {
                state.current_page = 1;
            } else if state.current_page > total_pages {
                state.current_page = total_pages;
            }
            let clamped = state.request();
            // Offsets only shrink here, so the correction always ends.
            if clamped.offset < request.offset {
                debug!(
                    page_key = %self.config.page_key,
                    page = state.current_page,
                    "current page out of range, refetching last page"
                );
                request = clamped;
                if let Err(err) = self.show_loading() {
                    return self.detached(&err);
                }
                continue;
            }

            let view = TableView {
                rows: &page.data,
                headers: &self.config.headers,
                dropdown_actions: &self.config.dropdown_actions,
                page_key: &self.config.page_key,
                start_serial: self.config.start_serial,
                offset: request.offset,
                has_select_column: self.config.has_select_column,
            };
            let rendered = self
                .row_renderer
                .render_rows(&self.document, &self.table, &view)
                .and_then(|()| {
                    self.pagination_renderer
                        .render_pagination(&self.document, &self.pager, &state)
                });
            if let Err(err) = rendered {
                return self.detached(&err);
            }
            drop(state);

            self.bind();
            return if page.total_items == 0 {
                CycleOutcome::Empty
            } else {
                CycleOutcome::Rendered {
                    request,
                    rows: page.data.len(),
                }
            };
        }
    }

    fn show_loading(&self) -> Result<(), DocumentError> {
        self.document.set_text(&self.table, LOADING_TEXT)?;
        self.document.clear(&self.pager)?;
        Ok(())
    }

    fn detached(&self, err: &DocumentError) -> CycleOutcome {
        debug!(page_key = %self.config.page_key, error = %err, "table left the document");
        self.bindings.lock().clear();
        CycleOutcome::Detached
    }

    /// Replaces the pagination listeners with exactly one of each.
    fn bind(&self) {
        let mut bindings = self.bindings.lock();
        bindings.clear();

        let this = self.this.clone();
        bindings.push(self.bus.subscribe::<RowsPerPageChange, _>(
            self.pager.target(),
            move |e| {
                if let Some(controller) = this.upgrade() {
                    controller.dispatch(Intent::PageSize(e.new_items_per_page));
                }
            },
        ));

        let this = self.this.clone();
        bindings.push(
            self.bus
                .subscribe::<PageChange, _>(self.pager.target(), move |e| {
                    if let Some(controller) = this.upgrade() {
                        controller.dispatch(Intent::Page(e.new_page));
                    }
                }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{PageResult, fetcher_fn};

    fn document_with(ids: &[&str]) -> Document {
        let document = Document::new();
        let root = document.content_root();
        let html: String = ids.iter().map(|id| format!(r#"<div id="{id}"></div>"#)).collect();
        document.set_inner_html(&root, &html).unwrap();
        document
    }

    #[test]
    fn test_config_builder() {
        let config = TableConfig::new("t", "p")
            .headers(["Name", "Email"])
            .dropdown_actions(["View"])
            .page_key("users")
            .start_serial(1)
            .items_per_page(10)
            .select_column(true);
        assert_eq!(config.headers, vec!["Name", "Email"]);
        assert_eq!(config.default_items_per_page, 10);
        assert_eq!(config.start_serial, 1);
        assert!(config.has_select_column);
    }

    #[test]
    fn test_missing_container() {
        let document = document_with(&["t"]);
        let err = PaginatedTableController::new(
            document,
            EventBus::new(),
            TableConfig::new("t", "p"),
            fetcher_fn(|_| async { Ok(PageResult::empty()) }),
        )
        .unwrap_err();
        assert_eq!(err, TableError::MissingContainer("p".into()));
    }

    #[test]
    fn test_apply_takes_increasing_tickets() {
        let document = document_with(&["t", "p"]);
        let table = PaginatedTableController::new(
            document,
            EventBus::new(),
            TableConfig::new("t", "p"),
            fetcher_fn(|_| async { Ok(PageResult::empty()) }),
        )
        .unwrap();

        assert_eq!(table.apply(Intent::Refresh), Some(1));
        assert_eq!(table.apply(Intent::Page(2)), None);
        assert_eq!(table.apply(Intent::PageSize(7)), None);
        assert_eq!(table.apply(Intent::PageSize(10)), Some(2));
        assert!(table.is_current(2));
        assert_eq!(table.state().items_per_page, 10);
    }
}
