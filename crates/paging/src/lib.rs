#![forbid(unsafe_code)]
// Allow pedantic lints for early-stage API ergonomics.
#![allow(clippy::nursery)]
#![allow(clippy::pedantic)]

//! # Paging
//!
//! Paginated data tables for the admin dashboard.
//!
//! A [`PaginatedTableController`] owns the paging state of one table and keeps
//! two rendered regions consistent with the backend:
//! - the **rows**, drawn by a [`RowRenderer`] ([`TextTable`] by default)
//! - the **pagination controls**, drawn by a [`PaginationRenderer`]
//!   ([`TextPagination`] by default)
//!
//! Data comes from a [`PageFetcher`], the only backend contract the controller
//! knows. Renderers talk back through events ([`PageChange`],
//! [`RowsPerPageChange`], [`TableAction`]) on the shared [`stage::EventBus`].
//!
//! ## Example
//!
//! ```rust
//! use paging::prelude::*;
//! use serde_json::json;
//! use stage::{Document, EventBus};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let document = Document::new();
//! let root = document.content_root();
//! document
//!     .set_inner_html(&root, r#"<div id="donor-table"></div><div id="donor-pager"></div>"#)
//!     .unwrap();
//!
//! let fetcher = fetcher_fn(|request: PageRequest| async move {
//!     let data = (request.offset..(request.offset + request.limit).min(57))
//!         .map(|i| json!({"id": i, "name": format!("Donor {i}")}).as_object().unwrap().clone())
//!         .collect();
//!     Ok(PageResult { data, total_items: 57 })
//! });
//!
//! let table = PaginatedTableController::new(
//!     document.clone(),
//!     EventBus::new(),
//!     TableConfig::new("donor-table", "donor-pager").headers(["Name"]),
//!     fetcher,
//! )
//! .unwrap();
//!
//! table.init().await;
//! table.go_to_page(3).await;
//! assert_eq!(table.state().current_page, 3);
//! assert!(document.content_of("donor-table").unwrap().contains("1057"));
//! # });
//! ```

pub mod controller;
pub mod controls;
pub mod events;
pub mod fetch;
pub mod paginator;
pub mod render;
pub mod table;

pub use controller::{
    CycleOutcome, DEFAULT_START_SERIAL, PaginatedTableController, TableConfig, TableError,
};
pub use controls::TextPagination;
pub use events::{PageChange, RowsPerPageChange, TableAction};
pub use fetch::{FetchError, PageFetcher, PageResult, Row, fetcher_fn};
pub use paginator::{
    DEFAULT_PAGE_SIZE, PAGE_SIZES, PageControl, PageRequest, PageWindow, PaginationState,
};
pub use render::{PaginationRenderer, RowRenderer, TableView};
pub use table::TextTable;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::controller::{CycleOutcome, PaginatedTableController, TableConfig};
    pub use crate::events::{PageChange, RowsPerPageChange, TableAction};
    pub use crate::fetch::{FetchError, PageFetcher, PageResult, Row, fetcher_fn};
    pub use crate::paginator::{PageRequest, PaginationState};
}
