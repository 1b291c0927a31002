//! Render collaborator contracts.
//!
//! The controller hands rows to a [`RowRenderer`] and paging metadata to a
//! [`PaginationRenderer`]. Both write into a document element and wire their
//! affordances to events; neither calls back into the controller.

use stage::{Document, DocumentError, ElementRef};

use crate::fetch::Row;
use crate::paginator::PaginationState;

/// Shown in the table container while a page is being fetched.
pub const LOADING_TEXT: &str = "Loading data...";

/// Shown in the table container when the backend has no rows.
pub const NO_DATA_TEXT: &str = "No data available";

/// Shown in the table container when the fetch failed.
pub const FETCH_FAILED_TEXT: &str = "Failed to load data.";

/// Everything a row renderer needs to draw one page.
#[derive(Debug, Clone, Copy)]
pub struct TableView<'a> {
    /// Rows of the current page.
    pub rows: &'a [Row],
    /// Column headers; derived from the first row when empty.
    pub headers: &'a [String],
    /// Per-row actions (`View`, `Edit`, `Delete`, ...).
    pub dropdown_actions: &'a [String],
    /// Tag carried by every [`crate::events::TableAction`] from this table.
    pub page_key: &'a str,
    /// Serial number of the first row of the whole dataset.
    pub start_serial: u64,
    /// Offset of the first row of this page.
    pub offset: usize,
    /// Whether to draw a trailing select column.
    pub has_select_column: bool,
}

impl TableView<'_> {
    /// Serial number displayed for the row at `index` on this page.
    #[must_use]
    pub fn serial(&self, index: usize) -> u64 {
        self.start_serial + (self.offset + index) as u64
    }
}

/// Draws a page of rows into a container.
pub trait RowRenderer: Send + Sync {
    fn render_rows(
        &self,
        document: &Document,
        container: &ElementRef,
        view: &TableView<'_>,
    ) -> Result<(), DocumentError>;
}

/// Draws the page-size selector and page navigation into a container.
pub trait PaginationRenderer: Send + Sync {
    fn render_pagination(
        &self,
        document: &Document,
        container: &ElementRef,
        state: &PaginationState,
    ) -> Result<(), DocumentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_uses_start_and_offset() {
        let view = TableView {
            rows: &[],
            headers: &[],
            dropdown_actions: &[],
            page_key: "users",
            start_serial: 1001,
            offset: 50,
            has_select_column: false,
        };
        assert_eq!(view.serial(0), 1051);
        assert_eq!(view.serial(6), 1057);
    }
}
