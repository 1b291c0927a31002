//! Pagination state and the sliding page-number window.
//!
//! Pages are 1-indexed. A table with zero items has zero pages, but its
//! current page is still 1.
//!
//! # Example
//!
//! ```rust
//! use paging::paginator::{PageControl, PageWindow, PaginationState};
//!
//! let mut state = PaginationState::new(25);
//! state.total_items = 57;
//! assert_eq!(state.total_pages(), 3);
//!
//! state.current_page = 3;
//! assert_eq!(state.request().offset, 50);
//!
//! let window = PageWindow::new(state.current_page, state.total_pages());
//! assert!(matches!(window.controls().last(), Some(PageControl::Next { enabled: false, .. })));
//! ```

use serde::{Deserialize, Serialize};

/// Page sizes offered by the rows-per-page selector.
pub const PAGE_SIZES: [usize; 5] = [5, 10, 25, 50, 100];

/// Page size used when a table does not configure one.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Numbered buttons shown at most in the page window.
pub const MAX_PAGE_BUTTONS: usize = 5;

/// Returns whether `n` is one of the selectable page sizes.
#[must_use]
pub fn is_allowed_page_size(n: usize) -> bool {
    PAGE_SIZES.contains(&n)
}

/// A `(limit, offset)` request for one page of rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    /// Maximum rows to return. Always positive.
    pub limit: usize,
    /// Rows to skip.
    pub offset: usize,
}

/// Paging state owned by one table controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationState {
    /// Current page (1-indexed).
    pub current_page: usize,
    /// Rows per page.
    pub items_per_page: usize,
    /// Item count last reported by the backend.
    pub total_items: usize,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl PaginationState {
    /// Fresh state on page 1 with no known items.
    #[must_use]
    pub fn new(items_per_page: usize) -> Self {
        Self {
            current_page: 1,
            items_per_page: items_per_page.max(1),
            total_items: 0,
        }
    }

    /// Number of pages for the current item count (0 when there are no items).
    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.total_items.div_ceil(self.items_per_page.max(1))
    }

    /// Offset of the first row on the current page.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.current_page.saturating_sub(1) * self.items_per_page
    }

    /// The request that fetches the current page.
    #[must_use]
    pub fn request(&self) -> PageRequest {
        PageRequest {
            limit: self.items_per_page,
            offset: self.offset(),
        }
    }

    /// Whether `page` addresses an existing page.
    #[must_use]
    pub fn is_valid_page(&self, page: usize) -> bool {
        page >= 1 && page <= self.total_pages()
    }
}

/// One element of the page navigation bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageControl {
    /// "Previous" button targeting `target`.
    Previous { target: usize, enabled: bool },
    /// A numbered page button.
    Page { number: usize, active: bool },
    /// A gap between non-adjacent page buttons.
    Ellipsis,
    /// "Next" button targeting `target`.
    Next { target: usize, enabled: bool },
}

/// Sliding window of numbered page buttons around the current page.
///
/// At most `max_buttons` consecutive numbers are shown. When the window does
/// not reach the first or last page, a shortcut to that page is added, with an
/// ellipsis when there is a gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    current: usize,
    total_pages: usize,
    max_buttons: usize,
}

impl PageWindow {
    /// Window with the default button budget.
    #[must_use]
    pub fn new(current: usize, total_pages: usize) -> Self {
        Self::with_max_buttons(current, total_pages, MAX_PAGE_BUTTONS)
    }

    /// Window with an explicit button budget.
    #[must_use]
    pub fn with_max_buttons(current: usize, total_pages: usize, max_buttons: usize) -> Self {
        Self {
            current: current.clamp(1, total_pages.max(1)),
            total_pages,
            max_buttons: max_buttons.max(1),
        }
    }

    /// First and last numbered page inside the window.
    #[must_use]
    pub fn bounds(&self) -> (usize, usize) {
        let mut start = self
            .current
            .saturating_sub(self.max_buttons / 2)
            .max(1);
        let end = (start + self.max_buttons - 1).min(self.total_pages);
        if end + 1 - start < self.max_buttons {
            start = (end + 1).saturating_sub(self.max_buttons).max(1);
        }
        (start, end)
    }

    /// The full control sequence. Empty when there is at most one page.
    #[must_use]
    pub fn controls(&self) -> Vec<PageControl> {
        if self.total_pages <= 1 {
            return Vec::new();
        }

        let (start, end) = self.bounds();
        let mut controls = Vec::with_capacity(self.max_buttons + 6);
        controls.push(PageControl::Previous {
            target: self.current.saturating_sub(1).max(1),
            enabled: self.current > 1,
        });

        if start > 1 {
            controls.push(PageControl::Page {
                number: 1,
                active: false,
            });
            if start > 2 {
                controls.push(PageControl::Ellipsis);
            }
        }

        for number in start..=end {
            controls.push(PageControl::Page {
                number,
                active: number == self.current,
            });
        }

        if end < self.total_pages {
            if end + 1 < self.total_pages {
                controls.push(PageControl::Ellipsis);
            }
            controls.push(PageControl::Page {
                number: self.total_pages,
                active: false,
            });
        }

        controls.push(PageControl::Next {
            target: (self.current + 1).min(self.total_pages),
            enabled: self.current < self.total_pages,
        });
        controls
    }

    /// Page numbers shown as buttons, in order.
    #[must_use]
    pub fn numbered(&self) -> Vec<usize> {
        self.controls()
            .into_iter()
            .filter_map(|c| match c {
                PageControl::Page { number, .. } => Some(number),
                _ => None,
            })
            .collect()
    }
}
