//! Plain-text pagination renderer.
//!
//! Draws two lines into the pagination container:
//!
//! ```text
//! Rows per page: 5 10 [25] 50 100
//! ‹ Prev  1 … 8 9 [10] 11 12 … 20  Next ›
//! ```
//!
//! The navigation line only appears when there is more than one page.
//! Affordances are `size:{n}`, `prev`, `page:{n}` and `next`; all of them emit
//! on the pagination container itself.

use stage::{Affordance, Document, DocumentError, ElementRef};
use tracing::trace;

use crate::events::{PageChange, RowsPerPageChange};
use crate::paginator::{PAGE_SIZES, PageControl, PageWindow, PaginationState};
use crate::render::PaginationRenderer;

/// Text pagination renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextPagination;

impl TextPagination {
    /// Creates the renderer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Rendered text for `state`. Empty when there are no items.
    #[must_use]
    pub fn render_text(state: &PaginationState) -> String {
        if state.total_items == 0 {
            return String::new();
        }

        let sizes: Vec<String> = PAGE_SIZES
            .iter()
            .map(|n| {
                if *n == state.items_per_page {
                    format!("[{n}]")
                } else {
                    n.to_string()
                }
            })
            .collect();
        let mut out = format!("Rows per page: {}", sizes.join(" "));

        let controls = PageWindow::new(state.current_page, state.total_pages()).controls();
        if !controls.is_empty() {
            let parts: Vec<String> = controls
                .iter()
                .map(|c| match c {
                    PageControl::Previous { .. } => "‹ Prev ".to_string(),
                    PageControl::Page {
                        number,
                        active: true,
                    } => format!("[{number}]"),
                    PageControl::Page { number, .. } => number.to_string(),
                    PageControl::Ellipsis => "…".to_string(),
                    PageControl::Next { .. } => " Next ›".to_string(),
                })
                .collect();
            out.push('\n');
            out.push_str(&parts.join(" "));
        }
        out
    }

    /// Affordances wired to `container`.
    #[must_use]
    pub fn affordances(container: &ElementRef, state: &PaginationState) -> Vec<Affordance> {
        if state.total_items == 0 {
            return Vec::new();
        }
        let target = container.target();

        let mut out: Vec<Affordance> = PAGE_SIZES
            .iter()
            .map(|n| {
                Affordance::new(
                    format!("size:{n}"),
                    target,
                    RowsPerPageChange {
                        new_items_per_page: *n,
                    },
                )
                .enabled(*n != state.items_per_page)
            })
            .collect();

        for control in PageWindow::new(state.current_page, state.total_pages()).controls() {
            match control {
                PageControl::Previous { target: page, enabled } => out.push(
                    Affordance::new("prev", target, PageChange { new_page: page }).enabled(enabled),
                ),
                PageControl::Page { number, .. } => out.push(Affordance::new(
                    format!("page:{number}"),
                    target,
                    PageChange { new_page: number },
                )),
                PageControl::Ellipsis => {}
                PageControl::Next { target: page, enabled } => out.push(
                    Affordance::new("next", target, PageChange { new_page: page }).enabled(enabled),
                ),
            }
        }
        out
    }
}

impl PaginationRenderer for TextPagination {
    fn render_pagination(
        &self,
        document: &Document,
        container: &ElementRef,
        state: &PaginationState,
    ) -> Result<(), DocumentError> {
        document.set_text(container, &Self::render_text(state))?;
        document.set_affordances(container, Self::affordances(container, state))?;
        trace!(
            container = container.id(),
            page = state.current_page,
            pages = state.total_pages(),
            "pagination rendered"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(current_page: usize, items_per_page: usize, total_items: usize) -> PaginationState {
        PaginationState {
            current_page,
            items_per_page,
            total_items,
        }
    }

    fn pager() -> (Document, ElementRef) {
        let document = Document::new();
        let root = document.content_root();
        document
            .set_inner_html(&root, r#"<div id="pager"></div>"#)
            .unwrap();
        let el = document.get_element_by_id("pager").unwrap();
        (document, el)
    }

    #[test]
    fn test_text_first_of_three() {
        let text = TextPagination::render_text(&state(1, 25, 57));
        assert_eq!(
            text,
            "Rows per page: 5 10 [25] 50 100\n‹ Prev  [1] 2 3  Next ›"
        );
    }

    #[test]
    fn test_text_single_page_has_no_nav() {
        let text = TextPagination::render_text(&state(1, 25, 10));
        assert_eq!(text, "Rows per page: 5 10 [25] 50 100");
    }

    #[test]
    fn test_text_empty() {
        assert!(TextPagination::render_text(&state(1, 25, 0)).is_empty());
    }

    #[test]
    fn test_affordances_boundaries() {
        let (document, el) = pager();
        TextPagination
            .render_pagination(&document, &el, &state(3, 25, 57))
            .unwrap();
        let affordances = document.affordances(&el).unwrap();

        assert!(affordances.contains(&("prev".to_string(), true)));
        assert!(affordances.contains(&("next".to_string(), false)));
        assert!(affordances.contains(&("size:25".to_string(), false)));
        assert!(affordances.contains(&("size:50".to_string(), true)));
        let pages: Vec<&str> = affordances
            .iter()
            .filter(|(l, _)| l.starts_with("page:"))
            .map(|(l, _)| l.as_str())
            .collect();
        assert_eq!(pages, vec!["page:1", "page:2", "page:3"]);
    }

    #[test]
    fn test_no_affordances_when_empty() {
        let (document, el) = pager();
        TextPagination
            .render_pagination(&document, &el, &state(1, 25, 0))
            .unwrap();
        assert!(document.affordances(&el).unwrap().is_empty());
        assert_eq!(document.content(&el).unwrap(), "");
    }
}
