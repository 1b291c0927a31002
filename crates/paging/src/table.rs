//! Plain-text table renderer.
//!
//! Draws rows as aligned columns and exposes one affordance per row action,
//! labelled `"{action-slug}:{item-id}"`. Activating it emits a
//! [`TableAction`] on the window.
//!
//! # Example
//!
//! ```rust
//! use paging::table::TextTable;
//! use paging::render::TableView;
//! use serde_json::json;
//!
//! let row = json!({"id": 7, "name": "Ada", "email": null});
//! let rows = vec![row.as_object().unwrap().clone()];
//! let headers = vec!["Name".to_string(), "Email".to_string()];
//! let view = TableView {
//!     rows: &rows,
//!     headers: &headers,
//!     dropdown_actions: &[],
//!     page_key: "users",
//!     start_serial: 1001,
//!     offset: 0,
//!     has_select_column: false,
//! };
//!
//! let text = TextTable::new().render_text(&view);
//! assert!(text.lines().nth(2).unwrap().starts_with("1001"));
//! assert!(text.contains('—'));
//! ```

use serde_json::Value;
use stage::{Affordance, Document, DocumentError, ElementRef, Target};
use tracing::trace;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::events::TableAction;
use crate::fetch::Row;
use crate::render::{NO_DATA_TEXT, RowRenderer, TableView};

/// Header of the serial-number column.
pub const SERIAL_HEADER: &str = "S/N";

const MISSING: &str = "—";
const COLUMN_GAP: &str = "  ";

/// Column headers with `S/N` first.
///
/// Explicit headers are reordered so `S/N` leads. Without headers, they are
/// derived from the first row's keys with `_` shown as a space.
#[must_use]
pub fn normalize_headers(headers: &[String], rows: &[Row]) -> Vec<String> {
    let mut out = vec![SERIAL_HEADER.to_string()];
    if headers.is_empty() {
        if let Some(first) = rows.first() {
            for key in first.keys() {
                let header = key.replace('_', " ");
                if !out.contains(&header) {
                    out.push(header);
                }
            }
        }
    } else {
        out.extend(headers.iter().filter(|h| *h != SERIAL_HEADER).cloned());
    }
    out
}

/// Row field a header reads from: lower-cased, whitespace runs as `_`.
#[must_use]
pub fn data_key(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Slug an action label is emitted as: lower-cased, whitespace runs as `-`.
#[must_use]
pub fn action_slug(action: &str) -> String {
    action
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

/// The row's `id` as a string, or empty when it has none.
#[must_use]
pub fn item_id(row: &Row) -> String {
    match row.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Display text for one cell.
#[must_use]
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => MISSING.to_string(),
        Some(Value::String(s)) if s.is_empty() => MISSING.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => if *b { "Yes" } else { "No" }.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Array(items)) if items.is_empty() => MISSING.to_string(),
        Some(Value::Array(items)) => format!("{} items", items.len()),
        Some(Value::Object(obj)) => obj
            .get("text")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(MISSING)
            .to_string(),
    }
}

/// Truncates to a display width, ending with an ellipsis when cut.
fn truncate_string(s: &str, width: usize) -> String {
    if UnicodeWidthStr::width(s) <= width {
        return s.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > width - 1 {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push('…');
    out
}

fn pad(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(UnicodeWidthStr::width(s));
    format!("{s}{}", " ".repeat(fill))
}

/// Text table renderer.
#[derive(Debug, Clone)]
pub struct TextTable {
    max_column_width: usize,
}

impl Default for TextTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TextTable {
    /// Creates a renderer with 28-column cells.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_column_width: 28,
        }
    }

    /// Sets the widest a column may grow before cells are truncated.
    #[must_use]
    pub fn max_column_width(mut self, width: usize) -> Self {
        self.max_column_width = width.max(2);
        self
    }

    fn grid(view: &TableView<'_>) -> (Vec<String>, Vec<Vec<String>>) {
        let headers = normalize_headers(view.headers, view.rows);
        let slugs: Vec<String> = view
            .dropdown_actions
            .iter()
            .map(|a| action_slug(a))
            .collect();

        let mut titles: Vec<String> = headers
            .iter()
            .map(|h| {
                if h == "Receipt" {
                    format!("{h}(CR)")
                } else {
                    h.clone()
                }
            })
            .collect();
        if !slugs.is_empty() {
            titles.push("Actions".to_string());
        }
        if view.has_select_column {
            titles.push("Select".to_string());
        }

        let cells = view
            .rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                let mut line: Vec<String> = headers
                    .iter()
                    .map(|h| {
                        if h == SERIAL_HEADER {
                            view.serial(index).to_string()
                        } else {
                            cell_text(row.get(&data_key(h)))
                        }
                    })
                    .collect();
                if !slugs.is_empty() {
                    line.push(slugs.join(" | "));
                }
                if view.has_select_column {
                    line.push("[ ]".to_string());
                }
                line
            })
            .collect();

        (titles, cells)
    }

    /// Renders the page as text. Header, rule, then one line per row.
    #[must_use]
    pub fn render_text(&self, view: &TableView<'_>) -> String {
        if view.rows.is_empty() {
            return NO_DATA_TEXT.to_string();
        }

        let (titles, cells) = Self::grid(view);
        let widths: Vec<usize> = titles
            .iter()
            .enumerate()
            .map(|(i, title)| {
                cells
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|c| UnicodeWidthStr::width(c.as_str()))
                    .chain(std::iter::once(UnicodeWidthStr::width(title.as_str())))
                    .max()
                    .unwrap_or(0)
                    .min(self.max_column_width)
            })
            .collect();

        let render_line = |values: &[String]| -> String {
            values
                .iter()
                .zip(&widths)
                .map(|(v, w)| pad(&truncate_string(v, *w), *w))
                .collect::<Vec<_>>()
                .join(COLUMN_GAP)
                .trim_end()
                .to_string()
        };

        let mut lines = Vec::with_capacity(cells.len() + 2);
        lines.push(render_line(&titles));
        lines.push(
            widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join(COLUMN_GAP),
        );
        lines.extend(cells.iter().map(|row| render_line(row)));
        lines.join("\n")
    }

    /// One affordance per (row, action), emitting [`TableAction`] on the window.
    #[must_use]
    pub fn affordances(view: &TableView<'_>) -> Vec<Affordance> {
        let mut out = Vec::with_capacity(view.rows.len() * view.dropdown_actions.len());
        for row in view.rows {
            let id = item_id(row);
            for action in view.dropdown_actions {
                let slug = action_slug(action);
                out.push(Affordance::new(
                    format!("{slug}:{id}"),
                    Target::Window,
                    TableAction {
                        action: slug,
                        item_id: id.clone(),
                        page_key: view.page_key.to_string(),
                    },
                ));
            }
        }
        out
    }
}

impl RowRenderer for TextTable {
    fn render_rows(
        &self,
        document: &Document,
        container: &ElementRef,
        view: &TableView<'_>,
    ) -> Result<(), DocumentError> {
        document.set_text(container, &self.render_text(view))?;
        document.set_affordances(container, Self::affordances(view))?;
        trace!(
            container = container.id(),
            rows = view.rows.len(),
            offset = view.offset,
            "table rendered"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stage::EventBus;
    use std::sync::Arc;

    fn rows(values: Value) -> Vec<Row> {
        values
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    fn view<'a>(rows: &'a [Row], headers: &'a [String], actions: &'a [String]) -> TableView<'a> {
        TableView {
            rows,
            headers,
            dropdown_actions: actions,
            page_key: "donors",
            start_serial: 1001,
            offset: 0,
            has_select_column: false,
        }
    }

    #[test]
    fn test_headers_put_serial_first() {
        let headers = vec!["Name".to_string(), "S/N".to_string(), "Email".to_string()];
        assert_eq!(normalize_headers(&headers, &[]), vec!["S/N", "Name", "Email"]);
    }

    #[test]
    fn test_headers_derived_from_first_row() {
        let data = rows(json!([{"full_name": "Ada", "phone": "555"}]));
        assert_eq!(
            normalize_headers(&[], &data),
            vec!["S/N", "full name", "phone"]
        );
    }

    #[test]
    fn test_data_key_and_slug() {
        assert_eq!(data_key("Date of  Birth"), "date_of_birth");
        assert_eq!(action_slug("View Details"), "view-details");
    }

    #[test]
    fn test_cell_text_variants() {
        assert_eq!(cell_text(None), "—");
        assert_eq!(cell_text(Some(&json!(""))), "—");
        assert_eq!(cell_text(Some(&json!(12))), "12");
        assert_eq!(cell_text(Some(&json!([1, 2, 3]))), "3 items");
        assert_eq!(cell_text(Some(&json!({"text": "Rice"}))), "Rice");
        assert_eq!(cell_text(Some(&json!({"other": 1}))), "—");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello world", 6), "hello…");
        assert_eq!(truncate_string("hello", 0), "");
    }

    #[test]
    fn test_render_text_layout() {
        let data = rows(json!([
            {"id": 1, "name": "Ada", "email": "ada@example.org"},
            {"id": 2, "name": "Grace"}
        ]));
        let headers = vec!["Name".to_string(), "Email".to_string()];
        let actions = vec!["View".to_string(), "Delete".to_string()];
        let text = TextTable::new().render_text(&view(&data, &headers, &actions));
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("S/N"));
        assert!(lines[0].contains("Actions"));
        assert!(lines[2].starts_with("1001"));
        assert!(lines[2].contains("view | delete"));
        assert!(lines[3].starts_with("1002"));
        assert!(lines[3].contains('—'));
    }

    #[test]
    fn test_render_text_empty() {
        let text = TextTable::new().render_text(&view(&[], &[], &[]));
        assert_eq!(text, NO_DATA_TEXT);
    }

    #[test]
    fn test_render_rows_wires_actions() {
        let document = Document::new();
        let bus = EventBus::new();
        let root = document.content_root();
        document
            .set_inner_html(&root, r#"<div id="donor-table"></div>"#)
            .unwrap();
        let container = document.get_element_by_id("donor-table").unwrap();

        let data = rows(json!([{"id": 42, "name": "Ada"}]));
        let headers = vec!["Name".to_string()];
        let actions = vec!["Edit".to_string()];
        TextTable::new()
            .render_rows(&document, &container, &view(&data, &headers, &actions))
            .unwrap();

        let seen = Arc::new(parking_lot::Mutex::new(None));
        let store = Arc::clone(&seen);
        let _sub = bus.subscribe::<TableAction, _>(Target::Window, move |e| {
            *store.lock() = Some(e.clone());
        });
        assert_eq!(document.activate(&bus, "edit:42").unwrap(), 1);
        assert_eq!(
            seen.lock().clone(),
            Some(TableAction {
                action: "edit".into(),
                item_id: "42".into(),
                page_key: "donors".into(),
            })
        );
    }
}
