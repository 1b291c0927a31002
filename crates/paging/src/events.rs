//! Events emitted by the table and pagination renderers.
//!
//! Renderers never touch controller state. They emit one of these and the
//! owner of the state decides what happens.

use serde::{Deserialize, Serialize};
use stage::Event;

/// The operator picked a different page size.
///
/// Emitted on the pagination container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowsPerPageChange {
    pub new_items_per_page: usize,
}

impl Event for RowsPerPageChange {
    const NAME: &'static str = "pagination:rowsPerPageChange";
}

/// The operator asked for another page.
///
/// Emitted on the pagination container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageChange {
    pub new_page: usize,
}

impl Event for PageChange {
    const NAME: &'static str = "pagination:pageChange";
}

/// A row-level action was requested (view, edit, delete, ...).
///
/// Emitted on [`stage::Target::Window`]; `page_key` tells listeners which
/// table the row belongs to when a page hosts several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableAction {
    pub action: String,
    pub item_id: String,
    pub page_key: String,
}

impl Event for TableAction {
    const NAME: &'static str = "tableAction";
}
