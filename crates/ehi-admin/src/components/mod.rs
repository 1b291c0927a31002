//! Page chrome and shared widgets.

pub mod header;
pub mod modal;
pub mod sidebar;

pub use header::Header;
pub use modal::{ModalHost, ModalKind, ModalOutcome};
pub use sidebar::Sidebar;
