#![forbid(unsafe_code)]
// Allow pedantic lints for early-stage API ergonomics.
#![allow(clippy::nursery)]
#![allow(clippy::pedantic)]

//! # Stage
//!
//! The shared surface every dashboard page plays on.
//!
//! Stage provides the two process-wide singletons that pages, tables and the
//! router cooperate through:
//! - **bus** - a typed event bus with RAII [`Subscription`]s
//! - **document** - an in-memory element tree with content, affordances
//!   (buttons/links/options), form inputs, head stylesheets and a modal overlay
//!
//! Components never call each other directly. A pagination control emits a
//! `PageChange` on its element, a table row emits a `TableAction` on the
//! window, and whoever owns the state decides what to do with it.
//!
//! ## Example
//!
//! ```rust
//! use stage::{Affordance, Document, Event, EventBus, Target};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! #[derive(Debug, Clone)]
//! struct Ping;
//!
//! impl Event for Ping {
//!     const NAME: &'static str = "ping";
//! }
//!
//! let bus = EventBus::new();
//! let document = Document::new();
//! let root = document.content_root();
//! document
//!     .set_inner_html(&root, r#"<div id="panel"></div>"#)
//!     .unwrap();
//! let panel = document.get_element_by_id("panel").unwrap();
//!
//! let hits = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&hits);
//! let _sub = bus.subscribe::<Ping, _>(panel.target(), move |_| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! document
//!     .set_affordances(&panel, vec![Affordance::new("ping", panel.target(), Ping)])
//!     .unwrap();
//! document.activate(&bus, "ping").unwrap();
//! assert_eq!(hits.load(Ordering::SeqCst), 1);
//! ```

pub mod bus;
pub mod document;

pub use bus::{Event, EventBus, Subscription, Target};
pub use document::{
    Affordance, CONTENT_ROOT, Document, DocumentError, ElementRef, ElementSnapshot, MODAL_ROOT,
    NodeId,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bus::{Event, EventBus, Subscription, Target};
    pub use crate::document::{Affordance, Document, DocumentError, ElementRef, NodeId};
}
