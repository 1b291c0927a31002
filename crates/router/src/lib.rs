#![forbid(unsafe_code)]
// Allow pedantic lints for early-stage API ergonomics.
#![allow(clippy::nursery)]
#![allow(clippy::pedantic)]

//! # Router
//!
//! Client-side navigation for the admin dashboard.
//!
//! The [`Router`] maps a path such as `/ehi/finance/assets` to:
//! - an HTML **template** injected into the content container
//! - an optional layout **stylesheet** swapped into the document head
//! - an optional page **module** whose initializer wires up the page
//!
//! Every displayed route lives in a [`NavigationSession`]. Listeners, timers,
//! tasks and controllers a page creates through its [`PageContext`] belong to
//! that session and are released when the route is left, so nothing from a
//! previous page reacts to events on the next one.
//!
//! Navigations are ordered: when a newer navigation starts, an older one that
//! is still fetching stops at its next step and never touches the document.
//!
//! ## Example
//!
//! ```rust
//! use router::prelude::*;
//! use stage::{Document, EventBus};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let assets = MemoryAssetSource::new()
//!     .with("/ehi/app/templates/dashboard.html", r#"<h1 id="title">Dashboard</h1>"#)
//!     .with("/ehi/app/styles/layouts/dashboard.css", "h1 { }");
//!
//! let modules = ModuleRegistry::new().register_module(
//!     Module::new("dashboard").export("initDashboard", |ctx: PageContext| async move {
//!         assert!(ctx.element("title").is_some());
//!         Ok(())
//!     }),
//! );
//!
//! let router = Router::builder(Document::new(), EventBus::new())
//!     .routes(RouteTable::new().route(RouteEntry::new("/ehi/dashboard").module("dashboard", "initDashboard")))
//!     .modules(modules)
//!     .assets(assets)
//!     .build();
//!
//! let outcome = router.navigate("/").await;
//! assert_eq!(outcome, NavigationOutcome::Rendered { path: "/ehi/dashboard".into() });
//! assert_eq!(router.history().current(), "/ehi/dashboard");
//! assert_eq!(router.document().stylesheets(), vec!["/ehi/app/styles/layouts/dashboard.css"]);
//! # });
//! ```

use std::future::Future;
use std::pin::Pin;

pub mod assets;
pub mod events;
pub mod history;
pub mod module;
pub mod route;
pub mod router;
pub mod session;

/// A boxed future that is `Send` and lives for `'a`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[cfg(feature = "http")]
pub use assets::HttpAssetSource;
pub use assets::{AssetError, AssetSource, DirAssetSource, MemoryAssetSource};
pub use events::{ContentLoaded, LinkClick, PopState, Resize, RouteChangeCompleted};
pub use history::{History, NavigationType};
pub use module::{InitFuture, Initializer, Module, ModuleError, ModuleRegistry};
pub use route::{MountConfig, RouteEntry, RouteTable};
pub use router::{NavigationOutcome, NavigationPhase, Router, RouterBuilder, RouterError};
pub use session::{NavigationSession, PageContext, TeardownReport};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::BoxFuture;
    pub use crate::assets::{AssetSource, DirAssetSource, MemoryAssetSource};
    pub use crate::events::{ContentLoaded, LinkClick, PopState, Resize, RouteChangeCompleted};
    pub use crate::module::{Module, ModuleError, ModuleRegistry};
    pub use crate::route::{MountConfig, RouteEntry, RouteTable};
    pub use crate::router::{NavigationOutcome, NavigationPhase, Router};
    pub use crate::session::PageContext;
}
