#![forbid(unsafe_code)]
// Allow pedantic lints for early-stage API ergonomics.
#![allow(clippy::nursery)]
#![allow(clippy::pedantic)]

//! # Ehi Admin
//!
//! The Ehi Centre admin dashboard, assembled from [`stage`], [`paging`] and
//! [`router`] and driven from a text shell.
//!
//! - **pages** - one route per dashboard page, each a lazily loaded module
//!   that mounts paginated tables (or the dashboard summary)
//! - **components** - sidebar, header and the modal overlay
//! - **store** - record stores standing in for the backend, seeded by
//!   [`data::Generator`]
//! - **shell** - the `ehi` command language (`go`, `press`, `type`, `view`, ...)
//!
//! ## Example
//!
//! ```rust
//! use ehi_admin::prelude::*;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let app = App::new(&Config::default()).unwrap();
//! app.start().await;
//! assert_eq!(app.document().title(), "Dashboard | Ehi Centre");
//!
//! app.visit("/donors").await;
//! assert_eq!(app.document().title(), "Donor Data | Ehi Centre");
//! let table = app.document().content_of("donors-table").unwrap();
//! assert!(table.starts_with("S/N"));
//! # });
//! ```

pub mod app;
pub mod assets;
pub mod cli;
pub mod components;
pub mod config;
pub mod data;
pub mod events;
pub mod format;
pub mod logging;
pub mod pages;
pub mod shell;
pub mod store;

pub use app::{App, CheckFailure};
pub use cli::{Cli, Command};
pub use config::{Config, ConfigError};
pub use logging::LogFormat;
pub use shell::{Flow, Shell, ShellError};
pub use store::{Backend, MemoryStore, Record, RecordStore, StoreError};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::app::App;
    pub use crate::components::{ModalHost, ModalKind, ModalOutcome};
    pub use crate::config::Config;
    pub use crate::data::{Seed, seed_backend};
    pub use crate::pages::PageEnv;
    pub use crate::shell::{Flow, Shell};
    pub use crate::store::{Backend, MemoryStore, Record, RecordStore};
}
