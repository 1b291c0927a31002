//! Page modules and the route table that points at them.
//!
//! Each route names a module key and an exported initializer. Modules are
//! built lazily by the [`ModuleRegistry`] the first time a route needs them;
//! the initializers mount the page's tables (or the dashboard summary) into
//! the freshly injected template.

pub mod catalog;
pub mod dashboard;
pub mod record;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use router::{
    InitFuture, Module, ModuleError, ModuleRegistry, MountConfig, PageContext, RouteEntry,
    RouteTable,
};
use tokio::sync::watch;
use tracing::debug;

use crate::store::Backend;

pub use catalog::{Layout, PAGES, PageDef, TableDef};

/// What page initializers are handed besides their [`PageContext`].
#[derive(Debug, Clone)]
pub struct PageEnv {
    pub backend: Backend,
    pub mount: MountConfig,
    /// Initial rows per page of every table.
    pub page_size: usize,
    pub start_serial: u64,
    /// Period of the dashboard's summary refresh.
    pub dashboard_refresh: Duration,
}

impl PageEnv {
    pub fn new(backend: Backend, mount: MountConfig) -> Self {
        Self {
            backend,
            mount,
            page_size: paging::DEFAULT_PAGE_SIZE,
            start_serial: paging::DEFAULT_START_SERIAL,
            dashboard_refresh: Duration::from_secs(30),
        }
    }
}

/// Counts page work started outside a table controller (mutations, summary
/// refreshes) so callers can wait for it to settle.
#[derive(Debug, Clone)]
pub struct Pending {
    count: Arc<watch::Sender<usize>>,
}

impl Default for Pending {
    fn default() -> Self {
        Self::new()
    }
}

impl Pending {
    #[must_use]
    pub fn new() -> Self {
        let (count, _) = watch::channel(0);
        Self {
            count: Arc::new(count),
        }
    }

    /// Marks one piece of work as started. It ends when the guard drops.
    #[must_use]
    pub fn begin(&self) -> PendingGuard {
        self.count.send_modify(|n| *n += 1);
        PendingGuard {
            count: Arc::clone(&self.count),
        }
    }

    /// Number of unfinished pieces of work.
    #[must_use]
    pub fn count(&self) -> usize {
        *self.count.borrow()
    }

    /// Resolves once nothing is pending.
    pub async fn wait(&self) {
        let mut rx = self.count.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

/// Ends one piece of [`Pending`] work on drop.
#[derive(Debug)]
pub struct PendingGuard {
    count: Arc<watch::Sender<usize>>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.count.send_modify(|n| *n = n.saturating_sub(1));
    }
}

type PageInit = fn(PageContext, Arc<PageEnv>) -> InitFuture;

fn init_records(ctx: PageContext, env: Arc<PageEnv>) -> InitFuture {
    Box::pin(record::init(ctx, env))
}

fn init_dashboard(ctx: PageContext, env: Arc<PageEnv>) -> InitFuture {
    Box::pin(dashboard::init(ctx, env))
}

/// One route per catalog page, under `mount`.
#[must_use]
pub fn route_table(mount: &MountConfig) -> RouteTable {
    PAGES.iter().fold(RouteTable::new(), |table, page| {
        let entry = RouteEntry::new(page.route(mount)).module(page.module, page.initializer);
        let entry = if page.stylesheet {
            entry
        } else {
            entry.without_stylesheet()
        };
        table.route(entry)
    })
}

/// Lazy loaders for every page module.
#[must_use]
pub fn registry(env: Arc<PageEnv>) -> ModuleRegistry {
    let mut modules: BTreeMap<&'static str, Vec<(&'static str, PageInit)>> = BTreeMap::new();
    for page in PAGES {
        let init: PageInit = match page.layout {
            Layout::Dashboard => init_dashboard,
            Layout::Tables(_) => init_records,
        };
        let exports = modules.entry(page.module).or_default();
        if !exports.iter().any(|(name, _)| *name == page.initializer) {
            exports.push((page.initializer, init));
        }
    }

    modules
        .into_iter()
        .fold(ModuleRegistry::new(), |registry, (key, exports)| {
            let env = Arc::clone(&env);
            registry.register(key, move || {
                let env = Arc::clone(&env);
                let exports = exports.clone();
                async move {
                    debug!(module = key, exports = exports.len(), "page module loaded");
                    let module = exports
                        .into_iter()
                        .fold(Module::new(key), |module, (name, init)| {
                            let env = Arc::clone(&env);
                            module.export(name, move |ctx| init(ctx, Arc::clone(&env)))
                        });
                    Ok::<_, ModuleError>(module)
                }
            })
        })
}
