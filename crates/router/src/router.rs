//! The navigation pipeline.
//!
//! Every navigation runs the same phases:
//!
//! 1. **TearingDown**: the previous [`NavigationSession`] is torn down, the
//!    content container is emptied, and the modal overlay is replaced. Listeners
//!    bound to removed elements are released with them.
//! 2. **Loading**: the route's template is fetched. Failure enters **Error**.
//! 3. **StyleSwap**: the route's layout stylesheet is fetched. The old sheet is
//!    removed only once the new one is confirmed (or confirmed missing).
//! 4. **ModuleInit**: the template is injected, a fresh session is opened and
//!    the route's initializer runs. A missing module or export is a warning.
//! 5. **Idle**: [`ContentLoaded`] is emitted on the window.
//!
//! Each navigation takes a generation number. After every suspension point the
//! pipeline checks it is still the latest navigation and stops quietly if not,
//! so a slow navigation can never overwrite a newer page.
//!
//! A failed template fetch shows an inline error and falls back to the default
//! route exactly once. If the default route fails too, navigation stops there.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use stage::{Document, EventBus, NodeId, Subscription, Target};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::assets::{AssetError, AssetSource};
use crate::events::{ContentLoaded, LinkClick, PopState};
use crate::history::History;
use crate::module::{ModuleError, ModuleRegistry};
use crate::route::{MountConfig, RouteEntry, RouteTable};
use crate::session::NavigationSession;

/// Where the current navigation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavigationPhase {
    #[default]
    Idle,
    TearingDown,
    Loading,
    StyleSwap,
    ModuleInit,
    Error,
}

impl fmt::Display for NavigationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::TearingDown => "tearing down",
            Self::Loading => "loading",
            Self::StyleSwap => "style swap",
            Self::ModuleInit => "module init",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// How a navigation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The route is displayed.
    Rendered { path: String },
    /// A newer navigation took over before this one finished.
    Superseded { path: String },
    /// The route failed and the default route is displayed instead.
    FellBack { failed: String, default: String },
    /// The route failed and so did the fallback; the error text is displayed.
    Failed { path: String, error: String },
}

/// Failures inside the navigation pipeline.
#[derive(Debug, Error)]
pub enum RouterError {
    /// The template could not be fetched.
    #[error("Error: Could not load content for \"{route}\". Please try again or check the URL.")]
    Template {
        route: String,
        #[source]
        source: AssetError,
    },

    /// The page module could not be loaded or initialized.
    #[error("module for route {route} failed: {source}")]
    Module {
        route: String,
        #[source]
        source: ModuleError,
    },
}

enum Stop {
    Superseded,
    Template(RouterError),
}

/// Decrements the in-flight counter when dropped.
struct InFlight(Arc<watch::Sender<usize>>);

impl InFlight {
    fn begin(counter: &Arc<watch::Sender<usize>>) -> Self {
        counter.send_modify(|n| *n += 1);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Builder for [`Router`].
pub struct RouterBuilder {
    document: Document,
    bus: EventBus,
    mount: MountConfig,
    routes: RouteTable,
    modules: ModuleRegistry,
    assets: Option<Arc<dyn AssetSource>>,
    history: Option<History>,
}

impl RouterBuilder {
    /// Sets the mount configuration.
    #[must_use]
    pub fn mount(mut self, mount: MountConfig) -> Self {
        self.mount = mount;
        self
    }

    /// Sets the route table.
    #[must_use]
    pub fn routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    /// Sets the module registry.
    #[must_use]
    pub fn modules(mut self, modules: ModuleRegistry) -> Self {
        self.modules = modules;
        self
    }

    /// Sets where templates and stylesheets come from.
    #[must_use]
    pub fn assets(mut self, assets: impl AssetSource + 'static) -> Self {
        self.assets = Some(Arc::new(assets));
        self
    }

    /// Shares an existing history instead of starting one at the default route.
    #[must_use]
    pub fn history(mut self, history: History) -> Self {
        self.history = Some(history);
        self
    }

    /// Builds the router. Without an asset source every template is missing.
    #[must_use]
    pub fn build(self) -> Arc<Router> {
        let assets = self
            .assets
            .unwrap_or_else(|| Arc::new(crate::assets::MemoryAssetSource::new()));
        let history = self
            .history
            .unwrap_or_else(|| History::new(self.bus.clone(), self.mount.default_route.clone()));
        let (in_flight, _) = watch::channel(0);

        Arc::new_cyclic(|this| Router {
            document: self.document,
            bus: self.bus,
            mount: self.mount,
            routes: self.routes,
            modules: self.modules,
            assets,
            history,
            generation: AtomicU64::new(0),
            phase: RwLock::new(NavigationPhase::Idle),
            current: RwLock::new(None),
            session: Mutex::new(None),
            stylesheet: Mutex::new(None),
            installed: Mutex::new(Vec::new()),
            in_flight: Arc::new(in_flight),
            this: this.clone(),
        })
    }
}

/// Maps paths to rendered, isolated pages.
pub struct Router {
    document: Document,
    bus: EventBus,
    mount: MountConfig,
    routes: RouteTable,
    modules: ModuleRegistry,
    assets: Arc<dyn AssetSource>,
    history: History,
    generation: AtomicU64,
    phase: RwLock<NavigationPhase>,
    current: RwLock<Option<String>>,
    session: Mutex<Option<NavigationSession>>,
    stylesheet: Mutex<Option<String>>,
    installed: Mutex<Vec<Subscription>>,
    in_flight: Arc<watch::Sender<usize>>,
    this: Weak<Self>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("mount", &self.mount)
            .field("routes", &self.routes.len())
            .field("phase", &*self.phase.read())
            .field("current", &*self.current.read())
            .finish_non_exhaustive()
    }
}

impl Router {
    /// Starts building a router over `document` and `bus`.
    #[must_use]
    pub fn builder(document: Document, bus: EventBus) -> RouterBuilder {
        RouterBuilder {
            document,
            bus,
            mount: MountConfig::default(),
            routes: RouteTable::new(),
            modules: ModuleRegistry::new(),
            assets: None,
            history: None,
        }
    }

    #[must_use]
    pub fn mount(&self) -> &MountConfig {
        &self.mount
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Phase of the latest navigation.
    #[must_use]
    pub fn phase(&self) -> NavigationPhase {
        *self.phase.read()
    }

    /// Route currently displayed, if any.
    #[must_use]
    pub fn current_route(&self) -> Option<String> {
        self.current.read().clone()
    }

    /// Active layout stylesheet, if any.
    #[must_use]
    pub fn active_stylesheet(&self) -> Option<String> {
        self.stylesheet.lock().clone()
    }

    /// Listener count of the current session, for diagnostics.
    #[must_use]
    pub fn session_listeners(&self) -> usize {
        self.session
            .lock()
            .as_ref()
            .map_or(0, NavigationSession::listener_count)
    }

    /// Binds link interception and history handling for the router's lifetime.
    ///
    /// Calling it again replaces the previous bindings.
    pub fn install(&self) {
        let mut installed = self.installed.lock();
        installed.clear();

        let this = self.this.clone();
        installed.push(self.bus.subscribe::<LinkClick, _>(Target::Document, move |e| {
            let Some(router) = this.upgrade() else {
                return;
            };
            if router.mount.intercepts(&e.href) {
                router.history.push(e.href.clone());
                router.dispatch(e.href.clone());
            } else {
                debug!(href = %e.href, "link left to the browser");
            }
        }));

        let this = self.this.clone();
        installed.push(self.bus.subscribe::<PopState, _>(Target::Window, move |e| {
            if let Some(router) = this.upgrade() {
                router.dispatch(e.path.clone());
            }
        }));
        debug!(mount = %self.mount.mount_prefix, "router installed");
    }

    /// Removes the bindings made by [`Router::install`].
    pub fn uninstall(&self) {
        self.installed.lock().clear();
    }

    /// Shows the route the history currently points at.
    pub async fn start(&self) -> NavigationOutcome {
        let path = self.history.current();
        self.navigate(&path).await
    }

    /// Pushes `href` onto the history and navigates to it.
    pub async fn visit(&self, href: &str) -> NavigationOutcome {
        self.history.push(href);
        self.navigate(href).await
    }

    /// Navigates to `path` without touching the history, except for root
    /// aliases and fallbacks which replace the current entry.
    pub async fn navigate(&self, path: &str) -> NavigationOutcome {
        let _guard = InFlight::begin(&self.in_flight);
        let path = if self.mount.is_root_alias(path) {
            debug!(alias = path, default = %self.mount.default_route, "root alias redirected");
            self.history.replace(self.mount.default_route.clone());
            self.mount.default_route.clone()
        } else {
            path.to_string()
        };

        let generation = self.next_generation();
        let err = match self.load(&path, generation).await {
            Ok(()) => return NavigationOutcome::Rendered { path },
            Err(Stop::Superseded) => return NavigationOutcome::Superseded { path },
            Err(Stop::Template(err)) => err,
        };

        self.show_error(generation, &err);
        let default = self.mount.default_route.clone();
        if path == default || !self.is_current(generation) {
            return self.failed(path, &err);
        }

        info!(failed = %path, default = %default, "falling back to default route");
        self.history.replace(default.clone());
        let generation = self.next_generation();
        match self.load(&default, generation).await {
            Ok(()) => NavigationOutcome::FellBack {
                failed: path,
                default,
            },
            Err(Stop::Superseded) => NavigationOutcome::Superseded { path: default },
            Err(Stop::Template(err)) => {
                self.show_error(generation, &err);
                self.failed(default, &err)
            }
        }
    }

    /// Resolves once no navigation is in flight and the current page's
    /// tracked work (see [`crate::PageContext::track_idle`]) has settled.
    pub async fn wait_idle(&self) {
        let mut rx = self.in_flight.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
        let waits = self
            .session
            .lock()
            .as_ref()
            .map(NavigationSession::idle_waits)
            .unwrap_or_default();
        join_all(waits.iter().map(|wait| wait())).await;
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn set_phase(&self, generation: u64, phase: NavigationPhase) -> Result<(), Stop> {
        self.commit(generation, phase, || ())
    }

    /// Enters `phase` and applies `apply` while `generation` is still the
    /// latest navigation.
    ///
    /// The phase lock is held from the check through `apply`, so a newer
    /// navigation cannot tear down between them. `apply` must not await or
    /// touch the phase.
    fn commit<T>(
        &self,
        generation: u64,
        phase: NavigationPhase,
        apply: impl FnOnce() -> T,
    ) -> Result<T, Stop> {
        let mut current = self.phase.write();
        if !self.is_current(generation) {
            return Err(Stop::Superseded);
        }
        *current = phase;
        Ok(apply())
    }

    fn failed(&self, path: String, err: &RouterError) -> NavigationOutcome {
        NavigationOutcome::Failed {
            path,
            error: err.to_string(),
        }
    }

    /// Starts a navigation from an event handler without awaiting it.
    fn dispatch(&self, path: String) {
        let Ok(handle) = Handle::try_current() else {
            warn!(%path, "no runtime to run navigation");
            return;
        };
        let Some(this) = self.this.upgrade() else {
            return;
        };
        let guard = InFlight::begin(&self.in_flight);
        handle.spawn(async move {
            let _guard = guard;
            this.navigate(&path).await;
        });
    }

    fn release(&self, removed: &[NodeId]) {
        for node in removed {
            self.bus.release_target(Target::Element(*node));
        }
    }

    fn show_error(&self, generation: u64, err: &RouterError) {
        error!(error = %err, source = ?std::error::Error::source(err), "navigation failed");
        let _ = self.commit(generation, NavigationPhase::Error, || {
            let root = self.document.content_root();
            match self.document.set_text(&root, &err.to_string()) {
                Ok(removed) => self.release(&removed),
                Err(e) => warn!(error = %e, "could not show navigation error"),
            }
        });
    }

    fn teardown(&self) {
        if let Some(session) = self.session.lock().take() {
            session.teardown();
        }
        let root = self.document.content_root();
        match self.document.clear(&root) {
            Ok(removed) => self.release(&removed),
            Err(e) => warn!(error = %e, "could not clear content"),
        }
        let removed = self.document.replace_modal();
        self.release(&removed);
    }

    async fn load(&self, path: &str, generation: u64) -> Result<(), Stop> {
        let entry = self.routes.get(path).cloned();

        self.commit(generation, NavigationPhase::TearingDown, || {
            self.teardown();
            *self.current.write() = None;
        })?;

        self.set_phase(generation, NavigationPhase::Loading)?;
        let template_path = self.mount.template_path(path);
        debug!(route = path, template = %template_path, "fetching template");
        let html = match self.assets.fetch_text(&template_path).await {
            Ok(html) => html,
            Err(source) => {
                if !self.is_current(generation) {
                    return Err(Stop::Superseded);
                }
                return Err(Stop::Template(RouterError::Template {
                    route: path.to_string(),
                    source,
                }));
            }
        };

        self.set_phase(generation, NavigationPhase::StyleSwap)?;
        self.swap_stylesheet(path, entry.as_ref(), generation).await?;

        let ctx = self.commit(generation, NavigationPhase::ModuleInit, || {
            let root = self.document.content_root();
            match self.document.set_inner_html(&root, &html) {
                Ok(removed) => self.release(&removed),
                Err(e) => warn!(error = %e, "could not inject template"),
            }
            let session = NavigationSession::new(path, self.document.clone(), self.bus.clone());
            let ctx = session.context();
            *self.session.lock() = Some(session);
            ctx
        })?;

        if let Err(err) = self.init_module(path, entry.as_ref(), ctx, generation).await {
            match err {
                Stop::Superseded => return Err(Stop::Superseded),
                Stop::Template(err) => warn!(error = %err, "page left without behavior"),
            }
        }

        self.commit(generation, NavigationPhase::Idle, || {
            *self.current.write() = Some(path.to_string());
        })?;
        info!(route = path, "content loaded");
        self.bus.emit(
            Target::Window,
            &ContentLoaded {
                path: path.to_string(),
            },
        );
        Ok(())
    }

    async fn swap_stylesheet(
        &self,
        path: &str,
        entry: Option<&RouteEntry>,
        generation: u64,
    ) -> Result<(), Stop> {
        let wanted = entry.is_none_or(|e| e.uses_stylesheet);
        let next = if wanted {
            let href = self.mount.stylesheet_path(path);
            match self.assets.fetch_text(&href).await {
                Ok(_) => Some(href),
                Err(e) => {
                    debug!(route = path, error = %e, "no stylesheet for route");
                    None
                }
            }
        } else {
            None
        };
        self.commit(generation, NavigationPhase::StyleSwap, || {
            let mut active = self.stylesheet.lock();
            if *active == next {
                return;
            }
            if let Some(href) = &next {
                self.document.add_stylesheet(href.clone());
            }
            if let Some(old) = active.take() {
                self.document.remove_stylesheet(&old);
            }
            *active = next;
        })
    }

    async fn init_module(
        &self,
        path: &str,
        entry: Option<&RouteEntry>,
        ctx: crate::PageContext,
        generation: u64,
    ) -> Result<(), Stop> {
        let Some((key, export)) = entry.and_then(|e| e.module.as_deref().zip(e.initializer.as_deref()))
        else {
            warn!(route = path, "no module defined for route");
            return Ok(());
        };
        let module_error = |source| {
            Stop::Template(RouterError::Module {
                route: path.to_string(),
                source,
            })
        };

        let module = self.modules.load(key).await;
        if !self.is_current(generation) {
            return Err(Stop::Superseded);
        }
        let module = module.map_err(module_error)?;
        let Some(init) = module.initializer(export) else {
            return Err(module_error(ModuleError::MissingExport {
                module: key.to_string(),
                export: export.to_string(),
            }));
        };

        debug!(route = path, module = key, export, "initializing page");
        let result = init(ctx).await;
        if !self.is_current(generation) {
            return Err(Stop::Superseded);
        }
        result.map_err(module_error)
    }
}
