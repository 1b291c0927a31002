//! The assembled dashboard.
//!
//! [`App`] owns the document, the bus, the seeded backend and the router, and
//! mounts the page chrome (sidebar and header) that outlives navigation.

use std::sync::Arc;

use anyhow::{Context, bail};
use paging::render::{FETCH_FAILED_TEXT, LOADING_TEXT};
use router::{DirAssetSource, NavigationOutcome, RouteTable, Router, RouterBuilder};
use stage::{Document, EventBus};
use tracing::{debug, info};

use crate::assets;
use crate::components::{Header, Sidebar};
use crate::config::Config;
use crate::data::seed_backend;
use crate::pages::{self, Layout, catalog};
use crate::store::Backend;

/// A route `check` could not render cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckFailure {
    pub route: String,
    pub problem: String,
}

/// The running dashboard.
pub struct App {
    config: Config,
    document: Document,
    bus: EventBus,
    backend: Backend,
    router: Arc<Router>,
    sidebar: Sidebar,
    _header: Header,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("router", &self.router)
            .field("sidebar", &self.sidebar)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "http")]
fn remote_assets(builder: RouterBuilder, url: &str) -> anyhow::Result<RouterBuilder> {
    Ok(builder.assets(router::HttpAssetSource::new(url)))
}

#[cfg(not(feature = "http"))]
fn remote_assets(_builder: RouterBuilder, url: &str) -> anyhow::Result<RouterBuilder> {
    bail!("cannot fetch assets from {url}: ehi was built without the `http` feature")
}

/// One line per route: path, module and initializer.
#[must_use]
pub fn describe_routes(routes: &RouteTable) -> String {
    routes
        .entries()
        .iter()
        .map(|entry| {
            let module = match (&entry.module, &entry.initializer) {
                (Some(module), Some(init)) => format!("{module}.{init}"),
                _ => "-".to_string(),
            };
            let style = if entry.uses_stylesheet { "" } else { "  (no stylesheet)" };
            format!("{:<36} {module}{style}", entry.path)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl App {
    /// Builds the dashboard described by `config`. Nothing is shown until
    /// [`App::start`].
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let document = Document::new();
        let bus = EventBus::new();
        let backend = seed_backend(config.seed());
        let mount = config.mount();
        let env = Arc::new(config.page_env(backend.clone()));

        let builder = Router::builder(document.clone(), bus.clone())
            .mount(mount.clone())
            .routes(pages::route_table(&mount))
            .modules(pages::registry(env));
        let builder = match (&config.assets_dir, &config.assets_url) {
            (Some(dir), _) => {
                if !dir.is_dir() {
                    bail!("assets directory {} does not exist", dir.display());
                }
                debug!(dir = %dir.display(), "serving assets from disk");
                builder.assets(DirAssetSource::new(dir.clone(), mount.app_root.clone()))
            }
            (None, Some(url)) => remote_assets(builder, url)
                .with_context(|| format!("assets_url = {url}"))?,
            (None, None) => builder.assets(assets::embedded(&mount)),
        };
        let router = builder.build();

        let sidebar = Sidebar::install(document.clone(), bus.clone(), mount);
        let header = Header::install(document.clone(), &bus);
        info!(
            routes = router.routes().len(),
            stores = backend.names().len(),
            "dashboard assembled"
        );
        Ok(Self {
            config: config.clone(),
            document,
            bus,
            backend,
            router,
            sidebar,
            _header: header,
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    #[must_use]
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    #[must_use]
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    #[must_use]
    pub fn sidebar(&self) -> &Sidebar {
        &self.sidebar
    }

    /// Binds the router and shows the initial route.
    pub async fn start(&self) -> NavigationOutcome {
        self.router.install();
        let outcome = self.router.start().await;
        self.settle().await;
        outcome
    }

    /// Resolves once navigation and page work are idle.
    pub async fn settle(&self) {
        self.router.wait_idle().await;
    }

    /// Full route for what the operator typed: mounted paths and root aliases
    /// stay as they are, anything else is taken relative to the mount.
    #[must_use]
    pub fn resolve_href(&self, input: &str) -> String {
        let mount = self.router.mount();
        if mount.is_root_alias(input) || mount.intercepts(input) {
            return input.to_string();
        }
        let relative = input.trim_start_matches('/');
        format!("{}/{relative}", mount.mount_prefix)
    }

    /// Navigates to `input` as a new history entry and waits for the page.
    pub async fn visit(&self, input: &str) -> NavigationOutcome {
        let href = self.resolve_href(input);
        let outcome = self.router.visit(&href).await;
        self.settle().await;
        outcome
    }

    /// The document as text: title, route, then every element with
    /// something to show.
    #[must_use]
    pub fn render_view(&self) -> String {
        let mut lines = vec![
            format!("== {} ==", self.document.title()),
            format!(
                "route: {}",
                self.router.current_route().unwrap_or_else(|| "-".into())
            ),
        ];
        if let Some(css) = self.router.active_stylesheet() {
            lines.push(format!("stylesheet: {css}"));
        }

        let snapshot = self.document.snapshot();
        for (i, el) in snapshot.iter().enumerate() {
            let leaf = snapshot.get(i + 1).is_none_or(|next| next.depth <= el.depth);
            if !leaf || (el.content.is_empty() && el.affordances.is_empty() && el.inputs.is_empty())
            {
                continue;
            }
            lines.push(String::new());
            lines.push(format!("[{}]", el.id));
            lines.extend(el.content.lines().map(|line| format!("  {line}")));
            if !el.inputs.is_empty() {
                let inputs: Vec<String> =
                    el.inputs.iter().map(|(k, v)| format!("{k}={v:?}")).collect();
                lines.push(format!("  inputs: {}", inputs.join(", ")));
            }
            if !el.affordances.is_empty() {
                let labels: Vec<String> = el
                    .affordances
                    .iter()
                    .map(|(label, enabled)| {
                        if *enabled {
                            label.clone()
                        } else {
                            format!("({label})")
                        }
                    })
                    .collect();
                lines.push(format!("  actions: {}", labels.join(" ")));
            }
        }
        lines.join("\n")
    }

    /// Visits every route and reports the ones that did not render, or whose
    /// tables are stuck loading or failed.
    pub async fn check(&self) -> Vec<CheckFailure> {
        let mut failures = Vec::new();
        let mount = self.router.mount().clone();
        let routes: Vec<String> = self
            .router
            .routes()
            .entries()
            .iter()
            .map(|e| e.path.clone())
            .collect();

        for route in routes {
            let outcome = self.visit(&route).await;
            let problem = match outcome {
                NavigationOutcome::Rendered { .. } => self.page_problem(&mount, &route),
                other => Some(format!("{other:?}")),
            };
            match problem {
                Some(problem) => failures.push(CheckFailure { route, problem }),
                None => debug!(%route, "route checked"),
            }
        }
        failures
    }

    fn page_problem(&self, mount: &router::MountConfig, route: &str) -> Option<String> {
        let page = catalog::find(mount, route)?;
        let containers: Vec<String> = match page.layout {
            Layout::Dashboard => vec![catalog::DASHBOARD_STATS.to_string()],
            Layout::Tables(tables) => tables.iter().map(catalog::TableDef::table_id).collect(),
        };
        containers.into_iter().find_map(|id| match self.document.content_of(&id) {
            None => Some(format!("#{id} is missing")),
            Some(text) if text == LOADING_TEXT => Some(format!("#{id} is still loading")),
            Some(text) if text == FETCH_FAILED_TEXT => Some(format!("#{id} failed to load")),
            Some(_) => None,
        })
    }
}
