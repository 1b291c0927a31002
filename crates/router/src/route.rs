//! Route table and mount configuration.
//!
//! Every route is an absolute path under the mount prefix (`/ehi/users`).
//! Templates and stylesheets are resolved against the app root:
//!
//! | route | template | stylesheet |
//! |-------|----------|------------|
//! | `/ehi/users` | `/ehi/app/templates/users.html` | `/ehi/app/styles/layouts/users.css` |
//! | `/ehi/finance/assets` | `/ehi/app/templates/finance/assets.html` | `/ehi/app/styles/layouts/assets.css` |

use std::collections::HashMap;

/// Where the app lives and where it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountConfig {
    /// Prefix every route path starts with.
    pub mount_prefix: String,
    /// Root of the template and stylesheet tree.
    pub app_root: String,
    /// Route shown for root aliases and after a failed navigation.
    pub default_route: String,
    /// Paths that redirect to the default route.
    pub root_aliases: Vec<String>,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self::new("/ehi")
    }
}

impl MountConfig {
    /// Conventional layout under `prefix`: app root `{prefix}/app`, default
    /// route `{prefix}/dashboard`.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into().trim_end_matches('/').to_string();
        let app_root = format!("{prefix}/app");
        let mut root_aliases = vec!["/".to_string()];
        if !prefix.is_empty() {
            root_aliases.push(prefix.clone());
            root_aliases.push(format!("{prefix}/"));
        }
        root_aliases.push(app_root.clone());
        root_aliases.push(format!("{app_root}/"));
        Self {
            default_route: format!("{prefix}/dashboard"),
            app_root,
            mount_prefix: prefix,
            root_aliases,
        }
    }

    /// Sets the default route.
    #[must_use]
    pub fn default_route(mut self, route: impl Into<String>) -> Self {
        self.default_route = route.into();
        self
    }

    /// Sets the app root.
    #[must_use]
    pub fn app_root(mut self, root: impl Into<String>) -> Self {
        self.app_root = root.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether `path` should redirect to the default route.
    #[must_use]
    pub fn is_root_alias(&self, path: &str) -> bool {
        self.root_aliases.iter().any(|a| a == path)
    }

    /// Whether a link to `href` is handled in-app.
    #[must_use]
    pub fn intercepts(&self, href: &str) -> bool {
        href.starts_with(&format!("{}/", self.mount_prefix))
    }

    /// The route without the mount prefix (`/ehi/finance/assets` -> `/finance/assets`).
    #[must_use]
    pub fn relative<'a>(&self, route: &'a str) -> &'a str {
        route.strip_prefix(&self.mount_prefix).unwrap_or(route)
    }

    /// Template resource for `route`.
    #[must_use]
    pub fn template_path(&self, route: &str) -> String {
        format!("{}/templates{}.html", self.app_root, self.relative(route))
    }

    /// Layout stylesheet for `route`, named after its last segment.
    #[must_use]
    pub fn stylesheet_path(&self, route: &str) -> String {
        let last = route.rsplit('/').next().unwrap_or(route);
        format!("{}/styles/layouts/{last}.css", self.app_root)
    }
}

/// One entry of the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub path: String,
    /// Key into the module registry.
    pub module: Option<String>,
    /// Export called after the template is injected.
    pub initializer: Option<String>,
    pub uses_stylesheet: bool,
}

impl RouteEntry {
    /// A static route with a stylesheet and no module.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            module: None,
            initializer: None,
            uses_stylesheet: true,
        }
    }

    /// Names the module and the initializer export to call.
    #[must_use]
    pub fn module(mut self, key: impl Into<String>, initializer: impl Into<String>) -> Self {
        self.module = Some(key.into());
        self.initializer = Some(initializer.into());
        self
    }

    /// Marks the route as having no layout stylesheet.
    #[must_use]
    pub fn without_stylesheet(mut self) -> Self {
        self.uses_stylesheet = false;
        self
    }
}

/// Immutable lookup from path to [`RouteEntry`], in declaration order.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
    index: HashMap<String, usize>,
}

impl RouteTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry. A later entry for the same path replaces the earlier one.
    #[must_use]
    pub fn route(mut self, entry: RouteEntry) -> Self {
        match self.index.get(&entry.path) {
            Some(&i) => self.entries[i] = entry,
            None => {
                self.index.insert(entry.path.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
        self
    }

    /// Looks up `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&RouteEntry> {
        self.index.get(path).map(|i| &self.entries[*i])
    }

    /// All entries in declaration order.
    #[must_use]
    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mount() {
        let mount = MountConfig::default();
        assert_eq!(mount.mount_prefix, "/ehi");
        assert_eq!(mount.app_root, "/ehi/app");
        assert_eq!(mount.default_route, "/ehi/dashboard");
        for alias in ["/", "/ehi", "/ehi/", "/ehi/app", "/ehi/app/"] {
            assert!(mount.is_root_alias(alias), "{alias}");
        }
        assert!(!mount.is_root_alias("/ehi/users"));
    }

    #[test]
    fn test_resource_paths() {
        let mount = MountConfig::default();
        assert_eq!(
            mount.template_path("/ehi/finance/assets"),
            "/ehi/app/templates/finance/assets.html"
        );
        assert_eq!(
            mount.stylesheet_path("/ehi/finance/assets"),
            "/ehi/app/styles/layouts/assets.css"
        );
        assert_eq!(mount.template_path("/ehi/users"), "/ehi/app/templates/users.html");
    }

    #[test]
    fn test_unprefixed_mount() {
        let mount = MountConfig::new("");
        assert_eq!(mount.default_route, "/dashboard");
        assert_eq!(mount.app_root, "/app");
        assert!(mount.intercepts("/users"));
        assert_eq!(mount.template_path("/users"), "/app/templates/users.html");
    }

    #[test]
    fn test_intercepts() {
        let mount = MountConfig::default();
        assert!(mount.intercepts("/ehi/users"));
        assert!(!mount.intercepts("/ehi"));
        assert!(!mount.intercepts("https://example.org/ehi/users"));
    }

    #[test]
    fn test_table_replaces_duplicates() {
        let table = RouteTable::new()
            .route(RouteEntry::new("/ehi/users").module("users", "initUsers"))
            .route(RouteEntry::new("/ehi/archive"))
            .route(RouteEntry::new("/ehi/users").without_stylesheet());
        assert_eq!(table.len(), 2);
        let users = table.get("/ehi/users").unwrap();
        assert!(!users.uses_stylesheet);
        assert!(users.module.is_none());
        assert_eq!(table.entries()[1].path, "/ehi/archive");
    }
}
