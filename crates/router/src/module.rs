//! Page modules and their registry.
//!
//! A [`Module`] is a named set of exported initializers. Several routes may
//! share one module and even one initializer (every finance route calls
//! `initFinance`). Modules are loaded lazily through the [`ModuleRegistry`] and
//! cached after the first successful load.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;

use crate::BoxFuture;
use crate::session::PageContext;

/// Errors raised while loading or running a page module.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModuleError {
    /// No loader is registered under this key.
    #[error("no module registered as \"{0}\"")]
    NotRegistered(String),

    /// The loader failed.
    #[error("failed to load module \"{module}\": {message}")]
    Load { module: String, message: String },

    /// The module does not export the requested initializer.
    #[error("module \"{module}\" does not export a function named {export}")]
    MissingExport { module: String, export: String },

    /// The initializer ran and failed.
    #[error("page initialization failed: {0}")]
    Init(String),
}

impl ModuleError {
    /// Wraps any displayable failure of a page initializer.
    pub fn init(err: impl fmt::Display) -> Self {
        Self::Init(err.to_string())
    }
}

/// Future returned by an initializer.
pub type InitFuture = BoxFuture<'static, Result<(), ModuleError>>;

/// An exported page initializer.
pub type Initializer = Arc<dyn Fn(PageContext) -> InitFuture + Send + Sync>;

/// A named set of exported initializers.
#[derive(Clone)]
pub struct Module {
    name: String,
    exports: HashMap<String, Initializer>,
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut exports: Vec<&String> = self.exports.keys().collect();
        exports.sort();
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("exports", &exports)
            .finish()
    }
}

impl Module {
    /// Creates a module with no exports.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exports: HashMap::new(),
        }
    }

    /// Exports an initializer under `name`.
    #[must_use]
    pub fn export<F, Fut>(mut self, name: impl Into<String>, init: F) -> Self
    where
        F: Fn(PageContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ModuleError>> + Send + 'static,
    {
        let init: Initializer = Arc::new(move |ctx: PageContext| Box::pin(init(ctx)) as InitFuture);
        self.exports.insert(name.into(), init);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up an export.
    #[must_use]
    pub fn initializer(&self, name: &str) -> Option<Initializer> {
        self.exports.get(name).cloned()
    }

    /// Export names, sorted.
    #[must_use]
    pub fn exports(&self) -> Vec<String> {
        let mut names: Vec<String> = self.exports.keys().cloned().collect();
        names.sort();
        names
    }
}

type Loader = Arc<dyn Fn() -> BoxFuture<'static, Result<Module, ModuleError>> + Send + Sync>;

/// Lazily loaded modules keyed by name.
#[derive(Default)]
pub struct ModuleRegistry {
    loaders: HashMap<String, Loader>,
    loaded: RwLock<HashMap<String, Arc<Module>>>,
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.loaders.keys().collect();
        keys.sort();
        f.debug_struct("ModuleRegistry")
            .field("modules", &keys)
            .field("loaded", &self.loaded.read().len())
            .finish()
    }
}

impl ModuleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an async loader under `key`.
    #[must_use]
    pub fn register<F, Fut>(mut self, key: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Module, ModuleError>> + Send + 'static,
    {
        let loader: Loader = Arc::new(move || {
            Box::pin(loader()) as BoxFuture<'static, Result<Module, ModuleError>>
        });
        self.loaders.insert(key.into(), loader);
        self
    }

    /// Registers an already built module under its own name.
    #[must_use]
    pub fn register_module(self, module: Module) -> Self {
        let key = module.name().to_string();
        self.register(key, move || {
            let module = module.clone();
            async move { Ok::<_, ModuleError>(module) }
        })
    }

    /// Whether a loader exists for `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.loaders.contains_key(key)
    }

    /// Loads `key`, reusing an earlier successful load.
    pub async fn load(&self, key: &str) -> Result<Arc<Module>, ModuleError> {
        if let Some(module) = self.loaded.read().get(key) {
            return Ok(Arc::clone(module));
        }
        let loader = self
            .loaders
            .get(key)
            .cloned()
            .ok_or_else(|| ModuleError::NotRegistered(key.to_string()))?;
        let module = Arc::new(loader().await?);
        debug!(module = key, exports = ?module.exports(), "module loaded");
        self.loaded
            .write()
            .entry(key.to_string())
            .or_insert_with(|| Arc::clone(&module));
        Ok(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_load_caches_module() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let registry = ModuleRegistry::new().register("finance", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(Module::new("finance").export("initFinance", |_ctx| async { Ok(()) })) }
        });

        let first = registry.load("finance").await.unwrap();
        let second = registry.load("finance").await.unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.initializer("initFinance").is_some());
        assert!(first.initializer("initReport").is_none());
    }

    #[tokio::test]
    async fn test_load_errors() {
        let registry = ModuleRegistry::new().register("broken", || async {
            Err(ModuleError::Load {
                module: "broken".into(),
                message: "syntax error".into(),
            })
        });
        assert_eq!(
            registry.load("missing").await.unwrap_err(),
            ModuleError::NotRegistered("missing".into())
        );
        assert!(matches!(
            registry.load("broken").await,
            Err(ModuleError::Load { .. })
        ));
    }

    #[test]
    fn test_exports_sorted() {
        let module = Module::new("programmes")
            .export("initProgrammes", |_| async { Ok(()) })
            .export("initDisbursement", |_| async { Ok(()) });
        assert_eq!(module.exports(), vec!["initDisbursement", "initProgrammes"]);
    }
}
