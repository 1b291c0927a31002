//! Template and stylesheet sources.
//!
//! The router asks an [`AssetSource`] for resources by their absolute app path
//! (`/ehi/app/templates/users.html`). A failed stylesheet fetch means "no
//! stylesheet"; a failed template fetch sends the router to its fallback.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tracing::trace;

/// Errors raised while fetching an asset.
#[derive(Debug, Error)]
pub enum AssetError {
    /// The asset does not exist.
    #[error("asset not found: {0}")]
    NotFound(String),

    /// The asset exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The server answered with a non-success status.
    #[error("request for {path} failed with status {status}")]
    Status { path: String, status: u16 },

    /// The server could not be reached.
    #[error("transport error for {path}: {message}")]
    Transport { path: String, message: String },
}

/// Supplies templates and stylesheets.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Fetches the asset at `path` as text.
    async fn fetch_text(&self, path: &str) -> Result<String, AssetError>;
}

/// Assets read from a directory.
///
/// Paths under `app_root` map onto `dir`: with app root `/ehi/app`,
/// `/ehi/app/templates/users.html` is read from `{dir}/templates/users.html`.
#[derive(Debug, Clone)]
pub struct DirAssetSource {
    dir: PathBuf,
    app_root: String,
}

impl DirAssetSource {
    /// Serves `dir` as `app_root`.
    pub fn new(dir: impl Into<PathBuf>, app_root: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            app_root: app_root.into().trim_end_matches('/').to_string(),
        }
    }

    /// Directory assets are read from.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `path`, if it stays inside the directory.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<PathBuf> {
        let rest = path.strip_prefix(&self.app_root)?;
        if !rest.starts_with('/') {
            return None;
        }
        let relative = Path::new(rest.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.dir.join(relative))
    }
}

#[async_trait]
impl AssetSource for DirAssetSource {
    async fn fetch_text(&self, path: &str) -> Result<String, AssetError> {
        let file = self
            .resolve(path)
            .ok_or_else(|| AssetError::NotFound(path.to_string()))?;
        trace!(path, file = %file.display(), "reading asset");
        match tokio::fs::read_to_string(&file).await {
            Ok(text) => Ok(text),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(AssetError::NotFound(path.to_string()))
            }
            Err(source) => Err(AssetError::Io {
                path: path.to_string(),
                source,
            }),
        }
    }
}

/// Assets held in memory, keyed by absolute path.
///
/// Records every requested path, which makes it handy in tests.
#[derive(Debug, Default)]
pub struct MemoryAssetSource {
    assets: RwLock<HashMap<String, String>>,
    requests: Mutex<Vec<String>>,
}

impl MemoryAssetSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an asset.
    #[must_use]
    pub fn with(self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    /// Adds or replaces an asset.
    pub fn insert(&self, path: impl Into<String>, text: impl Into<String>) {
        self.assets.write().insert(path.into(), text.into());
    }

    /// Removes an asset. Returns whether it existed.
    pub fn remove(&self, path: &str) -> bool {
        self.assets.write().remove(path).is_some()
    }

    /// Every path requested so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl AssetSource for MemoryAssetSource {
    async fn fetch_text(&self, path: &str) -> Result<String, AssetError> {
        self.requests.lock().push(path.to_string());
        self.assets
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(path.to_string()))
    }
}

#[async_trait]
impl<T: AssetSource + ?Sized> AssetSource for std::sync::Arc<T> {
    async fn fetch_text(&self, path: &str) -> Result<String, AssetError> {
        (**self).fetch_text(path).await
    }
}

/// Assets fetched from a web server.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpAssetSource {
    client: reqwest::Client,
    base_url: String,
}

#[cfg(feature = "http")]
impl HttpAssetSource {
    /// Fetches paths relative to `base_url` (`https://admin.example.org`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl AssetSource for HttpAssetSource {
    async fn fetch_text(&self, path: &str) -> Result<String, AssetError> {
        let url = format!("{}{path}", self.base_url);
        let transport = |err: reqwest::Error| AssetError::Transport {
            path: path.to_string(),
            message: err.to_string(),
        };
        let response = self.client.get(&url).send().await.map_err(transport)?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AssetError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(AssetError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_maps_app_root() {
        let source = DirAssetSource::new("/srv/assets", "/ehi/app/");
        assert_eq!(
            source.resolve("/ehi/app/templates/users.html"),
            Some(PathBuf::from("/srv/assets/templates/users.html"))
        );
        assert_eq!(source.resolve("/other/templates/users.html"), None);
        assert_eq!(source.resolve("/ehi/app/../secret.txt"), None);
    }

    #[tokio::test]
    async fn test_dir_source_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("templates")).unwrap();
        std::fs::write(dir.path().join("templates/users.html"), "<h1>Users</h1>").unwrap();
        let source = DirAssetSource::new(dir.path(), "/ehi/app");

        assert_eq!(
            source.fetch_text("/ehi/app/templates/users.html").await.unwrap(),
            "<h1>Users</h1>"
        );
        assert!(matches!(
            source.fetch_text("/ehi/app/templates/missing.html").await,
            Err(AssetError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_source_records_requests() {
        let source = MemoryAssetSource::new().with("/a.html", "a");
        assert_eq!(source.fetch_text("/a.html").await.unwrap(), "a");
        assert!(source.fetch_text("/b.html").await.is_err());
        assert_eq!(source.requests(), vec!["/a.html", "/b.html"]);
    }
}
