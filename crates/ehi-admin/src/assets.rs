//! Templates and layout stylesheets shipped inside the binary.
//!
//! Used unless `--assets DIR` points at a tree on disk. The tree can be
//! written out with [`export`] to start customizing it.

use std::fs;
use std::io;
use std::path::Path;

use router::{MemoryAssetSource, MountConfig};
use tracing::debug;

use crate::pages::PAGES;

/// Every page template and stylesheet, at the paths the router asks for.
#[must_use]
pub fn embedded(mount: &MountConfig) -> MemoryAssetSource {
    let source = MemoryAssetSource::new();
    for page in PAGES {
        let route = page.route(mount);
        source.insert(mount.template_path(&route), page.template());
        if page.stylesheet {
            source.insert(mount.stylesheet_path(&route), page.stylesheet_text());
        }
    }
    debug!(pages = PAGES.len(), "embedded assets ready");
    source
}

/// Writes the embedded tree under `dir`, laid out the way
/// [`router::DirAssetSource`] reads it. Returns the number of files written.
pub fn export(mount: &MountConfig, dir: &Path) -> io::Result<usize> {
    let mut written = 0;
    for page in PAGES {
        let route = page.route(mount);
        let mut files = vec![(mount.template_path(&route), page.template())];
        if page.stylesheet {
            files.push((mount.stylesheet_path(&route), page.stylesheet_text()));
        }
        for (resource, text) in files {
            let relative = resource
                .strip_prefix(&mount.app_root)
                .unwrap_or(&resource)
                .trim_start_matches('/');
            let path = dir.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, text)?;
            written += 1;
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use router::{AssetSource, DirAssetSource};

    #[tokio::test]
    async fn test_embedded_serves_templates_and_styles() {
        let mount = MountConfig::default();
        let source = embedded(&mount);
        let html = source
            .fetch_text("/ehi/app/templates/finance/receipt.html")
            .await
            .unwrap();
        assert!(html.contains("id=\"receipts-table\""));
        assert!(source.fetch_text("/ehi/app/styles/layouts/receipt.css").await.is_ok());
        assert!(source.fetch_text("/ehi/app/styles/layouts/archive.css").await.is_err());
    }

    #[tokio::test]
    async fn test_exported_tree_reads_back() {
        let mount = MountConfig::default();
        let dir = tempfile::tempdir().unwrap();
        let written = export(&mount, dir.path()).unwrap();
        assert!(written > PAGES.len());

        let source = DirAssetSource::new(dir.path(), mount.app_root.clone());
        let html = source
            .fetch_text("/ehi/app/templates/admin.html")
            .await
            .unwrap();
        assert!(html.contains("admin-users-summary-table"));
    }
}
