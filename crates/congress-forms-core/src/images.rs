//! Image hosting for captchas and screenshots.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    Captcha,
    Screenshot,
}

impl ImageKind {
    pub fn dir_name(&self) -> &'static str {
        match self {
            ImageKind::Captcha => "captchas",
            ImageKind::Screenshot => "screenshots",
        }
    }
}

/// Accepts a local image file and returns a retrievable URL for it.
///
/// The store must copy what it needs; the source file is deleted by the
/// caller once `store` returns.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn store(&self, file: &Path, kind: ImageKind) -> Result<String>;
}

/// Stores images under `<root>/<captchas|screenshots>/<random>.png`.
pub struct DirectoryImageStore {
    root: PathBuf,
    public_base_url: Option<String>,
}

impl DirectoryImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            public_base_url: None,
        }
    }

    pub fn with_public_base_url(mut self, base: impl Into<String>) -> Self {
        self.public_base_url = Some(base.into().trim_end_matches('/').to_string());
        self
    }

    fn url_for(&self, kind: ImageKind, name: &str, path: &Path) -> Result<String> {
        match &self.public_base_url {
            Some(base) => Ok(format!("{base}/{}/{name}", kind.dir_name())),
            None => {
                let absolute = std::path::absolute(path)?;
                let url = url::Url::from_file_path(&absolute)
                    .map_err(|_| anyhow::anyhow!("Cannot build file URL for {}", absolute.display()))?;
                Ok(url.to_string())
            }
        }
    }
}

#[async_trait]
impl ImageStore for DirectoryImageStore {
    async fn store(&self, file: &Path, kind: ImageKind) -> Result<String> {
        let dir = self.root.join(kind.dir_name());
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create image directory {}", dir.display()))?;

        let name = format!("{}.png", uuid::Uuid::new_v4().simple());
        let target = dir.join(&name);
        tokio::fs::copy(file, &target)
            .await
            .with_context(|| format!("Failed to store image {}", file.display()))?;

        let url = self.url_for(kind, &name, &target)?;
        debug!(kind = kind.dir_name(), url = %url, "Stored image");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_copy_under_kind_directory() {
        let root = tempfile::tempdir().unwrap();
        let source = root.path().join("source.png");
        std::fs::write(&source, b"png").unwrap();

        let store = DirectoryImageStore::new(root.path().join("images"))
            .with_public_base_url("https://forms.example.org/images/");
        let url = store.store(&source, ImageKind::Captcha).await.unwrap();

        assert!(url.starts_with("https://forms.example.org/images/captchas/"));
        assert!(url.ends_with(".png"));
        let stored: Vec<_> = std::fs::read_dir(root.path().join("images/captchas"))
            .unwrap()
            .collect();
        assert_eq!(stored.len(), 1);
        assert!(source.exists());
    }

    #[tokio::test]
    async fn falls_back_to_file_urls() {
        let root = tempfile::tempdir().unwrap();
        let source = root.path().join("shot.png");
        std::fs::write(&source, b"png").unwrap();

        let store = DirectoryImageStore::new(root.path());
        let url = store.store(&source, ImageKind::Screenshot).await.unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.contains("/screenshots/"));
    }
}
