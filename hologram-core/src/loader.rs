//! Resource access for manifests, caption documents and existence probes.

use crate::error::{CoreError, Result};
use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

const LOG_TARGET: &str = "hologram::loader";

/// Default timeout for HTTP requests (10 seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Default number of retry attempts
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Source of media-related resources, addressed by URIs relative to a root
#[async_trait]
pub trait ResourceLoader: Send + Sync {
    /// Get the loader name
    fn name(&self) -> &'static str;

    /// Lightweight existence check. Any failure counts as absent.
    async fn exists(&self, uri: &str) -> bool;

    /// Fetch a text document.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ResourceNotFound`] if the resource does not
    /// exist, or a transport error if it cannot be read.
    async fn fetch_text(&self, uri: &str) -> Result<String>;
}

/// Pick a loader for the configured media root.
///
/// `http://` and `https://` roots get an [`HttpLoader`]; anything else is
/// treated as a directory.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be created.
pub fn loader_for_root(root: &str) -> Result<Arc<dyn ResourceLoader>> {
    match Url::parse(root) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Arc::new(HttpLoader::new(url)?)),
        _ => Ok(Arc::new(FileLoader::new(root))),
    }
}

/// Loads resources from a local directory
#[derive(Debug, Clone)]
pub struct FileLoader {
    root: PathBuf,
}

impl FileLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, uri: &str) -> PathBuf {
        self.root.join(uri)
    }
}

#[async_trait]
impl ResourceLoader for FileLoader {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn exists(&self, uri: &str) -> bool {
        tokio::fs::metadata(self.resolve(uri))
            .await
            .is_ok_and(|meta| meta.is_file())
    }

    async fn fetch_text(&self, uri: &str) -> Result<String> {
        let path = self.resolve(uri);
        debug!(target: LOG_TARGET, "Reading {}", path.display());
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CoreError::ResourceNotFound { uri: uri.to_string() })
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Loads resources relative to a base URL, retrying transient failures
pub struct HttpLoader {
    base: Url,
    client: ClientWithMiddleware,
}

impl HttpLoader {
    /// Create a new HTTP loader with a 10-second timeout and 3 retries.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(mut base: Url) -> Result<Self> {
        // Without a trailing slash, joining would replace the last segment
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let base_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .user_agent("HologramPlayer/0.1")
            .build()?;

        // Wrap with retry middleware (exponential backoff)
        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(DEFAULT_MAX_RETRIES);
        let client = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self { base, client })
    }

    /// Absolute URL of a resource
    ///
    /// # Errors
    ///
    /// Returns an error if `uri` cannot be joined onto the base URL.
    pub fn resolve(&self, uri: &str) -> Result<Url> {
        Ok(self.base.join(uri)?)
    }
}

#[async_trait]
impl ResourceLoader for HttpLoader {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn exists(&self, uri: &str) -> bool {
        let Ok(url) = self.resolve(uri) else {
            return false;
        };
        match self.client.head(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(target: LOG_TARGET, "Probe of {} failed: {}", uri, e);
                false
            }
        }
    }

    async fn fetch_text(&self, uri: &str) -> Result<String> {
        let url = self.resolve(uri)?;
        debug!(target: LOG_TARGET, "GET {}", url);

        let response = self.client.get(url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CoreError::ResourceNotFound { uri: uri.to_string() });
        }
        if !response.status().is_success() {
            return Err(CoreError::HttpStatus {
                uri: uri.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

/// In-memory resources, keyed by URI
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    resources: HashMap<String, String>,
}

impl MemoryLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource with text content
    #[must_use]
    pub fn with_resource(mut self, uri: impl Into<String>, content: impl Into<String>) -> Self {
        self.resources.insert(uri.into(), content.into());
        self
    }

    /// Add a resource that only needs to exist (e.g. a video)
    #[must_use]
    pub fn with_media(self, uri: impl Into<String>) -> Self {
        self.with_resource(uri, String::new())
    }
}

#[async_trait]
impl ResourceLoader for MemoryLoader {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn exists(&self, uri: &str) -> bool {
        self.resources.contains_key(uri)
    }

    async fn fetch_text(&self, uri: &str) -> Result<String> {
        self.resources
            .get(uri)
            .cloned()
            .ok_or_else(|| CoreError::ResourceNotFound { uri: uri.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playlist::{MediaLayout, Playlist};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hologram-loader-{}-{name}", std::process::id()));
        std::fs::create_dir_all(dir.join("subtitles")).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_file_loader_reads_and_probes() {
        let dir = scratch_dir("read");
        std::fs::write(dir.join("subtitles/intro.json"), "[]").unwrap();

        let loader = FileLoader::new(&dir);
        assert!(loader.exists("subtitles/intro.json").await);
        assert!(!loader.exists("subtitles/missing.json").await);
        // Directories are not media
        assert!(!loader.exists("subtitles").await);
        assert_eq!(loader.fetch_text("subtitles/intro.json").await.unwrap(), "[]");

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_file_loader_missing_is_not_found() {
        let loader = FileLoader::new(scratch_dir("missing"));
        let result = loader.fetch_text("videos.json").await;
        assert!(matches!(result, Err(CoreError::ResourceNotFound { uri }) if uri == "videos.json"));
    }

    #[test]
    fn test_loader_for_root() {
        assert_eq!(loader_for_root("./media").unwrap().name(), "file");
        assert_eq!(loader_for_root("/srv/hologram").unwrap().name(), "file");
        assert_eq!(
            loader_for_root("https://cdn.example.com/show").unwrap().name(),
            "http"
        );
    }

    #[test]
    fn test_http_loader_resolves_relative_to_base() {
        let loader = HttpLoader::new(Url::parse("https://cdn.example.com/show").unwrap()).unwrap();
        assert_eq!(
            loader.resolve("videos/a.mp4").unwrap().as_str(),
            "https://cdn.example.com/show/videos/a.mp4"
        );
    }

    #[tokio::test]
    async fn test_memory_loader() {
        let loader = MemoryLoader::new()
            .with_media("videos/a.mp4")
            .with_resource("subtitles/a.json", "[]");
        assert!(loader.exists("videos/a.mp4").await);
        assert!(!loader.exists("videos/b.mp4").await);
        assert_eq!(loader.fetch_text("subtitles/a.json").await.unwrap(), "[]");
        assert!(loader.fetch_text("videos/b.mp4").await.is_err());
    }

    #[tokio::test]
    async fn test_playlist_fetch() {
        let loader = MemoryLoader::new().with_resource("videos.json", r#"["videos/a.mp4"]"#);
        let playlist = Playlist::fetch(&loader, "videos.json", &MediaLayout::default()).await;
        assert_eq!(playlist.len(), 1);
    }

    #[tokio::test]
    async fn test_playlist_fetch_failures_give_empty_playlist() {
        let loader = MemoryLoader::new().with_resource("broken.json", "{ nope");
        let layout = MediaLayout::default();
        assert!(Playlist::fetch(&loader, "missing.json", &layout).await.is_empty());
        assert!(Playlist::fetch(&loader, "broken.json", &layout).await.is_empty());
    }
}
