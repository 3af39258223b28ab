use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::surface::NodeId;
use crate::tasks::scheduler::LoadRequest;

/// Starts loading the image behind a request. The returned future resolves
/// when the image is ready to be revealed.
pub trait ImageLoader {
    fn load(&self, request: &LoadRequest) -> BoxFuture<'static, Result<()>>;
}

/// Decodes local files on the blocking pool. Remote URLs are fetched by the
/// rendering host itself, so they count as loaded straight away.
#[derive(Debug, Default, Clone)]
pub struct DecodingLoader;

impl ImageLoader for DecodingLoader {
    fn load(&self, request: &LoadRequest) -> BoxFuture<'static, Result<()>> {
        let url = request.url.clone();
        Box::pin(async move {
            let Some(path) = local_path(&url) else {
                debug!(%url, "remote image handed to the host");
                return Ok(());
            };
            let (width, height) = tokio::task::spawn_blocking(move || decode_dimensions(&path))
                .await
                .context("decode task panicked")??;
            debug!(%url, width, height, "loaded local image");
            Ok(())
        })
    }
}

/// `file://` URLs, and absolute paths present on disk. Host-relative and
/// protocol-relative URLs (`/images/x.jpg`, `//cdn/x.jpg`) belong to the host.
fn local_path(url: &str) -> Option<PathBuf> {
    if let Some(rest) = url.strip_prefix("file://") {
        return Some(PathBuf::from(rest));
    }
    if url.starts_with("//") || url.contains("://") {
        return None;
    }
    let path = Path::new(url);
    (path.is_absolute() && path.is_file()).then(|| path.to_path_buf())
}

fn decode_dimensions(path: &Path) -> Result<(u32, u32)> {
    let img = image::ImageReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?
        .with_guessed_format()?
        .decode()
        .with_context(|| format!("failed to decode {}", path.display()))?;
    Ok((img.width(), img.height()))
}

struct ActiveLoad {
    node: NodeId,
    /// `None` once the load failed; a failed load never completes.
    load: Option<BoxFuture<'static, Result<()>>>,
}

/// Holds the single live image load.
///
/// Syncing to a new request drops the previous future before the new one is
/// created, so a superseded load can never report completion.
#[derive(Default)]
pub struct LoadSlot {
    active: Option<ActiveLoad>,
}

impl LoadSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self) -> Option<NodeId> {
        self.active.as_ref().map(|a| a.node)
    }

    pub fn sync<L: ImageLoader + ?Sized>(&mut self, wanted: Option<&LoadRequest>, loader: &L) {
        if self.node() == wanted.map(|r| r.node) {
            return;
        }
        if let Some(stale) = self.active.take() {
            debug!(node = %stale.node, "detached superseded load");
        }
        if let Some(request) = wanted {
            self.active = Some(ActiveLoad {
                node: request.node,
                load: Some(loader.load(request)),
            });
        }
    }

    pub fn clear(&mut self) {
        self.active = None;
    }

    /// Resolves with the node whose load succeeded. Pends forever while the
    /// slot is empty or its load has failed.
    pub async fn completion(&mut self) -> NodeId {
        let Some(active) = self.active.as_mut() else {
            return std::future::pending().await;
        };
        let Some(load) = active.load.as_mut() else {
            return std::future::pending().await;
        };
        let result = load.as_mut().await;
        active.load = None;
        match result {
            Ok(()) => active.node,
            Err(err) => {
                warn!(node = %active.node, "image load failed; display holds: {err:#}");
                std::future::pending().await
            }
        }
    }
}

impl std::fmt::Debug for LoadSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadSlot").field("node", &self.node()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn request(node: u64, url: &str) -> LoadRequest {
        LoadRequest {
            node: NodeId(node),
            url: url.to_string(),
        }
    }

    /// Completes each load when the test fires its sender.
    #[derive(Default)]
    struct Gated {
        senders: Mutex<Vec<oneshot::Sender<()>>>,
    }

    impl ImageLoader for Gated {
        fn load(&self, _request: &LoadRequest) -> BoxFuture<'static, Result<()>> {
            let (tx, rx) = oneshot::channel();
            self.senders.lock().unwrap().push(tx);
            Box::pin(async move {
                rx.await.context("gate dropped")?;
                Ok(())
            })
        }
    }

    #[test]
    fn local_paths_are_recognised() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let on_disk = file.path().to_str().unwrap();

        assert_eq!(local_path("file:///tmp/a.png"), Some(PathBuf::from("/tmp/a.png")));
        assert_eq!(local_path(on_disk), Some(file.path().to_path_buf()));
        assert_eq!(local_path("https://example.com/c.jpg"), None);
    }

    #[test]
    fn host_relative_urls_go_to_the_host() {
        assert_eq!(local_path("/MMM-Wallpaper/images/x.jpg"), None);
        assert_eq!(local_path("//cdn.example.com/x.jpg"), None);
        assert_eq!(local_path("images/x.jpg"), None);
    }

    #[tokio::test]
    async fn host_relative_urls_complete_immediately() {
        DecodingLoader
            .load(&request(1, "/MMM-Wallpaper/images/x.jpg"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn decodes_local_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.png");
        image::RgbaImage::new(2, 1).save(&path).unwrap();

        let loader = DecodingLoader;
        let url = format!("file://{}", path.display());
        loader.load(&request(1, &url)).await.unwrap();
        assert_eq!(decode_dimensions(&path).unwrap(), (2, 1));
    }

    #[tokio::test]
    async fn missing_file_fails() {
        let loader = DecodingLoader;
        let res = loader.load(&request(1, "file:///definitely/not/here.png")).await;
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn remote_urls_complete_immediately() {
        DecodingLoader
            .load(&request(1, "https://example.com/a.jpg"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn superseded_load_is_detached() {
        let loader = Gated::default();
        let mut slot = LoadSlot::new();

        slot.sync(Some(&request(1, "a")), &loader);
        slot.sync(Some(&request(2, "b")), &loader);
        assert_eq!(slot.node(), Some(NodeId(2)));

        let mut senders = std::mem::take(&mut *loader.senders.lock().unwrap());
        let live = senders.pop().unwrap();
        let stale = senders.pop().unwrap();
        assert!(stale.send(()).is_err(), "stale load must have been dropped");

        live.send(()).unwrap();
        let node = tokio::time::timeout(Duration::from_secs(1), slot.completion())
            .await
            .expect("live load should complete");
        assert_eq!(node, NodeId(2));
    }

    #[tokio::test]
    async fn same_request_keeps_the_live_load() {
        let loader = Gated::default();
        let mut slot = LoadSlot::new();
        let req = request(3, "c");
        slot.sync(Some(&req), &loader);
        slot.sync(Some(&req), &loader);
        assert_eq!(loader.senders.lock().unwrap().len(), 1);

        slot.sync(None, &loader);
        assert_eq!(slot.node(), None);
    }

    #[tokio::test]
    async fn failed_load_never_completes() {
        let loader = Gated::default();
        let mut slot = LoadSlot::new();
        slot.sync(Some(&request(4, "d")), &loader);
        drop(std::mem::take(&mut *loader.senders.lock().unwrap()));

        let res = tokio::time::timeout(Duration::from_millis(100), slot.completion()).await;
        assert!(res.is_err());
        assert_eq!(slot.node(), Some(NodeId(4)));
    }
}
