use std::time::Duration;

use anyhow::Context;
use futures::future::BoxFuture;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rust_wallpaper::config::Configuration;
use rust_wallpaper::events::{Batch, Displayed, FetchRequest, ImageEntry, WallpaperEvent};
use rust_wallpaper::surface::MemorySurface;
use rust_wallpaper::tasks::display;
use rust_wallpaper::tasks::loader::ImageLoader;
use rust_wallpaper::tasks::router::EventRouter;
use rust_wallpaper::tasks::scheduler::LoadRequest;
use rust_wallpaper::viewport::{Orientation, Viewport};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(2);

/// Hands every load to the test, which decides when (and whether) it completes.
struct GatedLoader {
    issued: mpsc::UnboundedSender<(LoadRequest, oneshot::Sender<()>)>,
}

impl ImageLoader for GatedLoader {
    fn load(&self, request: &LoadRequest) -> BoxFuture<'static, anyhow::Result<()>> {
        let (tx, rx) = oneshot::channel();
        let _ = self.issued.send((request.clone(), tx));
        Box::pin(async move {
            rx.await.context("gate dropped")?;
            Ok(())
        })
    }
}

fn batch(n: usize) -> WallpaperEvent {
    WallpaperEvent::BatchAvailable(Batch {
        source: "bing".into(),
        orientation: Orientation::Horizontal,
        entries: (0..n)
            .map(|i| ImageEntry {
                url: format!("https://bing/{i}.jpg"),
                caption: None,
                variants: Vec::new(),
            })
            .collect(),
    })
}

struct Harness {
    events: mpsc::Sender<WallpaperEvent>,
    fetches: mpsc::Receiver<FetchRequest>,
    displayed: mpsc::Receiver<Displayed>,
    loads: mpsc::UnboundedReceiver<(LoadRequest, oneshot::Sender<()>)>,
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<anyhow::Result<EventRouter<MemorySurface, Viewport>>>,
}

fn spawn(cfg: Configuration) -> Harness {
    let (event_tx, event_rx) = mpsc::channel(16);
    let (fetch_tx, fetch_rx) = mpsc::channel(16);
    let (displayed_tx, displayed_rx) = mpsc::channel(16);
    let (issued, loads) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();

    let router = EventRouter::new(
        cfg,
        MemorySurface::new(),
        Viewport::new(1920, 1080),
        StdRng::seed_from_u64(5),
    );
    let handle = tokio::spawn(display::run(
        router,
        GatedLoader { issued },
        event_rx,
        fetch_tx,
        displayed_tx,
        cancel.clone(),
    ));

    Harness {
        events: event_tx,
        fetches: fetch_rx,
        displayed: displayed_rx,
        loads,
        cancel,
        handle,
    }
}

fn manual_config() -> Configuration {
    Configuration {
        slide_interval: Duration::ZERO,
        crossfade: false,
        ..Configuration::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn startup_issues_fetch_and_first_batch_displays() {
    let mut h = spawn(manual_config());

    let req = tokio::time::timeout(WAIT, h.fetches.recv())
        .await
        .expect("timeout waiting for startup fetch")
        .expect("provider channel closed");
    assert_eq!(req.orientation, Orientation::Horizontal);

    h.events.send(batch(3)).await.unwrap();
    let shown = tokio::time::timeout(WAIT, h.displayed.recv())
        .await
        .expect("timeout waiting for first image")
        .expect("displayed channel closed");
    assert!(shown.url.starts_with("https://bing/"));

    h.cancel.cancel();
    let router = h.handle.await.unwrap().unwrap();
    assert_eq!(router.scheduler().current_url(), Some(shown.url.as_str()));
    assert!(router.next_deadline().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn only_the_latest_forced_advance_can_land() {
    let mut h = spawn(manual_config());
    h.events.send(batch(5)).await.unwrap();
    tokio::time::timeout(WAIT, h.displayed.recv())
        .await
        .expect("timeout waiting for first image")
        .expect("displayed channel closed");

    h.events.send(WallpaperEvent::ForceAdvance).await.unwrap();
    h.events.send(WallpaperEvent::ForceAdvance).await.unwrap();

    let (first, first_gate) = tokio::time::timeout(WAIT, h.loads.recv())
        .await
        .expect("timeout waiting for first load")
        .expect("loader gone");
    let (second, second_gate) = tokio::time::timeout(WAIT, h.loads.recv())
        .await
        .expect("timeout waiting for second load")
        .expect("loader gone");
    assert_ne!(first.node, second.node);
    assert!(
        first_gate.send(()).is_err(),
        "superseded load must have been dropped"
    );

    second_gate.send(()).unwrap();
    let shown = tokio::time::timeout(WAIT, h.displayed.recv())
        .await
        .expect("timeout waiting for second image")
        .expect("displayed channel closed");
    assert_eq!(shown.url, second.url);

    h.cancel.cancel();
    let router = h.handle.await.unwrap().unwrap();
    assert_eq!(router.scheduler().current_node(), Some(second.node));
    assert!(router.surface().node(first.node).is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slide_timer_drives_rotation() {
    let mut h = spawn(Configuration {
        slide_interval: Duration::from_millis(500),
        crossfade: false,
        ..Configuration::default()
    });
    h.events.send(batch(3)).await.unwrap();
    tokio::time::timeout(WAIT, h.displayed.recv())
        .await
        .expect("timeout waiting for first image")
        .expect("displayed channel closed");

    let (request, gate) = tokio::time::timeout(WAIT, h.loads.recv())
        .await
        .expect("slide timer never started a load")
        .expect("loader gone");
    gate.send(()).unwrap();

    let shown = tokio::time::timeout(WAIT, h.displayed.recv())
        .await
        .expect("timeout waiting for rotated image")
        .expect("displayed channel closed");
    assert_eq!(shown.url, request.url);

    h.cancel.cancel();
    h.handle.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn closed_event_source_stops_the_loop() {
    let h = spawn(manual_config());
    drop(h.events);

    let router = tokio::time::timeout(WAIT, h.handle)
        .await
        .expect("loop did not stop")
        .unwrap()
        .unwrap();
    assert!(router.next_deadline().is_none());
    drop(h.fetches);
}
