use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::events::{Displayed, FetchRequest, Outbound, WallpaperEvent};
use crate::surface::{NodeId, RenderSurface};
use crate::tasks::loader::{ImageLoader, LoadSlot};
use crate::tasks::router::EventRouter;
use crate::viewport::ViewportQuery;

enum Wake {
    Event(WallpaperEvent),
    Loaded(NodeId),
    Timer,
}

/// Drives the router on a single task.
///
/// Rules:
/// - Each wake-up (event, load completion, timer) runs one router handler
///   to completion before anything else is looked at.
/// - After every handler the load slot is synced to the scheduler, which
///   drops a superseded load before the replacement is issued.
/// - Only the earliest deadline is slept on; timers are re-read each turn.
/// - Cancellation, or the event channel closing, tears the router down and
///   hands it back to the caller.
pub async fn run<S, V, L>(
    mut router: EventRouter<S, V>,
    loader: L,
    mut events: Receiver<WallpaperEvent>,
    to_provider: Sender<FetchRequest>,
    displayed_tx: Sender<Displayed>,
    cancel: CancellationToken,
) -> Result<EventRouter<S, V>>
where
    S: RenderSurface,
    V: ViewportQuery,
    L: ImageLoader,
{
    let mut slot = LoadSlot::new();
    router.start(Instant::now());

    loop {
        if !deliver(&mut router, &to_provider, &displayed_tx).await {
            warn!("provider channel closed");
            break;
        }
        slot.sync(router.pending_load(), &loader);
        let timer = router.next_deadline();
        let deadline = timer.unwrap_or_else(Instant::now);

        let wake = select! {
            _ = cancel.cancelled() => break,

            maybe_ev = events.recv() => match maybe_ev {
                Some(ev) => Wake::Event(ev),
                None => {
                    info!("event source closed");
                    break;
                }
            },

            node = slot.completion() => Wake::Loaded(node),

            _ = sleep_until(deadline), if timer.is_some() => Wake::Timer,
        };

        let now = Instant::now();
        match wake {
            Wake::Event(ev) => {
                debug!(event = ?ev, "event received");
                router.dispatch(ev, now);
            }
            Wake::Loaded(node) => {
                slot.clear();
                router.on_loaded(node, now);
            }
            Wake::Timer => router.tick(now),
        }
    }

    slot.clear();
    router.shutdown();
    Ok(router)
}

/// Flushes the router outbox. Returns false once the provider is gone.
async fn deliver<S, V>(
    router: &mut EventRouter<S, V>,
    to_provider: &Sender<FetchRequest>,
    displayed_tx: &Sender<Displayed>,
) -> bool
where
    S: RenderSurface,
    V: ViewportQuery,
{
    let pending: Vec<Outbound> = router.drain_outbound().collect();
    for msg in pending {
        match msg {
            Outbound::Fetch(request) => {
                debug!(
                    source = %request.config.source,
                    orientation = %request.orientation,
                    "fetch request"
                );
                if to_provider.send(request).await.is_err() {
                    return false;
                }
            }
            Outbound::Displayed(displayed) => {
                // Informational; a slow listener must not stall the display.
                if let Err(err) = displayed_tx.try_send(displayed) {
                    debug!("displayed notice dropped: {err}");
                }
            }
        }
    }
    true
}
