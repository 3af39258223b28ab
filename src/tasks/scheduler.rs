use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rand::rngs::StdRng;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::catalog::ImageCatalog;
use crate::config::Configuration;
use crate::events::{Displayed, ImageEntry};
use crate::surface::{ImageStyle, NodeId, RenderSurface};
use crate::timer::{Deadline, earliest};
use crate::variant;
use crate::viewport::Viewport;

/// Length of the opacity crossfade between two images.
pub const CROSSFADE_DURATION: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideState {
    /// No usable catalog. The last image, if any, stays on screen.
    Empty,
    /// One image fully visible.
    Showing,
    /// A pending image is loading or fading in.
    Transitioning,
}

/// An image the driver must load before the scheduler can reveal it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub node: NodeId,
    pub url: String,
}

/// Inputs every scheduler transition reads.
#[derive(Debug, Clone, Copy)]
pub struct SlideContext<'a> {
    pub catalog: &'a ImageCatalog,
    pub config: &'a Configuration,
    pub viewport: Viewport,
    pub now: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Loading,
    FadingIn,
}

#[derive(Debug)]
struct Shown {
    node: NodeId,
    url: String,
    entry: Arc<ImageEntry>,
}

#[derive(Debug)]
struct Pending {
    request: LoadRequest,
    entry: Arc<ImageEntry>,
    phase: Phase,
}

/// Decides which image is on screen and when the next one replaces it.
///
/// Transitions:
/// - first non-empty catalog: random entry, shown directly, slide timer armed.
/// - slide timer or forced advance: random entry mounted hidden; any previous
///   pending image is removed first so only one load is ever live.
/// - load completion: pending image fades in, caption hidden until the fade
///   settles, then the old image is released and the slide timer re-armed
///   from the settle moment.
/// - empty catalog: timers stop and the last image is left in place.
pub struct SlideScheduler<S> {
    surface: S,
    rng: StdRng,
    next_node: u64,
    catalog_len: usize,
    current_index: usize,
    current: Option<Shown>,
    pending: Option<Pending>,
    slide: Deadline,
    settle: Deadline,
    displayed: VecDeque<Displayed>,
}

impl<S: RenderSurface> SlideScheduler<S> {
    pub fn new(surface: S, rng: StdRng) -> Self {
        Self {
            surface,
            rng,
            next_node: 0,
            catalog_len: 0,
            current_index: 0,
            current: None,
            pending: None,
            slide: Deadline::disarmed(),
            settle: Deadline::disarmed(),
            displayed: VecDeque::new(),
        }
    }

    pub fn state(&self) -> SlideState {
        if self.pending.is_some() {
            SlideState::Transitioning
        } else if self.catalog_len == 0 {
            SlideState::Empty
        } else {
            SlideState::Showing
        }
    }

    pub fn on_catalog_replaced(&mut self, ctx: &SlideContext<'_>) {
        let was_empty = self.state() == SlideState::Empty;
        self.catalog_len = ctx.catalog.len();

        if ctx.catalog.is_empty() {
            self.slide.cancel();
            self.abandon_pending(ctx.config, ctx.now);
            info!("catalog empty; holding the last image");
            return;
        }

        self.current_index = self.rng.random_range(0..self.catalog_len);

        if self.current.is_none() && self.pending.is_none() {
            self.show_first(ctx);
        } else if was_empty && self.pending.is_none() {
            debug!("catalog refilled; resuming rotation");
            self.advance(ctx);
        }
    }

    /// The held catalog shrank in place. The image on screen and any
    /// pending load are kept; only the index is brought back in range.
    pub fn on_catalog_truncated(&mut self, ctx: &SlideContext<'_>) {
        if ctx.catalog.is_empty() {
            self.on_catalog_replaced(ctx);
            return;
        }
        self.catalog_len = ctx.catalog.len();
        if self.current_index >= self.catalog_len {
            self.current_index = self.rng.random_range(0..self.catalog_len);
        }
    }

    /// Start replacing the current image. Used by both the slide timer and
    /// forced advances.
    pub fn advance(&mut self, ctx: &SlideContext<'_>) {
        if ctx.catalog.is_empty() {
            debug!("advance requested without entries");
            self.slide.cancel();
            return;
        }

        if self.pending.as_ref().map(|p| p.phase) == Some(Phase::FadingIn) {
            self.finish_transition(ctx.config, ctx.now);
        }
        if let Some(stale) = self.pending.take() {
            self.surface.remove(stale.request.node);
            debug!(node = %stale.request.node, url = %stale.request.url, "detached pending load");
        }

        self.current_index = self.rng.random_range(0..ctx.catalog.len());
        let entry = Arc::clone(&ctx.catalog.entries()[self.current_index]);
        let url = self.resolve_url(&entry, ctx);
        let node = self.alloc_node();
        self.surface.mount(node, &url, &ImageStyle::from_config(ctx.config));
        debug!(%node, index = self.current_index, %url, "loading next image");

        self.pending = Some(Pending {
            request: LoadRequest { node, url },
            entry,
            phase: Phase::Loading,
        });
        // Keeps a stalled load from freezing the rotation forever.
        self.slide.arm(ctx.now, ctx.config.slide_interval);
    }

    /// Completion of the load for `node`. Completions for anything but the
    /// live pending load are ignored.
    pub fn on_loaded(&mut self, node: NodeId, config: &Configuration, now: Instant) {
        let Some(pending) = self.pending.as_mut() else {
            debug!(%node, "load completed with nothing pending");
            return;
        };
        if pending.request.node != node || pending.phase != Phase::Loading {
            debug!(%node, pending = %pending.request.node, "ignoring stale load completion");
            return;
        }
        pending.phase = Phase::FadingIn;

        let fade = if config.crossfade {
            CROSSFADE_DURATION
        } else {
            Duration::ZERO
        };
        self.surface.set_caption(None);
        self.surface.set_opacity(node, 1.0, fade);
        if let Some(current) = self.current.as_ref() {
            self.surface.set_opacity(current.node, 0.0, fade);
        }
        debug!(%node, fade_ms = fade.as_millis() as u64, "revealing image");

        if fade.is_zero() {
            self.finish_transition(config, now);
        } else {
            self.settle.arm(now, fade);
        }
    }

    /// Fire whichever timers are due at `ctx.now`.
    pub fn tick(&mut self, ctx: &SlideContext<'_>) {
        if self.settle.fire(ctx.now) {
            self.finish_transition(ctx.config, ctx.now);
        }
        if self.slide.fire(ctx.now) {
            debug!("slide timer fired");
            self.advance(ctx);
        }
    }

    /// Stop both timers and drop the live load. The image on screen stays.
    pub fn teardown(&mut self) {
        self.slide.cancel();
        self.settle.cancel();
        if let Some(pending) = self.pending.take() {
            self.surface.remove(pending.request.node);
        }
        debug!("scheduler torn down");
    }

    /// The load the driver should have in flight, if any.
    pub fn pending_load(&self) -> Option<&LoadRequest> {
        self.pending
            .as_ref()
            .filter(|p| p.phase == Phase::Loading)
            .map(|p| &p.request)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        earliest([self.slide.at(), self.settle.at()])
    }

    pub fn slide_deadline(&self) -> Option<Instant> {
        self.slide.at()
    }

    pub fn settle_deadline(&self) -> Option<Instant> {
        self.settle.at()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_entry(&self) -> Option<&Arc<ImageEntry>> {
        self.current.as_ref().map(|c| &c.entry)
    }

    pub fn current_node(&self) -> Option<NodeId> {
        self.current.as_ref().map(|c| c.node)
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current.as_ref().map(|c| c.url.as_str())
    }

    pub fn pending_entry(&self) -> Option<&Arc<ImageEntry>> {
        self.pending.as_ref().map(|p| &p.entry)
    }

    pub fn pending_node(&self) -> Option<NodeId> {
        self.pending.as_ref().map(|p| p.request.node)
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn drain_displayed(&mut self) -> impl Iterator<Item = Displayed> + '_ {
        self.displayed.drain(..)
    }

    fn show_first(&mut self, ctx: &SlideContext<'_>) {
        let Some(entry) = ctx.catalog.get(self.current_index).cloned() else {
            return;
        };
        let url = self.resolve_url(&entry, ctx);
        let node = self.alloc_node();
        self.surface.mount(node, &url, &ImageStyle::from_config(ctx.config));
        self.surface.set_opacity(node, 1.0, Duration::ZERO);
        self.show_caption(ctx.config, &entry);
        info!(%node, index = self.current_index, %url, "first image displayed");

        self.record_displayed(&url, &entry);
        self.current = Some(Shown { node, url, entry });
        self.slide.arm(ctx.now, ctx.config.slide_interval);
    }

    fn finish_transition(&mut self, config: &Configuration, now: Instant) {
        self.settle.cancel();
        let pending = match self.pending.take() {
            Some(p) if p.phase == Phase::FadingIn => p,
            other => {
                self.pending = other;
                return;
            }
        };

        if let Some(previous) = self.current.take() {
            self.surface.remove(previous.node);
        }
        self.show_caption(config, &pending.entry);

        let Pending { request, entry, .. } = pending;
        info!(node = %request.node, url = %request.url, "image displayed");
        self.record_displayed(&request.url, &entry);
        self.current = Some(Shown {
            node: request.node,
            url: request.url,
            entry,
        });

        if self.catalog_len > 0 {
            self.slide.arm(now, config.slide_interval);
        }
    }

    /// Catalog went empty: a fading image is allowed to land, a loading one
    /// is dropped.
    fn abandon_pending(&mut self, config: &Configuration, now: Instant) {
        match self.pending.as_ref().map(|p| p.phase) {
            Some(Phase::FadingIn) => self.finish_transition(config, now),
            Some(Phase::Loading) => {
                if let Some(stale) = self.pending.take() {
                    self.surface.remove(stale.request.node);
                    debug!(node = %stale.request.node, "dropped pending load");
                }
            }
            None => {}
        }
    }

    fn show_caption(&mut self, config: &Configuration, entry: &ImageEntry) {
        if config.caption {
            if let Some(caption) = entry.caption.as_deref() {
                self.surface.set_caption(Some(caption));
            }
        }
    }

    fn record_displayed(&mut self, url: &str, entry: &ImageEntry) {
        self.displayed.push_back(Displayed {
            url: url.to_string(),
            caption: entry.caption.clone(),
        });
    }

    fn resolve_url(&self, entry: &ImageEntry, ctx: &SlideContext<'_>) -> String {
        variant::resolve(entry, ctx.config.max_width, ctx.config.max_height, ctx.viewport)
            .to_string()
    }

    fn alloc_node(&mut self) -> NodeId {
        self.next_node += 1;
        NodeId(self.next_node)
    }
}
