use std::collections::VecDeque;

use rand::rngs::StdRng;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::catalog::{CatalogChange, ImageCatalog};
use crate::config::{ConfigUpdate, Configuration, PresenceAction};
use crate::events::{Batch, Outbound, WallpaperEvent};
use crate::surface::{NodeId, RenderSurface, SurfaceLayout};
use crate::tasks::controller::ConfigController;
use crate::tasks::scheduler::{LoadRequest, SlideContext, SlideScheduler};
use crate::timer::earliest;
use crate::viewport::{Viewport, ViewportQuery};

/// Owns the display state and maps every inbound event or timer fire onto
/// the catalog, scheduler and controller. Handlers run to completion; the
/// driver collects fetch requests and display notices from the outbox.
pub struct EventRouter<S, V> {
    controller: ConfigController,
    catalog: ImageCatalog,
    scheduler: SlideScheduler<S>,
    viewport: V,
    outbox: VecDeque<Outbound>,
}

impl<S: RenderSurface, V: ViewportQuery> EventRouter<S, V> {
    pub fn new(config: Configuration, surface: S, viewport: V, rng: StdRng) -> Self {
        Self {
            controller: ConfigController::new(config),
            catalog: ImageCatalog::new(),
            scheduler: SlideScheduler::new(surface, rng),
            viewport,
            outbox: VecDeque::new(),
        }
    }

    /// Lays out the surface and issues the startup fetch.
    pub fn start(&mut self, now: Instant) {
        let cfg = self.controller.config();
        let layout = SurfaceLayout::from_config(cfg);
        let starts_hidden = cfg.user_presence_action == PresenceAction::Show;

        let surface = self.scheduler.surface_mut();
        surface.configure(&layout);
        if starts_hidden {
            surface.set_visible(false);
        }

        let viewport = self.viewport.viewport();
        let request = self.controller.start(viewport, now);
        info!(
            source = %request.config.source,
            orientation = %request.orientation,
            %viewport,
            "wallpaper started"
        );
        self.outbox.push_back(Outbound::Fetch(request));
    }

    pub fn dispatch(&mut self, event: WallpaperEvent, now: Instant) {
        match event {
            WallpaperEvent::BatchAvailable(batch) => self.on_batch(batch, now),
            WallpaperEvent::ForceAdvance => {
                debug!("forced advance");
                let viewport = self.viewport.viewport();
                self.scheduler.advance(&SlideContext {
                    catalog: &self.catalog,
                    config: self.controller.config(),
                    viewport,
                    now,
                });
            }
            WallpaperEvent::PresenceChanged { present } => self.on_presence(present),
            WallpaperEvent::ConfigUpdate { payload } => self.on_config_update(payload, now),
        }
        self.collect_displayed();
    }

    /// Fire every timer due at `now`.
    pub fn tick(&mut self, now: Instant) {
        let viewport = self.viewport.viewport();
        if let Some(request) = self.controller.tick(viewport, now) {
            debug!(orientation = %request.orientation, "catalog refresh due");
            self.outbox.push_back(Outbound::Fetch(request));
        }
        self.scheduler.tick(&SlideContext {
            catalog: &self.catalog,
            config: self.controller.config(),
            viewport,
            now,
        });
        self.collect_displayed();
    }

    pub fn on_loaded(&mut self, node: NodeId, now: Instant) {
        self.scheduler.on_loaded(node, self.controller.config(), now);
        self.collect_displayed();
    }

    /// Releases both timers and the live load.
    pub fn shutdown(&mut self) {
        self.controller.teardown();
        self.scheduler.teardown();
        info!("wallpaper stopped");
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        earliest([
            self.controller.refresh_deadline(),
            self.scheduler.next_deadline(),
        ])
    }

    pub fn pending_load(&self) -> Option<&LoadRequest> {
        self.scheduler.pending_load()
    }

    pub fn drain_outbound(&mut self) -> impl Iterator<Item = Outbound> + '_ {
        self.outbox.drain(..)
    }

    pub fn config(&self) -> &Configuration {
        self.controller.config()
    }

    pub fn controller(&self) -> &ConfigController {
        &self.controller
    }

    pub fn catalog(&self) -> &ImageCatalog {
        &self.catalog
    }

    pub fn scheduler(&self) -> &SlideScheduler<S> {
        &self.scheduler
    }

    pub fn surface(&self) -> &S {
        self.scheduler.surface()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport.viewport()
    }

    fn on_batch(&mut self, batch: Batch, now: Instant) {
        let viewport = self.viewport.viewport();
        let orientation = self.controller.orientation(viewport);
        let change = self.catalog.replace(batch, self.controller.config(), orientation);
        if change == CatalogChange::Ignored {
            return;
        }
        self.scheduler.on_catalog_replaced(&SlideContext {
            catalog: &self.catalog,
            config: self.controller.config(),
            viewport,
            now,
        });
    }

    fn on_presence(&mut self, present: bool) {
        let action = self.controller.config().user_presence_action;
        match action.visibility(present) {
            Some(visible) => {
                debug!(present, visible, ?action, "presence changed");
                self.scheduler.surface_mut().set_visible(visible);
            }
            None => debug!(present, "presence ignored"),
        }
    }

    fn on_config_update(&mut self, update: ConfigUpdate, now: Instant) {
        let viewport = self.viewport.viewport();
        let request = self.controller.update(update, viewport, now);
        self.outbox.push_back(Outbound::Fetch(request));

        if self.catalog.truncate(self.controller.config().maximum_entries) {
            self.scheduler.on_catalog_truncated(&SlideContext {
                catalog: &self.catalog,
                config: self.controller.config(),
                viewport,
                now,
            });
        }
    }

    fn collect_displayed(&mut self) {
        self.outbox
            .extend(self.scheduler.drain_displayed().map(Outbound::Displayed));
    }
}
