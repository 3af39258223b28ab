use tokio::time::Instant;
use tracing::info;

use crate::config::{ConfigUpdate, Configuration};
use crate::events::FetchRequest;
use crate::timer::Deadline;
use crate::viewport::{Orientation, Viewport};

/// Owns the live configuration and the catalog refresh cadence.
///
/// Every update re-arms the refresh timer at the (possibly new) interval
/// and asks for a fetch right away. The slide timer is left alone.
#[derive(Debug)]
pub struct ConfigController {
    config: Configuration,
    refresh: Deadline,
}

impl ConfigController {
    pub fn new(config: Configuration) -> Self {
        Self {
            config,
            refresh: Deadline::disarmed(),
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn orientation(&self, viewport: Viewport) -> Orientation {
        self.config.resolved_orientation(viewport)
    }

    /// Initial fetch; arms the refresh timer.
    pub fn start(&mut self, viewport: Viewport, now: Instant) -> FetchRequest {
        self.refresh.arm(now, self.config.update_interval);
        self.fetch_request(viewport)
    }

    pub fn update(
        &mut self,
        update: ConfigUpdate,
        viewport: Viewport,
        now: Instant,
    ) -> FetchRequest {
        let patch = update.into_patch();
        self.config.apply(patch);
        info!(
            source = %self.config.source,
            update_interval = ?self.config.update_interval,
            slide_interval = ?self.config.slide_interval,
            "configuration updated"
        );
        self.refresh.arm(now, self.config.update_interval);
        self.fetch_request(viewport)
    }

    /// Periodic refresh; yields a request when the timer was due.
    pub fn tick(&mut self, viewport: Viewport, now: Instant) -> Option<FetchRequest> {
        if !self.refresh.fire(now) {
            return None;
        }
        self.refresh.arm(now, self.config.update_interval);
        Some(self.fetch_request(viewport))
    }

    pub fn refresh_deadline(&self) -> Option<Instant> {
        self.refresh.at()
    }

    pub fn teardown(&mut self) {
        self.refresh.cancel();
    }

    pub fn fetch_request(&self, viewport: Viewport) -> FetchRequest {
        FetchRequest {
            config: self.config.clone(),
            orientation: self.orientation(viewport),
        }
    }
}
