use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Configuration;
use crate::events::{Batch, ImageEntry};
use crate::viewport::Orientation;

/// Result of offering a batch to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogChange {
    /// Batch was for another source or orientation; nothing changed.
    Ignored,
    /// Catalog now holds `len` entries.
    Replaced { len: usize },
    /// Catalog was replaced by an empty batch.
    Emptied,
}

/// The active batch for the configured `(source, orientation)` pair.
///
/// Batches replace each other wholesale. Entries are shared so that the
/// scheduler may keep showing an entry after its batch has been dropped.
#[derive(Debug, Default)]
pub struct ImageCatalog {
    source: Option<String>,
    orientation: Option<Orientation>,
    entries: Vec<Arc<ImageEntry>>,
}

impl ImageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(
        &mut self,
        batch: Batch,
        config: &Configuration,
        orientation: Orientation,
    ) -> CatalogChange {
        if batch.orientation != orientation || !config.source.matches(&batch.source) {
            debug!(
                source = %batch.source,
                orientation = %batch.orientation,
                wanted_source = %config.source,
                wanted_orientation = %orientation,
                "ignoring stale batch"
            );
            return CatalogChange::Ignored;
        }

        let Batch {
            source,
            orientation,
            mut entries,
        } = batch;
        let received = entries.len();
        entries.truncate(config.maximum_entries);

        self.entries = entries.into_iter().map(Arc::new).collect();
        info!(
            source = %source,
            orientation = %orientation,
            received,
            kept = self.entries.len(),
            "catalog replaced"
        );
        self.source = Some(source);
        self.orientation = Some(orientation);

        if self.entries.is_empty() {
            CatalogChange::Emptied
        } else {
            CatalogChange::Replaced {
                len: self.entries.len(),
            }
        }
    }

    /// Enforces a lowered `maximum-entries` on the batch already held.
    /// Returns whether any entries were dropped.
    pub fn truncate(&mut self, max_entries: usize) -> bool {
        let before = self.entries.len();
        self.entries.truncate(max_entries);
        if self.entries.len() == before {
            return false;
        }
        info!(before, kept = self.entries.len(), "catalog truncated");
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<ImageEntry>> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[Arc<ImageEntry>] {
        &self.entries
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn orientation(&self) -> Option<Orientation> {
        self.orientation
    }
}
