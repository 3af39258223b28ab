//! Resolution-aware URL selection.

use crate::events::ImageEntry;
use crate::viewport::Viewport;

/// Pick the URL to fetch for `entry` on a display of `viewport` size.
///
/// Variants are walked in the order the provider listed them (smallest
/// first). The walk stops at the first variant over either cap, and after
/// the first variant that covers the viewport on both axes. Without a
/// usable variant the entry's base URL is returned.
pub fn resolve(entry: &ImageEntry, max_width: u32, max_height: u32, viewport: Viewport) -> &str {
    let mut url = entry.url.as_str();

    for variant in &entry.variants {
        if variant.width > max_width || variant.height > max_height {
            break;
        }

        url = variant.url.as_str();

        if variant.width >= viewport.width && variant.height >= viewport.height {
            break;
        }
    }

    url
}
