use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::Result;
use crate::navigator::NavEntry;
use crate::templating::Engine;

/// Where a build writes to and how it links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// The output directory.
    pub root: PathBuf,
    /// Prefix for every generated link, e.g. `/` or `https://example.org/docs`.
    pub url_root: String,
}

/// Build-wide facts shared, read-only, by every render in one build.
#[derive(Debug, Clone)]
pub struct BuildMetadata {
    pub build_time: DateTime<Utc>,
    pub version: String,
    pub navigator: NavEntry,
    /// `navigator`, rendered once through the navigator template.
    pub navigator_html: String,
}

#[cfg(test)] static_assertions::assert_impl_all!(BuildMetadata: Send, Sync);
#[cfg(test)] static_assertions::assert_impl_all!(Target: Send, Sync);
#[cfg(test)] static_assertions::assert_impl_all!(NavEntry: Send, Sync);

impl BuildMetadata {
    /// Freezes `navigator` for the build, rendering it with `engine`.
    pub fn new(navigator: NavEntry, engine: &dyn Engine, version: &str) -> Result<Self> {
        if navigator.is_empty() {
            warn!("navigator is empty: the source tree has no navigable pages");
        }

        let navigator_html = engine.render_navigator(&navigator)?;
        Ok(BuildMetadata {
            build_time: Utc::now(),
            version: version.into(),
            navigator,
            navigator_html,
        })
    }
}
