pub mod minijinja;

use std::fmt::Debug;
use std::path::Path;
use std::time::SystemTime;

use crate::error::Result;
use crate::metadata::{BuildMetadata, Target};
use crate::navigator::NavEntry;

/// Template names every engine must provide.
pub const PAGE: &str = "page.html";
pub const NAVIGATOR: &str = "navigator.html";
pub const DIRECTORY: &str = "directory.html";

/// Everything known about the page being produced, minus its body.
#[derive(Debug, Copy, Clone)]
pub struct Page<'a> {
    pub title: &'a str,
    /// Output path relative to the target root.
    pub path: &'a Path,
    pub modified: SystemTime,
    pub metadata: &'a BuildMetadata,
    pub target: &'a Target,
}

/// An immutable set of templates. Constructed once and handed to the driver.
pub trait Engine: Send + Sync + Debug {
    /// Wraps `body` in the sitewide page template.
    fn render_page(&self, page: &Page<'_>, body: &str) -> Result<String>;

    /// Renders the navigator into the fragment shared by every page.
    fn render_navigator(&self, navigator: &NavEntry) -> Result<String>;

    /// Renders the body of a directory's index page.
    fn render_directory(&self, page: &Page<'_>, entries: &[NavEntry]) -> Result<String>;

    /// Executes `source`, a page-level template named `name`, into a complete
    /// document.
    fn render_template(&self, name: &str, source: &str, page: &Page<'_>) -> Result<String>;
}
