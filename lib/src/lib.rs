#![doc = svgbobdoc::transform!(
//! A library for turning a directory of mixed documents into a static site.
//!
//! # Overview
//!
//! swgen consumes a source tree of markdown, org, HTML, page templates, and
//! arbitrary assets, and emits a mirrored output tree of HTML pages and
//! copied assets, along with a sitewide navigator injected into every page.
//!
//! A build proceeds in three passes over the source:
//!
//! ```svgbob
//!  +--------+   scan    +-----------+  navigate  +-----------+
//!  | source |---------->| Node tree |----------->| Navigator |
//!  +--------+           +-----+-----+            +-----+-----+
//!                             |                        |
//!                             |        flush           |
//!                             +-----------+------------+
//!                                         |
//!                                         v
//!                                   +----------+
//!                                   |  output  |
//!                                   +----------+
//! ```
//!
//!   1. **Scan.** The source directory is walked depth-first. Entries matched
//!      by the [`Ignore`](ignore::Ignore) rules are dropped along with their
//!      subtrees; everything else becomes a [`Node`](node::Node) whose
//!      [`Kind`](node::Kind) is resolved once, from its extension.
//!
//!   2. **Navigate.** The complete [`NavEntry`](navigator::NavEntry) tree is
//!      built from the node tree and frozen, with its rendered HTML, in the
//!      [`BuildMetadata`](metadata::BuildMetadata) every page sees.
//!
//!   3. **Flush.** Nodes are written depth-first. A source whose output is
//!      newer than itself is skipped unless the build is forced. Markup is
//!      converted by a [`Converter`](render::Converter), HTML is passed
//!      through, and both are wrapped in the sitewide page template; page
//!      templates render complete documents; everything else is copied.
//!
//! Templates are supplied as an explicitly constructed
//! [`Engine`](templating::Engine), such as
//! [`MiniJinjaEngine`](templating::minijinja::MiniJinjaEngine).
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use swgen::{IgnoreRules, Settings, Swgen};
//! use swgen::templating::minijinja::MiniJinjaEngine;
//!
//! # fn main() -> swgen::error::Result<()> {
//! let engine = Arc::new(MiniJinjaEngine::new()?);
//! let report = Swgen::new("site", "output", Settings::default(), engine)?
//!     .ignore(IgnoreRules::parse("drafts/**")?)
//!     .run()?;
//!
//! println!("wrote {} files", report.written.len());
//! # Ok(())
//! # }
//! ```
)]

#[macro_use]
pub mod error;
pub mod util;
pub mod ignore;
pub mod fstree;
pub mod node;
pub mod render;
pub mod navigator;
pub mod metadata;
pub mod templating;
pub mod config;
pub mod driver;

pub use config::Settings;
pub use driver::{BuildReport, Swgen};
pub use ignore::{Ignore, IgnoreRules};
pub use node::Node;
