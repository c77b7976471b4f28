//! The build driver: scan, navigate, then render and write depth-first.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{Chainable, Result};
use crate::ignore::{Ignore, IgnoreRules};
use crate::metadata::{BuildMetadata, Target};
use crate::navigator::{self, NavEntry};
use crate::node::{self, Kind, Node};
use crate::render::{Converters, Rendered};
use crate::templating::{Engine, Page};
use crate::util::PathExt;

/// The page synthesized for, or provided by, each directory.
pub const INDEX: &str = "index.html";

/// Where the serialized navigator is written when enabled.
pub const NAV_JSON: &str = "nav.json";

/// Everything a node needs to render and flush itself. Shared, read-only,
/// for the whole of one build.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub converters: &'a Converters,
    pub engine: &'a dyn Engine,
    pub metadata: &'a BuildMetadata,
    pub target: &'a Target,
    pub force: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Outcome {
    Written,
    Skipped,
}

/// Output paths, relative to the target root, touched by one build.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

#[derive(derive_more::Debug)]
pub struct Swgen {
    source: PathBuf,
    target: Target,
    settings: Settings,
    #[debug(skip)]
    ignore: Arc<dyn Ignore>,
    engine: Arc<dyn Engine>,
}

impl<'a> BuildContext<'a> {
    pub fn page<'b>(&'b self, node: &'b Node) -> Page<'b> {
        Page {
            title: node.title(),
            path: node.output_path(),
            modified: node.modified(),
            metadata: self.metadata,
            target: self.target,
        }
    }

    /// The absolute destination for an output-relative path.
    pub fn destination(&self, relative: &Path) -> PathBuf {
        self.target.root.join(relative)
    }

    /// Whether `destination` is newer than a source modified at `modified`,
    /// and so need not be regenerated.
    pub fn is_fresh(&self, destination: &Path, modified: SystemTime) -> bool {
        if self.force {
            return false;
        }

        match fs::metadata(destination) {
            Ok(meta) if !meta.is_dir() => meta.modified().map_or(false, |m| m > modified),
            _ => false,
        }
    }
}

impl BuildReport {
    fn record(&mut self, outcome: Outcome, path: &Path) {
        match outcome {
            Outcome::Written => {
                info!(path = %path.display(), "wrote");
                self.written.push(path.to_path_buf());
            }
            Outcome::Skipped => {
                debug!(path = %path.display(), "up to date, skipping");
                self.skipped.push(path.to_path_buf());
            }
        }
    }
}

fn write(destination: &Path, contents: &str) -> Result<()> {
    fs::write(destination, contents).chain_with(|| error! {
        Flush: "failed to write output",
        "path" => destination.display(),
    })
}

impl Node {
    /// Writes this node, and for directories everything beneath it, into the
    /// target. Stops at the first error.
    pub fn flush(&self, cx: &BuildContext<'_>, report: &mut BuildReport) -> Result<()> {
        let relative = self.output_path();
        let destination = cx.destination(relative);
        match self.kind() {
            Kind::Directory => {
                fs::create_dir_all(&destination).chain_with(|| error! {
                    Flush: "failed to create output directory",
                    "path" => destination.display(),
                })?;

                for child in self.children() {
                    child.flush(cx, report)?;
                }

                self.flush_index(cx, report)
            }
            _ if cx.is_fresh(&destination, self.modified()) => {
                report.record(Outcome::Skipped, relative);
                Ok(())
            }
            Kind::Raw => {
                fs::copy(&self.entry().path, &destination).chain_with(|| error! {
                    Flush: "failed to copy file",
                    "source" => self.entry().path.display(),
                    "destination" => destination.display(),
                })?;

                report.record(Outcome::Written, relative);
                Ok(())
            }
            _ => {
                let page = match self.render(cx)? {
                    Rendered::Page(page) => page,
                    Rendered::Fragment(body) => cx.engine.render_page(&cx.page(self), &body)
                        .chain_with(|| error! {
                            Render: "failed to wrap page",
                            "path" => self.entry().path.display(),
                        })?,
                };

                write(&destination, &page)?;
                report.record(Outcome::Written, relative);
                Ok(())
            }
        }
    }

    /// Whether this is a page source named `index.*`, standing in for its
    /// directory's synthesized index.
    fn is_index_source(&self) -> bool {
        self.kind().is_navigable()
            && self.entry().file_name.split('.').next() == Some("index")
    }

    /// Synthesizes `index.html` for a directory with navigable content that
    /// has no `index.*` page source of its own.
    fn flush_index(&self, cx: &BuildContext<'_>, report: &mut BuildReport) -> Result<()> {
        let relative = self.output_path().join(INDEX);
        if self.children().iter().any(|c| c.is_index_source() || c.output_path() == relative) {
            return Ok(());
        }

        let entries = navigator::listing(self, &cx.target.url_root);
        if entries.is_empty() {
            return Ok(());
        }

        let destination = cx.destination(&relative);
        if cx.is_fresh(&destination, self.modified()) {
            report.record(Outcome::Skipped, &relative);
            return Ok(());
        }

        let page = Page { path: &relative, ..cx.page(self) };
        let body = cx.engine.render_directory(&page, &entries)?;
        let html = cx.engine.render_page(&page, &body)?;
        write(&destination, &html)?;
        report.record(Outcome::Written, &relative);
        Ok(())
    }
}

impl Swgen {
    /// A build of `source` into `output`, ignoring nothing.
    pub fn new<S, O>(source: S, output: O, settings: Settings, engine: Arc<dyn Engine>) -> Result<Self>
        where S: AsRef<Path>, O: AsRef<Path>
    {
        settings.validate()?;
        Ok(Swgen {
            source: source.as_ref().to_path_buf(),
            target: Target {
                root: output.as_ref().to_path_buf(),
                url_root: settings.url_root.clone(),
            },
            ignore: Arc::new(IgnoreRules::new()),
            settings,
            engine,
        })
    }

    /// Skips every source entry `ignore` matches.
    pub fn ignore<I: Ignore + 'static>(mut self, ignore: I) -> Self {
        self.ignore = Arc::new(ignore);
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn scan(&self) -> Result<Node> {
        node::scan(&self.source, self.ignore.clone())
    }

    /// Scans the source and builds it.
    pub fn run(&self) -> Result<BuildReport> {
        let root = self.scan()?;
        self.build(&root)
    }

    /// Builds an already scanned tree: the navigator is completed first, then
    /// every node is flushed depth-first.
    pub fn build(&self, root: &Node) -> Result<BuildReport> {
        let navigator = navigator::build(root, &self.target.url_root);
        let metadata = BuildMetadata::new(navigator, &*self.engine, self.settings.version())?;

        fs::create_dir_all(&self.target.root).chain_with(|| error! {
            Flush: "failed to create output root",
            "path" => self.target.root.display(),
        })?;

        let mut report = BuildReport::default();
        if self.settings.navigator_json {
            self.write_navigator_json(root, &metadata.navigator, &mut report)?;
        }

        let cx = BuildContext {
            converters: &self.settings.converters,
            engine: &*self.engine,
            metadata: &metadata,
            target: &self.target,
            force: self.settings.force,
        };

        root.flush(&cx, &mut report)?;
        info!(
            written = report.written.len(),
            skipped = report.skipped.len(),
            "built {} into {}",
            self.source.display(),
            self.target.root.display()
        );

        Ok(report)
    }

    /// Writes `nav.json`, leaving an identical existing file untouched.
    fn write_navigator_json(
        &self,
        root: &Node,
        navigator: &NavEntry,
        report: &mut BuildReport,
    ) -> Result<()> {
        let relative = Path::new(NAV_JSON);
        if root.children().iter().any(|c| c.output_path() == relative) {
            return err! {
                Config: "navigator output collides with a source",
                "path" => relative.to_slash(),
            }
        }

        let json = serde_json::to_string_pretty(navigator)
            .chain_with(|| error!(Flush: "failed to serialize navigator"))?;

        let destination = self.target.root.join(relative);
        if !self.settings.force && fs::read_to_string(&destination).map_or(false, |s| s == json) {
            report.record(Outcome::Skipped, relative);
            return Ok(());
        }

        write(&destination, &json)?;
        report.record(Outcome::Written, relative);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};

    use super::*;
    use crate::templating::minijinja::MiniJinjaEngine;

    fn context<'a>(
        converters: &'a Converters,
        engine: &'a MiniJinjaEngine,
        metadata: &'a BuildMetadata,
        target: &'a Target,
        force: bool,
    ) -> BuildContext<'a> {
        BuildContext { converters, engine, metadata, target, force }
    }

    #[test]
    fn freshness_requires_a_strictly_newer_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("a.html");
        fs::write(&output, "").unwrap();

        let written = fs::metadata(&output).unwrap().modified().unwrap();
        let engine = MiniJinjaEngine::new().unwrap();
        let metadata = BuildMetadata::new(NavEntry::group("", vec![]), &engine, "0").unwrap();
        let target = Target { root: dir.path().into(), url_root: "/".into() };
        let converters = Converters::default();

        let cx = context(&converters, &engine, &metadata, &target, false);
        assert!(cx.is_fresh(&output, written - Duration::from_secs(60)));
        assert!(!cx.is_fresh(&output, written));
        assert!(!cx.is_fresh(&output, written + Duration::from_secs(60)));
        assert!(!cx.is_fresh(&dir.path().join("missing.html"), SystemTime::UNIX_EPOCH));
        assert!(!cx.is_fresh(dir.path(), SystemTime::UNIX_EPOCH));

        let forced = context(&converters, &engine, &metadata, &target, true);
        assert!(!forced.is_fresh(&output, SystemTime::UNIX_EPOCH));
    }

    #[test]
    fn raw_and_directory_nodes_are_not_renderable() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("logo.png"), [0u8, 159, 146, 150]).unwrap();

        let root = node::scan(dir.path(), Arc::new(IgnoreRules::new())).unwrap();
        let engine = MiniJinjaEngine::new().unwrap();
        let metadata = BuildMetadata::new(NavEntry::group("", vec![]), &engine, "0").unwrap();
        let target = Target { root: dir.path().join("out"), url_root: "/".into() };
        let converters = Converters::default();
        let cx = context(&converters, &engine, &metadata, &target, false);

        for node in root.descendants() {
            let error = node.render(&cx).unwrap_err();
            assert_eq!(error.kind(), crate::error::ErrorKind::Render);
            assert!(error.to_string().contains("not renderable"));
        }
    }

    #[test]
    fn navigator_json_collision_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src");
        fs::create_dir(&source).unwrap();
        fs::write(source.join(NAV_JSON), "{}").unwrap();

        let settings = Settings { navigator_json: true, ..Settings::default() };
        let engine = Arc::new(MiniJinjaEngine::new().unwrap());
        let swgen = Swgen::new(&source, dir.path().join("out"), settings, engine).unwrap();

        let error = swgen.run().unwrap_err();
        assert_eq!(error.kind(), crate::error::ErrorKind::Config);
        assert!(!dir.path().join("out").join(NAV_JSON).exists());
        assert!(source.join(NAV_JSON).exists());
    }
}
