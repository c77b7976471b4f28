//! The typed node tree produced by scanning a source directory.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::Result;
use crate::fstree::{EntryId, FsTree};
use crate::ignore::Ignore;
use crate::util::PathExt;

/// One stat'd filesystem object and its place relative to the scan root.
#[derive(Debug, Clone)]
pub struct SourceEntry {
    pub path: Arc<Path>,
    pub relative: PathBuf,
    pub file_name: String,
    pub ext: Option<String>,
    pub is_dir: bool,
    pub modified: SystemTime,
}

/// Markup dialects handed to an external (or built-in) converter.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Markup {
    Markdown,
    Org,
}

/// How a node is turned into output. Resolved once, when the node is built.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Copied byte-for-byte.
    Raw,
    /// Converted into an HTML fragment and wrapped in the page template.
    Convertible(Markup),
    /// Trusted HTML, wrapped in the page template as-is.
    Html,
    /// A page-level template that renders a complete output by itself.
    Template,
    Directory,
}

#[derive(Debug)]
pub struct Node {
    entry: SourceEntry,
    kind: Kind,
    title: String,
    output: PathBuf,
    children: Vec<Node>,
}

impl Kind {
    /// The one table mapping source extensions to kinds. Matching is
    /// case-sensitive.
    pub fn classify(ext: Option<&str>, is_dir: bool) -> Kind {
        if is_dir {
            return Kind::Directory;
        }

        match ext {
            Some("md") => Kind::Convertible(Markup::Markdown),
            Some("org") => Kind::Convertible(Markup::Org),
            Some("html") | Some("htm") => Kind::Html,
            Some("tmpl") => Kind::Template,
            _ => Kind::Raw,
        }
    }

    /// Whether nodes of this kind get a link in the navigator.
    pub fn is_navigable(self) -> bool {
        matches!(self, Kind::Convertible(_) | Kind::Html | Kind::Template)
    }

    /// The destination for a source at `relative`.
    pub fn output_path(self, relative: &Path) -> PathBuf {
        match self {
            Kind::Convertible(_) => relative.with_extension("html"),
            Kind::Template => relative.with_extension(""),
            Kind::Raw | Kind::Html | Kind::Directory => relative.to_path_buf(),
        }
    }
}

impl Node {
    pub fn new(entry: SourceEntry) -> Node {
        let kind = Kind::classify(entry.ext.as_deref(), entry.is_dir);
        let output = kind.output_path(&entry.relative);
        let title = match kind {
            Kind::Raw | Kind::Directory => entry.file_name.clone(),
            _ => output.stem_str().into_owned(),
        };

        Node { entry, kind, title, output, children: vec![] }
    }

    pub fn entry(&self) -> &SourceEntry {
        &self.entry
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// The destination path relative to the output root.
    pub fn output_path(&self) -> &Path {
        &self.output
    }

    pub fn modified(&self) -> SystemTime {
        self.entry.modified
    }

    /// Children in directory-listing order. Empty for leaves.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn is_dir(&self) -> bool {
        self.kind == Kind::Directory
    }

    /// Every node in the tree rooted at `self`, parents before children.
    pub fn descendants(&self) -> impl Iterator<Item = &Node> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }
}

/// Scans `root` into a node tree, skipping everything `ignore` matches.
///
/// Fails if any entry cannot be read or stat'd, or if two sources would be
/// written to the same output path.
pub fn scan<P: AsRef<Path>>(root: P, ignore: Arc<dyn Ignore>) -> Result<Node> {
    let tree = FsTree::build_with(root, ignore)?;
    let mut outputs = FxHashMap::default();
    let node = build(&tree, tree.root_id(), &mut outputs)?;
    debug!("scanned source tree:\n{node}");
    Ok(node)
}

fn build(
    tree: &FsTree,
    id: EntryId,
    outputs: &mut FxHashMap<PathBuf, Arc<Path>>,
) -> Result<Node> {
    let entry = &tree[id];
    let mut node = Node::new(SourceEntry {
        path: entry.path.clone(),
        relative: entry.relative.clone(),
        file_name: entry.file_name.clone(),
        ext: entry.file_ext().map(String::from),
        is_dir: entry.is_dir,
        modified: entry.modified,
    });

    if let Some(existing) = outputs.insert(node.output.clone(), entry.path.clone()) {
        return err! {
            Scan: "two sources map to the same output path",
            "output path" => node.output.display(),
            "first source" => existing.display(),
            "second source" => entry.path.display(),
        }
    }

    for &child in &entry.children {
        node.children.push(build(tree, child, outputs)?);
    }

    Ok(node)
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_node(f: &mut fmt::Formatter<'_>, node: &Node, depth: usize) -> fmt::Result {
            let name = match depth {
                0 => node.entry.path.display().to_string(),
                _ => node.entry.file_name.clone(),
            };

            write!(f, "{:indent$}{name}", "", indent = depth * 2)?;
            match node.kind {
                Kind::Directory => writeln!(f, "/")?,
                Kind::Raw => writeln!(f)?,
                _ => writeln!(f, " -> {}", node.output.display())?,
            }

            node.children.iter().try_for_each(|c| write_node(f, c, depth + 1))
        }

        write_node(f, self, 0)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    use super::*;
    use crate::error::ErrorKind;
    use crate::ignore::IgnoreRules;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, relative).unwrap();
    }

    fn scan_all(root: &Path) -> Result<Node> {
        scan(root, Arc::new(IgnoreRules::new()))
    }

    #[test]
    fn classification_is_by_source_extension() {
        assert_eq!(Kind::classify(Some("md"), false), Kind::Convertible(Markup::Markdown));
        assert_eq!(Kind::classify(Some("org"), false), Kind::Convertible(Markup::Org));
        assert_eq!(Kind::classify(Some("htm"), false), Kind::Html);
        assert_eq!(Kind::classify(Some("tmpl"), false), Kind::Template);
        assert_eq!(Kind::classify(Some("png"), false), Kind::Raw);
        assert_eq!(Kind::classify(Some("MD"), false), Kind::Raw);
        assert_eq!(Kind::classify(None, false), Kind::Raw);
        assert_eq!(Kind::classify(Some("md"), true), Kind::Directory);
    }

    #[test]
    fn output_paths_remap_only_converted_extensions() {
        let remap = |ext, path| Kind::classify(Some(ext), false).output_path(Path::new(path));
        assert_eq!(remap("md", "notes/index.md"), Path::new("notes/index.html"));
        assert_eq!(remap("org", "about.org"), Path::new("about.html"));
        assert_eq!(remap("htm", "legacy.htm"), Path::new("legacy.htm"));
        assert_eq!(remap("tmpl", "feed.xml.tmpl"), Path::new("feed.xml"));
        assert_eq!(remap("png", "img/logo.png"), Path::new("img/logo.png"));
    }

    #[test]
    fn scan_builds_typed_tree() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "index.md");
        touch(dir.path(), "logo.png");
        touch(dir.path(), "guide/setup.org");

        let root = scan_all(dir.path()).unwrap();
        assert!(root.is_dir());
        assert_eq!(root.output_path(), Path::new(""));
        assert_eq!(root.children().len(), 3);

        let find = |rel: &str| root.descendants()
            .find(|n| n.entry().relative == Path::new(rel))
            .unwrap();

        let index = find("index.md");
        assert_eq!(index.title(), "index");
        assert_eq!(index.output_path(), Path::new("index.html"));

        let logo = find("logo.png");
        assert_eq!(logo.kind(), Kind::Raw);
        assert_eq!(logo.title(), "logo.png");

        let guide = find("guide");
        assert_eq!(guide.kind(), Kind::Directory);
        assert_eq!(guide.children()[0].output_path(), Path::new("guide/setup.html"));
    }

    #[test]
    fn ignored_entries_never_become_nodes() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "index.md");
        touch(dir.path(), "drafts/secret.md");

        let ignore = IgnoreRules::parse("drafts/**").unwrap();
        let root = scan(dir.path(), Arc::new(ignore)).unwrap();
        let names: Vec<_> = root.descendants().skip(1).map(|n| n.title()).collect();
        assert_eq!(names, ["index"]);
    }

    #[test]
    fn colliding_outputs_fail_the_scan() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "about.md");
        touch(dir.path(), "about.html");

        let error = scan_all(dir.path()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Scan);
        assert!(error.to_string().contains("about.html"));
    }

    #[test]
    fn display_lists_the_tree() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "guide/setup.md");

        let listing = scan_all(dir.path()).unwrap().to_string();
        assert!(listing.contains("  guide/\n"));
        assert!(listing.contains("    setup.md -> guide/setup.html\n"));
    }
}
