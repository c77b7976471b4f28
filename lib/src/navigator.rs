//! The sitewide navigation tree.

use serde::Serialize;

use crate::node::{Kind, Node};
use crate::util::url_join;

/// One entry in the navigator. Only navigable leaves carry a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavEntry {
    pub title: String,
    pub link: Option<String>,
    pub children: Vec<NavEntry>,
}

impl NavEntry {
    pub fn group(title: impl Into<String>, children: Vec<NavEntry>) -> Self {
        NavEntry { title: title.into(), link: None, children }
    }

    pub fn link(title: impl Into<String>, link: impl Into<String>) -> Self {
        NavEntry { title: title.into(), link: Some(link.into()), children: vec![] }
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Every linked entry, depth-first in tree order.
    pub fn links(&self) -> impl Iterator<Item = &NavEntry> {
        let mut stack = vec![self];
        std::iter::from_fn(move || loop {
            let entry = stack.pop()?;
            stack.extend(entry.children.iter().rev());
            if entry.link.is_some() {
                return Some(entry);
            }
        })
    }
}

/// Builds the navigator for the tree rooted at `root`, prefixing every link
/// with `url_root`. Raw nodes are skipped and directories without navigable
/// descendants are pruned. The root itself is always returned, possibly empty.
pub fn build(root: &Node, url_root: &str) -> NavEntry {
    fn entry(node: &Node, url_root: &str) -> Option<NavEntry> {
        match node.kind() {
            Kind::Directory => {
                let children: Vec<_> = node.children().iter()
                    .filter_map(|child| entry(child, url_root))
                    .collect();

                (!children.is_empty()).then(|| NavEntry::group(node.title(), children))
            }
            kind if kind.is_navigable() => {
                Some(NavEntry::link(node.title(), url_join(url_root, node.output_path())))
            }
            _ => None,
        }
    }

    entry(root, url_root).unwrap_or_else(|| NavEntry::group(root.title(), vec![]))
}

/// The entries listed on a directory's index page: its navigable leaves, and
/// its subdirectories with navigable content, linked to their own index.
pub fn listing(dir: &Node, url_root: &str) -> Vec<NavEntry> {
    dir.children().iter()
        .filter_map(|child| match child.kind() {
            Kind::Directory => {
                let index = child.output_path().join(crate::driver::INDEX);
                child.descendants()
                    .any(|n| n.kind().is_navigable())
                    .then(|| NavEntry::link(child.title(), url_join(url_root, &index)))
            }
            kind if kind.is_navigable() => {
                Some(NavEntry::link(child.title(), url_join(url_root, child.output_path())))
            }
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    use super::*;
    use crate::ignore::IgnoreRules;
    use crate::node::scan;

    fn tree(files: &[&str], ignore: &str) -> Node {
        let dir = tempfile::tempdir().unwrap();
        for file in files {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }

        scan(dir.path(), Arc::new(IgnoreRules::parse(ignore).unwrap())).unwrap()
    }

    fn titles(entry: &NavEntry) -> Vec<&str> {
        entry.links().map(|e| e.title.as_str()).collect()
    }

    #[test]
    fn navigable_leaves_are_linked() {
        let root = tree(&["index.md", "about.org", "logo.png", "drafts/secret.md"], "drafts/**");
        let nav = build(&root, "/site");

        let mut links: Vec<_> = nav.links().map(|e| e.link.clone().unwrap()).collect();
        links.sort();
        assert_eq!(links, ["/site/about.html", "/site/index.html"]);
        assert!(nav.children.iter().all(|e| e.children.is_empty()));
    }

    #[test]
    fn directories_without_navigable_content_are_pruned() {
        let root = tree(&["a.md", "img/logo.png", "img/icons/x.svg", "docs/guide/setup.md"], "");
        let nav = build(&root, "");

        let groups: Vec<_> = nav.children.iter()
            .filter(|e| e.link.is_none())
            .map(|e| e.title.as_str())
            .collect();

        assert_eq!(groups, ["docs"]);
        let docs = nav.children.iter().find(|e| e.title == "docs").unwrap();
        assert_eq!(docs.children[0].title, "guide");
        assert_eq!(titles(docs), ["setup"]);
        assert_eq!(docs.children[0].children[0].link.as_deref(), Some("/docs/guide/setup.html"));
    }

    #[test]
    fn empty_site_has_an_empty_root() {
        let root = tree(&["logo.png"], "");
        let nav = build(&root, "/");
        assert!(nav.is_empty());
        assert_eq!(nav.link, None);
    }

    #[test]
    fn template_pages_link_to_their_output() {
        let root = tree(&["feed.xml.tmpl", "legacy.htm"], "");
        let nav = build(&root, "https://example.org/");

        let mut links: Vec<_> = nav.links().map(|e| e.link.as_deref().unwrap()).collect();
        links.sort();
        assert_eq!(links, ["https://example.org/feed.xml", "https://example.org/legacy.htm"]);
    }

    #[test]
    fn listings_link_subdirectories_to_their_index() {
        let root = tree(&["notes/a.md", "notes/b.png", "notes/deep/c.md", "notes/empty/d.png"], "");
        let notes = root.descendants().find(|n| n.entry().relative == Path::new("notes")).unwrap();

        let mut listing = listing(notes, "/s");
        listing.sort_by(|a, b| a.title.cmp(&b.title));
        assert_eq!(listing, [
            NavEntry::link("a", "/s/notes/a.html"),
            NavEntry::link("deep", "/s/notes/deep/index.html"),
        ]);
    }

    #[test]
    fn navigator_serializes_with_null_links_for_groups() {
        let nav = NavEntry::group("site", vec![NavEntry::link("index", "/index.html")]);
        let json = serde_json::to_value(&nav).unwrap();
        assert_eq!(json["link"], serde_json::Value::Null);
        assert_eq!(json["children"][0]["link"], "/index.html");
    }
}
