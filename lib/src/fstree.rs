use std::sync::Arc;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use std::{fmt, fs};

use rustc_hash::FxHashMap;
use jwalk::{DirEntry, Parallelism, WalkDir};
use tracing::debug;

use crate::error::{Chainable, Result};
use crate::ignore::Ignore;

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct EntryId(pub(crate) usize);

/// A flat, id-indexed snapshot of a directory tree with ignored entries
/// already removed. Children appear in directory-listing order.
#[derive(Debug)]
pub struct FsTree {
    root: PathBuf,
    entries: Vec<Entry>,
    map: FxHashMap<Arc<Path>, EntryId>,
}

#[derive(Debug)]
pub struct Entry {
    pub id: EntryId,
    pub path: Arc<Path>,
    pub relative: PathBuf,
    pub file_name: String,
    pub is_dir: bool,
    pub modified: SystemTime,
    pub parent: Option<EntryId>,
    pub children: Vec<EntryId>,
    pub depth: usize,
}

impl FsTree {
    fn new(root: PathBuf) -> Self {
        Self {
            root,
            map: FxHashMap::default(),
            entries: vec![],
        }
    }

    pub fn build<P: AsRef<Path>>(root: P) -> Result<Self> {
        Self::build_with(root, Arc::new(|_: &Path| false))
    }

    /// Walks `root` depth-first on the calling thread. Entries for which
    /// `ignore` matches their root-relative path are dropped before they are
    /// stat'd, and ignored directories are never descended into. Any read or
    /// stat failure aborts the walk.
    pub fn build_with<P: AsRef<Path>>(root: P, ignore: Arc<dyn Ignore>) -> Result<Self> {
        let root = root.as_ref();
        let root = fs::canonicalize(root).chain_with(|| error! {
            Scan: "failed to resolve source root",
            "path" => root.display(),
        })?;

        if !root.is_dir() {
            return err! {
                Scan: "source root must be a directory",
                "path" => root.display(),
            }
        }

        let filter_root = root.clone();
        let walker = WalkDir::new(&root)
            .follow_links(true)
            .skip_hidden(false)
            .sort(false)
            .parallelism(Parallelism::Serial)
            .process_read_dir(move |_, _, _, children| {
                children.retain(|child| {
                    let Ok(child) = child else { return true };
                    let path = child.parent_path.join(&child.file_name);
                    match path.strip_prefix(&filter_root) {
                        Ok(relative) if ignore.matches(relative) => {
                            debug!(path = %relative.display(), "ignoring entry");
                            false
                        }
                        _ => true,
                    }
                })
            });

        let mut tree = FsTree::new(root);
        for entry in walker {
            let entry = entry.chain_with(|| error! {
                Scan: "failed to read source tree",
                "root" => tree.root.display(),
            })?;

            tree.insert(entry)?;
        }

        if tree.len() == 0 {
            return err! {
                Scan: "file system tree discovery yielded zero entries",
                "search root" => tree.root.display(),
            }
        }

        Ok(tree)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The canonicalized path the tree was built from.
    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn root(&self) -> &Entry {
        &self[self.root_id()]
    }

    pub fn root_id(&self) -> EntryId {
        EntryId(0)
    }

    /// Looks up an entry by its path relative to the root.
    #[cfg(test)]
    pub fn get<P: AsRef<Path>>(&self, relative: P) -> Option<&Entry> {
        let path = self.root.join(relative.as_ref());
        self.map.get(&*path).map(|&id| &self[id])
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    fn insert(&mut self, entry: DirEntry<((), ())>) -> Result<EntryId> {
        let path: Arc<Path> = Arc::from(entry.path().into_boxed_path());
        let relative = path.strip_prefix(&self.root)
            .chain_with(|| error! {
                Scan: "source entry resolves outside of the source root",
                "path" => path.display(),
                "root" => self.root.display(),
            })?
            .to_path_buf();

        let modified = entry.metadata()
            .chain_with(|| error! {
                Scan: "failed to stat source entry",
                "path" => path.display(),
            })?
            .modified()
            .chain_with(|| error! {
                Scan: "source entry has no modification time",
                "path" => path.display(),
            })?;

        let entry = Entry {
            id: EntryId(self.entries.len()),
            path,
            relative,
            modified,
            is_dir: entry.file_type.is_dir(),
            file_name: entry.file_name.to_string_lossy().into_owned(),
            parent: self.map.get(&*entry.parent_path).cloned(),
            children: vec![],
            depth: entry.depth,
        };

        self.map.insert(entry.path.clone(), entry.id);
        if let Some(parent) = entry.parent {
            self.entries[parent.0].children.push(entry.id);
        }

        let id = entry.id;
        self.entries.push(entry);
        Ok(id)
    }
}

impl Entry {
    /// The last extension of the file name, if any.
    pub fn file_ext(&self) -> Option<&str> {
        match self.file_name.rsplit_once('.') {
            Some(("", _)) | None => None,
            Some((_, ext)) => Some(ext),
        }
    }
}

impl std::ops::Index<EntryId> for FsTree {
    type Output = Entry;

    fn index(&self, index: EntryId) -> &Self::Output {
        &self.entries[index.0]
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
