use std::borrow::Cow;
use std::path::{Component, Path};

pub trait PathExt: AsRef<Path> {
    /// The path's normal components joined with `/`, regardless of platform.
    fn to_slash(&self) -> Cow<'_, str>;

    /// The final component without its last extension.
    fn stem_str(&self) -> Cow<'_, str>;
}

impl PathExt for Path {
    fn to_slash(&self) -> Cow<'_, str> {
        if std::path::MAIN_SEPARATOR == '/' && !self.starts_with(".") {
            return self.to_string_lossy();
        }

        let parts: Vec<_> = self.components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect();

        Cow::Owned(parts.join("/"))
    }

    fn stem_str(&self) -> Cow<'_, str> {
        match self.file_stem() {
            Some(stem) => stem.to_string_lossy(),
            None => self.to_string_lossy(),
        }
    }
}
