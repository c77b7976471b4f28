mod path_ext;

pub use path_ext::*;

use std::path::Path;

/// Joins a site's URL root and an output-relative path into a link.
///
/// ```
/// use std::path::Path;
/// use swgen::util::url_join;
///
/// assert_eq!(url_join("", Path::new("index.html")), "/index.html");
/// assert_eq!(url_join("/blog/", Path::new("a/b.html")), "/blog/a/b.html");
/// assert_eq!(url_join("https://example.com", Path::new("a.html")), "https://example.com/a.html");
/// ```
pub fn url_join(root: &str, path: &Path) -> String {
    let root = root.trim_end_matches('/');
    let path = path.to_slash();
    format!("{root}/{}", path.trim_start_matches('/'))
}

#[cfg(test)]
mod path_tests {
    use std::path::Path;

    use super::PathExt;

    #[test]
    fn slash_paths_drop_relative_prefixes() {
        assert_eq!(Path::new("a/b/c.md").to_slash(), "a/b/c.md");
        assert_eq!(Path::new("./a/b.md").to_slash(), "a/b.md");
        assert_eq!(Path::new("").to_slash(), "");
    }

    #[test]
    fn stems_drop_only_the_last_extension() {
        assert_eq!(Path::new("dir/about.org").stem_str(), "about");
        assert_eq!(Path::new("feed.xml.tmpl").stem_str(), "feed.xml");
        assert_eq!(Path::new("README").stem_str(), "README");
    }
}
