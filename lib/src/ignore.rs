//! Ignore rules: a predicate over root-relative paths.
//!
//! Rules are glob patterns, one per line. Blank lines and lines starting with
//! `#` are skipped. `*` never crosses a `/`, while a `**` component crosses any
//! number of directories. A `**` inside a component, as in `**~`, matches
//! across directories too. A rule of the form `dir/**` also matches `dir`
//! itself, so ignoring a directory's contents removes the directory as well.

use std::fmt;
use std::path::Path;

use glob::{MatchOptions, Pattern};

use crate::error::{Chainable, Result};

/// The capability the scanner consumes: is `path`, relative to the scan root,
/// excluded from the build?
pub trait Ignore: Send + Sync {
    fn matches(&self, path: &Path) -> bool;
}

impl<F: Fn(&Path) -> bool + Send + Sync> Ignore for F {
    fn matches(&self, path: &Path) -> bool {
        self(path)
    }
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Clone, Default)]
pub struct IgnoreRules {
    rules: Vec<Rule>,
}

#[derive(Clone)]
struct Rule {
    line: String,
    patterns: Vec<Pattern>,
}

impl IgnoreRules {
    pub fn new() -> Self {
        IgnoreRules::default()
    }

    /// Compiles every rule in `rules`, failing on the first invalid pattern.
    pub fn parse(rules: &str) -> Result<Self> {
        let mut ignore = IgnoreRules::new();
        for (i, line) in rules.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            ignore.add(line).chain_with(|| error! {
                Ignore: "invalid ignore rule",
                "line" => i + 1,
            })?;
        }

        Ok(ignore)
    }

    /// Reads rules from the file at `path`. A missing file yields no rules.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(rules) => IgnoreRules::parse(&rules).chain_with(|| error! {
                Ignore: "failed to compile ignore file",
                "path" => path.display(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(IgnoreRules::new()),
            Err(e) => Err(e).chain_with(|| error! {
                Ignore: "failed to read ignore file",
                "path" => path.display(),
            }),
        }
    }

    pub fn add(&mut self, rule: &str) -> Result<&mut Self> {
        let compile = |glob: &str| Pattern::new(glob).chain_with(|| error! {
            Ignore: "failed to compile glob pattern",
            "pattern" => glob,
        });

        let mut patterns = vec![];
        for glob in expand(rule) {
            if let Some(dir) = glob.strip_suffix("/**").filter(|d| !d.is_empty()) {
                patterns.push(compile(dir)?);
            }

            patterns.push(compile(&glob)?);
        }

        self.rules.push(Rule { line: rule.to_string(), patterns });
        Ok(self)
    }

    /// Ignores the directory `dir`, taken literally, and everything in it.
    pub fn add_dir(&mut self, dir: &str) -> Result<&mut Self> {
        let dir = Pattern::escape(dir.trim_end_matches('/'));
        self.add(&format!("{dir}/**"))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Rewrites every `**` that is not a whole path component into the globs that
/// together match the same paths: `a**b` becomes `a*b` and `a*/**/*b`.
fn expand(rule: &str) -> Vec<String> {
    let bytes = rule.as_bytes();
    let partial = rule.match_indices("**").map(|(i, _)| i).find(|&i| {
        let starts = i == 0 || bytes[i - 1] == b'/';
        let ends = i + 2 == bytes.len() || bytes[i + 2] == b'/';
        !(starts && ends)
    });

    match partial {
        Some(i) => {
            let (head, tail) = (&rule[..i], &rule[i + 2..]);
            let mut globs = expand(&format!("{head}*{tail}"));
            globs.extend(expand(&format!("{head}*/**/*{tail}")));
            globs
        }
        None => vec![rule.to_string()],
    }
}

impl Ignore for IgnoreRules {
    fn matches(&self, path: &Path) -> bool {
        self.rules.iter()
            .flat_map(|rule| &rule.patterns)
            .any(|pattern| pattern.matches_path_with(path, MATCH_OPTIONS))
    }
}

impl fmt::Debug for IgnoreRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|r| &r.line))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let rules = IgnoreRules::parse("
            # editor backups
            **/*~

            .git/**
        ").unwrap();

        assert_eq!(rules.len(), 2);
        let cases = [
            (true, ".git/config"),
            (true, ".git/hook/post-commit"),
            (true, ".git"),
            (true, "hello.org~"),
            (true, "foo/bar.org~"),
            (false, "index.html"),
            (false, "git/config"),
        ];

        for (expected, path) in cases {
            assert_eq!(rules.matches(Path::new(path)), expected, "{path}");
        }
    }

    #[test]
    fn single_star_stays_within_a_component() {
        let rules = IgnoreRules::parse("*.bak").unwrap();
        assert!(rules.matches(Path::new("notes.bak")));
        assert!(!rules.matches(Path::new("drafts/notes.bak")));
    }

    #[test]
    fn recursive_wildcards_within_a_component() {
        let rules = IgnoreRules::parse("# comment\n**~\n.git/**\n").unwrap();
        assert_eq!(rules.len(), 2);

        let cases = [
            (true, "hello.org~"),
            (true, "foo/bar.org~"),
            (true, "a/b/c.md~"),
            (true, ".git"),
            (true, ".git/objects/ab"),
            (false, "index.html"),
            (false, "foo/bar.org"),
        ];

        for (expected, path) in cases {
            assert_eq!(rules.matches(Path::new(path)), expected, "{path}");
        }

        let rules = IgnoreRules::parse("docs/draft**").unwrap();
        assert!(rules.matches(Path::new("docs/drafts")));
        assert!(rules.matches(Path::new("docs/draft-1/notes.md")));
        assert!(!rules.matches(Path::new("drafts/docs")));
    }

    #[test]
    fn invalid_patterns_fail_with_line_context() {
        let error = IgnoreRules::parse("ok/**\nbad[").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Ignore);
        assert!(error.to_string().contains("line: 2"));
    }

    #[test]
    fn missing_ignore_file_means_no_rules() {
        let dir = tempfile::tempdir().unwrap();
        let rules = IgnoreRules::read(dir.path().join(".swignore")).unwrap();
        assert!(rules.is_empty());
        assert!(!rules.matches(Path::new("anything")));
    }

    #[test]
    fn directories_are_added_literally() {
        let mut rules = IgnoreRules::new();
        rules.add_dir(".template").unwrap().add_dir("out[1]/").unwrap();

        assert!(rules.matches(Path::new(".template")));
        assert!(rules.matches(Path::new(".template/page.html")));
        assert!(rules.matches(Path::new("out[1]/index.html")));
        assert!(!rules.matches(Path::new("out1/index.html")));
        assert!(!rules.matches(Path::new("docs/.template")));
    }

    #[test]
    fn closures_are_matchers() {
        let ignore = |path: &Path| path.starts_with("testing");
        assert!(ignore.matches(Path::new("testing/out.html")));
        assert!(!ignore.matches(Path::new("index.md")));
    }
}
