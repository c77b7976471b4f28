use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

use pulldown_cmark::{html, Options, Parser};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Chainable, Result};
use crate::node::Markup;

/// Placeholder in converter arguments replaced by the input path.
pub const INPUT: &str = "{input}";

/// How a markup source is turned into an HTML fragment.
///
/// In a settings file, a converter is either the string `"pulldown-cmark"` or
/// a table naming an external program:
///
/// ```toml
/// [converters.org]
/// program = "pandoc"
/// args = ["-f", "org", "-t", "html", "{input}"]
/// in_source_dir = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Converter {
    Builtin(Builtin),
    External(External),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Builtin {
    #[serde(rename = "pulldown-cmark")]
    PulldownCmark,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct External {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Run from the source's directory, passing only its file name.
    #[serde(default)]
    pub in_source_dir: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Converters {
    pub markdown: Converter,
    pub org: Converter,
}

impl Default for Converters {
    fn default() -> Self {
        Converters {
            markdown: Converter::External(External::new("kramdown", [INPUT])),
            org: Converter::External(External {
                in_source_dir: true,
                ..External::new("pandoc", [
                    "--fail-if-warnings", "-f", "org", "-t", "html", "--mathjax", "-i", INPUT
                ])
            }),
        }
    }
}

impl Converters {
    pub fn get(&self, markup: Markup) -> &Converter {
        match markup {
            Markup::Markdown => &self.markdown,
            Markup::Org => &self.org,
        }
    }

    /// Rejects converters that cannot handle their markup.
    pub fn validate(&self) -> Result<()> {
        if let Converter::Builtin(builtin) = &self.org {
            return err! {
                Config: "the org converter must be an external program",
                "configured" => format!("{builtin:?}"),
            }
        }

        for external in [&self.markdown, &self.org].into_iter().filter_map(Converter::external) {
            if external.program.trim().is_empty() {
                return err!(Config: "external converter has an empty program name");
            }
        }

        Ok(())
    }

    /// Converts the `markup` source at `path` into an HTML fragment.
    pub fn convert(&self, markup: Markup, path: &Path) -> Result<String> {
        self.get(markup).convert(path)
    }
}

impl Converter {
    pub fn convert(&self, path: &Path) -> Result<String> {
        match self {
            Converter::Builtin(Builtin::PulldownCmark) => {
                let source = fs::read_to_string(path).chain_with(|| error! {
                    Render: "failed to read markdown source",
                    "path" => path.display(),
                })?;

                Ok(markdown_to_html(&source))
            }
            Converter::External(external) => external.run(path),
        }
    }

    fn external(&self) -> Option<&External> {
        match self {
            Converter::External(external) => Some(external),
            Converter::Builtin(_) => None,
        }
    }
}

impl External {
    pub fn new<I, S>(program: &str, args: I) -> Self
        where I: IntoIterator<Item = S>, S: Into<String>
    {
        External {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            in_source_dir: false,
        }
    }

    /// The argument list for `input`: each `{input}` is substituted, or the
    /// input is appended when no argument mentions it.
    fn args_for(&self, input: &Path) -> Vec<OsString> {
        let mut substituted = false;
        let mut args: Vec<OsString> = self.args.iter()
            .map(|arg| match arg.as_str() {
                INPUT => {
                    substituted = true;
                    input.as_os_str().to_owned()
                }
                _ if arg.contains(INPUT) => {
                    substituted = true;
                    arg.replace(INPUT, &input.to_string_lossy()).into()
                }
                _ => arg.into(),
            })
            .collect();

        if !substituted {
            args.push(input.as_os_str().to_owned());
        }

        args
    }

    /// Runs the converter on `path` and returns its standard output. Standard
    /// input is closed; there is no timeout.
    pub fn run(&self, path: &Path) -> Result<String> {
        let mut command = Command::new(&self.program);
        let input = match (self.in_source_dir, path.parent(), path.file_name()) {
            (true, Some(dir), Some(name)) => {
                command.current_dir(dir);
                Path::new(name)
            }
            _ => path,
        };

        command.args(self.args_for(input)).stdin(Stdio::null());
        debug!(program = %self.program, path = %path.display(), "running converter");

        let output = command.output().chain_with(|| error! {
            Render: "failed to spawn converter",
            "program" => &self.program,
            "path" => path.display(),
        })?;

        if !output.status.success() {
            return err! {
                Render: "converter failed",
                "path" => path.display(),
                "program" => &self.program,
                "status" => output.status,
                "stderr" => String::from_utf8_lossy(&output.stderr).trim(),
            }
        }

        String::from_utf8(output.stdout).chain_with(|| error! {
            Render: "converter produced non-UTF-8 output",
            "path" => path.display(),
            "program" => &self.program,
        })
    }
}

/// Renders CommonMark (with the common extensions) to HTML in-process.
pub fn markdown_to_html(source: &str) -> String {
    let options = Options::all().difference(Options::ENABLE_SMART_PUNCTUATION);
    let mut html_output = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut html_output, Parser::new_ext(source, options));
    html_output
}
