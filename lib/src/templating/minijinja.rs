use std::borrow::Cow;
use std::fs;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use minijinja::value::Value;
use minijinja::{context, path_loader, AutoEscape, Environment, UndefinedBehavior};
use serde::Serialize;

use crate::error::{Chainable, Result};
use crate::navigator::NavEntry;
use crate::templating::{Engine, Page, DIRECTORY, NAVIGATOR, PAGE};
use crate::util::PathExt;

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <meta name="generator" content="swgen {{ version }}">
  <title>{{ title }}</title>
</head>
<body>
  {{ navigator }}
  <main>
{{ body }}
  </main>
  <footer>
    <p>Last modified {{ modified | date("%Y-%m-%d") }}. Built {{ build_time | date("%Y-%m-%d %H:%M UTC") }}.</p>
  </footer>
</body>
</html>
"#;

const NAVIGATOR_TEMPLATE: &str = r#"<nav class="navigator">
  <ul>
  {%- for entry in nav.children recursive %}
    <li>
    {%- if entry.link is none %}
      <span>{{ entry.title }}</span>
    {%- else %}
      <a href="{{ entry.link }}">{{ entry.title }}</a>
    {%- endif %}
    {%- if entry.children %}
      <ul>{{ loop(entry.children) }}</ul>
    {%- endif %}
    </li>
  {%- endfor %}
  </ul>
</nav>
"#;

const DIRECTORY_TEMPLATE: &str = r#"<h1>{{ title }}</h1>
<ul class="listing">
{%- for entry in entries %}
  <li><a href="{{ entry.link }}">{{ entry.title }}</a></li>
{%- endfor %}
</ul>
"#;

/// A [`minijinja`] template set: built-in templates for the page, navigator,
/// and directory listing, optionally overridden from a directory.
#[derive(Debug)]
pub struct MiniJinjaEngine {
    env: Environment<'static>,
}

/// The context every page-producing template sees.
#[derive(Serialize)]
struct PageContext<'a> {
    title: &'a str,
    path: Cow<'a, str>,
    url_root: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    entries: Option<&'a [NavEntry]>,
    navigator: Value,
    nav: &'a NavEntry,
    version: &'a str,
    build_time: String,
    modified: String,
    node: Value,
    metadata: Value,
    target: Value,
}

fn timestamp<T: Into<DateTime<Utc>>>(time: T) -> String {
    time.into().to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl<'a> PageContext<'a> {
    fn new(page: &Page<'a>) -> Self {
        let meta = page.metadata;
        let path = page.path.to_slash();
        let modified = timestamp(page.modified);
        let build_time = timestamp(meta.build_time);
        let navigator = Value::from_safe_string(meta.navigator_html.clone());

        PageContext {
            title: page.title,
            url_root: &page.target.url_root,
            body: None,
            entries: None,
            nav: &meta.navigator,
            version: &meta.version,
            node: context! {
                title => page.title,
                path => &path,
                modified => &modified,
            },
            metadata: context! {
                build_time => &build_time,
                version => &meta.version,
                navigator => navigator.clone(),
                nav => &meta.navigator,
            },
            target: context! {
                root => page.target.root.display().to_string(),
                url_root => &page.target.url_root,
            },
            path,
            modified,
            build_time,
            navigator,
        }
    }
}

/// Template names ending in `.tmpl` escape like the file they produce.
fn auto_escape(name: &str) -> AutoEscape {
    let name = name.strip_suffix(".tmpl").unwrap_or(name);
    match name.rsplit_once('.') {
        Some((_, "html" | "htm" | "xml" | "svg")) => AutoEscape::Html,
        _ => AutoEscape::None,
    }
}

impl MiniJinjaEngine {
    /// An engine with only the built-in templates.
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(auto_escape);
        env.set_formatter(ext::escape_html);
        env.add_filter("date", ext::date);
        env.add_function("url", ext::url);

        for (name, source) in [
            (PAGE, PAGE_TEMPLATE),
            (NAVIGATOR, NAVIGATOR_TEMPLATE),
            (DIRECTORY, DIRECTORY_TEMPLATE),
        ] {
            env.add_template(name, source).chain_with(|| error! {
                Template: "failed to compile built-in template",
                "name" => name,
            })?;
        }

        Ok(MiniJinjaEngine { env })
    }

    /// An engine whose templates are loaded from `dir`. Any of `page.html`,
    /// `navigator.html`, or `directory.html` found there replaces the
    /// built-in; other files in `dir` are available to `include` and
    /// `extends`.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return err! {
                Template: "template directory does not exist",
                "path" => dir.display(),
            }
        }

        let mut engine = MiniJinjaEngine::new()?;
        engine.env.set_loader(path_loader(dir));
        for name in [PAGE, NAVIGATOR, DIRECTORY] {
            let path = dir.join(name);
            if !path.is_file() {
                continue;
            }

            let source = fs::read_to_string(&path).chain_with(|| error! {
                Template: "failed to read template",
                "path" => path.display(),
            })?;

            engine = engine.with_template(name, source).chain_with(|| error! {
                Template: "failed to load template",
                "path" => path.display(),
            })?;

            tracing::debug!(template = name, path = %path.display(), "overriding built-in template");
        }

        Ok(engine)
    }

    /// Adds or replaces the template `name`.
    pub fn with_template(mut self, name: &str, source: String) -> Result<Self> {
        self.env.add_template_owned(name.to_string(), source).chain_with(|| error! {
            Template: "failed to compile template",
            "name" => name,
        })?;

        Ok(self)
    }

    fn render_named<S: Serialize>(&self, name: &str, context: S) -> Result<String> {
        let template = self.env.get_template(name).chain_with(|| error! {
            Template: "missing template",
            "name" => name,
        })?;

        template.render(context).chain_with(|| error! {
            Template: "failed to render template",
            "name" => name,
        })
    }
}

impl Engine for MiniJinjaEngine {
    fn render_page(&self, page: &Page<'_>, body: &str) -> Result<String> {
        let context = PageContext {
            body: Some(Value::from_safe_string(body.to_string())),
            ..PageContext::new(page)
        };

        self.render_named(PAGE, context)
    }

    fn render_navigator(&self, navigator: &NavEntry) -> Result<String> {
        self.render_named(NAVIGATOR, context! { nav => navigator })
    }

    fn render_directory(&self, page: &Page<'_>, entries: &[NavEntry]) -> Result<String> {
        let context = PageContext { entries: Some(entries), ..PageContext::new(page) };
        self.render_named(DIRECTORY, context)
    }

    fn render_template(&self, name: &str, source: &str, page: &Page<'_>) -> Result<String> {
        self.env.render_named_str(name, source, PageContext::new(page))
            .chain_with(|| error! {
                Template: "failed to render page template",
                "name" => name,
            })
    }
}

mod ext {
    use std::fmt::Write;
    use std::path::PathBuf;

    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
    use minijinja::value::{Rest, Value};
    use minijinja::{escape_formatter, AutoEscape, Error, ErrorKind, Output, State};

    use crate::util::url_join;

    /// Escapes `&<>"'` in HTML contexts. Unlike the default formatter, `/` is
    /// left alone so links render as written.
    pub fn escape_html(out: &mut Output<'_>, state: &State<'_, '_>, value: &Value) -> Result<(), Error> {
        let escape = matches!(state.auto_escape(), AutoEscape::Html)
            && !value.is_safe()
            && !value.is_undefined()
            && !value.is_none();

        if !escape {
            return escape_formatter(out, state, value);
        }

        let text = value.to_string();
        let mut last = 0;
        for (i, c) in text.char_indices() {
            let entity = match c {
                '&' => "&amp;",
                '<' => "&lt;",
                '>' => "&gt;",
                '"' => "&quot;",
                '\'' => "&#x27;",
                _ => continue,
            };

            out.write_str(&text[last..i]).and_then(|_| out.write_str(entity))
                .map_err(|_| Error::new(ErrorKind::WriteFailure, "failed to write escaped output"))?;

            last = i + 1;
        }

        out.write_str(&text[last..])
            .map_err(|_| Error::new(ErrorKind::WriteFailure, "failed to write escaped output"))
    }

    /// `url(parts...)`: joins `url_root` with the given path parts.
    pub fn url(state: &State<'_, '_>, parts: Rest<String>) -> Result<Value, Error> {
        let root = state.lookup("url_root")
            .filter(|v| !v.is_undefined())
            .ok_or_else(|| Error::new(
                ErrorKind::UndefinedError,
                "`url` requires `url_root` in the template context"
            ))?;

        let root = root.as_str()
            .ok_or_else(|| Error::new(ErrorKind::InvalidOperation, "`url_root` must be a string"))?;

        let path: PathBuf = parts.iter().collect();
        Ok(Value::from_safe_string(url_join(root, &path)))
    }

    /// `value | date(fmt)`: formats a unix timestamp, an RFC 3339 string, a
    /// date, or a date-time with a `strftime`-style format.
    pub fn date(value: Value, fmt: &str) -> Result<String, Error> {
        let invalid = |msg: String| Error::new(ErrorKind::InvalidOperation, msg);

        let formatted = if let Ok(ts) = i64::try_from(value.clone()) {
            DateTime::<Utc>::from_timestamp(ts, 0)
                .ok_or_else(|| invalid(format!("invalid timestamp {ts} provided to `date`")))?
                .format(fmt)
        } else {
            let kind = value.kind();
            let string = value.as_str()
                .ok_or_else(|| invalid(format!("`date` must be applied to a string or integer, found {kind}")))?;

            string.parse::<DateTime<Utc>>().map(|dt| dt.format(fmt))
                .or_else(|_| string.parse::<NaiveDateTime>().map(|dt| dt.format(fmt)))
                .or_else(|_| string.parse::<NaiveDate>().map(|d| d.format(fmt)))
                .map_err(|e| invalid(format!("failed to parse {string}: {e}")))?
        };

        let mut output = String::new();
        write!(output, "{formatted}")
            .map_err(|_| invalid(format!("invalid date format string {fmt:?}")))?;

        Ok(output)
    }
}
