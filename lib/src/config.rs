use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Chainable, Result};
use crate::render::Converters;

/// Build settings, typically read from a `swgen.toml`:
///
/// ```toml
/// url_root = "/docs"
/// navigator_json = true
///
/// [converters]
/// markdown = "pulldown-cmark"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Prefix for every generated link.
    pub url_root: String,
    /// Rewrite every output regardless of timestamps.
    pub force: bool,
    /// Version string exposed to templates. Defaults to this crate's version.
    pub version: Option<String>,
    /// Also write the navigator to `nav.json` in the output root.
    pub navigator_json: bool,
    pub converters: Converters,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            url_root: "/".into(),
            force: false,
            version: None,
            navigator_json: false,
            converters: Converters::default(),
        }
    }
}

impl Settings {
    /// Reads settings from `path`. A missing file yields the defaults.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let string = match std::fs::read_to_string(path) {
            Ok(string) => string,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Settings::default()),
            Err(e) => return Err(e).chain_with(|| error! {
                Config: "failed to read settings",
                "path" => path.display(),
            }),
        };

        Settings::parse(&string).chain_with(|| error! {
            Config: "invalid settings file",
            "path" => path.display(),
        })
    }

    pub fn parse(string: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(string)
            .chain_with(|| error!(Config: "failed to parse settings"))?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.converters.validate()
    }

    pub fn version(&self) -> &str {
        self.version.as_deref().unwrap_or(env!("CARGO_PKG_VERSION"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::render::{Builtin, Converter};

    #[test]
    fn empty_settings_are_defaults() {
        let settings = Settings::parse("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.version(), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn partial_settings_keep_other_defaults() {
        let settings = Settings::parse(r#"
            url_root = "https://example.org/docs"
            version = "2024.1"

            [converters]
            markdown = "pulldown-cmark"
        "#).unwrap();

        assert_eq!(settings.url_root, "https://example.org/docs");
        assert_eq!(settings.version(), "2024.1");
        assert_eq!(settings.converters.markdown, Converter::Builtin(Builtin::PulldownCmark));
        assert_eq!(settings.converters.org, Converters::default().org);
        assert!(!settings.force);
    }

    #[test]
    fn unknown_keys_are_config_errors() {
        let error = Settings::parse("url_rot = '/'").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Config);
        assert!(error.to_string().contains("url_rot"));
    }

    #[test]
    fn inconsistent_converters_are_rejected() {
        let error = Settings::parse("[converters]\norg = \"pulldown-cmark\"").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Config);
    }

    #[test]
    fn missing_settings_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::read(dir.path().join("swgen.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }
}
