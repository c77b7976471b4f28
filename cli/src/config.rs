use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use swgen::error::{Chainable, Result};
use swgen::templating::Engine;
use swgen::templating::minijinja::MiniJinjaEngine;
use swgen::util::PathExt;
use swgen::{err, error, IgnoreRules, Settings, Swgen};

use crate::{flags, CONFIG_FILE, IGNORE_FILE, TEMPLATE_DIR};

#[derive(Debug)]
pub struct Config {
    pub input: PathBuf,
    pub output: PathBuf,
    pub settings: Settings,
    pub ignore: IgnoreRules,
    pub engine: Arc<dyn Engine>,
}

impl Config {
    /// Reads `swgen.toml`, `.swignore`, and `.template/` from the input
    /// directory, then applies `flags` over them.
    pub fn discover(flags: &flags::Swgen) -> Result<Self> {
        let input = flags.input.clone().unwrap_or_else(|| PathBuf::from("."));
        let output = flags.output.clone().unwrap_or_else(|| PathBuf::from("./output"));

        let mut settings = Settings::read(input.join(CONFIG_FILE))?;
        if let Some(root) = &flags.root {
            settings.url_root = root.clone();
        }

        settings.force |= flags.force;
        settings.navigator_json |= flags.nav_json;

        let mut ignore = IgnoreRules::read(input.join(IGNORE_FILE))?;
        ignore.add(IGNORE_FILE)?.add(CONFIG_FILE)?.add_dir(TEMPLATE_DIR)?;
        if let Some(nested) = nested_output(&input, &output)? {
            debug!(path = %nested.display(), "ignoring output directory inside the input");
            ignore.add_dir(&nested.to_slash())?;
        }

        let templates = input.join(TEMPLATE_DIR);
        let engine: Arc<dyn Engine> = match templates.is_dir() {
            true => Arc::new(MiniJinjaEngine::from_dir(&templates)?),
            false => Arc::new(MiniJinjaEngine::new()?),
        };

        let config = Config { input, output, settings, ignore, engine };
        debug!(?config, "discovered configuration");
        Ok(config)
    }

    pub fn into_swgen(self) -> Result<Swgen> {
        let swgen = Swgen::new(self.input, self.output, self.settings, self.engine)?;
        Ok(swgen.ignore(self.ignore))
    }
}

/// The output directory relative to the input, when it lies inside it. The
/// output directory is created so both paths can be resolved.
fn nested_output(input: &Path, output: &Path) -> Result<Option<PathBuf>> {
    let resolve = |path: &Path| fs::canonicalize(path).chain_with(|| error! {
        Config: "failed to resolve directory",
        "path" => path.display(),
    });

    fs::create_dir_all(output).chain_with(|| error! {
        Flush: "failed to create output directory",
        "path" => output.display(),
    })?;

    let (input, output) = (resolve(input)?, resolve(output)?);
    match output.strip_prefix(&input) {
        Ok(nested) if nested.as_os_str().is_empty() => err! {
            Config: "output directory must differ from the input directory",
            "path" => output.display(),
        },
        Ok(nested) => Ok(Some(nested.to_path_buf())),
        Err(_) if input.starts_with(&output) => err! {
            Config: "output directory must not contain the input directory",
            "input" => input.display(),
            "output" => output.display(),
        },
        Err(_) => Ok(None),
    }
}
