use std::process::ExitCode;
use std::time::Instant;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

mod config;

pub const CONFIG_FILE: &str = "swgen.toml";
pub const IGNORE_FILE: &str = ".swignore";
pub const TEMPLATE_DIR: &str = ".template";

mod flags {
    use std::path::PathBuf;

    xflags::xflags! {
        /// Builds a static site from a directory of markdown, org, html, page
        /// templates, and assets.
        cmd swgen {
            /// Source directory. Defaults to `.`.
            optional -i, --input input: PathBuf
            /// Output directory. Defaults to `./output`.
            optional -o, --output output: PathBuf
            /// URL prefix for every generated link.
            optional -r, --root root: String
            /// Rewrite every output, even when it is newer than its source.
            optional -f, --force
            /// Log every skipped and ignored entry.
            optional -v, --verbose
            /// Also write the navigator to `nav.json`.
            optional --nav-json
        }
    }
}

pub fn main() -> ExitCode {
    let flags = flags::Swgen::from_env_or_exit();
    let filter = if flags.verbose {
        EnvFilter::new("swgen=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let start = Instant::now();
    let result = Config::discover(&flags)
        .and_then(|config| config.into_swgen())
        .and_then(|swgen| {
            info!(
                url_root = %swgen.target().url_root,
                force = swgen.settings().force,
                "building {} into {}",
                swgen.source().display(),
                swgen.target().root.display()
            );

            swgen.run()
        });

    match result {
        Ok(report) => {
            info!(
                written = report.written.len(),
                skipped = report.skipped.len(),
                "build finished in {}ms",
                start.elapsed().as_millis()
            );

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
