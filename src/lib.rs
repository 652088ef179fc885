//! stubfix: generate and post-process Python type stubs
//!
//! Runs `pybind11-stubgen` for the f3d binding, rewrites the type annotations
//! of every stub it changed with context-scoped rules, injects extra imports,
//! and reports a unified diff of what the post-processing did.

// Core infrastructure - re-exported from stubfix-core
pub use stubfix_core::config;
pub use stubfix_core::diff;
pub use stubfix_core::error;
pub use stubfix_core::fix;
pub use stubfix_core::output;
pub use stubfix_core::snapshot;

// Pipeline stages
pub mod postprocess;
pub mod stubgen;

use std::path::{Path, PathBuf};

use tracing::info;

use stubfix_core::config::Config;
use stubfix_core::error::StubfixError;
use stubfix_core::output::PostprocessReport;

/// Options for one end-to-end run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory the generator writes into and the stubs are read from.
    pub output_dir: PathBuf,
    /// Generator settings and post-processing rules.
    pub config: Config,
    /// Interpreter override for the generator.
    pub python: Option<PathBuf>,
    /// Process every stub matching the glob instead of running the generator.
    pub skip_generate: bool,
    /// Report without writing files.
    pub dry_run: bool,
}

impl RunOptions {
    /// Options with the default configuration for `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        RunOptions {
            output_dir: output_dir.into(),
            config: Config::default(),
            python: None,
            skip_generate: false,
            dry_run: false,
        }
    }
}

/// Generate stubs (unless skipped), then post-process every changed file.
///
/// The rules are compiled before the generator starts, so a misconfigured
/// rule fails the run without touching the output directory.
pub fn run(options: &RunOptions) -> Result<PostprocessReport, StubfixError> {
    let rules = options.config.postprocess.compile()?;
    let output_dir: &Path = &options.output_dir;

    let changed = if options.skip_generate {
        info!(output_dir = %output_dir.display(), "skipping stub generation");
        stubgen::existing_stubs(&options.config.generator, output_dir)?
    } else {
        stubgen::run_generator(
            &options.config.generator,
            output_dir,
            options.python.as_deref(),
        )?
    };

    postprocess::postprocess_stubs(output_dir, &changed, &rules, options.dry_run)
}
