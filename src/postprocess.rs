//! Per-file stub post-processing.
//!
//! Each changed stub is read, rewritten by a [`StubTransformer`], diffed
//! against its normalised original and written back. A file is only written
//! once its transformation has fully succeeded.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use stubfix_core::diff::unified_diff;
use stubfix_core::error::StubfixError;
use stubfix_core::fix::StubRules;
use stubfix_core::output::{FileReport, PostprocessReport};
use stubfix_core::snapshot::ChangedFileSet;
use stubfix_pyi::{postprocess_source, StubTransformer};

/// Lines of context around each diff hunk.
pub const DIFF_CONTEXT: usize = 1;

/// A file's outcome together with its diff lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedFile {
    pub report: FileReport,
    pub diff: Vec<String>,
}

/// Rewrite one stub file.
///
/// `label` is the path relative to the output directory; the diff headers
/// carry the full path.
pub fn postprocess_file(
    path: &Path,
    label: &str,
    transformer: &StubTransformer,
    extra_imports: &[String],
    dry_run: bool,
) -> Result<ProcessedFile, StubfixError> {
    let source = fs::read_to_string(path).map_err(|e| StubfixError::io(path, e))?;
    let result = postprocess_source(&source, transformer, extra_imports, label)?;

    let changed = result.normalized != result.transformed;
    let written = !dry_run;
    if written {
        let mut text = result.transformed.clone();
        if !text.is_empty() {
            text.push('\n');
        }
        fs::write(path, text).map_err(|e| StubfixError::io(path, e))?;
    }

    let display = path.display().to_string();
    let diff = unified_diff(
        &result.normalized,
        &result.transformed,
        &display,
        &display,
        DIFF_CONTEXT,
    );
    debug!(
        file = label,
        fixes = result.fixes_applied,
        imports = result.imports_injected,
        changed,
        "post-processed stub"
    );

    Ok(ProcessedFile {
        report: FileReport {
            path: label.to_string(),
            imports_injected: result.imports_injected,
            fixes_applied: result.fixes_applied,
            changed,
            written,
        },
        diff,
    })
}

/// Rewrite every file in `changed`, in order, collecting one report.
pub fn postprocess_stubs(
    output_dir: &Path,
    changed: &ChangedFileSet,
    rules: &StubRules,
    dry_run: bool,
) -> Result<PostprocessReport, StubfixError> {
    let transformer = StubTransformer::new(rules.fixes.clone());
    let mut report = PostprocessReport::new(output_dir.display().to_string(), dry_run);

    for (label, path) in changed.files().iter().zip(changed.paths_under(output_dir)) {
        let processed =
            postprocess_file(&path, label, &transformer, &rules.extra_imports, dry_run)?;
        report.files.push(processed.report);
        report.diff.extend(processed.diff);
    }

    info!(
        files = report.files.len(),
        changed = report.changed_count(),
        fixes = report.fixes_applied(),
        dry_run,
        "post-processing complete"
    );
    Ok(report)
}

// ============================================================================
// Tests
// ============================================================================
