//! JSON output types and serialization for CLI responses.
//!
//! ## Design Principles
//!
//! 1. **Status first:** Every response has `status` as first field
//! 2. **Deterministic:** Same input -> same output (field order, array ordering)
//! 3. **Versioned:** Schema version in response enables forward compatibility

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::error::{OutputErrorCode, StubfixError};

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Error Output
// ============================================================================

/// A position in a stub file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// File label (relative to the output directory).
    pub file: String,
    /// 1-based line.
    pub line: usize,
    /// 1-based column.
    pub col: usize,
}

/// Error information in JSON output.
///
/// - `code`: Numeric error code (see [`OutputErrorCode`])
/// - `message`: Human-readable message
/// - `details`: Error-specific structured data (optional)
/// - `location`: Where the error occurred (optional)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code.
    pub code: u8,
    /// Human-readable message.
    pub message: String,
    /// Error-specific structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Where the error occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl ErrorInfo {
    /// Create from a StubfixError.
    pub fn from_error(err: &StubfixError) -> Self {
        let code = OutputErrorCode::from(err).code();
        let message = err.to_string();

        let (details, location) = match err {
            StubfixError::Syntax {
                file, line, column, ..
            } => (
                None,
                Some(Location {
                    file: file.clone(),
                    line: *line,
                    col: *column,
                }),
            ),
            StubfixError::GeneratorFailed { command, code } => (
                Some(serde_json::json!({ "command": command, "exit_code": code })),
                None,
            ),
            StubfixError::GeneratorTimeout { command, seconds } => (
                Some(serde_json::json!({ "command": command, "timeout_secs": seconds })),
                None,
            ),
            StubfixError::FixProducedInvalidAnnotation {
                pattern,
                target,
                text,
                ..
            } => (
                Some(serde_json::json!({
                    "pattern": pattern,
                    "target": target,
                    "text": text
                })),
                None,
            ),
            StubfixError::PythonNotFound { searched } => {
                (Some(serde_json::json!({ "searched": searched })), None)
            }
            StubfixError::Io { path, .. } => (
                Some(serde_json::json!({ "path": path.display().to_string() })),
                None,
            ),
            _ => (None, None),
        };

        ErrorInfo {
            code,
            message,
            details,
            location,
        }
    }
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Error information.
    pub error: ErrorInfo,
}

impl ErrorResponse {
    /// Create an error response from a StubfixError.
    pub fn from_error(err: &StubfixError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

// ============================================================================
// Post-processing Report
// ============================================================================

/// Outcome for a single stub file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    /// Path relative to the output directory.
    pub path: String,
    /// Whether the extra imports were inserted into this file.
    pub imports_injected: bool,
    /// Number of rule applications that rewrote an annotation.
    pub fixes_applied: usize,
    /// Whether the rewritten text differs from the normalised original.
    pub changed: bool,
    /// Whether the file was written back.
    pub written: bool,
}

/// Response for a post-processing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostprocessReport {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Output directory the stubs live in.
    pub output_dir: String,
    /// Whether files were left untouched.
    pub dry_run: bool,
    /// Per-file outcomes, sorted by path.
    pub files: Vec<FileReport>,
    /// Unified diff lines over all files, in file order.
    pub diff: Vec<String>,
}

impl PostprocessReport {
    /// Create an empty report for an output directory.
    pub fn new(output_dir: impl Into<String>, dry_run: bool) -> Self {
        PostprocessReport {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            output_dir: output_dir.into(),
            dry_run,
            files: Vec::new(),
            diff: Vec::new(),
        }
    }

    /// Number of files whose text changed.
    pub fn changed_count(&self) -> usize {
        self.files.iter().filter(|file| file.changed).count()
    }

    /// Total rule applications across files.
    pub fn fixes_applied(&self) -> usize {
        self.files.iter().map(|file| file.fixes_applied).sum()
    }

    /// One-line human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "{} file(s) processed, {} changed, {} fix(es) applied{}",
            self.files.len(),
            self.changed_count(),
            self.fixes_applied(),
            if self.dry_run { " (dry run)" } else { "" }
        )
    }
}

// ============================================================================
// Emission
// ============================================================================

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    // Use serde_json's pretty printer
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fix::FixTarget;

    fn file(path: &str, changed: bool, fixes: usize) -> FileReport {
        FileReport {
            path: path.to_string(),
            imports_injected: true,
            fixes_applied: fixes,
            changed,
            written: changed,
        }
    }

    #[test]
    fn report_serializes_status_first() {
        let mut report = PostprocessReport::new("/tmp/stubs", false);
        report.files.push(file("f3d/pyf3d.pyi", true, 2));
        report.diff.push("--- f3d/pyf3d.pyi".to_string());

        let mut out = Vec::new();
        emit_response(&report, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let status_pos = text.find("\"status\"").unwrap();
        let files_pos = text.find("\"files\"").unwrap();
        assert!(status_pos < files_pos);

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["files"][0]["fixes_applied"], 2);
        assert_eq!(value["diff"][0], "--- f3d/pyf3d.pyi");
    }

    #[test]
    fn summary_counts_changed_files_and_fixes() {
        let mut report = PostprocessReport::new("out", true);
        report.files.push(file("a.pyi", true, 3));
        report.files.push(file("b.pyi", false, 0));
        assert_eq!(
            report.summary(),
            "2 file(s) processed, 1 changed, 3 fix(es) applied (dry run)"
        );
    }

    #[test]
    fn syntax_error_carries_location() {
        let err = StubfixError::Syntax {
            file: "f3d/pyf3d.pyi".to_string(),
            line: 4,
            column: 9,
            message: "unexpected token".to_string(),
            rendered: String::new(),
        };
        let response = ErrorResponse::from_error(&err);
        assert_eq!(response.status, "error");
        assert_eq!(response.error.code, 3);
        assert_eq!(
            response.error.location,
            Some(Location {
                file: "f3d/pyf3d.pyi".to_string(),
                line: 4,
                col: 9
            })
        );
    }

    #[test]
    fn invalid_fix_output_carries_details() {
        let err = StubfixError::FixProducedInvalidAnnotation {
            pattern: "int".to_string(),
            target: FixTarget::CallbackReturn,
            text: "list[".to_string(),
            message: "unexpected end of input".to_string(),
        };
        let info = ErrorInfo::from_error(&err);
        let details = info.details.unwrap();
        assert_eq!(details["target"], "cb_return");
        assert_eq!(details["text"], "list[");
    }

    #[test]
    fn generator_failure_details_include_exit_code() {
        let err = StubfixError::GeneratorFailed {
            command: "gen".to_string(),
            code: Some(7),
        };
        let info = ErrorInfo::from_error(&err);
        assert_eq!(info.code, 5);
        assert_eq!(info.details.unwrap()["exit_code"], 7);
    }
}
