//! Error types and exit codes for stubfix.
//!
//! This module provides a unified error type (`StubfixError`) covering every
//! failure the pipeline can surface, and the mapping from errors to process
//! exit codes.
//!
//! ## Exit Code Mapping
//!
//! - `2`: Invalid arguments or configuration (bad input from caller)
//! - `3`: Syntax errors in a stub file
//! - `4`: Apply errors (I/O while reading or writing stubs)
//! - `5`: Generator errors that carry no exit code of their own
//! - `10`: Internal errors (bugs, unexpected state)
//!
//! A generator that exits non-zero propagates its own exit code instead.
//!
//! ## Design
//!
//! - **Unified type**: `StubfixError` is the single error type crossing crate
//!   boundaries; the parser's own error is bridged in `stubfix-pyi`.
//! - **Code mapping**: `OutputErrorCode` provides stable integer codes for
//!   JSON output and the process exit status.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::fix::FixTarget;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output and process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments or configuration.
    InvalidArguments = 2,
    /// A stub file did not parse.
    SyntaxError = 3,
    /// Failed to read or write a stub file.
    ApplyError = 4,
    /// The generator could not be run to completion.
    GeneratorError = 5,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for the stub pipeline.
#[derive(Debug, Error)]
pub enum StubfixError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// Configuration file could not be read or is malformed.
    #[error("invalid configuration{}: {message}", describe_path(.path))]
    Config {
        path: Option<PathBuf>,
        message: String,
    },

    /// A type-fix pattern is not a valid regular expression.
    #[error("invalid type fix pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    /// A literal substitution template is malformed for its pattern.
    #[error("invalid substitution `{substitution}` for pattern `{pattern}`: {reason}")]
    InvalidSubstitution {
        pattern: String,
        substitution: String,
        reason: String,
    },

    /// A stub file glob is malformed.
    #[error("invalid file pattern `{pattern}`: {source}")]
    InvalidGlob {
        pattern: String,
        source: globset::Error,
    },

    /// No Python interpreter could be located to run the generator.
    #[error("python interpreter not found (searched: {})", .searched.join(", "))]
    PythonNotFound { searched: Vec<String> },

    /// The generator process could not be started.
    #[error("failed to launch stub generator `{program}`: {source}")]
    GeneratorSpawn { program: String, source: io::Error },

    /// The generator exited unsuccessfully.
    #[error("stub generator `{command}` failed: {}", describe_exit(.code))]
    GeneratorFailed { command: String, code: Option<i32> },

    /// The generator exceeded its configured deadline and was killed.
    #[error("stub generator `{command}` timed out after {seconds}s")]
    GeneratorTimeout { command: String, seconds: u64 },

    /// A stub file is not valid interface syntax.
    #[error("syntax error in {file} at {line}:{column}: {message}")]
    Syntax {
        file: String,
        line: usize,
        column: usize,
        message: String,
        /// Source snippet pointing at the error, for terminal output.
        rendered: String,
    },

    /// A type fix rewrote an annotation into text that no longer parses.
    #[error("type fix `{pattern}` produced an invalid {target} annotation `{text}`: {message}")]
    FixProducedInvalidAnnotation {
        pattern: String,
        target: FixTarget,
        text: String,
        message: String,
    },

    /// Reading or writing a file failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    Internal { message: String },
}

fn describe_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" in {}", path.display()),
        None => String::new(),
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&StubfixError> for OutputErrorCode {
    fn from(err: &StubfixError) -> Self {
        match err {
            StubfixError::InvalidArguments { .. }
            | StubfixError::Config { .. }
            | StubfixError::InvalidPattern { .. }
            | StubfixError::InvalidSubstitution { .. }
            | StubfixError::InvalidGlob { .. } => OutputErrorCode::InvalidArguments,
            StubfixError::Syntax { .. } | StubfixError::FixProducedInvalidAnnotation { .. } => {
                OutputErrorCode::SyntaxError
            }
            StubfixError::Io { .. } => OutputErrorCode::ApplyError,
            StubfixError::PythonNotFound { .. }
            | StubfixError::GeneratorSpawn { .. }
            | StubfixError::GeneratorFailed { .. }
            | StubfixError::GeneratorTimeout { .. } => OutputErrorCode::GeneratorError,
            StubfixError::Internal { .. } => OutputErrorCode::InternalError,
        }
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl StubfixError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        StubfixError::InvalidArguments {
            message: message.into(),
        }
    }

    /// Create a configuration error, optionally tied to a file.
    pub fn config(path: Option<&Path>, message: impl Into<String>) -> Self {
        StubfixError::Config {
            path: path.map(Path::to_path_buf),
            message: message.into(),
        }
    }

    /// Create an I/O error for a path.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StubfixError::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        StubfixError::Internal {
            message: message.into(),
        }
    }

    /// Exit status for the process.
    ///
    /// A generator that exited with its own non-zero code propagates it
    /// unchanged; everything else uses the mapped [`OutputErrorCode`].
    pub fn exit_code(&self) -> u8 {
        if let StubfixError::GeneratorFailed {
            code: Some(code), ..
        } = self
        {
            if let Ok(code) = u8::try_from(*code) {
                if code != 0 {
                    return code;
                }
            }
        }
        OutputErrorCode::from(self).code()
    }
}

// ============================================================================
// Tests
// ============================================================================
