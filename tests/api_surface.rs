//! Compile-only test to verify public API surface.
//!
//! This file serves as a compile-time contract for the public API.
//! If this file fails to compile, the public API has regressed.
//!
//! Run with: cargo test -- api_surface

// Allow unused imports - this test is about compile-time verification, not runtime usage
#![allow(unused_imports)]

// ============================================================================
// Core Infrastructure Types
// ============================================================================

// config module - TOML configuration
use stubfix::config::{Config, FixConfig, GeneratorConfig, PostprocessConfig};

// error module - error types and codes
use stubfix::error::{OutputErrorCode, StubfixError};

// fix module - annotation rewrite rules
use stubfix::fix::{FixTarget, StubRules, Substitution, TypeFix};

// output module - JSON output types
use stubfix::output::{
    emit_response, ErrorInfo, ErrorResponse, FileReport, Location, PostprocessReport,
    SCHEMA_VERSION,
};

// snapshot module - changed-file detection
use stubfix::snapshot::{compile_glob, ChangedFileSet, MtimeSnapshot};

// diff module - unified diff generation
use stubfix::diff::unified_diff;

// ============================================================================
// Pipeline
// ============================================================================

use stubfix::postprocess::{postprocess_file, postprocess_stubs, ProcessedFile, DIFF_CONTEXT};
use stubfix::stubgen::{
    existing_stubs, generator_args, generator_command, resolve_python, run_command,
    run_generator, PYTHON_ENV_VAR,
};
use stubfix::{run, RunOptions};

// ============================================================================
// Stub Syntax
// ============================================================================

use stubfix_pyi::nodes::{
    Alias, AnnAssign, Assign, BinOp, BoolOp, ClassDef, CmpOp, Codegen, CodegenState, Constant,
    DictItem, Expr, Expression, FunctionDef, If, Import, ImportFrom, Keyword, Module, Param,
    Parameters, Precedence, Return, Statement, UnaryOp,
};
use stubfix_pyi::visitor::{
    walk_expression, walk_function_def, walk_module, walk_statement, StubTransformer, Transform,
    TransformOutcome, Transformer,
};
use stubfix_pyi::{
    normalize, parse_expression, parse_module, postprocess_source, prettify_error, syntax_error,
    unparse, unparse_expression, ParserError, PostprocessedSource,
};

// ============================================================================
// Test
// ============================================================================

#[test]
fn api_surface_compiles() {
    // If this test compiles, the public API surface is intact.
}

#[test]
fn schema_version_is_stable() {
    assert_eq!(SCHEMA_VERSION, "1");
}
