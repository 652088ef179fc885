// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! A parser, unparser and annotation rewriter for Python interface stubs.
//!
//! This crate reads the `.pyi` files produced by stub generators into an owned
//! syntax tree, rewrites type annotations with context-scoped rules, and
//! writes the tree back out in the canonical layout of CPython's
//! `ast.unparse`.
//!
//! # Overview
//!
//! - **Parsing**: [`parse_module`] for whole files, [`parse_expression`] for
//!   annotation fragments.
//! - **Code Generation**: [`unparse`] and [`unparse_expression`], built on the
//!   [`Codegen`] trait.
//! - **Rewriting**: the [`Transformer`] trait and the [`StubTransformer`] pass.
//!
//! # Quick Start
//!
//! ```
//! use stubfix_pyi::{parse_module, unparse};
//!
//! let source = "import os\nclass A:\n    x: int  # comment\n    def f(self) -> 'A': ...\n";
//! let module = parse_module(source).expect("parse error");
//! assert_eq!(
//!     unparse(&module),
//!     "import os\n\nclass A:\n    x: int\n\n    def f(self) -> 'A':\n        ..."
//! );
//! ```

use std::cmp::{max, min};

use stubfix_core::error::StubfixError;

// ============================================================================
// Public modules and re-exports
// ============================================================================

/// Owned syntax tree and code generation.
pub mod nodes;
pub use nodes::{Codegen, CodegenState, Expression, Module, Statement};

/// PEG parser over the token stream.
pub mod parser;
pub use parser::ParserError;

/// Tokenizer for stub source text.
pub mod tokenizer;

/// Transformer infrastructure for tree rewriting.
pub mod visitor;
pub use visitor::{StubTransformer, Transform, TransformOutcome, Transformer};

use parser::{stub_grammar, TokVec};

// ============================================================================
// Parsing functions
// ============================================================================

fn tokenize(text: &str) -> Result<TokVec<'_>, ParserError<'_>> {
    tokenizer::tokenize(text)
        .map(TokVec::from)
        .map_err(|(err, pos)| ParserError::TokenizerError(err, pos, text))
}

/// Parses a stub file into a [`Module`].
///
/// # Example
///
/// ```
/// use stubfix_pyi::parse_module;
///
/// let module = parse_module("def f(x: int) -> str: ...\n").expect("parse error");
/// assert_eq!(module.body.len(), 1);
/// ```
pub fn parse_module(module_text: &str) -> Result<Module, ParserError<'_>> {
    let module_text = module_text.strip_prefix('\u{feff}').unwrap_or(module_text);
    let tokens = tokenize(module_text)?;
    stub_grammar::file(&tokens).map_err(|err| ParserError::ParserError(err, module_text))
}

/// Parses a single expression, such as the text of an annotation.
///
/// Leading spaces and tabs are ignored.
///
/// # Example
///
/// ```
/// use stubfix_pyi::{parse_expression, unparse_expression};
///
/// let expr = parse_expression("  list[ int ]").expect("parse error");
/// assert_eq!(unparse_expression(&expr), "list[int]");
/// ```
pub fn parse_expression(text: &str) -> Result<Expression, ParserError<'_>> {
    let text = text.trim_start_matches([' ', '\t']);
    let tokens = tokenize(text)?;
    stub_grammar::expression_input(&tokens).map_err(|err| ParserError::ParserError(err, text))
}

// ============================================================================
// Code generation
// ============================================================================

/// Writes a module back out as source, without a trailing newline.
pub fn unparse(module: &Module) -> String {
    let mut state = CodegenState::new();
    module.codegen(&mut state);
    state.into_string()
}

/// Writes an expression back out as source.
pub fn unparse_expression(expr: &Expression) -> String {
    let mut state = CodegenState::new();
    expr.codegen(&mut state);
    state.into_string()
}

/// Parses and unparses `source`, dropping comments and normalising layout.
pub fn normalize(source: &str) -> Result<String, ParserError<'_>> {
    parse_module(source).map(|module| unparse(&module))
}

// ============================================================================
// Error reporting
// ============================================================================

/// Returns the byte offset of the beginning of line `n` (1-indexed).
fn bol_offset(source: &str, n: i32) -> usize {
    if n <= 1 {
        return 0;
    }
    source
        .match_indices('\n')
        .nth((n - 2) as usize)
        .map(|(index, _)| index + 1)
        .unwrap_or_else(|| source.len())
}

/// Formats a parser error into a human-readable string with source context.
///
/// The snippet shows the offending line with one line of context on each
/// side, labelled with `label` (usually the file name).
///
/// # Example
///
/// ```
/// use stubfix_pyi::{parse_module, prettify_error};
///
/// let err = parse_module("def f(:\n").unwrap_err();
/// let formatted = prettify_error(&err, "example.pyi");
/// assert!(formatted.contains("example.pyi"));
/// ```
pub fn prettify_error(err: &ParserError<'_>, label: &str) -> String {
    use annotate_snippets::{Level, Renderer, Snippet};

    let module_text = err.source_text();
    let (start_pos, end_pos) = match err {
        ParserError::ParserError(e, _) => (e.location.start_pos, e.location.end_pos),
        ParserError::TokenizerError(_, pos, _) => (*pos, *pos),
    };

    let context = 1;
    let line_start = max(1, start_pos.line.saturating_sub(context as usize));
    let start_offset = bol_offset(module_text, start_pos.line as i32 - context);
    let end_offset = bol_offset(module_text, end_pos.line as i32 + context + 1);
    let source = &module_text[start_offset..end_offset];
    let start = start_pos.offset.saturating_sub(start_offset);
    let end = end_pos.offset.saturating_sub(start_offset);
    let end = if start == end {
        min(end + 1, end_offset - start_offset + 1)
    } else {
        end
    };
    let message = format!("{} {} -> {}", err.message(), start_pos, end_pos);
    let rendered = Renderer::plain()
        .render(
            Level::Error.title(label).snippet(
                Snippet::source(source)
                    .line_start(line_start)
                    .origin(label)
                    .fold(false)
                    .annotations(vec![Level::Error.span(start..end).label(&message)]),
            ),
        )
        .to_string();
    rendered
}

/// Converts a parser error into the pipeline's [`StubfixError::Syntax`].
pub fn syntax_error(err: &ParserError<'_>, file: &str) -> StubfixError {
    let pos = err.position();
    StubfixError::Syntax {
        file: file.to_string(),
        line: pos.line,
        column: pos.column,
        message: err.message(),
        rendered: prettify_error(err, file),
    }
}

// ============================================================================
// Post-processing
// ============================================================================

/// The result of post-processing one stub.
#[derive(Debug, Clone, PartialEq)]
pub struct PostprocessedSource {
    /// The original text after a parse/unparse round trip.
    pub normalized: String,
    /// The rewritten text.
    pub transformed: String,
    /// Whether the extra imports were inserted.
    pub imports_injected: bool,
    /// Number of rule applications that rewrote an annotation.
    pub fixes_applied: usize,
}

/// Parses `source`, applies `transformer` and unparses both the original and
/// the rewritten tree. `file_label` names the file in syntax errors.
pub fn postprocess_source(
    source: &str,
    transformer: &StubTransformer,
    extra_imports: &[String],
    file_label: &str,
) -> Result<PostprocessedSource, StubfixError> {
    let module = parse_module(source).map_err(|err| syntax_error(&err, file_label))?;
    let normalized = unparse(&module);
    let outcome = transformer.transform(module, extra_imports)?;
    Ok(PostprocessedSource {
        normalized,
        transformed: unparse(&outcome.module),
        imports_injected: outcome.imports_injected,
        fixes_applied: outcome.fixes_applied,
    })
}

// ============================================================================
// Tests
// ============================================================================
