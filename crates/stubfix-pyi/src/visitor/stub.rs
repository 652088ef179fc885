// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! StubTransformer: context-scoped annotation fixes for generated stubs.
//!
//! This module provides a [`StubTransformer`] that rewrites the type
//! annotations of a parsed stub with an ordered list of [`TypeFix`] rules and
//! injects extra `import` statements.
//!
//! # Contexts
//!
//! Each annotation is fixed in the [`FixTarget`] of its position:
//!
//! - **return**: `def f() -> T` (sync and async functions)
//! - **attr**: `x: T`, at any nesting level
//! - **arg**: `def f(x: T)`, for every parameter kind
//! - **cb_arg** / **cb_return**: the two halves of a callable parameter
//!   annotation `Callable[[A], R]`, fixed separately instead of in `arg`
//!
//! # Import Injection
//!
//! The extra imports passed to [`StubTransformer::transform`] are inserted as
//! one `import NAME` statement each, immediately before the first plain
//! `import` statement of the file in document order. `from ... import`
//! statements do not trigger injection, and a file without plain imports is
//! left without them.
//!
//! # Usage
//!
//! ```
//! use stubfix_core::fix::TypeFix;
//! use stubfix_pyi::{parse_module, unparse, StubTransformer};
//!
//! let fix = TypeFix::new(r"f3d\.point3_t", "tuple[float, float, float]").unwrap();
//! let transformer = StubTransformer::new(vec![fix]);
//!
//! let module = parse_module("def f(p: f3d.point3_t) -> None: ...\n").unwrap();
//! let outcome = transformer.transform(module, &[]).unwrap();
//! assert_eq!(
//!     unparse(&outcome.module),
//!     "def f(p: tuple[float, float, float]) -> None:\n    ..."
//! );
//! ```

use std::sync::LazyLock;

use regex::Regex;
use stubfix_core::error::StubfixError;
use stubfix_core::fix::{FixTarget, TypeFix};
use tracing::trace;

use super::dispatch::{walk_function_def, walk_statement};
use super::traits::{Transform, Transformer};
use crate::nodes::{AnnAssign, Expression, FunctionDef, Import, Module, Param, Statement};
use crate::{parse_expression, unparse_expression};

/// Matches the unparsed value of a callable annotation's subscript.
static CALLABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(typing\.|collections\.abc\.)?Callable").unwrap());

// ============================================================================
// StubTransformer
// ============================================================================

/// Applies type fixes to every annotation of a stub.
///
/// The transformer holds only its rules; everything that changes while a file
/// is processed lives in the per-call state, so one transformer can be reused
/// across any number of files.
#[derive(Debug, Clone, Default)]
pub struct StubTransformer {
    fixes: Vec<TypeFix>,
}

/// Result of transforming one module.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutcome {
    /// The rewritten module.
    pub module: Module,
    /// Whether the extra imports were inserted.
    pub imports_injected: bool,
    /// Number of rule applications that rewrote an annotation.
    pub fixes_applied: usize,
}

impl StubTransformer {
    /// Create a transformer applying `fixes` in order.
    pub fn new(fixes: Vec<TypeFix>) -> Self {
        StubTransformer { fixes }
    }

    /// The rules, in application order.
    pub fn fixes(&self) -> &[TypeFix] {
        &self.fixes
    }

    /// Rewrite `module`, inserting `extra_imports` before its first import.
    pub fn transform(
        &self,
        module: Module,
        extra_imports: &[String],
    ) -> Result<TransformOutcome, StubfixError> {
        let mut pass = FilePass {
            fixes: &self.fixes,
            pending_imports: extra_imports.to_vec(),
            imports_injected: false,
            fixes_applied: 0,
        };
        let module = pass.transform_module(module)?;
        Ok(TransformOutcome {
            module,
            imports_injected: pass.imports_injected,
            fixes_applied: pass.fixes_applied,
        })
    }

    /// Fix a single annotation in `target`, returning it with the number of
    /// rules that fired.
    pub fn fix_annotation(
        &self,
        annotation: Expression,
        target: FixTarget,
    ) -> Result<(Expression, usize), StubfixError> {
        let mut pass = FilePass {
            fixes: &self.fixes,
            pending_imports: Vec::new(),
            imports_injected: false,
            fixes_applied: 0,
        };
        let annotation = pass.fix_annotation(annotation, target)?;
        Ok((annotation, pass.fixes_applied))
    }
}

// ============================================================================
// Per-file pass
// ============================================================================

struct FilePass<'r> {
    fixes: &'r [TypeFix],
    pending_imports: Vec<String>,
    imports_injected: bool,
    fixes_applied: usize,
}

impl FilePass<'_> {
    fn fix_annotation(
        &mut self,
        annotation: Expression,
        target: FixTarget,
    ) -> Result<Expression, StubfixError> {
        let mut annotation = annotation;
        let mut text = unparse_expression(&annotation);
        for fix in self.fixes.iter().filter(|fix| fix.applies_to(target)) {
            let Some(rewritten) = fix.apply(&text) else {
                continue;
            };
            annotation = parse_expression(&rewritten).map_err(|err| {
                StubfixError::FixProducedInvalidAnnotation {
                    pattern: fix.pattern().to_string(),
                    target,
                    text: rewritten.clone(),
                    message: err.message(),
                }
            })?;
            let fixed = unparse_expression(&annotation);
            trace!(
                pattern = fix.pattern(),
                %target,
                from = %text,
                to = %fixed,
                "type fix applied"
            );
            text = fixed;
            self.fixes_applied += 1;
        }
        Ok(annotation)
    }

    /// Split `Callable[[A], R]` into its halves, or fix the whole annotation
    /// as a plain argument.
    fn fix_param_annotation(
        &mut self,
        annotation: Expression,
    ) -> Result<Expression, StubfixError> {
        match annotation {
            Expression::Subscript { value, slice }
                if CALLABLE.is_match(&unparse_expression(&value)) =>
            {
                match *slice {
                    Expression::Tuple(elts) => match <[Expression; 2]>::try_from(elts) {
                        Ok([args, ret]) => {
                            let args = self.fix_annotation(args, FixTarget::CallbackArgument)?;
                            let ret = self.fix_annotation(ret, FixTarget::CallbackReturn)?;
                            Ok(Expression::subscript(
                                *value,
                                Expression::Tuple(vec![args, ret]),
                            ))
                        }
                        Err(elts) => self.fix_annotation(
                            Expression::subscript(*value, Expression::Tuple(elts)),
                            FixTarget::Argument,
                        ),
                    },
                    slice => self.fix_annotation(
                        Expression::subscript(*value, slice),
                        FixTarget::Argument,
                    ),
                }
            }
            annotation => self.fix_annotation(annotation, FixTarget::Argument),
        }
    }
}

impl Transformer for FilePass<'_> {
    type Error = StubfixError;

    fn transform_statement(
        &mut self,
        node: Statement,
    ) -> Result<Transform<Statement>, StubfixError> {
        match node {
            Statement::Import(import) if !self.pending_imports.is_empty() => {
                let mut statements: Vec<Statement> = self
                    .pending_imports
                    .drain(..)
                    .map(|name| Statement::Import(Import::single(name)))
                    .collect();
                statements.push(Statement::Import(import));
                self.imports_injected = true;
                Ok(Transform::Flatten(statements))
            }
            node => walk_statement(self, node).map(Transform::Keep),
        }
    }

    fn transform_function_def(&mut self, node: FunctionDef) -> Result<FunctionDef, StubfixError> {
        let mut node = node;
        if let Some(returns) = node.returns.take() {
            node.returns = Some(self.fix_annotation(returns, FixTarget::Return)?);
        }
        walk_function_def(self, node)
    }

    fn transform_ann_assign(&mut self, node: AnnAssign) -> Result<AnnAssign, StubfixError> {
        let AnnAssign {
            target,
            annotation,
            value,
            simple,
        } = node;
        Ok(AnnAssign {
            target,
            annotation: self.fix_annotation(annotation, FixTarget::Attribute)?,
            value,
            simple,
        })
    }

    fn transform_param(&mut self, node: Param) -> Result<Param, StubfixError> {
        let mut node = node;
        if let Some(annotation) = node.annotation.take() {
            node.annotation = Some(self.fix_param_annotation(annotation)?);
        }
        Ok(node)
    }
}

// ============================================================================
// Tests
// ============================================================================
