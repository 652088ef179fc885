// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Syntax tree for Python interface stubs.
//!
//! The tree is abstract: comments, parentheses and original spacing are not
//! kept, so code generation produces a normalised layout.

pub mod codegen;
pub mod expression;
pub mod statement;

pub use codegen::{Codegen, CodegenState, Precedence};
pub use expression::{
    BinOp, BoolOp, CmpOp, Constant, DictItem, Expression, FStringPart, FormattedValue, Keyword,
    UnaryOp,
};
pub use statement::{
    Alias, AnnAssign, Assign, ClassDef, Expr, FunctionDef, If, Import, ImportFrom, Module, Param,
    Parameters, Return, Statement,
};
