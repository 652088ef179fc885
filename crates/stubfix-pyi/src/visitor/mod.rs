// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Syntax tree rewriting.
//!
//! - [`Transformer`]: fallible node-by-node rewriting with `walk_*` defaults
//! - [`StubTransformer`]: the type-fix and import-injection pass over stubs

mod dispatch;
mod stub;
mod traits;

pub use dispatch::{
    walk_ann_assign, walk_assign, walk_class_def, walk_expr, walk_expression, walk_function_def,
    walk_if_stmt, walk_import_from, walk_import_stmt, walk_module, walk_param, walk_parameters,
    walk_return_stmt, walk_statement, walk_statements,
};
pub use stub::{StubTransformer, TransformOutcome};
pub use traits::{Transform, Transformer};
