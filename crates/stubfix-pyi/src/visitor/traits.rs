// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Transformer trait definitions for syntax tree rewriting.

use super::dispatch::{
    walk_ann_assign, walk_assign, walk_class_def, walk_expr, walk_expression, walk_function_def,
    walk_if_stmt, walk_import_from, walk_import_stmt, walk_module, walk_param, walk_parameters,
    walk_return_stmt, walk_statement,
};
use crate::nodes::{
    AnnAssign, Assign, ClassDef, Expr, Expression, FunctionDef, If, Import, ImportFrom, Module,
    Param, Parameters, Return, Statement,
};

/// Transform result for nodes that appear in a statement list.
///
/// `Flatten` replaces the node with any number of nodes, spliced into the
/// enclosing block in order.
#[derive(Debug, Clone)]
pub enum Transform<T> {
    /// Keep the transformed node.
    Keep(T),
    /// Replace the node with multiple nodes.
    Flatten(Vec<T>),
}

impl<T> Transform<T> {
    /// Append the resulting nodes to `out`.
    pub fn extend_into(self, out: &mut Vec<T>) {
        match self {
            Transform::Keep(t) => out.push(t),
            Transform::Flatten(v) => out.extend(v),
        }
    }
}

/// Macro to generate transformer trait method signatures.
///
/// Each generated `transform_*` method defaults to the matching `walk_*`
/// function, which rebuilds the node from its transformed children.
macro_rules! transformer_methods {
    (
        $(
            $(#[$meta:meta])*
            $base_name:ident : $node_type:ty
        ),* $(,)?
    ) => {
        paste::paste! {
            $(
                $(#[$meta])*
                #[doc = concat!("Transform a [`", stringify!($node_type), "`] node.")]
                #[doc = ""]
                #[doc = "Defaults to the matching `walk_*` function, which transforms the children."]
                fn [<transform_ $base_name>](&mut self, node: $node_type) -> Result<$node_type, Self::Error> {
                    [<walk_ $base_name>](self, node)
                }
            )*
        }
    };
}

/// Macro to generate transformer methods that return Transform<T> for list contexts.
macro_rules! transformer_list_methods {
    (
        $(
            $(#[$meta:meta])*
            $base_name:ident : $node_type:ty
        ),* $(,)?
    ) => {
        paste::paste! {
            $(
                $(#[$meta])*
                #[doc = concat!("Transform a [`", stringify!($node_type), "`] node in a list context.")]
                #[doc = ""]
                #[doc = "Returns `Transform::Keep` of the walked node by default. Can also return `Flatten`."]
                fn [<transform_ $base_name>](&mut self, node: $node_type) -> Result<Transform<$node_type>, Self::Error> {
                    [<walk_ $base_name>](self, node).map(Transform::Keep)
                }
            )*
        }
    };
}

/// Fallible rewriting of a syntax tree.
///
/// Every method consumes a node and returns its replacement. Defaults walk
/// into children in source order, so an implementation overrides only the
/// nodes it cares about and calls the matching `walk_*` function to keep
/// descending. The first error aborts the whole walk.
///
/// # Example
///
/// ```
/// use std::convert::Infallible;
/// use stubfix_pyi::nodes::Expression;
/// use stubfix_pyi::visitor::{walk_expression, Transformer};
///
/// struct Renamer;
///
/// impl Transformer for Renamer {
///     type Error = Infallible;
///
///     fn transform_expression(&mut self, node: Expression) -> Result<Expression, Infallible> {
///         match node {
///             Expression::Name(id) if id == "old" => Ok(Expression::name("new")),
///             other => walk_expression(self, other),
///         }
///     }
/// }
/// ```
pub trait Transformer {
    /// Error that aborts the walk.
    type Error;

    // Module
    transformer_methods! {
        module: Module,
    }

    // Statements (list context - can be removed/flattened)
    transformer_list_methods! {
        statement: Statement,
    }

    // Compound statements
    transformer_methods! {
        function_def: FunctionDef,
        class_def: ClassDef,
        if_stmt: If,
    }

    // Simple statements
    transformer_methods! {
        import_stmt: Import,
        import_from: ImportFrom,
        assign: Assign,
        ann_assign: AnnAssign,
        expr: Expr,
        return_stmt: Return,
    }

    // Function-related
    transformer_methods! {
        parameters: Parameters,
        param: Param,
    }

    // Expressions
    transformer_methods! {
        expression: Expression,
    }
}
