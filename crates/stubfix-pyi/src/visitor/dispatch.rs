// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Walk functions: rebuild each node from its transformed children.
//!
//! Children are handed to the transformer in source order. Statement lists
//! splice in `Transform::Flatten` results.

use super::traits::Transformer;
use crate::nodes::{
    AnnAssign, Assign, ClassDef, DictItem, Expr, Expression, FStringPart, FormattedValue,
    FunctionDef, If, Import, ImportFrom, Keyword, Module, Param, Parameters, Return, Statement,
};

pub fn walk_module<T: Transformer + ?Sized>(t: &mut T, node: Module) -> Result<Module, T::Error> {
    Ok(Module {
        body: walk_statements(t, node.body)?,
    })
}

/// Transform every statement of a block, splicing in flattened results.
pub fn walk_statements<T: Transformer + ?Sized>(
    t: &mut T,
    body: Vec<Statement>,
) -> Result<Vec<Statement>, T::Error> {
    let mut out = Vec::with_capacity(body.len());
    for stmt in body {
        t.transform_statement(stmt)?.extend_into(&mut out);
    }
    Ok(out)
}

pub fn walk_statement<T: Transformer + ?Sized>(
    t: &mut T,
    node: Statement,
) -> Result<Statement, T::Error> {
    Ok(match node {
        Statement::FunctionDef(def) => Statement::FunctionDef(t.transform_function_def(def)?),
        Statement::ClassDef(def) => Statement::ClassDef(t.transform_class_def(def)?),
        Statement::If(stmt) => Statement::If(t.transform_if_stmt(stmt)?),
        Statement::Import(stmt) => Statement::Import(t.transform_import_stmt(stmt)?),
        Statement::ImportFrom(stmt) => Statement::ImportFrom(t.transform_import_from(stmt)?),
        Statement::Assign(stmt) => Statement::Assign(t.transform_assign(stmt)?),
        Statement::AnnAssign(stmt) => Statement::AnnAssign(t.transform_ann_assign(stmt)?),
        Statement::Expr(stmt) => Statement::Expr(t.transform_expr(stmt)?),
        Statement::Return(stmt) => Statement::Return(t.transform_return_stmt(stmt)?),
        Statement::Pass => Statement::Pass,
    })
}

fn walk_expressions<T: Transformer + ?Sized>(
    t: &mut T,
    exprs: Vec<Expression>,
) -> Result<Vec<Expression>, T::Error> {
    exprs
        .into_iter()
        .map(|e| t.transform_expression(e))
        .collect()
}

fn walk_optional<T: Transformer + ?Sized>(
    t: &mut T,
    expr: Option<Expression>,
) -> Result<Option<Expression>, T::Error> {
    expr.map(|e| t.transform_expression(e)).transpose()
}

fn walk_boxed<T: Transformer + ?Sized>(
    t: &mut T,
    expr: Box<Expression>,
) -> Result<Box<Expression>, T::Error> {
    t.transform_expression(*expr).map(Box::new)
}

fn walk_optional_boxed<T: Transformer + ?Sized>(
    t: &mut T,
    expr: Option<Box<Expression>>,
) -> Result<Option<Box<Expression>>, T::Error> {
    expr.map(|e| walk_boxed(t, e)).transpose()
}

/// Transform the values of replacement fields, including those nested in
/// format specs.
fn walk_fstring_parts<T: Transformer + ?Sized>(
    t: &mut T,
    parts: Vec<FStringPart>,
) -> Result<Vec<FStringPart>, T::Error> {
    parts
        .into_iter()
        .map(|part| -> Result<FStringPart, T::Error> {
            Ok(match part {
                FStringPart::Literal(_) => part,
                FStringPart::Field(field) => FStringPart::Field(FormattedValue {
                    value: walk_boxed(t, field.value)?,
                    conversion: field.conversion,
                    format_spec: field
                        .format_spec
                        .map(|spec| walk_fstring_parts(t, spec))
                        .transpose()?,
                }),
            })
        })
        .collect()
}

fn walk_keywords<T: Transformer + ?Sized>(
    t: &mut T,
    keywords: Vec<Keyword>,
) -> Result<Vec<Keyword>, T::Error> {
    keywords
        .into_iter()
        .map(|k| -> Result<Keyword, T::Error> {
            Ok(Keyword {
                arg: k.arg,
                value: t.transform_expression(k.value)?,
            })
        })
        .collect()
}

pub fn walk_function_def<T: Transformer + ?Sized>(
    t: &mut T,
    node: FunctionDef,
) -> Result<FunctionDef, T::Error> {
    Ok(FunctionDef {
        decorators: walk_expressions(t, node.decorators)?,
        is_async: node.is_async,
        name: node.name,
        params: t.transform_parameters(node.params)?,
        returns: walk_optional(t, node.returns)?,
        body: walk_statements(t, node.body)?,
    })
}

pub fn walk_parameters<T: Transformer + ?Sized>(
    t: &mut T,
    node: Parameters,
) -> Result<Parameters, T::Error> {
    Ok(Parameters {
        posonly: walk_param_list(t, node.posonly)?,
        args: walk_param_list(t, node.args)?,
        vararg: node.vararg.map(|p| t.transform_param(p)).transpose()?,
        kwonly: walk_param_list(t, node.kwonly)?,
        kwarg: node.kwarg.map(|p| t.transform_param(p)).transpose()?,
    })
}

fn walk_param_list<T: Transformer + ?Sized>(
    t: &mut T,
    params: Vec<Param>,
) -> Result<Vec<Param>, T::Error> {
    params.into_iter().map(|p| t.transform_param(p)).collect()
}

pub fn walk_param<T: Transformer + ?Sized>(t: &mut T, node: Param) -> Result<Param, T::Error> {
    Ok(Param {
        name: node.name,
        annotation: walk_optional(t, node.annotation)?,
        default: walk_optional(t, node.default)?,
    })
}

pub fn walk_class_def<T: Transformer + ?Sized>(
    t: &mut T,
    node: ClassDef,
) -> Result<ClassDef, T::Error> {
    Ok(ClassDef {
        decorators: walk_expressions(t, node.decorators)?,
        name: node.name,
        bases: walk_expressions(t, node.bases)?,
        keywords: walk_keywords(t, node.keywords)?,
        body: walk_statements(t, node.body)?,
    })
}

pub fn walk_if_stmt<T: Transformer + ?Sized>(t: &mut T, node: If) -> Result<If, T::Error> {
    Ok(If {
        test: t.transform_expression(node.test)?,
        body: walk_statements(t, node.body)?,
        orelse: walk_statements(t, node.orelse)?,
    })
}

pub fn walk_import_stmt<T: Transformer + ?Sized>(
    _t: &mut T,
    node: Import,
) -> Result<Import, T::Error> {
    Ok(node)
}

pub fn walk_import_from<T: Transformer + ?Sized>(
    _t: &mut T,
    node: ImportFrom,
) -> Result<ImportFrom, T::Error> {
    Ok(node)
}

pub fn walk_assign<T: Transformer + ?Sized>(t: &mut T, node: Assign) -> Result<Assign, T::Error> {
    Ok(Assign {
        targets: walk_expressions(t, node.targets)?,
        value: t.transform_expression(node.value)?,
    })
}

pub fn walk_ann_assign<T: Transformer + ?Sized>(
    t: &mut T,
    node: AnnAssign,
) -> Result<AnnAssign, T::Error> {
    Ok(AnnAssign {
        target: t.transform_expression(node.target)?,
        annotation: t.transform_expression(node.annotation)?,
        value: walk_optional(t, node.value)?,
        simple: node.simple,
    })
}

pub fn walk_expr<T: Transformer + ?Sized>(t: &mut T, node: Expr) -> Result<Expr, T::Error> {
    Ok(Expr {
        value: t.transform_expression(node.value)?,
    })
}

pub fn walk_return_stmt<T: Transformer + ?Sized>(
    t: &mut T,
    node: Return,
) -> Result<Return, T::Error> {
    Ok(Return {
        value: walk_optional(t, node.value)?,
    })
}

pub fn walk_expression<T: Transformer + ?Sized>(
    t: &mut T,
    node: Expression,
) -> Result<Expression, T::Error> {
    Ok(match node {
        Expression::Name(_) | Expression::Constant(_) => node,
        Expression::JoinedStr(parts) => Expression::JoinedStr(walk_fstring_parts(t, parts)?),
        Expression::Attribute { value, attr } => Expression::Attribute {
            value: walk_boxed(t, value)?,
            attr,
        },
        Expression::Subscript { value, slice } => Expression::Subscript {
            value: walk_boxed(t, value)?,
            slice: walk_boxed(t, slice)?,
        },
        Expression::Slice { lower, upper, step } => Expression::Slice {
            lower: walk_optional_boxed(t, lower)?,
            upper: walk_optional_boxed(t, upper)?,
            step: walk_optional_boxed(t, step)?,
        },
        Expression::Call {
            func,
            args,
            keywords,
        } => Expression::Call {
            func: walk_boxed(t, func)?,
            args: walk_expressions(t, args)?,
            keywords: walk_keywords(t, keywords)?,
        },
        Expression::Starred(value) => Expression::Starred(walk_boxed(t, value)?),
        Expression::Tuple(elts) => Expression::Tuple(walk_expressions(t, elts)?),
        Expression::List(elts) => Expression::List(walk_expressions(t, elts)?),
        Expression::Set(elts) => Expression::Set(walk_expressions(t, elts)?),
        Expression::Dict(items) => Expression::Dict(
            items
                .into_iter()
                .map(|item| -> Result<DictItem, T::Error> {
                    Ok(DictItem {
                        key: walk_optional(t, item.key)?,
                        value: t.transform_expression(item.value)?,
                    })
                })
                .collect::<Result<Vec<_>, T::Error>>()?,
        ),
        Expression::IfExp { test, body, orelse } => Expression::IfExp {
            body: walk_boxed(t, body)?,
            test: walk_boxed(t, test)?,
            orelse: walk_boxed(t, orelse)?,
        },
        Expression::BoolOp { op, values } => Expression::BoolOp {
            op,
            values: walk_expressions(t, values)?,
        },
        Expression::UnaryOp { op, operand } => Expression::UnaryOp {
            op,
            operand: walk_boxed(t, operand)?,
        },
        Expression::BinOp { left, op, right } => Expression::BinOp {
            left: walk_boxed(t, left)?,
            op,
            right: walk_boxed(t, right)?,
        },
        Expression::Compare { left, comparisons } => Expression::Compare {
            left: walk_boxed(t, left)?,
            comparisons: comparisons
                .into_iter()
                .map(|(op, e)| t.transform_expression(e).map(|e| (op, e)))
                .collect::<Result<Vec<_>, T::Error>>()?,
        },
    })
}
