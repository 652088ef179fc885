// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Module and statement nodes.

use super::codegen::{docstring_literal, Codegen, CodegenState, Precedence};
use super::expression::{Constant, Expression, Keyword};

/// A parsed stub file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub body: Vec<Statement>,
}

/// A statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    FunctionDef(FunctionDef),
    ClassDef(ClassDef),
    If(If),
    Import(Import),
    ImportFrom(ImportFrom),
    Assign(Assign),
    AnnAssign(AnnAssign),
    Expr(Expr),
    Return(Return),
    Pass,
}

/// `def name(params) -> returns: body`, optionally `async`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub decorators: Vec<Expression>,
    pub is_async: bool,
    pub name: String,
    pub params: Parameters,
    pub returns: Option<Expression>,
    pub body: Vec<Statement>,
}

/// The parameter list of a function.
///
/// Positional defaults are stored on each [`Param`] rather than in a
/// separate list aligned to the end.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Parameters {
    /// Parameters before `/`.
    pub posonly: Vec<Param>,
    /// Regular positional-or-keyword parameters.
    pub args: Vec<Param>,
    /// `*args`
    pub vararg: Option<Param>,
    /// Parameters after `*` or `*args`.
    pub kwonly: Vec<Param>,
    /// `**kwargs`
    pub kwarg: Option<Param>,
}

impl Parameters {
    /// Whether the function takes no parameters at all.
    pub fn is_empty(&self) -> bool {
        self.posonly.is_empty()
            && self.args.is_empty()
            && self.vararg.is_none()
            && self.kwonly.is_empty()
            && self.kwarg.is_none()
    }
}

/// A single parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub annotation: Option<Expression>,
    pub default: Option<Expression>,
}

/// `class name(bases, keywords): body`
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub decorators: Vec<Expression>,
    pub name: String,
    pub bases: Vec<Expression>,
    pub keywords: Vec<Keyword>,
    pub body: Vec<Statement>,
}

/// `if test: body else: orelse`; `elif` is an `If` alone in `orelse`.
#[derive(Debug, Clone, PartialEq)]
pub struct If {
    pub test: Expression,
    pub body: Vec<Statement>,
    pub orelse: Vec<Statement>,
}

/// `import a.b as c, d`
#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub names: Vec<Alias>,
}

impl Import {
    /// A plain `import name` statement.
    pub fn single(name: impl Into<String>) -> Self {
        Import {
            names: vec![Alias {
                name: name.into(),
                asname: None,
            }],
        }
    }
}

/// `from ..module import a as b`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportFrom {
    pub module: Option<String>,
    pub names: Vec<Alias>,
    /// Number of leading dots.
    pub level: usize,
}

/// An imported name with optional alias.
#[derive(Debug, Clone, PartialEq)]
pub struct Alias {
    pub name: String,
    pub asname: Option<String>,
}

/// `t1 = t2 = value`
#[derive(Debug, Clone, PartialEq)]
pub struct Assign {
    pub targets: Vec<Expression>,
    pub value: Expression,
}

/// `target: annotation = value`
#[derive(Debug, Clone, PartialEq)]
pub struct AnnAssign {
    pub target: Expression,
    pub annotation: Expression,
    pub value: Option<Expression>,
    /// False when the target is a parenthesised name such as `(x): int`.
    pub simple: bool,
}

/// An expression used as a statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub value: Expression,
}

/// `return value`
#[derive(Debug, Clone, PartialEq)]
pub struct Return {
    pub value: Option<Expression>,
}

// ============================================================================
// Codegen
// ============================================================================

impl Codegen for Module {
    fn codegen(&self, state: &mut CodegenState) {
        body_codegen(&self.body, state);
    }
}

/// The string of a leading docstring statement, if any.
fn docstring(body: &[Statement]) -> Option<(&str, bool)> {
    match body.first() {
        Some(Statement::Expr(Expr {
            value:
                Expression::Constant(Constant::Str {
                    value,
                    unicode_prefix,
                }),
        })) => Some((value.as_str(), *unicode_prefix)),
        _ => None,
    }
}

/// Write a module, class or function body, giving a docstring its literal form.
fn body_codegen(body: &[Statement], state: &mut CodegenState) {
    let rest = match docstring(body) {
        Some((value, unicode_prefix)) => {
            state.fill(if unicode_prefix { "u" } else { "" });
            state.add_token(&docstring_literal(value));
            &body[1..]
        }
        None => body,
    };
    for stmt in rest {
        stmt.codegen(state);
    }
}

fn block_codegen(body: &[Statement], state: &mut CodegenState) {
    state.add_token(":");
    state.indent();
    for stmt in body {
        stmt.codegen(state);
    }
    state.dedent();
}

fn decorators_codegen(decorators: &[Expression], state: &mut CodegenState) {
    state.maybe_newline();
    for decorator in decorators {
        state.fill("@");
        decorator.codegen(state);
    }
}

impl Codegen for Statement {
    fn codegen(&self, state: &mut CodegenState) {
        match self {
            Statement::FunctionDef(def) => def.codegen(state),
            Statement::ClassDef(def) => def.codegen(state),
            Statement::If(stmt) => stmt.codegen(state),
            Statement::Import(stmt) => stmt.codegen(state),
            Statement::ImportFrom(stmt) => stmt.codegen(state),
            Statement::Assign(stmt) => stmt.codegen(state),
            Statement::AnnAssign(stmt) => stmt.codegen(state),
            Statement::Expr(stmt) => stmt.codegen(state),
            Statement::Return(stmt) => stmt.codegen(state),
            Statement::Pass => state.fill("pass"),
        }
    }
}

impl Codegen for FunctionDef {
    fn codegen(&self, state: &mut CodegenState) {
        decorators_codegen(&self.decorators, state);
        state.fill(if self.is_async { "async def " } else { "def " });
        state.add_token(&self.name);
        state.add_token("(");
        self.params.codegen(state);
        state.add_token(")");
        if let Some(returns) = &self.returns {
            state.add_token(" -> ");
            returns.codegen(state);
        }
        state.add_token(":");
        state.indent();
        body_codegen(&self.body, state);
        state.dedent();
    }
}

impl Codegen for Param {
    fn codegen(&self, state: &mut CodegenState) {
        state.add_token(&self.name);
        if let Some(annotation) = &self.annotation {
            state.add_token(": ");
            annotation.codegen(state);
        }
    }
}

fn param_with_default(param: &Param, state: &mut CodegenState) {
    param.codegen(state);
    if let Some(default) = &param.default {
        state.add_token("=");
        default.codegen(state);
    }
}

impl Codegen for Parameters {
    fn codegen(&self, state: &mut CodegenState) {
        let mut first = true;
        let mut separator = |state: &mut CodegenState| {
            if first {
                first = false;
            } else {
                state.add_token(", ");
            }
        };

        for (index, param) in self.posonly.iter().chain(&self.args).enumerate() {
            separator(state);
            param_with_default(param, state);
            if index + 1 == self.posonly.len() {
                state.add_token(", /");
            }
        }

        if self.vararg.is_some() || !self.kwonly.is_empty() {
            separator(state);
            state.add_token("*");
            if let Some(vararg) = &self.vararg {
                vararg.codegen(state);
            }
        }

        for param in &self.kwonly {
            state.add_token(", ");
            param_with_default(param, state);
        }

        if let Some(kwarg) = &self.kwarg {
            separator(state);
            state.add_token("**");
            kwarg.codegen(state);
        }
    }
}

impl Codegen for ClassDef {
    fn codegen(&self, state: &mut CodegenState) {
        decorators_codegen(&self.decorators, state);
        state.fill("class ");
        state.add_token(&self.name);
        if !self.bases.is_empty() || !self.keywords.is_empty() {
            state.add_token("(");
            let mut first = true;
            for base in &self.bases {
                if !first {
                    state.add_token(", ");
                }
                first = false;
                base.codegen(state);
            }
            for keyword in &self.keywords {
                if !first {
                    state.add_token(", ");
                }
                first = false;
                keyword.codegen(state);
            }
            state.add_token(")");
        }
        state.add_token(":");
        state.indent();
        body_codegen(&self.body, state);
        state.dedent();
    }
}

impl Codegen for If {
    fn codegen(&self, state: &mut CodegenState) {
        state.fill("if ");
        self.test.codegen(state);
        block_codegen(&self.body, state);

        let mut node = self;
        // Collapse a lone nested `if` in the else branch into `elif`.
        while let [Statement::If(inner)] = node.orelse.as_slice() {
            node = inner;
            state.fill("elif ");
            node.test.codegen(state);
            block_codegen(&node.body, state);
        }
        if !node.orelse.is_empty() {
            state.fill("else");
            block_codegen(&node.orelse, state);
        }
    }
}

impl Codegen for Alias {
    fn codegen(&self, state: &mut CodegenState) {
        state.add_token(&self.name);
        if let Some(asname) = &self.asname {
            state.add_token(" as ");
            state.add_token(asname);
        }
    }
}

fn aliases_codegen(names: &[Alias], state: &mut CodegenState) {
    for (i, alias) in names.iter().enumerate() {
        if i > 0 {
            state.add_token(", ");
        }
        alias.codegen(state);
    }
}

impl Codegen for Import {
    fn codegen(&self, state: &mut CodegenState) {
        state.fill("import ");
        aliases_codegen(&self.names, state);
    }
}

impl Codegen for ImportFrom {
    fn codegen(&self, state: &mut CodegenState) {
        state.fill("from ");
        state.add_token(&".".repeat(self.level));
        if let Some(module) = &self.module {
            state.add_token(module);
        }
        state.add_token(" import ");
        aliases_codegen(&self.names, state);
    }
}

impl Codegen for Assign {
    fn codegen(&self, state: &mut CodegenState) {
        state.fill("");
        for target in &self.targets {
            target.codegen_in(state, Precedence::Tuple);
            state.add_token(" = ");
        }
        self.value.codegen(state);
    }
}

impl Codegen for AnnAssign {
    fn codegen(&self, state: &mut CodegenState) {
        state.fill("");
        let parens = !self.simple && matches!(self.target, Expression::Name(_));
        if parens {
            state.add_token("(");
        }
        self.target.codegen(state);
        if parens {
            state.add_token(")");
        }
        state.add_token(": ");
        self.annotation.codegen(state);
        if let Some(value) = &self.value {
            state.add_token(" = ");
            value.codegen(state);
        }
    }
}

impl Codegen for Expr {
    fn codegen(&self, state: &mut CodegenState) {
        state.fill("");
        self.value.codegen_in(state, Precedence::Yield);
    }
}

impl Codegen for Return {
    fn codegen(&self, state: &mut CodegenState) {
        state.fill("return");
        if let Some(value) = &self.value {
            state.add_token(" ");
            value.codegen(state);
        }
    }
}
