// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Expression nodes.

use super::codegen::{
    bytes_repr, float_repr, str_avoiding_backslashes, str_literal_helper, str_repr, Codegen,
    CodegenState, Precedence, ALL_QUOTES,
};

/// A Python expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// An identifier, e.g. `int`.
    Name(String),
    /// A literal value.
    Constant(Constant),
    /// An f-string, or a run of adjacent strings that includes one.
    JoinedStr(Vec<FStringPart>),
    /// `value.attr`
    Attribute {
        value: Box<Expression>,
        attr: String,
    },
    /// `value[slice]`; a multi-element subscript has a [`Expression::Tuple`] slice.
    Subscript {
        value: Box<Expression>,
        slice: Box<Expression>,
    },
    /// `lower:upper:step` inside a subscript.
    Slice {
        lower: Option<Box<Expression>>,
        upper: Option<Box<Expression>>,
        step: Option<Box<Expression>>,
    },
    /// `func(args, keywords)`
    Call {
        func: Box<Expression>,
        args: Vec<Expression>,
        keywords: Vec<Keyword>,
    },
    /// `*value`
    Starred(Box<Expression>),
    /// `(a, b)` or `a, b`
    Tuple(Vec<Expression>),
    /// `[a, b]`
    List(Vec<Expression>),
    /// `{a, b}`
    Set(Vec<Expression>),
    /// `{k: v, **rest}`
    Dict(Vec<DictItem>),
    /// `body if test else orelse`
    IfExp {
        test: Box<Expression>,
        body: Box<Expression>,
        orelse: Box<Expression>,
    },
    /// `a or b or c`
    BoolOp { op: BoolOp, values: Vec<Expression> },
    /// `not x`, `-x`, `+x`, `~x`
    UnaryOp {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    /// `left op right`
    BinOp {
        left: Box<Expression>,
        op: BinOp,
        right: Box<Expression>,
    },
    /// `left op1 c1 op2 c2 ...`
    Compare {
        left: Box<Expression>,
        comparisons: Vec<(CmpOp, Expression)>,
    },
}

impl Expression {
    /// Create a name expression.
    pub fn name(id: impl Into<String>) -> Self {
        Expression::Name(id.into())
    }

    /// Create an attribute access `value.attr`.
    pub fn attribute(value: Expression, attr: impl Into<String>) -> Self {
        Expression::Attribute {
            value: Box::new(value),
            attr: attr.into(),
        }
    }

    /// Create a subscript `value[slice]`.
    pub fn subscript(value: Expression, slice: Expression) -> Self {
        Expression::Subscript {
            value: Box::new(value),
            slice: Box::new(slice),
        }
    }

    /// Create a binary operation.
    pub fn binary(left: Expression, op: BinOp, right: Expression) -> Self {
        Expression::BinOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Create a unary operation.
    pub fn unary(op: UnaryOp, operand: Expression) -> Self {
        Expression::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    /// Create a string constant.
    pub fn string(value: impl Into<String>) -> Self {
        Expression::Constant(Constant::Str {
            value: value.into(),
            unicode_prefix: false,
        })
    }

    /// Whether this expression may appear as an assignment target.
    pub fn is_assignable(&self) -> bool {
        match self {
            Expression::Name(_) | Expression::Attribute { .. } | Expression::Subscript { .. } => {
                true
            }
            Expression::Starred(inner) => inner.is_assignable(),
            Expression::Tuple(elts) | Expression::List(elts) => {
                elts.iter().all(Expression::is_assignable)
            }
            _ => false,
        }
    }
}

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    None,
    True,
    False,
    /// `...`
    Ellipsis,
    /// An integer, normalised to decimal digits.
    Int(String),
    Float(f64),
    /// An imaginary literal; the value is the imaginary part.
    Complex(f64),
    /// A string; `unicode_prefix` records a leading `u` prefix.
    Str { value: String, unicode_prefix: bool },
    Bytes(Vec<u8>),
}

/// A piece of an f-string.
#[derive(Debug, Clone, PartialEq)]
pub enum FStringPart {
    /// Text outside replacement fields, with escapes and `{{`/`}}` decoded.
    Literal(String),
    Field(FormattedValue),
}

/// A replacement field `{value!conversion:format_spec}`.
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedValue {
    pub value: Box<Expression>,
    /// One of `s`, `r` or `a`.
    pub conversion: Option<char>,
    pub format_spec: Option<Vec<FStringPart>>,
}

/// A keyword argument `arg=value`, or `**value` when `arg` is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    pub arg: Option<String>,
    pub value: Expression,
}

/// A dictionary entry `key: value`, or `**value` when `key` is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct DictItem {
    pub key: Option<Expression>,
    pub value: Expression,
}

/// Boolean operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolOp {
    And,
    Or,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Invert,
    UAdd,
    USub,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mult,
    MatMult,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

impl BoolOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoolOp::And => "and",
            BoolOp::Or => "or",
        }
    }
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Not => "not",
            UnaryOp::Invert => "~",
            UnaryOp::UAdd => "+",
            UnaryOp::USub => "-",
        }
    }
}

impl BinOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mult => "*",
            BinOp::MatMult => "@",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::LShift => "<<",
            BinOp::RShift => ">>",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::BitAnd => "&",
        }
    }
}

impl CmpOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::NotEq => "!=",
            CmpOp::Lt => "<",
            CmpOp::LtE => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtE => ">=",
            CmpOp::Is => "is",
            CmpOp::IsNot => "is not",
            CmpOp::In => "in",
            CmpOp::NotIn => "not in",
        }
    }
}

impl BinOp {
    fn precedence(&self) -> Precedence {
        match self {
            BinOp::Add | BinOp::Sub => Precedence::Arith,
            BinOp::Mult | BinOp::MatMult | BinOp::Div | BinOp::FloorDiv | BinOp::Mod => {
                Precedence::Term
            }
            BinOp::Pow => Precedence::Power,
            BinOp::LShift | BinOp::RShift => Precedence::Shift,
            BinOp::BitOr => Precedence::Expr,
            BinOp::BitXor => Precedence::BitXor,
            BinOp::BitAnd => Precedence::BitAnd,
        }
    }
}

// ============================================================================
// Codegen
// ============================================================================

impl Codegen for Constant {
    fn codegen(&self, state: &mut CodegenState) {
        match self {
            Constant::None => state.add_token("None"),
            Constant::True => state.add_token("True"),
            Constant::False => state.add_token("False"),
            Constant::Ellipsis => state.add_token("..."),
            Constant::Int(digits) => state.add_token(digits),
            Constant::Float(value) => state.add_token(&float_repr(*value, false)),
            Constant::Complex(value) => state.add_token(&float_repr(*value, true)),
            Constant::Str {
                value,
                unicode_prefix,
            } => {
                if *unicode_prefix {
                    state.add_token("u");
                }
                if state.avoids_backslashes() {
                    state.add_token(&str_avoiding_backslashes(value));
                } else {
                    state.add_token(&str_repr(value));
                }
            }
            Constant::Bytes(value) => state.add_token(&bytes_repr(value)),
        }
    }
}

impl Codegen for Keyword {
    fn codegen(&self, state: &mut CodegenState) {
        match &self.arg {
            Some(arg) => {
                state.add_token(arg);
                state.add_token("=");
            }
            None => state.add_token("**"),
        }
        self.value.codegen(state);
    }
}

impl Codegen for Expression {
    fn codegen(&self, state: &mut CodegenState) {
        self.codegen_in(state, Precedence::Test);
    }
}

fn interleave(state: &mut CodegenState, elts: &[Expression]) {
    for (i, elt) in elts.iter().enumerate() {
        if i > 0 {
            state.add_token(", ");
        }
        elt.codegen(state);
    }
}

/// Comma-separated items; a single item keeps its trailing comma.
fn items_view(state: &mut CodegenState, elts: &[Expression]) {
    if let [only] = elts {
        only.codegen(state);
        state.add_token(",");
    } else {
        interleave(state, elts);
    }
}

/// F-string pieces as they appear between the quotes, before quoting.
fn fstring_body(parts: &[FStringPart]) -> String {
    parts
        .iter()
        .map(|part| match part {
            FStringPart::Literal(text) => escape_braces(text),
            FStringPart::Field(field) => field.source(),
        })
        .collect()
}

fn escape_braces(text: &str) -> String {
    text.replace('{', "{{").replace('}', "}}")
}

impl FormattedValue {
    fn source(&self) -> String {
        let mut inner = CodegenState::for_fstring_field();
        self.value.codegen_in(&mut inner, Precedence::Test.next());
        let expr = inner.into_string();

        let mut out = String::from("{");
        // `{{` would read as an escaped brace
        if expr.starts_with('{') {
            out.push(' ');
        }
        out.push_str(&expr);
        if let Some(conversion) = self.conversion {
            out.push('!');
            out.push(conversion);
        }
        if let Some(spec) = &self.format_spec {
            out.push(':');
            out.push_str(&fstring_body(spec));
        }
        out.push('}');
        out
    }
}

/// Write an f-string, narrowing the quote style piece by piece so literal
/// text keeps escaped whitespace and fields keep their own quotes.
fn joined_str(state: &mut CodegenState, parts: &[FStringPart]) {
    state.add_token("f");
    if state.avoids_backslashes() {
        state.add_token(&str_avoiding_backslashes(&fstring_body(parts)));
        return;
    }

    let mut quote_types: Vec<&'static str> = ALL_QUOTES.to_vec();
    let mut body = String::new();
    for part in parts {
        let (text, is_literal) = match part {
            FStringPart::Literal(text) => (escape_braces(text), true),
            FStringPart::Field(field) => (field.source(), false),
        };
        let (escaped, narrowed) = str_literal_helper(&text, &quote_types, is_literal);
        body.push_str(&escaped);
        quote_types = narrowed;
    }
    let quote = quote_types[0];
    state.add_token(quote);
    state.add_token(&body);
    state.add_token(quote);
}

fn open_paren_if(state: &mut CodegenState, condition: bool) {
    if condition {
        state.add_token("(");
    }
}

fn close_paren_if(state: &mut CodegenState, condition: bool) {
    if condition {
        state.add_token(")");
    }
}

impl Expression {
    /// Write this expression where the surrounding context binds at `context`.
    pub fn codegen_in(&self, state: &mut CodegenState, context: Precedence) {
        match self {
            Expression::Name(id) => state.add_token(id),
            Expression::Constant(constant) => constant.codegen(state),
            Expression::JoinedStr(parts) => joined_str(state, parts),
            Expression::Attribute { value, attr } => {
                value.codegen_in(state, Precedence::Atom);
                // `1.real` would lex as a float.
                if matches!(
                    **value,
                    Expression::Constant(Constant::Int(_) | Constant::True | Constant::False)
                ) {
                    state.add_token(" ");
                }
                state.add_token(".");
                state.add_token(attr);
            }
            Expression::Subscript { value, slice } => {
                value.codegen_in(state, Precedence::Atom);
                state.add_token("[");
                match &**slice {
                    Expression::Tuple(elts) if !elts.is_empty() => items_view(state, elts),
                    other => other.codegen(state),
                }
                state.add_token("]");
            }
            Expression::Slice { lower, upper, step } => {
                if let Some(lower) = lower {
                    lower.codegen(state);
                }
                state.add_token(":");
                if let Some(upper) = upper {
                    upper.codegen(state);
                }
                if let Some(step) = step {
                    state.add_token(":");
                    step.codegen(state);
                }
            }
            Expression::Call {
                func,
                args,
                keywords,
            } => {
                func.codegen_in(state, Precedence::Atom);
                state.add_token("(");
                interleave(state, args);
                for (i, keyword) in keywords.iter().enumerate() {
                    if i > 0 || !args.is_empty() {
                        state.add_token(", ");
                    }
                    keyword.codegen(state);
                }
                state.add_token(")");
            }
            Expression::Starred(value) => {
                state.add_token("*");
                value.codegen_in(state, Precedence::Expr);
            }
            Expression::Tuple(elts) => {
                let parens = elts.is_empty() || context > Precedence::Tuple;
                open_paren_if(state, parens);
                items_view(state, elts);
                close_paren_if(state, parens);
            }
            Expression::List(elts) => {
                state.add_token("[");
                interleave(state, elts);
                state.add_token("]");
            }
            Expression::Set(elts) => {
                if elts.is_empty() {
                    state.add_token("{*()}");
                } else {
                    state.add_token("{");
                    interleave(state, elts);
                    state.add_token("}");
                }
            }
            Expression::Dict(items) => {
                state.add_token("{");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        state.add_token(", ");
                    }
                    match &item.key {
                        Some(key) => {
                            key.codegen(state);
                            state.add_token(": ");
                            item.value.codegen(state);
                        }
                        None => {
                            state.add_token("**");
                            item.value.codegen_in(state, Precedence::Expr);
                        }
                    }
                }
                state.add_token("}");
            }
            Expression::IfExp { test, body, orelse } => {
                let parens = context > Precedence::Test;
                open_paren_if(state, parens);
                body.codegen_in(state, Precedence::Test.next());
                state.add_token(" if ");
                test.codegen_in(state, Precedence::Test.next());
                state.add_token(" else ");
                orelse.codegen_in(state, Precedence::Test);
                close_paren_if(state, parens);
            }
            Expression::BoolOp { op, values } => {
                let own = match op {
                    BoolOp::And => Precedence::And,
                    BoolOp::Or => Precedence::Or,
                };
                let parens = context > own;
                open_paren_if(state, parens);
                // Each operand binds one level tighter than the one before.
                let mut level = own;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        state.add_token(" ");
                        state.add_token(op.as_str());
                        state.add_token(" ");
                    }
                    level = level.next();
                    value.codegen_in(state, level);
                }
                close_paren_if(state, parens);
            }
            Expression::UnaryOp { op, operand } => {
                let own = match op {
                    UnaryOp::Not => Precedence::Not,
                    _ => Precedence::Factor,
                };
                let parens = context > own;
                open_paren_if(state, parens);
                state.add_token(op.as_str());
                if own != Precedence::Factor {
                    state.add_token(" ");
                }
                operand.codegen_in(state, own);
                close_paren_if(state, parens);
            }
            Expression::BinOp { left, op, right } => {
                let own = op.precedence();
                let parens = context > own;
                let (left_level, right_level) = if *op == BinOp::Pow {
                    (own.next(), own)
                } else {
                    (own, own.next())
                };
                open_paren_if(state, parens);
                left.codegen_in(state, left_level);
                state.add_token(" ");
                state.add_token(op.as_str());
                state.add_token(" ");
                right.codegen_in(state, right_level);
                close_paren_if(state, parens);
            }
            Expression::Compare { left, comparisons } => {
                let parens = context > Precedence::Cmp;
                open_paren_if(state, parens);
                left.codegen_in(state, Precedence::Cmp.next());
                for (op, comparator) in comparisons {
                    state.add_token(" ");
                    state.add_token(op.as_str());
                    state.add_token(" ");
                    comparator.codegen_in(state, Precedence::Cmp.next());
                }
                close_paren_if(state, parens);
            }
        }
    }
}
