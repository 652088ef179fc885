// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! PEG grammar over the token stream.
//!
//! Covers the statement and expression subset that appears in interface
//! stubs: definitions, imports, assignments, conditionals and the full
//! expression precedence ladder. Comprehensions, lambdas, `yield`, walrus
//! and control-flow statements other than `if`/`return`/`pass` are not
//! accepted.

use std::fmt;

use peg::{Parse, ParseElem, RuleResult};

use crate::nodes::{
    Alias, AnnAssign, Assign, BinOp, BoolOp, ClassDef, CmpOp, Constant, DictItem, Expr,
    Expression, FunctionDef, If, Import, ImportFrom, Keyword, Module, Param, Parameters, Return,
    Statement, UnaryOp,
};
use crate::parser::literal;
use crate::tokenizer::{TextPosition, TokType, Token};

pub type TokenRef<'input, 'a> = &'input Token<'a>;

#[derive(Debug)]
pub struct TokVec<'a>(Vec<Token<'a>>);

impl<'a> From<Vec<Token<'a>>> for TokVec<'a> {
    fn from(vec: Vec<Token<'a>>) -> Self {
        TokVec(vec)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ParseLoc {
    pub start_pos: TextPosition,
    pub end_pos: TextPosition,
}

impl fmt::Display for ParseLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.start_pos.fmt(f)
    }
}

impl<'a> Parse for TokVec<'a> {
    type PositionRepr = ParseLoc;

    fn start(&self) -> usize {
        0
    }

    fn is_eof(&self, pos: usize) -> bool {
        pos >= self.0.len()
    }

    fn position_repr(&self, pos: usize) -> Self::PositionRepr {
        match self.0.get(pos).or_else(|| self.0.last()) {
            Some(tok) => ParseLoc {
                start_pos: tok.start_pos,
                end_pos: tok.end_pos,
            },
            None => ParseLoc {
                start_pos: TextPosition::default(),
                end_pos: TextPosition::default(),
            },
        }
    }
}

impl<'input, 'a: 'input> ParseElem<'input> for TokVec<'a> {
    type Element = TokenRef<'input, 'a>;

    fn parse_elem(&'input self, pos: usize) -> RuleResult<Self::Element> {
        match self.0.get(pos) {
            Some(tok) => RuleResult::Matched(pos + 1, tok),
            None => RuleResult::Failed,
        }
    }
}

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

fn is_keyword(text: &str) -> bool {
    KEYWORDS.contains(&text)
}

peg::parser! {
    pub grammar stub_grammar<'a>() for TokVec<'a> {

        // Entry points

        pub rule file() -> Module
            = body:statement()* tok(TokType::EndMarker, "EOF") {
                Module { body: body.into_iter().flatten().collect() }
            }

        pub rule expression_input() -> Expression
            = e:star_expressions() tok(TokType::Newline, "NEWLINE")? tok(TokType::EndMarker, "EOF") { e }

        // Statements

        rule statement() -> Vec<Statement>
            = s:compound_stmt() { vec![s] }
            / simple_stmts()

        rule simple_stmts() -> Vec<Statement>
            = s:simple_stmt() ++ lit(";") lit(";")? tok(TokType::Newline, "NEWLINE") { s }

        rule simple_stmt() -> Statement
            = import_name()
            / import_from()
            / lit("pass") { Statement::Pass }
            / lit("return") value:star_expressions()? { Statement::Return(Return { value }) }
            / lit("(") target:name() lit(")") lit(":") annotation:expression()
              value:(lit("=") v:star_expressions() { v })? {
                Statement::AnnAssign(AnnAssign {
                    target: Expression::Name(target),
                    annotation,
                    value,
                    simple: false,
                })
            }
            / first:star_expressions() tail:statement_tail()? {? build_expression_statement(first, tail) }

        rule statement_tail() -> StatementTail
            = lit(":") annotation:expression() value:(lit("=") v:star_expressions() { v })? {
                StatementTail::Annotated { annotation, value }
            }
            / values:(lit("=") v:star_expressions() { v })+ { StatementTail::Assign(values) }

        rule compound_stmt() -> Statement
            = decorators:decorator()* d:definition() { with_decorators(decorators, d) }
            / if_stmt()

        rule decorator() -> Expression
            = lit("@") e:expression() tok(TokType::Newline, "NEWLINE") { e }

        rule definition() -> Statement
            = function_def()
            / class_def()

        rule function_def() -> Statement
            = is_async:lit("async")? lit("def") n:name() lit("(") params:parameters() lit(")")
              returns:(lit("->") e:expression() { e })? lit(":") body:block() {
                Statement::FunctionDef(FunctionDef {
                    decorators: Vec::new(),
                    is_async: is_async.is_some(),
                    name: n,
                    params,
                    returns,
                    body,
                })
            }

        rule parameters() -> Parameters
            = items:(i:param_item() ++ lit(",") lit(",")? { i })? {?
                build_parameters(items.unwrap_or_default())
            }

        rule param_item() -> ParamItem
            = lit("/") { ParamItem::Slash }
            / lit("**") p:param_no_default() { ParamItem::DoubleStar(p) }
            / lit("*") p:param_no_default()? { ParamItem::Star(p) }
            / p:param() { ParamItem::Param(p) }

        rule param() -> Param
            = n:name() annotation:annotation()? default:(lit("=") e:expression() { e })? {
                Param { name: n, annotation, default }
            }

        rule param_no_default() -> Param
            = n:name() annotation:annotation()? { Param { name: n, annotation, default: None } }

        rule annotation() -> Expression
            = lit(":") e:expression() { e }

        rule class_def() -> Statement
            = lit("class") n:name() arguments:(lit("(") a:arguments()? lit(")") { a })? lit(":")
              body:block() {
                let CallArguments { args, keywords } = arguments.flatten().unwrap_or_default();
                Statement::ClassDef(ClassDef {
                    decorators: Vec::new(),
                    name: n,
                    bases: args,
                    keywords,
                    body,
                })
            }

        rule block() -> Vec<Statement>
            = tok(TokType::Newline, "NEWLINE") tok(TokType::Indent, "INDENT") body:statement()+
              tok(TokType::Dedent, "DEDENT") { body.into_iter().flatten().collect() }
            / simple_stmts()

        rule if_stmt() -> Statement
            = lit("if") test:expression() lit(":") body:block() orelse:else_block()? {
                Statement::If(If { test, body, orelse: orelse.unwrap_or_default() })
            }

        rule else_block() -> Vec<Statement>
            = lit("elif") test:expression() lit(":") body:block() orelse:else_block()? {
                vec![Statement::If(If { test, body, orelse: orelse.unwrap_or_default() })]
            }
            / lit("else") lit(":") body:block() { body }

        rule import_name() -> Statement
            = lit("import") names:dotted_as_name() ++ lit(",") { Statement::Import(Import { names }) }

        rule dotted_as_name() -> Alias
            = n:dotted_name() asname:(lit("as") a:name() { a })? { Alias { name: n, asname } }

        rule dotted_name() -> String
            = parts:name() ++ lit(".") { parts.join(".") }

        rule import_from() -> Statement
            = lit("from") dots:import_dot()* module:dotted_name()? lit("import") names:import_targets() {?
                let level: usize = dots.iter().sum();
                if level == 0 && module.is_none() {
                    Err("module name")
                } else {
                    Ok(Statement::ImportFrom(ImportFrom { module, names, level }))
                }
            }

        rule import_dot() -> usize
            = lit(".") { 1 }
            / lit("...") { 3 }

        rule import_targets() -> Vec<Alias>
            = lit("(") names:import_as_name() ++ lit(",") lit(",")? lit(")") { names }
            / names:import_as_name() ++ lit(",") !lit(",") { names }
            / lit("*") { vec![Alias { name: "*".to_string(), asname: None }] }

        rule import_as_name() -> Alias
            = n:name() asname:(lit("as") a:name() { a })? { Alias { name: n, asname } }

        // Expressions

        rule star_expressions() -> Expression
            = first:star_expression() rest:(lit(",") e:star_expression() { e })* trailing:lit(",")? {
                make_tuple(first, rest, trailing.is_some())
            }

        rule star_expression() -> Expression
            = lit("*") e:bitwise_or() { Expression::Starred(Box::new(e)) }
            / expression()

        rule expression() -> Expression
            = body:disjunction() cond:(lit("if") t:disjunction() lit("else") o:expression() { (t, o) })? {
                match cond {
                    Some((test, orelse)) => Expression::IfExp {
                        test: Box::new(test),
                        body: Box::new(body),
                        orelse: Box::new(orelse),
                    },
                    None => body,
                }
            }

        rule disjunction() -> Expression
            = first:conjunction() rest:(lit("or") e:conjunction() { e })* { make_bool_op(BoolOp::Or, first, rest) }

        rule conjunction() -> Expression
            = first:inversion() rest:(lit("and") e:inversion() { e })* { make_bool_op(BoolOp::And, first, rest) }

        rule inversion() -> Expression
            = lit("not") e:inversion() { Expression::unary(UnaryOp::Not, e) }
            / comparison()

        rule comparison() -> Expression
            = left:bitwise_or() comparisons:(op:comp_op() e:bitwise_or() { (op, e) })* {
                if comparisons.is_empty() {
                    left
                } else {
                    Expression::Compare { left: Box::new(left), comparisons }
                }
            }

        rule comp_op() -> CmpOp
            = lit("not") lit("in") { CmpOp::NotIn }
            / lit("is") lit("not") { CmpOp::IsNot }
            / lit("==") { CmpOp::Eq }
            / lit("!=") { CmpOp::NotEq }
            / lit("<=") { CmpOp::LtE }
            / lit("<") { CmpOp::Lt }
            / lit(">=") { CmpOp::GtE }
            / lit(">") { CmpOp::Gt }
            / lit("in") { CmpOp::In }
            / lit("is") { CmpOp::Is }

        rule bitwise_or() -> Expression
            = first:bitwise_xor() rest:(lit("|") e:bitwise_xor() { (BinOp::BitOr, e) })* { fold_binary(first, rest) }

        rule bitwise_xor() -> Expression
            = first:bitwise_and() rest:(lit("^") e:bitwise_and() { (BinOp::BitXor, e) })* { fold_binary(first, rest) }

        rule bitwise_and() -> Expression
            = first:shift_expr() rest:(lit("&") e:shift_expr() { (BinOp::BitAnd, e) })* { fold_binary(first, rest) }

        rule shift_expr() -> Expression
            = first:sum() rest:(op:shift_op() e:sum() { (op, e) })* { fold_binary(first, rest) }

        rule shift_op() -> BinOp
            = lit("<<") { BinOp::LShift }
            / lit(">>") { BinOp::RShift }

        rule sum() -> Expression
            = first:term() rest:(op:sum_op() e:term() { (op, e) })* { fold_binary(first, rest) }

        rule sum_op() -> BinOp
            = lit("+") { BinOp::Add }
            / lit("-") { BinOp::Sub }

        rule term() -> Expression
            = first:factor() rest:(op:term_op() e:factor() { (op, e) })* { fold_binary(first, rest) }

        rule term_op() -> BinOp
            = lit("*") { BinOp::Mult }
            / lit("/") { BinOp::Div }
            / lit("//") { BinOp::FloorDiv }
            / lit("%") { BinOp::Mod }
            / lit("@") { BinOp::MatMult }

        rule factor() -> Expression
            = lit("+") e:factor() { Expression::unary(UnaryOp::UAdd, e) }
            / lit("-") e:factor() { Expression::unary(UnaryOp::USub, e) }
            / lit("~") e:factor() { Expression::unary(UnaryOp::Invert, e) }
            / power()

        rule power() -> Expression
            = base:primary() exp:(lit("**") e:factor() { e })? {
                match exp {
                    Some(e) => Expression::binary(base, BinOp::Pow, e),
                    None => base,
                }
            }

        rule primary() -> Expression
            = a:atom() trailers:trailer()* { apply_trailers(a, trailers) }

        rule trailer() -> Trailer
            = lit(".") n:name() { Trailer::Attribute(n) }
            / lit("(") a:arguments()? lit(")") { Trailer::Call(a.unwrap_or_default()) }
            / lit("[") s:slices() lit("]") { Trailer::Subscript(s) }

        rule slices() -> Expression
            = first:slice() rest:(lit(",") s:slice() { s })* trailing:lit(",")? {
                // `a[*b]` subscripts with a one-element tuple
                let starred = matches!(first, Expression::Starred(_));
                make_tuple(first, rest, trailing.is_some() || starred)
            }

        rule slice() -> Expression
            = lit("*") e:bitwise_or() { Expression::Starred(Box::new(e)) }
            / lower:expression()? tail:slice_tail()? {? make_slice(lower, tail) }

        rule slice_tail() -> (Option<Expression>, Option<Expression>)
            = lit(":") upper:expression()? step:(lit(":") s:expression()? { s })? { (upper, step.flatten()) }

        rule arguments() -> CallArguments
            = items:call_arg() ++ lit(",") lit(",")? {? build_arguments(items) }

        rule call_arg() -> CallArg
            = lit("**") e:expression() { CallArg::Keyword(Keyword { arg: None, value: e }) }
            / lit("*") e:expression() { CallArg::Positional(Expression::Starred(Box::new(e))) }
            / n:name() lit("=") e:expression() { CallArg::Keyword(Keyword { arg: Some(n), value: e }) }
            / e:expression() { CallArg::Positional(e) }

        rule atom() -> Expression
            = n:name() { Expression::Name(n) }
            / lit("None") { Expression::Constant(Constant::None) }
            / lit("True") { Expression::Constant(Constant::True) }
            / lit("False") { Expression::Constant(Constant::False) }
            / parts:tok(TokType::String, "STRING")+ {?
                let texts: Vec<&str> = parts.iter().map(|t| t.string).collect();
                literal::concatenate(&texts)
            }
            / t:tok(TokType::Number, "NUMBER") {? literal::parse_number(t.string).map(Expression::Constant) }
            / lit("...") { Expression::Constant(Constant::Ellipsis) }
            / lit("(") lit(")") { Expression::Tuple(Vec::new()) }
            / lit("(") first:star_expression() rest:(lit(",") e:star_expression() { e })* trailing:lit(",")? lit(")") {?
                if rest.is_empty() && trailing.is_none() && matches!(first, Expression::Starred(_)) {
                    Err("starred expression in parentheses")
                } else {
                    Ok(make_tuple(first, rest, trailing.is_some()))
                }
            }
            / lit("[") lit("]") { Expression::List(Vec::new()) }
            / lit("[") elts:star_expression() ++ lit(",") lit(",")? lit("]") { Expression::List(elts) }
            / lit("{") lit("}") { Expression::Dict(Vec::new()) }
            / lit("{") items:dict_or_set_item() ++ lit(",") lit(",")? lit("}") {? build_dict_or_set(items) }

        rule dict_or_set_item() -> DictOrSetItem
            = lit("**") e:bitwise_or() { DictOrSetItem::Unpack(e) }
            / lit("*") e:bitwise_or() { DictOrSetItem::Element(Expression::Starred(Box::new(e))) }
            / k:expression() v:(lit(":") v:expression() { v })? {
                match v {
                    Some(v) => DictOrSetItem::Pair(k, v),
                    None => DictOrSetItem::Element(k),
                }
            }

        // Tokens

        rule name() -> String
            = t:tok(TokType::Name, "NAME") {?
                if is_keyword(t.string) { Err("NAME") } else { Ok(t.string.to_string()) }
            }

        rule tok(ty: TokType, err: &'static str) -> TokenRef<'input, 'a>
            = [t] {? if t.r#type == ty { Ok(t) } else { Err(err) } }

        rule lit(lit: &'static str) -> TokenRef<'input, 'a>
            = [t] {? if t.string == lit { Ok(t) } else { Err(lit) } }
    }
}

// ============================================================================
// Grammar helpers
// ============================================================================

/// What follows the first expression of an expression statement.
enum StatementTail {
    Annotated {
        annotation: Expression,
        value: Option<Expression>,
    },
    Assign(Vec<Expression>),
}

enum ParamItem {
    Slash,
    Star(Option<Param>),
    DoubleStar(Param),
    Param(Param),
}

#[derive(Default)]
struct CallArguments {
    args: Vec<Expression>,
    keywords: Vec<Keyword>,
}

enum CallArg {
    Positional(Expression),
    Keyword(Keyword),
}

enum Trailer {
    Attribute(String),
    Call(CallArguments),
    Subscript(Expression),
}

enum DictOrSetItem {
    Unpack(Expression),
    Element(Expression),
    Pair(Expression, Expression),
}

fn build_expression_statement(
    first: Expression,
    tail: Option<StatementTail>,
) -> Result<Statement, &'static str> {
    match tail {
        None => Ok(Statement::Expr(Expr { value: first })),
        Some(StatementTail::Annotated { annotation, value }) => {
            let simple = match &first {
                Expression::Name(_) => true,
                Expression::Attribute { .. } | Expression::Subscript { .. } => false,
                _ => return Err("annotated assignment target"),
            };
            Ok(Statement::AnnAssign(AnnAssign {
                target: first,
                annotation,
                value,
                simple,
            }))
        }
        Some(StatementTail::Assign(mut values)) => {
            let value = values.pop().ok_or("assignment value")?;
            let mut targets = Vec::with_capacity(values.len() + 1);
            targets.push(first);
            targets.extend(values);
            if !targets.iter().all(Expression::is_assignable) {
                return Err("assignment target");
            }
            Ok(Statement::Assign(Assign { targets, value }))
        }
    }
}

fn with_decorators(decorators: Vec<Expression>, mut stmt: Statement) -> Statement {
    match &mut stmt {
        Statement::FunctionDef(def) => def.decorators = decorators,
        Statement::ClassDef(def) => def.decorators = decorators,
        _ => {}
    }
    stmt
}

fn build_parameters(items: Vec<ParamItem>) -> Result<Parameters, &'static str> {
    let mut params = Parameters::default();
    let mut seen_slash = false;
    let mut seen_star = false;
    let mut bare_star = false;
    let mut seen_default = false;
    let mut seen_kwarg = false;

    for item in items {
        if seen_kwarg {
            return Err("no parameters after **kwargs");
        }
        match item {
            ParamItem::Slash => {
                if seen_slash || seen_star || params.args.is_empty() {
                    return Err("/ after positional parameters");
                }
                seen_slash = true;
                params.posonly = std::mem::take(&mut params.args);
            }
            ParamItem::Star(vararg) => {
                if seen_star {
                    return Err("* only once");
                }
                seen_star = true;
                bare_star = vararg.is_none();
                params.vararg = vararg;
            }
            ParamItem::DoubleStar(kwarg) => {
                params.kwarg = Some(kwarg);
                seen_kwarg = true;
            }
            ParamItem::Param(param) => {
                if seen_star {
                    params.kwonly.push(param);
                    continue;
                }
                if param.default.is_some() {
                    seen_default = true;
                } else if seen_default {
                    return Err("default for parameter following a default");
                }
                params.args.push(param);
            }
        }
    }

    if bare_star && params.kwonly.is_empty() {
        return Err("named parameters after bare *");
    }
    Ok(params)
}

fn build_arguments(items: Vec<CallArg>) -> Result<CallArguments, &'static str> {
    let mut result = CallArguments::default();
    for item in items {
        match item {
            CallArg::Positional(expr) => {
                let starred = matches!(expr, Expression::Starred(_));
                if !result.keywords.is_empty()
                    && (!starred || result.keywords.iter().any(|k| k.arg.is_none()))
                {
                    return Err("positional argument before keyword arguments");
                }
                result.args.push(expr);
            }
            CallArg::Keyword(keyword) => result.keywords.push(keyword),
        }
    }
    Ok(result)
}

fn make_tuple(first: Expression, rest: Vec<Expression>, trailing_comma: bool) -> Expression {
    if rest.is_empty() && !trailing_comma {
        return first;
    }
    let mut elts = Vec::with_capacity(rest.len() + 1);
    elts.push(first);
    elts.extend(rest);
    Expression::Tuple(elts)
}

fn make_bool_op(op: BoolOp, first: Expression, rest: Vec<Expression>) -> Expression {
    if rest.is_empty() {
        return first;
    }
    let mut values = Vec::with_capacity(rest.len() + 1);
    values.push(first);
    values.extend(rest);
    Expression::BoolOp { op, values }
}

fn fold_binary(first: Expression, rest: Vec<(BinOp, Expression)>) -> Expression {
    rest.into_iter()
        .fold(first, |left, (op, right)| Expression::binary(left, op, right))
}

fn make_slice(
    lower: Option<Expression>,
    tail: Option<(Option<Expression>, Option<Expression>)>,
) -> Result<Expression, &'static str> {
    match (lower, tail) {
        (Some(expr), None) => Ok(expr),
        (None, None) => Err("slice"),
        (lower, Some((upper, step))) => Ok(Expression::Slice {
            lower: lower.map(Box::new),
            upper: upper.map(Box::new),
            step: step.map(Box::new),
        }),
    }
}

fn apply_trailers(atom: Expression, trailers: Vec<Trailer>) -> Expression {
    trailers
        .into_iter()
        .fold(atom, |value, trailer| match trailer {
            Trailer::Attribute(attr) => Expression::attribute(value, attr),
            Trailer::Call(CallArguments { args, keywords }) => Expression::Call {
                func: Box::new(value),
                args,
                keywords,
            },
            Trailer::Subscript(slice) => Expression::subscript(value, slice),
        })
}

fn build_dict_or_set(items: Vec<DictOrSetItem>) -> Result<Expression, &'static str> {
    if items
        .iter()
        .all(|item| matches!(item, DictOrSetItem::Element(_)))
    {
        let elts = items
            .into_iter()
            .filter_map(|item| match item {
                DictOrSetItem::Element(e) => Some(e),
                _ => None,
            })
            .collect();
        return Ok(Expression::Set(elts));
    }

    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        match item {
            DictOrSetItem::Pair(key, value) => entries.push(DictItem {
                key: Some(key),
                value,
            }),
            DictOrSetItem::Unpack(value) => entries.push(DictItem { key: None, value }),
            DictOrSetItem::Element(_) => return Err("':'"),
        }
    }
    Ok(Expression::Dict(entries))
}
