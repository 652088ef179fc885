// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Code generation back to Python source.
//!
//! Output follows the canonical layout of CPython's `ast.unparse`: four-space
//! indentation, a blank line before every `def`/`class`, minimal parentheses
//! driven by operator precedence, and `repr`-style literals. Generated text
//! has no trailing newline.

/// Nodes that can be written back out as source.
pub trait Codegen {
    fn codegen(&self, state: &mut CodegenState);
}

/// Output buffer with the current indentation level.
#[derive(Debug, Default)]
pub struct CodegenState {
    tokens: String,
    indent_level: usize,
    /// Set while writing an f-string replacement field, where string
    /// literals may not contain backslashes.
    avoid_backslashes: bool,
}

const INDENT: &str = "    ";

impl CodegenState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A buffer for the expression inside an f-string replacement field.
    pub(crate) fn for_fstring_field() -> Self {
        CodegenState {
            avoid_backslashes: true,
            ..Self::default()
        }
    }

    pub(crate) fn avoids_backslashes(&self) -> bool {
        self.avoid_backslashes
    }

    pub fn add_token(&mut self, tok: &str) {
        self.tokens.push_str(tok);
    }

    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    /// Start a new line unless nothing has been written yet.
    pub fn maybe_newline(&mut self) {
        if !self.tokens.is_empty() {
            self.tokens.push('\n');
        }
    }

    /// Start a new indented line beginning with `text`.
    pub fn fill(&mut self, text: &str) {
        self.maybe_newline();
        for _ in 0..self.indent_level {
            self.tokens.push_str(INDENT);
        }
        self.tokens.push_str(text);
    }

    pub fn into_string(self) -> String {
        self.tokens
    }
}

/// Binding strength of expression contexts, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    NamedExpr,
    Tuple,
    Yield,
    Test,
    Or,
    And,
    Not,
    Cmp,
    /// Also the precedence of `|`.
    Expr,
    BitXor,
    BitAnd,
    Shift,
    Arith,
    Term,
    Factor,
    Power,
    Await,
    Atom,
}

impl Precedence {
    /// The next tighter level; `Atom` is its own successor.
    pub fn next(self) -> Self {
        use Precedence::*;
        match self {
            NamedExpr => Tuple,
            Tuple => Yield,
            Yield => Test,
            Test => Or,
            Or => And,
            And => Not,
            Not => Cmp,
            Cmp => Expr,
            Expr => BitXor,
            BitXor => BitAnd,
            BitAnd => Shift,
            Shift => Arith,
            Arith => Term,
            Term => Factor,
            Factor => Power,
            Power => Await,
            Await | Atom => Atom,
        }
    }
}

/// Literal used for infinite floats, one past the largest finite exponent.
const INFSTR: &str = "1e309";

/// Python `repr` of a float (`imaginary` for the imaginary part of a complex).
pub(crate) fn float_repr(value: f64, imaginary: bool) -> String {
    let suffix = if imaginary { "j" } else { "" };
    if value.is_nan() {
        return format!("({INFSTR}-{INFSTR}){suffix}");
    }
    if value.is_infinite() {
        let sign = if value < 0.0 { "-" } else { "" };
        return format!("{sign}{INFSTR}{suffix}");
    }

    let sci = format!("{:e}", value);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    let body = if (-4..16).contains(&exp) {
        if exp >= 0 {
            let point = exp as usize + 1;
            if digits.len() <= point {
                let zeros = "0".repeat(point - digits.len());
                let fraction = if imaginary { "" } else { ".0" };
                format!("{digits}{zeros}{fraction}")
            } else {
                format!("{}.{}", &digits[..point], &digits[point..])
            }
        } else {
            format!("0.{}{}", "0".repeat((-exp - 1) as usize), digits)
        }
    } else {
        let (first, rest) = digits.split_at(1);
        let mantissa = if rest.is_empty() {
            first.to_string()
        } else {
            format!("{first}.{rest}")
        };
        let exp_sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{exp_sign}{:02}", exp.abs())
    };
    format!("{sign}{body}{suffix}")
}

/// Approximation of `str.isprintable` for a single character.
///
/// Control characters, separators other than space, format characters,
/// private-use code points and noncharacters are not printable.
pub(crate) fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    if c.is_control() {
        return false;
    }
    !matches!(
        c as u32,
        0x00A0
            | 0x00AD
            | 0x0600..=0x0605
            | 0x061C
            | 0x06DD
            | 0x070F
            | 0x1680
            | 0x180E
            | 0x2000..=0x200F
            | 0x2028..=0x202F
            | 0x205F..=0x2064
            | 0x2066..=0x206F
            | 0x3000
            | 0xE000..=0xF8FF
            | 0xFEFF
            | 0xFFF9..=0xFFFB
            | 0xFFFE
            | 0xFFFF
            | 0x110BD
            | 0x1D173..=0x1D17A
            | 0xE0001
            | 0xE0020..=0xE007F
            | 0xF0000..=0x10FFFF
    )
}

fn push_hex_escape(out: &mut String, code: u32) {
    if code <= 0xff {
        out.push_str(&format!("\\x{:02x}", code));
    } else if code <= 0xffff {
        out.push_str(&format!("\\u{:04x}", code));
    } else {
        out.push_str(&format!("\\U{:08x}", code));
    }
}

/// Python `repr` of a string, including quotes.
pub(crate) fn str_repr(value: &str) -> String {
    let quote = if value.contains('\'') && !value.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => push_hex_escape(&mut out, c as u32),
            c if c.is_ascii() || is_printable(c) => out.push(c),
            c => push_hex_escape(&mut out, c as u32),
        }
    }
    out.push(quote);
    out
}

/// Python `repr` of a bytes value, including the `b` prefix and quotes.
pub(crate) fn bytes_repr(value: &[u8]) -> String {
    let quote = if value.contains(&b'\'') && !value.contains(&b'"') {
        b'"'
    } else {
        b'\''
    };
    let mut out = String::with_capacity(value.len() + 3);
    out.push('b');
    out.push(quote as char);
    for &b in value {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\t' => out.push_str("\\t"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b if b == quote => {
                out.push('\\');
                out.push(b as char);
            }
            b if !(0x20..0x7f).contains(&b) => out.push_str(&format!("\\x{:02x}", b)),
            b => out.push(b as char),
        }
    }
    out.push(quote as char);
    out
}

const MULTI_QUOTES: [&str; 2] = ["\"\"\"", "'''"];

/// Every quote style, in order of preference.
pub(crate) const ALL_QUOTES: [&str; 4] = ["'", "\"", "\"\"\"", "'''"];

/// Escape `value` for a literal quoted with one of `quote_types`.
///
/// Returns the escaped body and the quote styles that can still enclose it,
/// best first. Backslashes and unprintable characters are always escaped;
/// newlines and tabs only when `escape_special_whitespace` is set. When no
/// quote style fits, falls back to the body of the `repr`.
pub(crate) fn str_literal_helper(
    value: &str,
    quote_types: &[&'static str],
    escape_special_whitespace: bool,
) -> (String, Vec<&'static str>) {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\n' | '\t' if !escape_special_whitespace => escaped.push(c),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            '\r' => escaped.push_str("\\r"),
            c if !is_printable(c) => push_hex_escape(&mut escaped, c as u32),
            c => escaped.push(c),
        }
    }

    let mut quotes: Vec<&'static str> = quote_types.to_vec();
    if escaped.contains('\n') {
        quotes.retain(|q| MULTI_QUOTES.contains(q));
    }
    quotes.retain(|q| !escaped.contains(q));
    if quotes.is_empty() {
        let repr = str_repr(value);
        let first = if repr.starts_with('"') { "\"" } else { "'" };
        let quote = quote_types
            .iter()
            .copied()
            .find(|q| q.contains(first))
            .unwrap_or(first);
        return (repr[1..repr.len() - 1].to_string(), vec![quote]);
    }

    if let Some(last) = escaped.chars().last() {
        quotes.sort_by_key(|q| q.starts_with(last));
        if quotes[0].starts_with(last) {
            escaped.pop();
            escaped.push('\\');
            escaped.push(last);
        }
    }
    (escaped, quotes)
}

/// A string literal that spells out no backslash escapes where a quote
/// change can avoid them.
pub(crate) fn str_avoiding_backslashes(value: &str) -> String {
    let (escaped, quotes) = str_literal_helper(value, &ALL_QUOTES, false);
    let quote = quotes[0];
    format!("{quote}{escaped}{quote}")
}

/// A docstring literal: triple-quoted, with newlines and tabs kept as-is.
pub(crate) fn docstring_literal(value: &str) -> String {
    let (escaped, quotes) = str_literal_helper(value, &MULTI_QUOTES, false);
    let quote = quotes[0];
    format!("{quote}{escaped}{quote}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_repr_matches_python() {
        assert_eq!(float_repr(1.0, false), "1.0");
        assert_eq!(float_repr(0.5, false), "0.5");
        assert_eq!(float_repr(100.25, false), "100.25");
        assert_eq!(float_repr(0.0001, false), "0.0001");
        assert_eq!(float_repr(0.00001, false), "1e-05");
        assert_eq!(float_repr(1.5e-7, false), "1.5e-07");
        assert_eq!(float_repr(1e15, false), "1000000000000000.0");
        assert_eq!(float_repr(1e16, false), "1e+16");
        assert_eq!(float_repr(f64::INFINITY, false), "1e309");
        assert_eq!(float_repr(0.0, false), "0.0");
    }

    #[test]
    fn imaginary_repr_drops_fraction() {
        assert_eq!(float_repr(2.0, true), "2j");
        assert_eq!(float_repr(1.5, true), "1.5j");
        assert_eq!(float_repr(1e20, true), "1e+20j");
    }

    #[test]
    fn str_repr_chooses_quotes() {
        assert_eq!(str_repr("abc"), "'abc'");
        assert_eq!(str_repr("it's"), "\"it's\"");
        assert_eq!(str_repr("both ' and \""), "'both \\' and \"'");
        assert_eq!(str_repr("a\nb\\"), "'a\\nb\\\\'");
        assert_eq!(str_repr("\u{0}é\u{a0}"), "'\\x00é\\xa0'");
        assert_eq!(str_repr("\u{200b}"), "'\\u200b'");
    }

    #[test]
    fn bytes_repr_escapes_non_ascii() {
        assert_eq!(bytes_repr(b"ab\x00\xff"), "b'ab\\x00\\xff'");
        assert_eq!(bytes_repr(b"'"), "b\"'\"");
    }

    #[test]
    fn docstrings_prefer_double_quotes() {
        assert_eq!(docstring_literal("Doc."), "\"\"\"Doc.\"\"\"");
        assert_eq!(docstring_literal("a\n    b"), "\"\"\"a\n    b\"\"\"");
        assert_eq!(docstring_literal("say \"hi\""), "'''say \"hi\"'''");
        assert_eq!(docstring_literal("has \"\"\" inside"), "'''has \"\"\" inside'''");
    }

    #[test]
    fn literal_helper_narrows_quotes() {
        let (body, quotes) = str_literal_helper("it's", &ALL_QUOTES, true);
        assert_eq!(body, "it's");
        assert_eq!(quotes, vec!["\"", "\"\"\"", "'''"]);

        let (body, quotes) = str_literal_helper("a\tb", &ALL_QUOTES, true);
        assert_eq!(body, "a\\tb");
        assert_eq!(quotes[0], "'");

        let (_, quotes) = str_literal_helper("a\nb", &ALL_QUOTES, false);
        assert_eq!(quotes, vec!["\"\"\"", "'''"]);
    }

    #[test]
    fn backslash_free_literals_switch_quotes() {
        assert_eq!(str_avoiding_backslashes("k"), "'k'");
        assert_eq!(str_avoiding_backslashes("it's"), "\"it's\"");
        assert_eq!(str_avoiding_backslashes("'\""), "''''\"'''");
    }

    #[test]
    fn precedence_next_saturates() {
        assert_eq!(Precedence::Test.next(), Precedence::Or);
        assert_eq!(Precedence::Atom.next(), Precedence::Atom);
        assert!(Precedence::Tuple < Precedence::Test);
    }
}
