// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Decoding of number and string literal tokens.
//!
//! Errors are `&'static str` so the grammar can surface them directly from
//! `{? }` actions.

use crate::nodes::{Constant, Expression, FStringPart, FormattedValue};

/// A single decoded string token.
#[derive(Debug, Clone, PartialEq)]
enum StringPart {
    Str { value: String, unicode_prefix: bool },
    Bytes(Vec<u8>),
    Formatted(Vec<FStringPart>),
}

/// Decode a run of adjacent string tokens into one expression.
///
/// A run with any f-string becomes a single [`Expression::JoinedStr`] whose
/// adjacent literal text is merged.
pub(crate) fn concatenate(parts: &[&str]) -> Result<Expression, &'static str> {
    let decoded = parts
        .iter()
        .map(|raw| parse_string(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let bytes = decoded
        .iter()
        .filter(|p| matches!(p, StringPart::Bytes(_)))
        .count();
    if bytes != 0 && bytes != decoded.len() {
        return Err("cannot mix bytes and nonbytes literals");
    }

    if decoded.iter().any(|p| matches!(p, StringPart::Formatted(_))) {
        let mut values = Vec::new();
        for part in decoded {
            match part {
                StringPart::Str { value, .. } => push_literal(&mut values, value),
                StringPart::Formatted(pieces) => {
                    for piece in pieces {
                        match piece {
                            FStringPart::Literal(text) => push_literal(&mut values, text),
                            field => values.push(field),
                        }
                    }
                }
                StringPart::Bytes(_) => {}
            }
        }
        return Ok(Expression::JoinedStr(values));
    }

    if bytes != 0 {
        let mut value = Vec::new();
        for part in decoded {
            if let StringPart::Bytes(b) = part {
                value.extend(b);
            }
        }
        return Ok(Expression::Constant(Constant::Bytes(value)));
    }

    let mut value = String::new();
    let mut unicode = false;
    for (i, part) in decoded.into_iter().enumerate() {
        if let StringPart::Str {
            value: s,
            unicode_prefix,
        } = part
        {
            if i == 0 {
                unicode = unicode_prefix;
            }
            value.push_str(&s);
        }
    }
    Ok(Expression::Constant(Constant::Str {
        value,
        unicode_prefix: unicode,
    }))
}

/// Append literal text, merging it into a preceding literal. Empty text is
/// dropped.
fn push_literal(values: &mut Vec<FStringPart>, text: String) {
    if text.is_empty() {
        return;
    }
    match values.last_mut() {
        Some(FStringPart::Literal(last)) => last.push_str(&text),
        _ => values.push(FStringPart::Literal(text)),
    }
}

fn parse_string(raw: &str) -> Result<StringPart, &'static str> {
    let quote_at = raw
        .find(['\'', '"'])
        .ok_or("string literal without quotes")?;
    let prefix = raw[..quote_at].to_ascii_lowercase();
    let quoted = &raw[quote_at..];

    let is_raw = prefix.contains('r');
    let is_bytes = prefix.contains('b');

    let quote_len = if quoted.starts_with("'''") || quoted.starts_with("\"\"\"") {
        3
    } else {
        1
    };
    if quoted.len() < quote_len * 2 {
        return Err("unterminated string literal");
    }
    let body = &quoted[quote_len..quoted.len() - quote_len];

    if prefix.contains('f') {
        return FStringScanner::new(body, is_raw)
            .parts(false)
            .map(StringPart::Formatted);
    }

    if is_bytes {
        if !body.is_ascii() {
            return Err("bytes can only contain ASCII literal characters");
        }
        let value = if is_raw {
            body.as_bytes().to_vec()
        } else {
            unescape_bytes(body)?
        };
        return Ok(StringPart::Bytes(value));
    }

    let value = if is_raw {
        body.to_string()
    } else {
        unescape_str(body)?
    };
    Ok(StringPart::Str {
        value,
        unicode_prefix: prefix == "u",
    })
}

/// Splits the body of an f-string into literal text and replacement fields.
struct FStringScanner {
    chars: Vec<char>,
    pos: usize,
    is_raw: bool,
}

impl FStringScanner {
    fn new(body: &str, is_raw: bool) -> Self {
        FStringScanner {
            chars: body.chars().collect(),
            pos: 0,
            is_raw,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn text(&self, start: usize, end: usize) -> String {
        self.chars[start..end].iter().collect()
    }

    /// Scan pieces up to the end of the body, or up to the `}` closing a
    /// format spec when `in_spec` is set.
    fn parts(&mut self, in_spec: bool) -> Result<Vec<FStringPart>, &'static str> {
        let mut parts = Vec::new();
        // Undecoded source text of the current literal.
        let mut literal = String::new();
        loop {
            match self.peek() {
                None if in_spec => return Err("f-string: expecting '}'"),
                None => break,
                Some('}') if in_spec => break,
                Some('}') => {
                    if self.peek_at(1) != Some('}') {
                        return Err("f-string: single '}' is not allowed");
                    }
                    literal.push('}');
                    self.pos += 2;
                }
                Some('{') if !in_spec && self.peek_at(1) == Some('{') => {
                    literal.push('{');
                    self.pos += 2;
                }
                Some('{') => {
                    self.flush_literal(&mut parts, &mut literal)?;
                    let field = self.field(&mut parts)?;
                    parts.push(FStringPart::Field(field));
                }
                Some('\\') if !self.is_raw => {
                    literal.push('\\');
                    self.pos += 1;
                    match self.peek() {
                        Some('N') => return Err("named unicode escapes are not supported"),
                        // A brace after a backslash still opens or closes a field.
                        Some('{' | '}') | None => {}
                        Some(c) => {
                            literal.push(c);
                            self.pos += 1;
                        }
                    }
                }
                Some(c) => {
                    literal.push(c);
                    self.pos += 1;
                }
            }
        }
        self.flush_literal(&mut parts, &mut literal)?;
        Ok(parts)
    }

    fn flush_literal(
        &self,
        parts: &mut Vec<FStringPart>,
        literal: &mut String,
    ) -> Result<(), &'static str> {
        let source = std::mem::take(literal);
        let text = if self.is_raw {
            source
        } else {
            unescape_str(&source)?
        };
        push_literal(parts, text);
        Ok(())
    }

    /// Scan a replacement field starting at its `{`. The text of a
    /// self-documenting `{expr=}` field goes into `parts` first.
    fn field(&mut self, parts: &mut Vec<FStringPart>) -> Result<FormattedValue, &'static str> {
        self.pos += 1;
        let start = self.pos;
        self.skip_expression()?;
        let expr_end = self.pos;
        let source = self.text(start, expr_end);
        if source.trim().is_empty() {
            return Err("f-string: empty expression not allowed");
        }

        let mut self_documenting = false;
        if self.peek() == Some('=') {
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
                self.pos += 1;
            }
            push_literal(parts, self.text(start, self.pos));
            self_documenting = true;
        }

        let mut conversion = None;
        if self.peek() == Some('!') {
            match self.peek_at(1) {
                Some(c @ ('s' | 'r' | 'a')) => conversion = Some(c),
                _ => {
                    return Err(
                        "f-string: invalid conversion character: expected 's', 'r', or 'a'",
                    )
                }
            }
            self.pos += 2;
        }

        let mut format_spec = None;
        if self.peek() == Some(':') {
            self.pos += 1;
            format_spec = Some(self.parts(true)?);
        }

        if self.peek() != Some('}') {
            return Err("f-string: expecting '}'");
        }
        self.pos += 1;

        if self_documenting && conversion.is_none() && format_spec.is_none() {
            conversion = Some('r');
        }

        // Fields are parsed as if parenthesized, so `{a, b}` is a tuple.
        let wrapped = format!("({})", source);
        let value = crate::parse_expression(&wrapped)
            .map_err(|_| "f-string: invalid expression")?;
        Ok(FormattedValue {
            value: Box::new(value),
            conversion,
            format_spec,
        })
    }

    /// Advance to the first top-level `!`, `:`, `=` or `}` that ends the
    /// expression of a field, skipping over brackets and nested strings.
    fn skip_expression(&mut self) -> Result<(), &'static str> {
        let mut depth = 0usize;
        let mut quote: Option<(char, usize)> = None;
        loop {
            let c = self.peek().ok_or("f-string: expecting '}'")?;
            if c == '\\' {
                return Err("f-string expression part cannot include a backslash");
            }
            if let Some((q, len)) = quote {
                if c == q && (len == 1 || self.opens_triple(q)) {
                    quote = None;
                    self.pos += len;
                } else {
                    self.pos += 1;
                }
                continue;
            }
            match c {
                '\'' | '"' => {
                    let len = if self.opens_triple(c) { 3 } else { 1 };
                    quote = Some((c, len));
                    self.pos += len;
                    continue;
                }
                '#' => return Err("f-string expression part cannot include '#'"),
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' if depth > 0 => depth -= 1,
                '}' => return Ok(()),
                ')' | ']' => return Err("f-string: unmatched bracket"),
                ':' if depth == 0 => return Ok(()),
                '!' if depth == 0 && self.peek_at(1) != Some('=') => return Ok(()),
                '=' if depth == 0 && self.is_lone_equals() => return Ok(()),
                _ => {}
            }
            self.pos += 1;
        }
    }

    fn opens_triple(&self, quote: char) -> bool {
        self.peek() == Some(quote)
            && self.peek_at(1) == Some(quote)
            && self.peek_at(2) == Some(quote)
    }

    /// An `=` that is not part of `==`, `!=`, `<=` or `>=`.
    fn is_lone_equals(&self) -> bool {
        let before = self.pos.checked_sub(1).and_then(|i| self.chars.get(i));
        self.peek_at(1) != Some('=') && !matches!(before, Some('=' | '!' | '<' | '>'))
    }
}

/// Escapes shared by `str` and `bytes`, as a code point.
enum Escape {
    Value(u32),
    Skip,
    Unknown(char),
}

fn common_escape(
    c: char,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
) -> Result<Escape, &'static str> {
    let value = match c {
        '\n' => return Ok(Escape::Skip),
        '\r' => {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            return Ok(Escape::Skip);
        }
        '\\' => '\\' as u32,
        '\'' => '\'' as u32,
        '"' => '"' as u32,
        'a' => 0x07,
        'b' => 0x08,
        'f' => 0x0c,
        'n' => '\n' as u32,
        'r' => '\r' as u32,
        't' => '\t' as u32,
        'v' => 0x0b,
        '0'..='7' => {
            let mut value = c.to_digit(8).unwrap_or(0);
            for _ in 0..2 {
                match chars.peek().and_then(|d| d.to_digit(8)) {
                    Some(d) => {
                        value = value * 8 + d;
                        chars.next();
                    }
                    None => break,
                }
            }
            value
        }
        'x' => read_hex(chars, 2).ok_or("truncated \\xXX escape")?,
        other => return Ok(Escape::Unknown(other)),
    };
    Ok(Escape::Value(value))
}

fn read_hex(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, count: usize) -> Option<u32> {
    let mut value = 0u32;
    for _ in 0..count {
        let digit = chars.peek()?.to_digit(16)?;
        chars.next();
        value = value.checked_mul(16)?.checked_add(digit)?;
    }
    Some(value)
}

fn unescape_str(body: &str) -> Result<String, &'static str> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(next) = chars.next() else {
            out.push('\\');
            break;
        };
        let code = match next {
            'u' => read_hex(&mut chars, 4).ok_or("truncated \\uXXXX escape")?,
            'U' => read_hex(&mut chars, 8).ok_or("truncated \\UXXXXXXXX escape")?,
            'N' => return Err("named unicode escapes are not supported"),
            _ => match common_escape(next, &mut chars)? {
                Escape::Value(code) => code,
                Escape::Skip => continue,
                Escape::Unknown(other) => {
                    out.push('\\');
                    out.push(other);
                    continue;
                }
            },
        };
        out.push(char::from_u32(code).ok_or("illegal Unicode character")?);
    }
    Ok(out)
}

fn unescape_bytes(body: &str) -> Result<Vec<u8>, &'static str> {
    let mut out = Vec::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c as u8);
            continue;
        }
        let Some(next) = chars.next() else {
            out.push(b'\\');
            break;
        };
        match common_escape(next, &mut chars)? {
            Escape::Value(code) => out.push((code & 0xff) as u8),
            Escape::Skip => {}
            Escape::Unknown(other) => {
                out.push(b'\\');
                out.push(other as u8);
            }
        }
    }
    Ok(out)
}

/// Decode a number token.
pub(crate) fn parse_number(raw: &str) -> Result<Constant, &'static str> {
    let text: String = raw
        .chars()
        .filter(|c| *c != '_')
        .collect::<String>()
        .to_ascii_lowercase();

    if let Some(imag) = text.strip_suffix('j') {
        return imag
            .parse::<f64>()
            .map(Constant::Complex)
            .map_err(|_| "invalid imaginary literal");
    }
    for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
        if let Some(digits) = text.strip_prefix(prefix) {
            return to_decimal(digits, radix).map(Constant::Int);
        }
    }
    if text.contains(['.', 'e']) {
        return text
            .parse::<f64>()
            .map(Constant::Float)
            .map_err(|_| "invalid float literal");
    }
    to_decimal(&text, 10).map(Constant::Int)
}

const LIMB: u64 = 1_000_000_000;

/// Convert digits in `radix` to a decimal string of arbitrary size.
fn to_decimal(digits: &str, radix: u32) -> Result<String, &'static str> {
    if digits.is_empty() {
        return Err("invalid integer literal");
    }
    // Little-endian base 10^9 limbs.
    let mut limbs: Vec<u64> = vec![0];
    for c in digits.chars() {
        let mut carry = u64::from(c.to_digit(radix).ok_or("invalid digit in integer literal")?);
        for limb in limbs.iter_mut() {
            let v = *limb * u64::from(radix) + carry;
            *limb = v % LIMB;
            carry = v / LIMB;
        }
        if carry > 0 {
            limbs.push(carry);
        }
    }

    let mut out = String::new();
    let mut iter = limbs.iter().rev();
    if let Some(first) = iter.next() {
        out.push_str(&first.to_string());
    }
    for limb in iter {
        out.push_str(&format!("{:09}", limb));
    }
    Ok(out)
}
