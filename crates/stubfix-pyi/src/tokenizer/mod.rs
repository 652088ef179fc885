// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Tokenizer for Python interface stubs.
//!
//! Produces the token stream consumed by the grammar: names, numbers,
//! strings, operators, and the layout tokens `Newline`, `Indent`, `Dedent`
//! and `EndMarker`. Comments and blank lines produce no tokens, and no
//! layout tokens are produced inside brackets.
//!
//! Every non-empty token stream ends with a `Newline` (synthesised with
//! empty text when the source lacks a trailing newline), the `Dedent`s that
//! close any open blocks, and a single `EndMarker`.


use std::fmt;
use thiserror::Error;

/// Tab stops used when measuring indentation.
const TAB_SIZE: usize = 8;

/// Maximum nesting of indented blocks.
const MAX_INDENT: usize = 100;

/// Operators, longest first so that matching is greedy.
const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "->", ":=", "==", "!=", "<=", ">=", "**", "//", "<<",
    ">>", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "@=", "(", ")", "[", "]", "{", "}",
    ":", ",", ";", ".", "+", "-", "*", "/", "%", "|", "&", "^", "~", "<", ">", "=", "@",
];

/// Kinds of tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokType {
    /// An identifier or keyword.
    Name,
    /// A numeric literal.
    Number,
    /// A string or bytes literal, including its prefix and quotes.
    String,
    /// An operator or delimiter.
    Op,
    /// The end of a logical line.
    Newline,
    /// An increase in indentation.
    Indent,
    /// A decrease in indentation.
    Dedent,
    /// The end of the input.
    EndMarker,
}

/// A position in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextPosition {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
    /// Byte offset from the start of the text.
    pub offset: usize,
}

impl fmt::Display for TextPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A single token with its source text and location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// Token kind.
    pub r#type: TokType,
    /// Source text of the token (empty for layout tokens).
    pub string: &'a str,
    /// Where the token starts.
    pub start_pos: TextPosition,
    /// Where the token ends.
    pub end_pos: TextPosition,
}

/// Tokenizer failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokError {
    #[error("inconsistent use of tabs and spaces in indentation")]
    TabSpace,
    #[error("too many levels of indentation")]
    TooDeep,
    #[error("unindent does not match any outer indentation level")]
    Dedent,
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated triple-quoted string literal")]
    UnterminatedTripleQuotedString,
    #[error("unmatched '{0}'")]
    UnmatchedClosingParen(char),
    #[error("closing parenthesis '{1}' does not match opening parenthesis '{0}'")]
    MismatchedClosingParen(char, char),
    #[error("'{0}' was never closed")]
    UnclosedParen(char),
    #[error("unexpected character after line continuation character")]
    LineContinuation,
    #[error("unexpected end of file after line continuation character")]
    LineContinuationEof,
    #[error("invalid decimal literal")]
    BadDecimal,
    #[error("invalid hexadecimal literal")]
    BadHexadecimal,
    #[error("invalid octal literal")]
    BadOctal,
    #[error("invalid binary literal")]
    BadBinary,
    #[error("invalid character '{0}'")]
    BadCharacter(char),
}

/// Tokenize `text` into a complete token stream.
///
/// On failure, returns the error together with the position it occurred at.
pub fn tokenize(text: &str) -> Result<Vec<Token<'_>>, (TokError, TextPosition)> {
    TokState::new(text).run()
}

struct TokState<'t> {
    text: &'t str,
    /// Byte offset of the next character.
    pos: usize,
    line: usize,
    line_start: usize,
    /// Open brackets, innermost last.
    parens: Vec<(char, TextPosition)>,
    /// Indentation widths of the open blocks; always starts with 0.
    indents: Vec<usize>,
    /// Indentation widths counting each tab as one column, used to detect
    /// ambiguous mixes of tabs and spaces.
    alt_indents: Vec<usize>,
    at_line_start: bool,
    tokens: Vec<Token<'t>>,
}

impl<'t> TokState<'t> {
    fn new(text: &'t str) -> Self {
        TokState {
            text,
            pos: 0,
            line: 1,
            line_start: 0,
            parens: Vec::new(),
            indents: vec![0],
            alt_indents: vec![0],
            at_line_start: true,
            tokens: Vec::new(),
        }
    }

    fn position(&self) -> TextPosition {
        TextPosition {
            line: self.line,
            column: self.text[self.line_start..self.pos].chars().count() + 1,
            offset: self.pos,
        }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.text[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Consume a `\n`, `\r\n` or `\r` line ending if one is next.
    fn eat_line_ending(&mut self) -> bool {
        match self.peek() {
            Some('\n') => {
                self.pos += 1;
            }
            Some('\r') => {
                self.pos += 1;
                if self.peek() == Some('\n') {
                    self.pos += 1;
                }
            }
            _ => return false,
        }
        self.line += 1;
        self.line_start = self.pos;
        true
    }

    fn push(&mut self, r#type: TokType, start: usize, start_pos: TextPosition) {
        let end_pos = self.position();
        self.tokens.push(Token {
            r#type,
            string: &self.text[start..self.pos],
            start_pos,
            end_pos,
        });
    }

    fn push_layout(&mut self, r#type: TokType) {
        let pos = self.position();
        self.tokens.push(Token {
            r#type,
            string: "",
            start_pos: pos,
            end_pos: pos,
        });
    }

    fn error<T>(&self, err: TokError) -> Result<T, (TokError, TextPosition)> {
        Err((err, self.position()))
    }

    fn run(mut self) -> Result<Vec<Token<'t>>, (TokError, TextPosition)> {
        loop {
            if self.at_line_start && self.parens.is_empty() {
                if !self.start_line()? {
                    continue;
                }
            }

            while matches!(self.peek(), Some(' ' | '\t' | '\x0c')) {
                self.pos += 1;
            }

            let Some(c) = self.peek() else {
                break;
            };
            let start = self.pos;
            let start_pos = self.position();

            match c {
                '#' => self.skip_comment(),
                '\\' => {
                    self.pos += 1;
                    if self.peek().is_none() {
                        return self.error(TokError::LineContinuationEof);
                    }
                    if !self.eat_line_ending() {
                        return self.error(TokError::LineContinuation);
                    }
                }
                '\n' | '\r' => {
                    self.eat_line_ending();
                    if self.parens.is_empty() {
                        self.tokens.push(Token {
                            r#type: TokType::Newline,
                            string: &self.text[start..self.pos],
                            start_pos,
                            end_pos: start_pos,
                        });
                        self.at_line_start = true;
                    }
                }
                '0'..='9' => {
                    self.number()?;
                    self.push(TokType::Number, start, start_pos);
                }
                '.' if matches!(self.peek_nth(1), Some('0'..='9')) => {
                    self.number()?;
                    self.push(TokType::Number, start, start_pos);
                }
                '\'' | '"' => {
                    self.string_body()?;
                    self.push(TokType::String, start, start_pos);
                }
                c if is_identifier_start(c) => {
                    while self.peek().is_some_and(is_identifier_char) {
                        self.bump();
                    }
                    let word = &self.text[start..self.pos];
                    if matches!(self.peek(), Some('\'' | '"')) && is_string_prefix(word) {
                        self.string_body()?;
                        self.push(TokType::String, start, start_pos);
                    } else {
                        self.push(TokType::Name, start, start_pos);
                    }
                }
                _ => {
                    self.operator(c)?;
                    self.push(TokType::Op, start, start_pos);
                }
            }
        }

        self.finish()
    }

    /// Handle indentation at the start of a line.
    ///
    /// Returns `false` when the line was blank or comment-only and has been
    /// consumed entirely.
    fn start_line(&mut self) -> Result<bool, (TokError, TextPosition)> {
        let mut width = 0;
        let mut alt_width = 0;
        loop {
            match self.peek() {
                Some(' ') => {
                    width += 1;
                    alt_width += 1;
                }
                Some('\t') => {
                    width = (width / TAB_SIZE + 1) * TAB_SIZE;
                    alt_width += 1;
                }
                Some('\x0c') => {
                    width = 0;
                    alt_width = 0;
                }
                _ => break,
            }
            self.pos += 1;
        }

        match self.peek() {
            None => {
                self.at_line_start = false;
                return Ok(true);
            }
            Some('#') => {
                self.skip_comment();
                if !self.eat_line_ending() {
                    self.at_line_start = false;
                }
                return Ok(false);
            }
            Some('\n' | '\r') => {
                self.eat_line_ending();
                return Ok(false);
            }
            _ => {}
        }

        self.at_line_start = false;
        let current = self.indents.last().copied().unwrap_or(0);
        let alt_current = self.alt_indents.last().copied().unwrap_or(0);
        if width > current {
            if alt_width <= alt_current {
                return self.error(TokError::TabSpace);
            }
            if self.indents.len() > MAX_INDENT {
                return self.error(TokError::TooDeep);
            }
            self.indents.push(width);
            self.alt_indents.push(alt_width);
            self.push_layout(TokType::Indent);
        } else if width < current {
            while self.indents.last().is_some_and(|&indent| indent > width) {
                self.indents.pop();
                self.alt_indents.pop();
                self.push_layout(TokType::Dedent);
            }
            if self.indents.last() != Some(&width) {
                return self.error(TokError::Dedent);
            }
            if self.alt_indents.last() != Some(&alt_width) {
                return self.error(TokError::TabSpace);
            }
        } else if alt_width != alt_current {
            return self.error(TokError::TabSpace);
        }
        Ok(true)
    }

    fn skip_comment(&mut self) {
        while !matches!(self.peek(), None | Some('\n' | '\r')) {
            self.bump();
        }
    }

    fn finish(mut self) -> Result<Vec<Token<'t>>, (TokError, TextPosition)> {
        if let Some(&(open, open_pos)) = self.parens.last() {
            return Err((TokError::UnclosedParen(open), open_pos));
        }
        let needs_newline = self
            .tokens
            .last()
            .is_some_and(|tok| !matches!(tok.r#type, TokType::Newline | TokType::Dedent));
        if needs_newline {
            self.push_layout(TokType::Newline);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push_layout(TokType::Dedent);
        }
        self.push_layout(TokType::EndMarker);
        Ok(self.tokens)
    }

    fn operator(&mut self, c: char) -> Result<(), (TokError, TextPosition)> {
        let rest = &self.text[self.pos..];
        let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) else {
            return self.error(TokError::BadCharacter(c));
        };

        match c {
            '(' | '[' | '{' => {
                let pos = self.position();
                self.parens.push((c, pos));
            }
            ')' | ']' | '}' => match self.parens.pop() {
                None => return self.error(TokError::UnmatchedClosingParen(c)),
                Some((open, _)) if closing_for(open) != c => {
                    return self.error(TokError::MismatchedClosingParen(open, c));
                }
                Some(_) => {}
            },
            _ => {}
        }
        self.pos += op.len();
        Ok(())
    }

    /// Scan digits accepted by `is_digit`, allowing single underscores
    /// between digits. Returns the number of digits consumed.
    fn digits(
        &mut self,
        is_digit: impl Fn(char) -> bool,
        err: TokError,
    ) -> Result<usize, (TokError, TextPosition)> {
        let mut count = 0;
        loop {
            match self.peek() {
                Some(c) if is_digit(c) => {
                    self.pos += 1;
                    count += 1;
                }
                Some('_') if count > 0 => {
                    self.pos += 1;
                    if !self.peek().is_some_and(&is_digit) {
                        return self.error(err);
                    }
                }
                _ => return Ok(count),
            }
        }
    }

    fn number(&mut self) -> Result<(), (TokError, TextPosition)> {
        if self.peek() == Some('0') {
            let radix = match self.peek_nth(1) {
                Some('x' | 'X') => Some((16, TokError::BadHexadecimal)),
                Some('o' | 'O') => Some((8, TokError::BadOctal)),
                Some('b' | 'B') => Some((2, TokError::BadBinary)),
                _ => None,
            };
            if let Some((radix, err)) = radix {
                self.pos += 2;
                if self.peek() == Some('_') {
                    self.pos += 1;
                }
                if self.digits(|c| c.is_digit(radix), err)? == 0 {
                    return self.error(err);
                }
                return self.number_end(err);
            }
        }

        let start = self.pos;
        self.digits(|c| c.is_ascii_digit(), TokError::BadDecimal)?;
        let mut is_integer = true;
        if self.peek() == Some('.') {
            is_integer = false;
            self.pos += 1;
            self.digits(|c| c.is_ascii_digit(), TokError::BadDecimal)?;
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            self.pos += 1;
            if matches!(self.peek(), Some('+' | '-')) {
                self.pos += 1;
            }
            if self.digits(|c| c.is_ascii_digit(), TokError::BadDecimal)? == 0 {
                return self.error(TokError::BadDecimal);
            }
            is_integer = false;
        }
        if matches!(self.peek(), Some('j' | 'J')) {
            self.pos += 1;
            is_integer = false;
        }

        if is_integer {
            let digits = &self.text[start..self.pos];
            if digits.starts_with('0') && digits.chars().any(|c| matches!(c, '1'..='9')) {
                return self.error(TokError::BadDecimal);
            }
        }
        self.number_end(TokError::BadDecimal)
    }

    fn number_end(&mut self, err: TokError) -> Result<(), (TokError, TextPosition)> {
        match self.peek() {
            Some(c) if is_identifier_char(c) => self.error(err),
            _ => Ok(()),
        }
    }

    /// Scan a string body starting at the opening quote.
    fn string_body(&mut self) -> Result<(), (TokError, TextPosition)> {
        let Some(quote) = self.bump() else {
            return self.error(TokError::UnterminatedString);
        };
        let triple = self.peek() == Some(quote) && self.peek_nth(1) == Some(quote);
        if triple {
            self.pos += 2;
        }

        loop {
            match self.peek() {
                None => {
                    return self.error(if triple {
                        TokError::UnterminatedTripleQuotedString
                    } else {
                        TokError::UnterminatedString
                    });
                }
                Some('\\') => {
                    self.pos += 1;
                    if !self.eat_line_ending() {
                        self.bump();
                    }
                }
                Some('\n' | '\r') => {
                    if !triple {
                        return self.error(TokError::UnterminatedString);
                    }
                    self.eat_line_ending();
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    if !triple {
                        return Ok(());
                    }
                    if self.peek() == Some(quote) && self.peek_nth(1) == Some(quote) {
                        self.pos += 2;
                        return Ok(());
                    }
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }
}

fn closing_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

fn is_identifier_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_identifier_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

/// Whether `word` is a valid string prefix (`r`, `b`, `u`, `f` and their
/// combinations), case-insensitively.
pub(crate) fn is_string_prefix(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "r" | "u" | "b" | "f" | "br" | "rb" | "fr" | "rf"
    )
}
