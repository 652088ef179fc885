// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::parser::grammar::TokVec;
use crate::tokenizer::{TextPosition, TokError};
use peg::Parse;
use thiserror::Error;

#[allow(clippy::enum_variant_names)]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParserError<'a> {
    #[error("tokenizer error: {0}")]
    TokenizerError(TokError, TextPosition, &'a str),
    #[error("parser error: {0}")]
    ParserError(
        peg::error::ParseError<<TokVec<'a> as Parse>::PositionRepr>,
        &'a str,
    ),
}

impl<'a> ParserError<'a> {
    /// Where in the source the error was detected.
    pub fn position(&self) -> TextPosition {
        match self {
            ParserError::TokenizerError(_, pos, _) => *pos,
            ParserError::ParserError(err, _) => err.location.start_pos,
        }
    }

    /// The source text that failed to parse.
    pub fn source_text(&self) -> &'a str {
        match self {
            ParserError::TokenizerError(_, _, text) | ParserError::ParserError(_, text) => text,
        }
    }

    /// A description of the error without position information.
    pub fn message(&self) -> String {
        match self {
            ParserError::TokenizerError(err, _, _) => err.to_string(),
            ParserError::ParserError(err, _) => format!("expected {}", err.expected),
        }
    }
}
