// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

mod errors;
mod grammar;
pub(crate) mod literal;

pub use errors::ParserError;
pub use grammar::{stub_grammar, ParseLoc, TokVec, TokenRef};
