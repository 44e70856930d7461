/*
MIT License

Copyright (c) 2026 Raja Lehtihet and Wael El Oraiby

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/

//! `nom` parser for single rule expressions.
//!
//! The grammar is a narrow expression subset, parsed in "evaluate a single
//! expression" mode only: there are no statements, assignments, or imports,
//! and trailing input is a syntax error.
//!
//! Expressions support:
//! - numeric and string literals, identifiers
//! - attribute access (`m.x`) and subscripts (`x[d]`, `x[d, t]`)
//! - unary `+ -`, binary `+ - * / // % **`
//! - comparison chains (`== != < <= > >=`)
//! - tuple and list literals
//! - conditional expressions (`a if t else b`)
//! - function calls and generator expressions (`sum(x[d] for d in s)`)

mod expr;
mod utils;

use crate::ast::{Expr, SourceSpan, Span};
use crate::diagnostics::ParseError;
use nom::{
    combinator::all_consuming,
    error::{VerboseError, VerboseErrorKind},
    sequence::delimited,
    IResult,
};

use self::expr::expr as expression;
use self::utils::ws0;

type PResult<'a, O> = IResult<Span<'a>, O, VerboseError<Span<'a>>>;

/// Parses a single rule expression into a spanned AST.
pub fn parse_expression(source: &str) -> Result<Expr, ParseError> {
    let input = Span::new(source);
    // `all_consuming` ensures trailing garbage is treated as syntax error.
    match all_consuming(delimited(ws0, expression, ws0))(input) {
        Ok((_, parsed)) => Ok(parsed),
        Err(err) => Err(parse_error_to_diagnostic(err, source)),
    }
}

/// Converts a `nom` verbose error to crate-level parse diagnostics.
fn parse_error_to_diagnostic(err: nom::Err<VerboseError<Span<'_>>>, source: &str) -> ParseError {
    match err {
        nom::Err::Incomplete(_) => ParseError::message_only("Incomplete input"),
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            // Use the deepest recorded parser error as the diagnostic anchor.
            if let Some((span, kind)) = e.errors.last() {
                let span = SourceSpan::from_bounds(*span, *span);
                let detail = match kind {
                    VerboseErrorKind::Context(ctx) => format!("Syntax error: expected {ctx}"),
                    VerboseErrorKind::Char(c) => format!("Syntax error: expected '{c}'"),
                    VerboseErrorKind::Nom(kind) => format!("Syntax error near {kind:?}"),
                };
                ParseError::from_span(detail, source, &span)
            } else {
                ParseError::message_only("Syntax error")
            }
        }
    }
}
