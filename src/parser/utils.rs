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

//! Parser trivia and lexical helpers.

use crate::ast::Span;
use nom::Parser;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, multispace0},
    combinator::{map, recognize, value, verify},
    error::{context, ErrorKind, ParseError as NomParseError, VerboseError},
    sequence::{delimited, pair},
};

use super::PResult;

/// Keywords that structure the grammar and can never be identifiers.
const RESERVED: &[&str] = &["for", "in", "if", "else", "lambda"];

/// Parses a raw identifier token (`[A-Za-z_][A-Za-z0-9_]*`).
fn raw_identifier(input: Span<'_>) -> PResult<'_, Span<'_>> {
    recognize(pair(
        take_while1(is_ident_start),
        take_while(is_ident_continue),
    ))
    .parse(input)
}

/// Parses identifiers, rejecting reserved keywords.
pub(super) fn identifier(input: Span<'_>) -> PResult<'_, String> {
    map(
        verify(raw_identifier, |s: &Span<'_>| {
            !RESERVED.contains(s.fragment())
        }),
        |s: Span<'_>| s.fragment().to_string(),
    )
    .parse(input)
}

/// Parses one specific keyword token with surrounding whitespace.
///
/// Matching is whole-token: `for` never matches the head of `format`.
pub(super) fn keyword<'a>(word: &'static str) -> impl FnMut(Span<'a>) -> PResult<'a, ()> {
    move |input| {
        let (rest, ident) = ws(raw_identifier)(input)?;
        if *ident.fragment() == word {
            Ok((rest, ()))
        } else {
            Err(nom::Err::Error(VerboseError::from_error_kind(
                input,
                ErrorKind::Tag,
            )))
        }
    }
}

/// Returns whether a char can start an identifier.
fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

/// Returns whether a char can continue an identifier.
fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

/// Parses a quoted string literal (single or double quotes).
///
/// Escape processing is intentionally minimal: whitelisted sentinels are
/// consumed as raw text between quotes.
pub(super) fn string_literal(input: Span<'_>) -> PResult<'_, String> {
    let double_quoted = map(
        delimited(
            char('"'),
            take_while(|c| c != '"' && c != '\n' && c != '\r'),
            context("closing quote", char('"')),
        ),
        |s: Span<'_>| s.fragment().to_string(),
    );
    let single_quoted = map(
        delimited(
            char('\''),
            take_while(|c| c != '\'' && c != '\n' && c != '\r'),
            context("closing quote", char('\'')),
        ),
        |s: Span<'_>| s.fragment().to_string(),
    );
    ws(alt((double_quoted, single_quoted))).parse(input)
}

/// Skips zero-or-more whitespace.
pub(super) fn ws0(input: Span<'_>) -> PResult<'_, ()> {
    value((), multispace0).parse(input)
}

/// Wraps a parser with leading/trailing whitespace skipping.
pub(super) fn ws<'a, O, P>(mut parser: P) -> impl FnMut(Span<'a>) -> PResult<'a, O>
where
    P: FnMut(Span<'a>) -> PResult<'a, O>,
{
    // This helper keeps grammar rules free from manual trivia handling.
    move |input| nom::sequence::delimited(ws0, &mut parser, ws0)(input)
}

/// Parses a specific character token with surrounding whitespace.
pub(super) fn ws_char<'a>(c: char) -> impl FnMut(Span<'a>) -> PResult<'a, char> {
    ws(char(c))
}

/// Parses a specific multi-character token with surrounding whitespace.
pub(super) fn ws_tag<'a>(t: &'static str) -> impl FnMut(Span<'a>) -> PResult<'a, Span<'a>> {
    ws(tag(t))
}
