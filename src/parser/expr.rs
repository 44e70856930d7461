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

//! Expression parser.

use crate::ast::{BinOp, CmpOp, CompClause, Expr, ExprKind, SourceSpan, Span, UnaryOp};
use nom::Parser;
use nom::{
    branch::alt,
    combinator::{map, map_res, opt, value},
    error::context,
    multi::separated_list1,
    number::complete::recognize_float,
    sequence::{delimited, preceded},
};

use super::utils::{identifier, keyword, string_literal, ws, ws_char, ws_tag};
use super::PResult;

/// Top-level expression parser (conditional expressions bind loosest).
pub(super) fn expr(input: Span<'_>) -> PResult<'_, Expr> {
    parse_conditional(input)
}

/// Parses `body if test else orelse`; the else-arm nests to the right.
fn parse_conditional(input: Span<'_>) -> PResult<'_, Expr> {
    let start = input;
    let (input, body) = parse_comparison(input)?;
    let (input, test) = opt(preceded(keyword("if"), parse_comparison)).parse(input)?;
    let Some(test) = test else {
        return Ok((input, body));
    };
    let (input, _) = context("'else'", keyword("else")).parse(input)?;
    let (input, orelse) = parse_conditional(input)?;
    let span = SourceSpan::from_bounds(start, input);
    Ok((
        input,
        Expr {
            kind: ExprKind::IfExp {
                body: Box::new(body),
                test: Box::new(test),
                orelse: Box::new(orelse),
            },
            span,
        },
    ))
}

/// Parses comparison chains (`a <= b < c` keeps every operator).
fn parse_comparison(input: Span<'_>) -> PResult<'_, Expr> {
    let start = input;
    let (mut input, left) = parse_add_sub(input)?;
    let mut ops = Vec::new();
    let mut comparators = Vec::new();
    loop {
        let (next, op) = opt(cmp_op).parse(input)?;
        let Some(op) = op else {
            break;
        };
        let (next, right) = parse_add_sub(next)?;
        ops.push(op);
        comparators.push(right);
        input = next;
    }
    if ops.is_empty() {
        return Ok((input, left));
    }
    let span = SourceSpan::from_bounds(start, input);
    Ok((
        input,
        Expr {
            kind: ExprKind::Compare {
                left: Box::new(left),
                ops,
                comparators,
            },
            span,
        },
    ))
}

/// Parses comparison operator tokens, two-character tokens first.
fn cmp_op(input: Span<'_>) -> PResult<'_, CmpOp> {
    alt((
        value(CmpOp::Eq, ws_tag("==")),
        value(CmpOp::NotEq, ws_tag("!=")),
        value(CmpOp::LtE, ws_tag("<=")),
        value(CmpOp::GtE, ws_tag(">=")),
        value(CmpOp::Lt, ws_tag("<")),
        value(CmpOp::Gt, ws_tag(">")),
    ))
    .parse(input)
}

/// Parses left-associative `+`/`-`.
fn parse_add_sub(input: Span<'_>) -> PResult<'_, Expr> {
    let (mut input, mut left) = parse_term(input)?;
    loop {
        let (next, op) = opt(alt((ws_char('+'), ws_char('-')))).parse(input)?;
        let Some(op_char) = op else {
            break;
        };

        // Left-associative fold: `a-b-c` becomes `(a-b)-c`.
        let (next, right) = parse_term(next)?;
        let op = if op_char == '+' {
            BinOp::Add
        } else {
            BinOp::Sub
        };
        let span = left.span.merge(&right.span);
        left = Expr {
            kind: ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        };
        input = next;
    }
    Ok((input, left))
}

/// Parses left-associative `*`, `/`, `//`, `%`.
fn parse_term(input: Span<'_>) -> PResult<'_, Expr> {
    let (mut input, mut left) = parse_factor(input)?;
    loop {
        let (next, op) = opt(term_op).parse(input)?;
        let Some(op) = op else {
            break;
        };

        // Left-associative fold: `a/b/c` becomes `(a/b)/c`.
        let (next, right) = parse_factor(next)?;
        let span = left.span.merge(&right.span);
        left = Expr {
            kind: ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        };
        input = next;
    }
    Ok((input, left))
}

/// Parses multiplicative operator tokens; `//` must win over `/`.
fn term_op(input: Span<'_>) -> PResult<'_, BinOp> {
    alt((
        value(BinOp::FloorDiv, ws_tag("//")),
        value(BinOp::Div, ws_tag("/")),
        value(BinOp::Mod, ws_tag("%")),
        value(BinOp::Mul, ws_tag("*")),
    ))
    .parse(input)
}

/// Parses unary operators; `-x ** 2` parses as `-(x ** 2)`.
fn parse_factor(input: Span<'_>) -> PResult<'_, Expr> {
    let start = input;
    // Unary operators are parsed recursively to support chains like `--x`.
    if let Ok((input, op_char)) = alt((ws_char('-'), ws_char('+'))).parse(input) {
        let (input, inner) = parse_factor(input)?;
        let op = if op_char == '-' {
            UnaryOp::Neg
        } else {
            UnaryOp::Pos
        };
        let span = SourceSpan::from_bounds(start, input);
        return Ok((
            input,
            Expr {
                kind: ExprKind::Unary {
                    op,
                    operand: Box::new(inner),
                },
                span,
            },
        ));
    }
    parse_power(input)
}

/// Parses right-associative `**` (`2 ** -1` keeps the unary on the exponent).
fn parse_power(input: Span<'_>) -> PResult<'_, Expr> {
    let start = input;
    let (input, base) = parse_postfix(input)?;
    let (input, exponent) = opt(preceded(ws_tag("**"), parse_factor)).parse(input)?;
    let Some(exponent) = exponent else {
        return Ok((input, base));
    };
    let span = SourceSpan::from_bounds(start, input);
    Ok((
        input,
        Expr {
            kind: ExprKind::Binary {
                op: BinOp::Pow,
                left: Box::new(base),
                right: Box::new(exponent),
            },
            span,
        },
    ))
}

/// Parses postfix call/subscript/attribute chains (`m.x[d]`, `f(a)(b)`).
fn parse_postfix(input: Span<'_>) -> PResult<'_, Expr> {
    let (mut input, mut node) = parse_primary(input)?;
    loop {
        if let Ok((next, args)) = call_arguments(input) {
            let mut span = node.span.clone();
            span.end = next.location_offset();
            node = Expr {
                kind: ExprKind::Call {
                    func: Box::new(node),
                    args,
                },
                span,
            };
            input = next;
            continue;
        }
        if let Ok((next, index)) = subscript_index(input) {
            let mut span = node.span.clone();
            span.end = next.location_offset();
            node = Expr {
                kind: ExprKind::Subscript {
                    base: Box::new(node),
                    index: Box::new(index),
                },
                span,
            };
            input = next;
            continue;
        }
        if let Ok((next, attr)) = preceded(ws_char('.'), identifier).parse(input) {
            let mut span = node.span.clone();
            span.end = next.location_offset();
            node = Expr {
                kind: ExprKind::Attribute {
                    base: Box::new(node),
                    attr,
                },
                span,
            };
            input = next;
            continue;
        }
        break;
    }
    Ok((input, node))
}

/// Parses a parenthesized argument list.
///
/// A lone `x for t in s` argument becomes a generator expression, mirroring
/// the `sum(x for t in s)` aggregation form.
fn call_arguments(input: Span<'_>) -> PResult<'_, Vec<Expr>> {
    let (input, _) = ws_char('(').parse(input)?;
    if let Ok((input, _)) = ws_char(')').parse(input) {
        return Ok((input, Vec::new()));
    }

    let arg_start = input;
    let (input, first) = expr(input)?;
    if let Ok((input, clauses)) = comp_clauses(input) {
        let span = SourceSpan::from_bounds(arg_start, input);
        let generator = Expr {
            kind: ExprKind::Generator {
                element: Box::new(first),
                clauses,
            },
            span,
        };
        let (input, _) = context("')'", ws_char(')')).parse(input)?;
        return Ok((input, vec![generator]));
    }

    let mut args = vec![first];
    let mut input = input;
    loop {
        let (next, comma) = opt(ws_char(',')).parse(input)?;
        if comma.is_none() {
            break;
        }
        let (next, arg) = expr(next)?;
        args.push(arg);
        input = next;
    }
    let (input, _) = context("')'", ws_char(')')).parse(input)?;
    Ok((input, args))
}

/// Parses `[...]` subscripts; `x[a, b]` produces a tuple index.
fn subscript_index(input: Span<'_>) -> PResult<'_, Expr> {
    let start = input;
    let (input, _) = ws_char('[').parse(input)?;
    let (input, mut items) = separated_list1(ws_char(','), expr).parse(input)?;
    let (input, _) = context("']'", ws_char(']')).parse(input)?;
    if items.len() == 1 {
        return Ok((input, items.remove(0)));
    }
    let span = SourceSpan::from_bounds(start, input);
    Ok((
        input,
        Expr {
            kind: ExprKind::Tuple(items),
            span,
        },
    ))
}

/// Parses one-or-more `for <targets> in <iterable>` clauses.
fn comp_clauses(input: Span<'_>) -> PResult<'_, Vec<CompClause>> {
    let (mut input, first) = comp_clause(input)?;
    let mut clauses = vec![first];
    loop {
        let (next, clause) = opt(comp_clause).parse(input)?;
        let Some(clause) = clause else {
            break;
        };
        clauses.push(clause);
        input = next;
    }
    Ok((input, clauses))
}

fn comp_clause(input: Span<'_>) -> PResult<'_, CompClause> {
    let start = input;
    let (input, _) = keyword("for").parse(input)?;
    let (input, targets) = comp_targets(input)?;
    let (input, _) = context("'in'", keyword("in")).parse(input)?;
    // Iterables bind at comparison level; a trailing `if` filter is left for
    // the caller and rejected there, since filters are not part of the grammar.
    let (input, iter) = parse_comparison(input)?;
    let span = SourceSpan::from_bounds(start, input);
    Ok((input, CompClause { targets, iter, span }))
}

/// Parses loop targets (`a`, `a, b`, `(a, b)`, `[a, b]`), identifiers only.
fn comp_targets(input: Span<'_>) -> PResult<'_, Vec<String>> {
    let (input, groups) = separated_list1(ws_char(','), target_atom).parse(input)?;
    Ok((input, groups.into_iter().flatten().collect()))
}

fn target_atom(input: Span<'_>) -> PResult<'_, Vec<String>> {
    alt((
        map(ws(identifier), |name| vec![name]),
        delimited(
            ws_char('('),
            separated_list1(ws_char(','), ws(identifier)),
            ws_char(')'),
        ),
        delimited(
            ws_char('['),
            separated_list1(ws_char(','), ws(identifier)),
            ws_char(']'),
        ),
    ))
    .parse(input)
}

/// Parses expression atoms.
fn parse_primary(input: Span<'_>) -> PResult<'_, Expr> {
    alt((
        parse_list_or_comprehension,
        parse_parenthesized,
        parse_string,
        parse_number,
        parse_ident,
    ))
    .parse(input)
}

/// Parses `[...]` literals and list comprehensions.
fn parse_list_or_comprehension(input: Span<'_>) -> PResult<'_, Expr> {
    let start = input;
    let (input, _) = ws_char('[').parse(input)?;
    if let Ok((input, _)) = ws_char(']').parse(input) {
        let span = SourceSpan::from_bounds(start, input);
        return Ok((
            input,
            Expr {
                kind: ExprKind::List(Vec::new()),
                span,
            },
        ));
    }

    let (input, first) = expr(input)?;
    if let Ok((input, clauses)) = comp_clauses(input) {
        let (input, _) = context("']'", ws_char(']')).parse(input)?;
        let span = SourceSpan::from_bounds(start, input);
        return Ok((
            input,
            Expr {
                kind: ExprKind::Generator {
                    element: Box::new(first),
                    clauses,
                },
                span,
            },
        ));
    }

    let mut items = vec![first];
    let mut input = input;
    loop {
        let (next, comma) = opt(ws_char(',')).parse(input)?;
        if comma.is_none() {
            break;
        }
        let (next, item) = expr(next)?;
        items.push(item);
        input = next;
    }
    let (input, _) = context("']'", ws_char(']')).parse(input)?;
    let span = SourceSpan::from_bounds(start, input);
    Ok((
        input,
        Expr {
            kind: ExprKind::List(items),
            span,
        },
    ))
}

/// Parses `(...)`: the empty tuple, a grouped expression, a tuple literal, or
/// a parenthesized generator expression.
fn parse_parenthesized(input: Span<'_>) -> PResult<'_, Expr> {
    let start = input;
    let (input, _) = ws_char('(').parse(input)?;
    if let Ok((input, _)) = ws_char(')').parse(input) {
        let span = SourceSpan::from_bounds(start, input);
        return Ok((
            input,
            Expr {
                kind: ExprKind::Tuple(Vec::new()),
                span,
            },
        ));
    }

    let (input, first) = expr(input)?;
    if let Ok((input, clauses)) = comp_clauses(input) {
        let (input, _) = context("')'", ws_char(')')).parse(input)?;
        let span = SourceSpan::from_bounds(start, input);
        return Ok((
            input,
            Expr {
                kind: ExprKind::Generator {
                    element: Box::new(first),
                    clauses,
                },
                span,
            },
        ));
    }

    let (input, rest) = opt(preceded(
        ws_char(','),
        separated_list1(ws_char(','), expr),
    ))
    .parse(input)?;
    let (input, _) = context("')'", ws_char(')')).parse(input)?;
    let span = SourceSpan::from_bounds(start, input);
    match rest {
        Some(mut items) => {
            let mut elements = vec![first];
            elements.append(&mut items);
            Ok((
                input,
                Expr {
                    kind: ExprKind::Tuple(elements),
                    span,
                },
            ))
        }
        None => {
            // Preserve outer range for better diagnostics around grouped terms.
            let mut inner = first;
            inner.span = span;
            Ok((input, inner))
        }
    }
}

/// Parses numeric literal expressions.
fn parse_number(input: Span<'_>) -> PResult<'_, Expr> {
    let start = input;
    let (input, n) = ws(map_res(recognize_float, |s: Span<'_>| {
        s.fragment().parse::<f64>()
    }))
    .parse(input)?;
    let span = SourceSpan::from_bounds(start, input);
    Ok((
        input,
        Expr {
            kind: ExprKind::Number(n),
            span,
        },
    ))
}

/// Parses string literal expressions.
fn parse_string(input: Span<'_>) -> PResult<'_, Expr> {
    let start = input;
    let (input, s) = string_literal(input)?;
    let span = SourceSpan::from_bounds(start, input);
    Ok((
        input,
        Expr {
            kind: ExprKind::Str(s),
            span,
        },
    ))
}

/// Parses identifier expressions.
fn parse_ident(input: Span<'_>) -> PResult<'_, Expr> {
    let start = input;
    let (input, name) = ws(identifier).parse(input)?;
    let span = SourceSpan::from_bounds(start, input);
    Ok((
        input,
        Expr {
            kind: ExprKind::Ident(name),
            span,
        },
    ))
}
