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

//! AST definitions for rule expressions with precise source spans.
//!
//! The parser creates this AST first. The safety validator walks it against a
//! symbol whitelist, and the evaluator interprets validated trees directly.

use nom_locate::LocatedSpan;

/// Parser input span type carrying byte offsets and line/column info.
pub type Span<'a> = LocatedSpan<&'a str>;

/// Source range and anchor position for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpan {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based UTF-8 column.
    pub column: usize,
}

impl SourceSpan {
    /// Creates a source span from parser start/end positions.
    pub fn from_bounds(start: Span<'_>, end: Span<'_>) -> Self {
        Self {
            start: start.location_offset(),
            end: end.location_offset(),
            line: start.location_line() as usize,
            column: start.get_utf8_column(),
        }
    }

    /// Returns span length in bytes.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns whether the span is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a span that starts at `self` and ends at `other`.
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            start: self.start,
            end: other.end,
            line: self.line,
            column: self.column,
        }
    }
}

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// Addition (`+`).
    Add,
    /// Subtraction (`-`).
    Sub,
    /// Multiplication (`*`).
    Mul,
    /// Division (`/`).
    Div,
    /// Floor division (`//`).
    FloorDiv,
    /// Modulo (`%`).
    Mod,
    /// Exponentiation (`**`).
    Pow,
}

impl BinOp {
    /// Returns the operator's surface syntax.
    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Negation (`-`).
    Neg,
    /// Identity (`+`).
    Pos,
}

impl UnaryOp {
    /// Returns the operator's surface syntax.
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Pos => "+",
        }
    }
}

/// Comparison operators.
///
/// `NotEq` is representable so that chains containing it parse and are then
/// rejected by the validator's operator check rather than by the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    /// Equality (`==`).
    Eq,
    /// Inequality (`!=`).
    NotEq,
    /// Less-than (`<`).
    Lt,
    /// Less-or-equal (`<=`).
    LtE,
    /// Greater-than (`>`).
    Gt,
    /// Greater-or-equal (`>=`).
    GtE,
}

impl CmpOp {
    /// Returns the operator's surface syntax.
    pub fn as_str(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::NotEq => "!=",
            CmpOp::Lt => "<",
            CmpOp::LtE => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtE => ">=",
        }
    }
}

/// One `for <targets> in <iterable>` clause of a generator expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CompClause {
    /// Loop target names, one entry per bound identifier.
    ///
    /// A destructured target (`for a, b in s`) contributes one name per
    /// element; targets are restricted to plain identifiers.
    pub targets: Vec<String>,
    /// Source iterable expression.
    pub iter: Expr,
    /// Source location for diagnostics.
    pub span: SourceSpan,
}

/// Expression node variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Numeric literal.
    Number(f64),
    /// String literal.
    Str(String),
    /// Identifier reference.
    Ident(String),
    /// Attribute access (`base.attr`).
    Attribute {
        /// Base expression.
        base: Box<Expr>,
        /// Attribute name.
        attr: String,
    },
    /// Subscript access (`base[index]`).
    Subscript {
        /// Base expression.
        base: Box<Expr>,
        /// Index expression (a tuple node for `base[a, b]`).
        index: Box<Expr>,
    },
    /// Unary operation.
    Unary {
        /// Operator kind.
        op: UnaryOp,
        /// Operand.
        operand: Box<Expr>,
    },
    /// Binary operation.
    Binary {
        /// Operator kind.
        op: BinOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// Comparison chain (`a <= b < c` keeps one op per comparator).
    Compare {
        /// Leftmost operand.
        left: Box<Expr>,
        /// Chain operators, one per comparator.
        ops: Vec<CmpOp>,
        /// Right-hand operands, parallel to `ops`.
        comparators: Vec<Expr>,
    },
    /// Tuple literal.
    Tuple(Vec<Expr>),
    /// List literal.
    List(Vec<Expr>),
    /// Conditional expression (`body if test else orelse`).
    IfExp {
        /// Value when the test holds.
        body: Box<Expr>,
        /// Condition.
        test: Box<Expr>,
        /// Value when the test fails.
        orelse: Box<Expr>,
    },
    /// Function call.
    Call {
        /// Call target expression.
        func: Box<Expr>,
        /// Call arguments.
        args: Vec<Expr>,
    },
    /// Generator expression / comprehension (`element for t in s ...`).
    Generator {
        /// Element expression evaluated per binding.
        element: Box<Expr>,
        /// Loop clauses in source order.
        clauses: Vec<CompClause>,
    },
}

/// Spanned expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    /// Expression payload.
    pub kind: ExprKind,
    /// Source location for diagnostics.
    pub span: SourceSpan,
}

impl Expr {
    /// Renders an attribute chain over a bare identifier as a dotted path.
    ///
    /// Returns `Some("a.b.c")` for `a.b.c` and `None` when the innermost base
    /// is anything other than an identifier (e.g. `f(x).b`, `x[0].b`).
    pub fn dotted_path(&self) -> Option<String> {
        match &self.kind {
            ExprKind::Ident(name) => Some(name.clone()),
            ExprKind::Attribute { base, attr } => {
                let mut path = base.dotted_path()?;
                path.push('.');
                path.push_str(attr);
                Some(path)
            }
            _ => None,
        }
    }
}
