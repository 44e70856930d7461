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

//! Safe compilation of untrusted rule expressions into linear programs.
//!
//! Upstream, a language model turns a natural-language optimization problem
//! into a structured description whose constraints and objective arrive as
//! small expression strings. This crate provides:
//! - A `nom` expression parser for a narrow arithmetic/comparison subset.
//! - A safety validator that accepts an expression only when every construct
//!   is allow-listed and every free name is whitelisted ([`is_safe`]).
//! - A rule compiler that splits lambda-shaped text, validates the body, and
//!   produces an invocable [`Rule`] ([`compile_rule`]).
//! - A tree-walking evaluator over validated bodies, the only execution
//!   path; no host evaluation facility is ever involved.
//! - Model construction from a structured description into a
//!   [`LinearProgram`] with LP-format output ([`construct_model`]).
//!
//! # Pipeline
//!
//! 1. Parse the expression text into a spanned AST.
//! 2. Validate it against the caller's symbol whitelist (fail closed).
//! 3. Compile into a [`Rule`] bound to its index parameters.
//! 4. Instantiate constraints over index cross-products; emit LP text.
//!
//! # Variable Flattening
//!
//! Linear expressions name variable instances by flattened name:
//! `staff["Mon"]` becomes `staff__Mon`, a scalar variable keeps its name.

mod ast;
mod diagnostics;
mod eval;
mod model;
mod parser;
mod rule;
mod safety;

pub use ast::{BinOp, CmpOp, CompClause, Expr, ExprKind, SourceSpan, UnaryOp};
pub use diagnostics::ParseError;
pub use eval::{
    Component, ComponentMap, EvalContext, EvalError, IndexElem, LinExpr, ParamTable, Relation,
    Sense, Value, VarFamily,
};
pub use model::{
    construct_model, ConstraintSpec, Domain, IndexValue, LinearProgram, LpConstraint, LpVariable,
    ModelError, ModelSpec, ObjectiveSpec, OptimizationSense, ParamSpec, RuleSpec, SetSpec, VarSpec,
};
pub use parser::parse_expression;
pub use rule::{compile_rule, ExpressionNotSafeError, Rule};
pub use safety::{is_safe, SKIP_SENTINEL};

#[cfg(test)]
mod tests;
