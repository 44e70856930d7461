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

//! Expression safety validation against a symbol whitelist.
//!
//! An expression is safe when every node is one of the accepted constructs and
//! every free name resolves to a whitelisted symbol or a generator binding.
//! Acceptance is allow-list driven: anything the grammar cannot represent, or
//! any node kind without an explicit acceptance rule, is unsafe by default.

use crate::ast::{CmpOp, Expr, ExprKind};
use crate::parser::parse_expression;
use std::collections::HashSet;
use tracing::debug;

/// Reserved symbol meaning "emit no constraint for this index".
///
/// Always permitted, regardless of the caller's whitelist.
pub const SKIP_SENTINEL: &str = "Constraint.Skip";

/// Pure aggregation/range helpers callable by bare name.
const AGGREGATE_FNS: &[&str] = &["sum", "ord", "range"];

/// Returns whether `expression` only references whitelisted symbols and
/// accepted constructs.
///
/// This never fails with an error: unparsable input is simply unsafe. The
/// check is pure, so two calls with the same arguments agree.
pub fn is_safe(expression: &str, allowed_symbols: &HashSet<String>) -> bool {
    let parsed = match parse_expression(expression) {
        Ok(parsed) => parsed,
        Err(err) => {
            debug!(%expression, error = %err.message, "rejected: not a single expression");
            return false;
        }
    };
    check_expr(&parsed, allowed_symbols)
}

/// Validates an already-parsed expression tree.
///
/// The rule compiler parses once and shares the tree between validation and
/// compilation; this is the same check [`is_safe`] applies after parsing.
pub(crate) fn check_expr(expr: &Expr, allowed_symbols: &HashSet<String>) -> bool {
    let mut checker = SafetyChecker::new(allowed_symbols);
    checker.check(expr)
}

/// Single-traversal whitelist checker.
///
/// `iteration_vars` collects generator loop targets as they are discovered
/// and accepts them as free names for the remainder of the traversal.
struct SafetyChecker<'a> {
    allowed: &'a HashSet<String>,
    iteration_vars: HashSet<String>,
}

impl<'a> SafetyChecker<'a> {
    fn new(allowed: &'a HashSet<String>) -> Self {
        Self {
            allowed,
            iteration_vars: HashSet::new(),
        }
    }

    fn symbol_allowed(&self, name: &str) -> bool {
        name == SKIP_SENTINEL || self.allowed.contains(name)
    }

    fn check(&mut self, expr: &Expr) -> bool {
        match &expr.kind {
            ExprKind::Number(_) => true,
            ExprKind::Str(text) => {
                // String literals are only meaningful as whitelisted sentinels
                // (e.g. set members compared against by name).
                let ok = self.symbol_allowed(text);
                if !ok {
                    debug!(literal = %text, "rejected: string literal is not a whitelisted symbol");
                }
                ok
            }
            ExprKind::Ident(name) => {
                let ok = self.symbol_allowed(name) || self.iteration_vars.contains(name);
                if !ok {
                    debug!(identifier = %name, "rejected: identifier is not whitelisted");
                }
                ok
            }
            ExprKind::Attribute { .. } => self.check_attribute(expr),
            ExprKind::Subscript { base, index } => self.check(base) && self.check(index),
            ExprKind::Unary { operand, .. } => self.check(operand),
            ExprKind::Binary { left, right, .. } => self.check(left) && self.check(right),
            ExprKind::Compare {
                left,
                ops,
                comparators,
            } => {
                self.check(left)
                    && ops.iter().all(|op| self.cmp_op_allowed(*op))
                    && comparators.iter().all(|comp| self.check(comp))
            }
            ExprKind::Tuple(items) | ExprKind::List(items) => {
                items.iter().all(|item| self.check(item))
            }
            ExprKind::IfExp { body, test, orelse } => {
                self.check(test) && self.check(body) && self.check(orelse)
            }
            ExprKind::Call { func, args } => self.check_call(func, args),
            ExprKind::Generator { element, clauses } => {
                // Targets are bound before the element and every iterable is
                // validated, so `sum(x[d] for d in s)` accepts `d`.
                for clause in clauses {
                    for target in &clause.targets {
                        self.iteration_vars.insert(target.clone());
                    }
                }
                self.check(element) && clauses.iter().all(|clause| self.check(&clause.iter))
            }
        }
    }

    /// Accepts attribute chains only as literally whitelisted dotted paths.
    ///
    /// There is no prefix or wildcard matching: `m.x` passes only when the
    /// whitelist contains the exact string `"m.x"`.
    fn check_attribute(&mut self, expr: &Expr) -> bool {
        let Some(path) = expr.dotted_path() else {
            debug!("rejected: attribute base is not a plain name chain");
            return false;
        };
        let ok = self.symbol_allowed(&path);
        if !ok {
            debug!(attribute = %path, "rejected: attribute path is not whitelisted");
        }
        ok
    }

    /// Accepts calls to the fixed helper set, or to whitelisted dotted paths.
    fn check_call(&mut self, func: &Expr, args: &[Expr]) -> bool {
        let target_ok = match &func.kind {
            ExprKind::Ident(name) => {
                let ok = AGGREGATE_FNS.contains(&name.as_str());
                if !ok {
                    debug!(function = %name, "rejected: call target is not an aggregation helper");
                }
                ok
            }
            ExprKind::Attribute { .. } => self.check_attribute(func),
            _ => {
                debug!("rejected: call target is neither a name nor an attribute path");
                false
            }
        };
        target_ok && args.iter().all(|arg| self.check(arg))
    }

    fn cmp_op_allowed(&self, op: CmpOp) -> bool {
        let ok = matches!(
            op,
            CmpOp::Eq | CmpOp::Gt | CmpOp::Lt | CmpOp::GtE | CmpOp::LtE
        );
        if !ok {
            debug!(operator = op.as_str(), "rejected: comparison operator is not allowed");
        }
        ok
    }
}
