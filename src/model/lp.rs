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

//! The constructed linear program and its LP-format rendering.
//!
//! The program is the hand-off artifact: solver invocation belongs to an
//! external collaborator, which consumes the LP text.

use crate::eval::{LinExpr, Sense};

use super::spec::{Domain, OptimizationSense};

/// One instantiated decision variable with its value domain.
#[derive(Debug, Clone, PartialEq)]
pub struct LpVariable {
    /// Flattened instance name (`staff__Mon`).
    pub name: String,
    /// Declared value domain.
    pub domain: Domain,
}

/// One named linear constraint: `expr (sense) 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct LpConstraint {
    /// Instance name (`cover__0`).
    pub name: String,
    /// Left-hand side with the right-hand side folded in.
    pub expr: LinExpr,
    /// Comparison sense against zero.
    pub sense: Sense,
}

impl LpConstraint {
    /// Right-hand side after moving the constant across the comparison.
    pub fn rhs(&self) -> f64 {
        -self.expr.constant()
    }
}

/// A fully instantiated linear program.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearProgram {
    /// Objective expression.
    pub objective: LinExpr,
    /// Optimization direction.
    pub sense: OptimizationSense,
    /// Instantiated constraints in declaration order.
    pub constraints: Vec<LpConstraint>,
    /// Instantiated variables in declaration order.
    pub variables: Vec<LpVariable>,
}

impl LinearProgram {
    /// Renders the program in CPLEX LP format.
    pub fn to_lp_string(&self) -> String {
        let mut out = String::new();
        match self.sense {
            OptimizationSense::Minimize => out.push_str("Minimize\n obj: "),
            OptimizationSense::Maximize => out.push_str("Maximize\n obj: "),
        }
        out.push_str(&fmt_objective(&self.objective));
        out.push('\n');

        out.push_str("Subject To\n");
        for constraint in &self.constraints {
            out.push_str(&format!(
                " {}: {} {} {}\n",
                constraint.name,
                fmt_terms(&constraint.expr),
                constraint.sense,
                fmt_num(constraint.rhs())
            ));
        }

        // The LP default bound is `0 <= x`; only other shapes need spelling out.
        let mut bounds = Vec::new();
        for variable in &self.variables {
            match variable.domain {
                Domain::NonPositiveIntegers | Domain::NonPositiveReals => {
                    bounds.push(format!(" -inf <= {} <= 0\n", variable.name));
                }
                Domain::Integers | Domain::Reals => {
                    bounds.push(format!(" {} free\n", variable.name));
                }
                Domain::NonNegativeIntegers | Domain::NonNegativeReals => {}
            }
        }
        if !bounds.is_empty() {
            out.push_str("Bounds\n");
            for bound in bounds {
                out.push_str(&bound);
            }
        }

        let integers: Vec<&str> = self
            .variables
            .iter()
            .filter(|variable| variable.domain.is_integer())
            .map(|variable| variable.name.as_str())
            .collect();
        if !integers.is_empty() {
            out.push_str("General\n");
            for name in integers {
                out.push_str(&format!(" {name}\n"));
            }
        }

        out.push_str("End\n");
        out
    }
}

fn fmt_terms(expr: &LinExpr) -> String {
    let mut parts: Vec<String> = Vec::new();
    for (name, coefficient) in expr.terms() {
        if (coefficient - 1.0).abs() < 1e-12 {
            parts.push(format!("+1 {name}"));
        } else if (coefficient + 1.0).abs() < 1e-12 {
            parts.push(format!("-1 {name}"));
        } else {
            parts.push(format!("{coefficient:+.6} {name}"));
        }
    }
    if parts.is_empty() {
        parts.push("+0".to_string());
    }
    parts.join(" ")
}

fn fmt_objective(expr: &LinExpr) -> String {
    let mut rendered = fmt_terms(expr);
    if expr.constant().abs() > 1e-12 {
        rendered.push_str(&format!(" {:+.6}", expr.constant()));
    }
    rendered
}

fn fmt_num(v: f64) -> String {
    if (v - v.round()).abs() < 1e-9 {
        format!("{}", v.round() as i64)
    } else {
        format!("{v:.6}")
    }
}
