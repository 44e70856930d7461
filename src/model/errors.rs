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

//! Errors surfaced while constructing a model from its description.

use crate::eval::EvalError;
use crate::rule::ExpressionNotSafeError;
use thiserror::Error;

/// Model-construction failures.
///
/// An unsafe rule aborts construction of the entire model: there is no
/// partial or degraded result.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A rule or expression failed safety validation.
    #[error(transparent)]
    UnsafeExpression(#[from] ExpressionNotSafeError),
    /// A constraint supplied neither a rule nor an expression.
    #[error("constraint `{0}` must have either a rule or an expression")]
    MissingConstraintRule(String),
    /// The objective supplied neither a rule nor an expression.
    #[error("objective must have either a rule or an expression")]
    MissingObjectiveRule,
    /// Two components share a name.
    #[error("duplicate component `{0}`")]
    DuplicateComponent(String),
    /// The description declares no decision variables.
    #[error("model declares no variables")]
    NoVariables,
    /// A component references an index set that was never declared.
    #[error("`{component}` references unknown index set `{set}`")]
    UnknownIndexSet { component: String, set: String },
    /// A parameter initializer key does not match the declared index sets.
    #[error("parameter `{param}`: bad index key `{key}`: {reason}")]
    BadParamKey {
        param: String,
        key: String,
        reason: String,
    },
    /// A parameter value falls outside its declared domain.
    #[error("parameter `{param}` value {value} lies outside {domain}")]
    ParamOutsideDomain {
        param: String,
        value: f64,
        domain: &'static str,
    },
    /// Declared index sets and rule index parameters disagree in number.
    #[error(
        "constraint `{name}` declares {declared} index set(s) but its rule takes {takes} index parameter(s)"
    )]
    IndexArity {
        name: String,
        declared: usize,
        takes: usize,
    },
    /// A compiled rule failed at evaluation time.
    #[error("rule evaluation failed for `{name}` at index [{key}]: {source}")]
    Eval {
        name: String,
        key: String,
        #[source]
        source: EvalError,
    },
    /// A constraint rule produced something other than a relation or skip.
    #[error("constraint `{name}` at index [{key}] produced {got}, expected a relation")]
    NotARelation {
        name: String,
        key: String,
        got: &'static str,
    },
    /// The objective rule did not produce a linear expression.
    #[error("objective produced {0}, expected a linear expression")]
    NotLinearObjective(&'static str),
}
