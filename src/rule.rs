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

//! Rule compilation: from untrusted expression text to an invocable rule.
//!
//! A rule string is either a bare expression or a `lambda <params>: <body>`
//! form. Detection is a literal-substring heuristic (the `lambda` keyword,
//! then a split at the first colon), deliberately kept as-is, ambiguities
//! included; the edge cases are pinned by tests.

use crate::ast::Expr;
use crate::eval::{EvalContext, EvalError, Interpreter, Value};
use crate::parser::parse_expression;
use crate::safety::check_expr;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use tracing::debug;

/// Parameter name a bare expression is implicitly wrapped with.
const IMPLICIT_MODEL_PARAM: &str = "model";

/// Validation failure raised by [`compile_rule`].
///
/// This is the compiler's only error kind: parse failures, rejected
/// constructs, and unsplittable lambda text all surface here, carrying the
/// offending body and the symbol set in effect for diagnosis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionNotSafeError {
    /// The rejected expression body.
    pub expression: String,
    /// The whitelist in effect, sorted for stable diagnostics.
    pub allowed_symbols: BTreeSet<String>,
}

impl ExpressionNotSafeError {
    fn new(expression: &str, allowed_symbols: &HashSet<String>) -> Self {
        Self {
            expression: expression.to_string(),
            allowed_symbols: allowed_symbols.iter().cloned().collect(),
        }
    }
}

impl fmt::Display for ExpressionNotSafeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expression is not safe: `{}`", self.expression)?;
        if self.allowed_symbols.is_empty() {
            return write!(f, " (no symbols are whitelisted)");
        }
        let symbols = self
            .allowed_symbols
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, " (whitelisted symbols: {symbols})")
    }
}

impl std::error::Error for ExpressionNotSafeError {}

/// A compiled rule: the validated body plus its parameter list.
///
/// The first parameter is the model/context slot; the rest are index
/// parameters bound positionally by the caller, once per index tuple.
#[derive(Debug, Clone)]
pub struct Rule {
    source: String,
    params: Vec<String>,
    body: Expr,
}

impl Rule {
    /// Returns the original expression text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the full parameter list, model slot included.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Returns the index parameters in declared order (everything after the
    /// model slot).
    pub fn index_params(&self) -> &[String] {
        self.params.get(1..).unwrap_or(&[])
    }

    /// Returns the index parameter names as a set.
    pub fn index_parameter_names(&self) -> BTreeSet<String> {
        self.index_params().iter().cloned().collect()
    }

    /// Invokes the rule with positional arguments matching [`Rule::params`].
    ///
    /// Evaluation is pure: the same context and arguments always produce the
    /// same result, and a rule can be invoked any number of times.
    pub fn call(&self, ctx: &EvalContext, args: &[Value]) -> Result<Value, EvalError> {
        Interpreter::new(ctx).run(&self.params, args, &self.body)
    }
}

/// Compiles untrusted rule text against a symbol whitelist.
///
/// Parameters extracted from a lambda form join the whitelist for the body
/// check. Parameter text is trimmed but not otherwise validated; with a
/// tree-walking evaluator a malformed parameter is inert, since a validated
/// body can never reference it.
pub fn compile_rule(
    expression: &str,
    allowed_symbols: &HashSet<String>,
) -> Result<Rule, ExpressionNotSafeError> {
    debug!(%expression, "compiling rule expression");
    let Some((params, body_text)) = split_lambda(expression) else {
        // `lambda` with no colon cannot be split into parameters and a body.
        return Err(ExpressionNotSafeError::new(expression, allowed_symbols));
    };

    let mut effective: HashSet<String> = allowed_symbols.clone();
    effective.extend(params.iter().cloned());

    let body = match parse_expression(&body_text) {
        Ok(body) => body,
        Err(_) => return Err(ExpressionNotSafeError::new(&body_text, &effective)),
    };
    if !check_expr(&body, &effective) {
        return Err(ExpressionNotSafeError::new(&body_text, &effective));
    }

    debug!(params = ?params, "rule body validated");
    Ok(Rule {
        source: expression.to_string(),
        params,
        body,
    })
}

/// Splits lambda-shaped text into parameters and body.
///
/// Returns `None` when the text contains `lambda` but no colon to split at.
/// The split point is the *first* colon in the whole text, so a colon that
/// precedes the intended one (e.g. inside a subscript) wins, a preserved
/// quirk.
fn split_lambda(expression: &str) -> Option<(Vec<String>, String)> {
    if !expression.contains("lambda") {
        return Some((
            vec![IMPLICIT_MODEL_PARAM.to_string()],
            expression.to_string(),
        ));
    }

    let (left, right) = expression.split_once(':')?;
    let params_text = left
        .find("lambda")
        .map(|pos| &left[pos + "lambda".len()..])
        .unwrap_or("");
    let params = params_text
        .trim()
        .split(',')
        .map(|param| param.trim().to_string())
        .collect();
    Some((params, right.trim().to_string()))
}
