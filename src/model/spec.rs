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

//! Structured model descriptions.
//!
//! These types mirror the JSON the upstream language-model layer produces: a
//! declarative list of sets, parameters, variables, and constraints, with
//! rule text carried as strings. Unknown fields are ignored on purpose: the
//! upstream schema carries bookkeeping this layer has no use for.

use crate::eval::IndexElem;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Optimization direction for the objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationSense {
    /// Maximize the objective.
    Maximize,
    /// Minimize the objective.
    Minimize,
}

/// Value domains assignable to variables and parameter tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Domain {
    NonNegativeIntegers,
    NonNegativeReals,
    NonPositiveIntegers,
    NonPositiveReals,
    Integers,
    Reals,
}

impl Domain {
    /// Returns whether the domain restricts values to integers.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Domain::NonNegativeIntegers | Domain::NonPositiveIntegers | Domain::Integers
        )
    }

    /// Lower bound, when the domain imposes one.
    pub fn lower_bound(self) -> Option<f64> {
        match self {
            Domain::NonNegativeIntegers | Domain::NonNegativeReals => Some(0.0),
            _ => None,
        }
    }

    /// Upper bound, when the domain imposes one.
    pub fn upper_bound(self) -> Option<f64> {
        match self {
            Domain::NonPositiveIntegers | Domain::NonPositiveReals => Some(0.0),
            _ => None,
        }
    }

    /// Returns whether `value` is a member of the domain.
    pub fn contains(self, value: f64) -> bool {
        if self.is_integer() && value.fract() != 0.0 {
            return false;
        }
        if let Some(lower) = self.lower_bound() {
            if value < lower {
                return false;
            }
        }
        if let Some(upper) = self.upper_bound() {
            if value > upper {
                return false;
            }
        }
        true
    }

    /// Returns the domain's declared name.
    pub fn as_str(self) -> &'static str {
        match self {
            Domain::NonNegativeIntegers => "NonNegativeIntegers",
            Domain::NonNegativeReals => "NonNegativeReals",
            Domain::NonPositiveIntegers => "NonPositiveIntegers",
            Domain::NonPositiveReals => "NonPositiveReals",
            Domain::Integers => "Integers",
            Domain::Reals => "Reals",
        }
    }
}

/// One index value in a set initializer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum IndexValue {
    /// Integer set member.
    Int(i64),
    /// String set member.
    Str(String),
}

impl From<IndexValue> for IndexElem {
    fn from(value: IndexValue) -> Self {
        match value {
            IndexValue::Int(v) => IndexElem::Int(v),
            IndexValue::Str(s) => IndexElem::Str(s),
        }
    }
}

/// Index set declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct SetSpec {
    /// Component name.
    pub name: String,
    /// Member values, in declaration order.
    pub initialize: Vec<IndexValue>,
    /// Short description.
    #[serde(default)]
    pub doc: String,
}

/// Decision-variable declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct VarSpec {
    /// Component name.
    pub name: String,
    /// Names of the index sets; empty for a scalar variable.
    #[serde(default)]
    pub indexes: Vec<String>,
    /// Value domain.
    pub domain: Domain,
    /// Short description.
    #[serde(default)]
    pub doc: String,
}

/// Parameter-table declaration.
///
/// `initialize` keys are rendered index tuples; multi-index keys are
/// comma-joined (`"Mon,1"`). A scalar parameter carries a single entry whose
/// key text is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ParamSpec {
    /// Component name.
    pub name: String,
    /// Names of the index sets; empty for a scalar parameter.
    #[serde(default)]
    pub indexes: Vec<String>,
    /// Values keyed by rendered index tuple.
    pub initialize: BTreeMap<String, f64>,
    /// Domain every value must belong to.
    pub within: Domain,
    /// Short description.
    #[serde(default)]
    pub doc: String,
}

/// Lambda-shaped rule carried as separate parts.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleSpec {
    /// Parameter names, the model slot first.
    pub lambda_arguments: Vec<String>,
    /// Rule body text.
    pub lambda_body: String,
}

impl RuleSpec {
    /// Reassembles the canonical lambda text the compiler consumes.
    pub fn to_lambda_text(&self) -> String {
        format!(
            "lambda {}: {}",
            self.lambda_arguments.join(", "),
            self.lambda_body
        )
    }
}

/// Constraint declaration: either a closed expression or an indexed rule.
#[derive(Debug, Clone, Deserialize)]
pub struct ConstraintSpec {
    /// Constraint name.
    pub name: String,
    /// Index set names the rule is instantiated over, in binding order.
    #[serde(default)]
    pub idxs: Vec<String>,
    /// Closed expression form (no index parameters).
    #[serde(default)]
    pub expr: Option<String>,
    /// Indexed rule form.
    #[serde(default)]
    pub rule: Option<RuleSpec>,
    /// Short description.
    #[serde(default)]
    pub doc: String,
}

/// Objective declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectiveSpec {
    /// Closed expression form.
    #[serde(default)]
    pub expr: Option<String>,
    /// Rule-text form (may be lambda-shaped).
    #[serde(default)]
    pub rule: Option<String>,
    /// Optimization direction.
    pub optimization_sense: OptimizationSense,
}

/// Complete model description.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelSpec {
    /// Objective declaration.
    pub objective: ObjectiveSpec,
    /// Index sets.
    #[serde(default)]
    pub sets: Vec<SetSpec>,
    /// Parameter tables.
    #[serde(default)]
    pub parameters: Vec<ParamSpec>,
    /// Decision variables.
    pub variables: Vec<VarSpec>,
    /// Constraints.
    #[serde(default)]
    pub constraints: Vec<ConstraintSpec>,
}

impl ModelSpec {
    /// Deserializes a model description from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
