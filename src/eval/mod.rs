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

//! Runtime values and the evaluation context.
//!
//! Validated rule bodies are interpreted by a tree-walking evaluator rather
//! than any host evaluation facility, so the accepted-construct set is
//! enforced identically at parse time and at execution time. Model components
//! reach the evaluator as an explicit, pre-declared name-to-component map,
//! never through runtime reflection.

mod exec;

pub(crate) use exec::Interpreter;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Coefficients below this threshold are dropped from linear expressions.
const COEFFICIENT_EPSILON: f64 = 1e-12;

/// One scalar index position (set member).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexElem {
    /// Integer index value.
    Int(i64),
    /// String index value.
    Str(String),
}

impl fmt::Display for IndexElem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexElem::Int(v) => write!(f, "{v}"),
            IndexElem::Str(s) => write!(f, "{s}"),
        }
    }
}

/// Renders an index tuple for flattened names and error messages.
pub(crate) fn render_key(key: &[IndexElem]) -> String {
    key.iter()
        .map(|elem| elem.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Returns the flattened solver name for one variable instance.
///
/// `staff["Mon"]` flattens to `staff__Mon`; a scalar variable keeps its name.
pub(crate) fn flattened_var_name(name: &str, key: &[IndexElem]) -> String {
    if key.is_empty() {
        return name.to_string();
    }
    let mut parts = vec![name.to_string()];
    parts.extend(key.iter().map(|elem| elem.to_string()));
    parts.join("__")
}

/// Numeric parameter table, indexed by tuples of set members.
///
/// A scalar parameter has arity 0 and stores its value under the empty key.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamTable {
    /// Component name.
    pub name: String,
    /// Number of index positions.
    pub arity: usize,
    /// Values keyed by index tuple.
    pub values: HashMap<Vec<IndexElem>, f64>,
}

/// Decision-variable family with its declared index domains.
#[derive(Debug, Clone, PartialEq)]
pub struct VarFamily {
    /// Component name.
    pub name: String,
    /// Declared member values for each index position, in order.
    pub index_domains: Vec<Vec<IndexElem>>,
}

impl VarFamily {
    /// Number of index positions.
    pub fn arity(&self) -> usize {
        self.index_domains.len()
    }
}

/// A declared model component, keyed by name in the component map.
#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    /// An index set.
    Set(Vec<IndexElem>),
    /// A numeric parameter table.
    Param(ParamTable),
    /// A decision-variable family.
    Var(VarFamily),
}

/// Explicit name-to-component map handed to rules as their model argument.
pub type ComponentMap = BTreeMap<String, Component>;

/// Affine expression over flattened decision-variable names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinExpr {
    terms: BTreeMap<String, f64>,
    constant: f64,
}

impl LinExpr {
    /// The zero expression.
    pub fn zero() -> Self {
        Self::default()
    }

    /// A constant expression.
    pub fn from_constant(v: f64) -> Self {
        Self {
            terms: BTreeMap::new(),
            constant: v,
        }
    }

    /// A single-variable term.
    pub fn from_term(name: impl Into<String>, coefficient: f64) -> Self {
        let mut expr = Self::zero();
        if coefficient != 0.0 {
            expr.terms.insert(name.into(), coefficient);
        }
        expr
    }

    /// Adds `other` into `self`.
    pub fn add_inplace(&mut self, other: &LinExpr) {
        self.constant += other.constant;
        for (name, coefficient) in other.terms.iter() {
            *self.terms.entry(name.clone()).or_insert(0.0) += *coefficient;
        }
        self.terms.retain(|_, c| c.abs() > COEFFICIENT_EPSILON);
    }

    /// Subtracts `other` from `self`.
    pub fn sub_inplace(&mut self, other: &LinExpr) {
        self.constant -= other.constant;
        for (name, coefficient) in other.terms.iter() {
            *self.terms.entry(name.clone()).or_insert(0.0) -= *coefficient;
        }
        self.terms.retain(|_, c| c.abs() > COEFFICIENT_EPSILON);
    }

    /// Returns `self` scaled by `k`.
    pub fn scale(&self, k: f64) -> Self {
        let mut expr = Self::zero();
        expr.constant = self.constant * k;
        for (name, coefficient) in self.terms.iter() {
            let scaled = coefficient * k;
            if scaled.abs() > COEFFICIENT_EPSILON {
                expr.terms.insert(name.clone(), scaled);
            }
        }
        expr
    }

    /// Returns whether the expression has no variable terms.
    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    /// Returns the constant part.
    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// Returns the coefficient for a flattened variable name (0 when absent).
    pub fn coefficient(&self, name: &str) -> f64 {
        self.terms.get(name).copied().unwrap_or(0.0)
    }

    /// Iterates `(name, coefficient)` terms in name order.
    pub fn terms(&self) -> impl Iterator<Item = (&str, f64)> {
        self.terms.iter().map(|(name, c)| (name.as_str(), *c))
    }

    /// Number of variable terms.
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }
}

/// Constraint sense relative to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    /// `expr <= 0`.
    Le,
    /// `expr >= 0`.
    Ge,
    /// `expr == 0`.
    Eq,
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sense::Le => write!(f, "<="),
            Sense::Ge => write!(f, ">="),
            Sense::Eq => write!(f, "="),
        }
    }
}

/// One linear constraint instance: `expr (sense) 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    /// Left-hand side with the right-hand side folded in.
    pub expr: LinExpr,
    /// Comparison sense against zero.
    pub sense: Sense,
}

/// Runtime value produced by rule evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Numeric value.
    Num(f64),
    /// String value.
    Str(String),
    /// Boolean value (comparison results).
    Bool(bool),
    /// Sequence value (sets, tuples, lists, generator results).
    Seq(Vec<Value>),
    /// Affine expression over decision variables.
    Linear(LinExpr),
    /// Linear constraint instance.
    Relation(Relation),
    /// The "emit no constraint here" sentinel.
    Skip,
    /// Indexed parameter handle.
    Param(ParamTable),
    /// Indexed decision-variable handle.
    Var(VarFamily),
    /// Model handle: the pre-declared component map.
    Model(Rc<ComponentMap>),
}

impl Value {
    /// Human-readable type label used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Num(_) => "number",
            Value::Str(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Seq(_) => "sequence",
            Value::Linear(_) => "linear expression",
            Value::Relation(_) => "relation",
            Value::Skip => "skip sentinel",
            Value::Param(_) => "parameter",
            Value::Var(_) => "variable",
            Value::Model(_) => "model",
        }
    }

    /// Extracts the numeric payload when this value is a number.
    pub fn as_num(&self) -> Option<f64> {
        match self {
            Value::Num(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Num(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Num(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<IndexElem> for Value {
    fn from(elem: IndexElem) -> Self {
        match elem {
            IndexElem::Int(v) => Value::Num(v as f64),
            IndexElem::Str(s) => Value::Str(s),
        }
    }
}

/// Global bindings visible to every rule invocation.
///
/// The context is plain data: nothing is resolved reflectively, and
/// evaluation never mutates it, so a compiled rule can be invoked repeatedly.
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    globals: HashMap<String, Value>,
}

impl EvalContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a global name.
    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.globals.insert(name.into(), value);
    }

    /// Looks up a global name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }
}

/// Runtime failures raised while interpreting a validated rule body.
#[derive(Debug, Error)]
pub enum EvalError {
    /// Invocation arity does not match the rule's parameter list.
    #[error("rule expects {expected} argument(s), got {got}")]
    RuleArity { expected: usize, got: usize },
    /// A free name resolved to nothing.
    #[error("unknown name `{0}`")]
    UnknownName(String),
    /// Attribute lookup on the model found no component.
    #[error("model has no component `{0}`")]
    UnknownComponent(String),
    /// Attribute lookup on a non-model value.
    #[error("{0} value has no attributes")]
    NoAttributes(&'static str),
    /// Call target is not an aggregation helper.
    #[error("`{0}` is not callable")]
    NotCallable(String),
    /// Aggregation helper invoked with the wrong number of arguments.
    #[error("{func}() expects {expected} argument(s), got {got}")]
    HelperArity {
        func: &'static str,
        expected: &'static str,
        got: usize,
    },
    /// `ord` argument is not a single-character string.
    #[error("ord() expects a single-character string")]
    OrdArgument,
    /// `range` bound is not an integer.
    #[error("range() bounds must be integers")]
    RangeBound,
    /// Operator applied to incompatible operand types.
    #[error("operator `{op}` is not defined for {left} and {right}")]
    BadOperands {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },
    /// Unary operator applied to an incompatible operand.
    #[error("unary `{op}` is not defined for {operand}")]
    BadUnary {
        op: &'static str,
        operand: &'static str,
    },
    /// An operation would make a decision-variable expression nonlinear.
    #[error("expression over decision variables must stay linear")]
    NonLinear,
    /// `<` / `>` against a decision-variable expression.
    #[error("strict inequalities cannot bound decision variables")]
    StrictInequality,
    /// A comparison chain touched a decision-variable expression.
    #[error("chained comparisons cannot bound decision variables")]
    RangedRelation,
    /// Conditional test did not produce a boolean.
    #[error("condition must be a boolean, got {0}")]
    NonBoolCondition(&'static str),
    /// Subscript on a value without members.
    #[error("{0} value cannot be subscripted")]
    NotSubscriptable(&'static str),
    /// Iteration over a non-sequence.
    #[error("{0} value cannot be iterated")]
    NotIterable(&'static str),
    /// Sequence index outside the valid span.
    #[error("sequence index {0} is out of range")]
    IndexOutOfRange(i64),
    /// Index value of an unusable type.
    #[error("invalid index: {0}")]
    BadIndex(String),
    /// Component subscripted with the wrong number of index values.
    #[error("`{name}` expects {expected} index value(s), got {got}")]
    SubscriptArity {
        name: String,
        expected: usize,
        got: usize,
    },
    /// Variable subscripted outside its declared index domain.
    #[error("`{name}` has no member at index [{key}]")]
    UnknownIndex { name: String, key: String },
    /// Parameter lookup miss.
    #[error("parameter `{name}` has no value at index [{key}]")]
    MissingParamValue { name: String, key: String },
    /// Numeric division/modulo by zero.
    #[error("division by zero")]
    DivisionByZero,
    /// Destructuring loop target mismatch.
    #[error("cannot unpack a value of length {got} into {expected} loop target(s)")]
    TargetArity { expected: usize, got: usize },
}
