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

//! Tree-walking interpreter over validated rule bodies.

use crate::ast::{BinOp, CmpOp, CompClause, Expr, ExprKind, UnaryOp};
use crate::safety::SKIP_SENTINEL;
use std::collections::HashMap;

use super::{
    flattened_var_name, render_key, Component, EvalContext, EvalError, IndexElem, LinExpr,
    Relation, Sense, Value,
};

/// Interpreter state for one rule invocation.
///
/// Holds the shared context plus a scope stack: the bottom scope carries the
/// bound rule parameters, and generator expressions push/pop their own.
pub(crate) struct Interpreter<'a> {
    ctx: &'a EvalContext,
    scopes: Vec<HashMap<String, Value>>,
}

impl<'a> Interpreter<'a> {
    pub(crate) fn new(ctx: &'a EvalContext) -> Self {
        Self {
            ctx,
            scopes: Vec::new(),
        }
    }

    /// Binds `params` to `args` positionally and evaluates `body`.
    pub(crate) fn run(
        mut self,
        params: &[String],
        args: &[Value],
        body: &Expr,
    ) -> Result<Value, EvalError> {
        if params.len() != args.len() {
            return Err(EvalError::RuleArity {
                expected: params.len(),
                got: args.len(),
            });
        }
        let scope = params
            .iter()
            .cloned()
            .zip(args.iter().cloned())
            .collect::<HashMap<_, _>>();
        self.scopes.push(scope);
        let result = self.eval(body);
        let _ = self.scopes.pop();
        result
    }

    fn resolve_binding(&self, name: &str) -> Option<Value> {
        for scope in self.scopes.iter().rev() {
            if let Some(value) = scope.get(name) {
                return Some(value.clone());
            }
        }
        self.ctx.get(name).cloned()
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        match &expr.kind {
            ExprKind::Number(v) => Ok(Value::Num(*v)),
            ExprKind::Str(s) => Ok(Value::Str(s.clone())),
            ExprKind::Ident(name) => self
                .resolve_binding(name)
                .ok_or_else(|| EvalError::UnknownName(name.clone())),
            ExprKind::Attribute { base, attr } => self.eval_attribute(expr, base, attr),
            ExprKind::Subscript { base, index } => self.eval_subscript(base, index),
            ExprKind::Unary { op, operand } => {
                let value = self.eval(operand)?;
                apply_unary(*op, value)
            }
            ExprKind::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                apply_binary(*op, left, right)
            }
            ExprKind::Compare {
                left,
                ops,
                comparators,
            } => self.eval_compare(left, ops, comparators),
            ExprKind::Tuple(items) | ExprKind::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.eval(item)?);
                }
                Ok(Value::Seq(out))
            }
            ExprKind::IfExp { body, test, orelse } => {
                // Only the selected branch is evaluated.
                let test_value = self.eval(test)?;
                let Value::Bool(truth) = test_value else {
                    return Err(EvalError::NonBoolCondition(test_value.type_name()));
                };
                if truth {
                    self.eval(body)
                } else {
                    self.eval(orelse)
                }
            }
            ExprKind::Call { func, args } => self.eval_call(func, args),
            ExprKind::Generator { element, clauses } => self.eval_generator(element, clauses),
        }
    }

    fn eval_attribute(&mut self, expr: &Expr, base: &Expr, attr: &str) -> Result<Value, EvalError> {
        // The skip sentinel resolves before any lookup: `Constraint` itself
        // is never a bound name.
        if let Some(path) = expr.dotted_path() {
            if path == SKIP_SENTINEL {
                return Ok(Value::Skip);
            }
        }
        let base_value = self.eval(base)?;
        match base_value {
            Value::Model(components) => match components.get(attr) {
                Some(component) => component_to_value(component),
                None => Err(EvalError::UnknownComponent(attr.to_string())),
            },
            other => Err(EvalError::NoAttributes(other.type_name())),
        }
    }

    fn eval_subscript(&mut self, base: &Expr, index: &Expr) -> Result<Value, EvalError> {
        let base_value = self.eval(base)?;
        let index_value = self.eval(index)?;
        match base_value {
            Value::Seq(items) => {
                // Sequences index by position, negative counts from the end.
                let idx = int_index(&index_value)?;
                let len = items.len() as i64;
                let actual = if idx < 0 { idx + len } else { idx };
                if actual < 0 || actual >= len {
                    return Err(EvalError::IndexOutOfRange(idx));
                }
                Ok(items[actual as usize].clone())
            }
            Value::Param(table) => {
                let key = index_key(&index_value)?;
                if key.len() != table.arity {
                    return Err(EvalError::SubscriptArity {
                        name: table.name.clone(),
                        expected: table.arity,
                        got: key.len(),
                    });
                }
                match table.values.get(&key) {
                    Some(v) => Ok(Value::Num(*v)),
                    None => Err(EvalError::MissingParamValue {
                        name: table.name.clone(),
                        key: render_key(&key),
                    }),
                }
            }
            Value::Var(family) => {
                let key = index_key(&index_value)?;
                if key.len() != family.arity() {
                    return Err(EvalError::SubscriptArity {
                        name: family.name.clone(),
                        expected: family.arity(),
                        got: key.len(),
                    });
                }
                for (position, domain) in key.iter().zip(family.index_domains.iter()) {
                    if !domain.contains(position) {
                        return Err(EvalError::UnknownIndex {
                            name: family.name.clone(),
                            key: render_key(&key),
                        });
                    }
                }
                Ok(Value::Linear(LinExpr::from_term(
                    flattened_var_name(&family.name, &key),
                    1.0,
                )))
            }
            other => Err(EvalError::NotSubscriptable(other.type_name())),
        }
    }

    fn eval_compare(
        &mut self,
        left: &Expr,
        ops: &[CmpOp],
        comparators: &[Expr],
    ) -> Result<Value, EvalError> {
        let first = self.eval(left)?;
        if ops.len() == 1 {
            let right = self.eval(&comparators[0])?;
            return match compare_pair(&first, ops[0], &right)? {
                Compared::Bool(b) => Ok(Value::Bool(b)),
                Compared::Rel(rel) => Ok(Value::Relation(rel)),
            };
        }

        // Chains fold conjunctively over adjacent pairs; a decision variable
        // anywhere in the chain cannot produce a single-sense relation.
        let mut prev = first;
        let mut all = true;
        for (op, comparator) in ops.iter().zip(comparators.iter()) {
            let next = self.eval(comparator)?;
            match compare_pair(&prev, *op, &next)? {
                Compared::Bool(b) => all = all && b,
                Compared::Rel(_) => return Err(EvalError::RangedRelation),
            }
            prev = next;
        }
        Ok(Value::Bool(all))
    }

    fn eval_call(&mut self, func: &Expr, args: &[Expr]) -> Result<Value, EvalError> {
        match &func.kind {
            ExprKind::Ident(name) => match name.as_str() {
                "sum" => self.builtin_sum(args),
                "ord" => self.builtin_ord(args),
                "range" => self.builtin_range(args),
                other => Err(EvalError::NotCallable(other.to_string())),
            },
            // Dotted paths name components; components are data, not callables.
            _ => Err(EvalError::NotCallable(
                func.dotted_path()
                    .unwrap_or_else(|| "<expression>".to_string()),
            )),
        }
    }

    fn builtin_sum(&mut self, args: &[Expr]) -> Result<Value, EvalError> {
        let [arg] = args else {
            return Err(EvalError::HelperArity {
                func: "sum",
                expected: "1",
                got: args.len(),
            });
        };
        let value = self.eval(arg)?;
        let Value::Seq(items) = value else {
            return Err(EvalError::NotIterable(value.type_name()));
        };
        let mut acc = Value::Num(0.0);
        for item in items {
            acc = apply_binary(BinOp::Add, acc, item)?;
        }
        Ok(acc)
    }

    fn builtin_ord(&mut self, args: &[Expr]) -> Result<Value, EvalError> {
        let [arg] = args else {
            return Err(EvalError::HelperArity {
                func: "ord",
                expected: "1",
                got: args.len(),
            });
        };
        let value = self.eval(arg)?;
        let Value::Str(s) = &value else {
            return Err(EvalError::OrdArgument);
        };
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(Value::Num(c as u32 as f64)),
            _ => Err(EvalError::OrdArgument),
        }
    }

    fn builtin_range(&mut self, args: &[Expr]) -> Result<Value, EvalError> {
        if args.is_empty() || args.len() > 2 {
            return Err(EvalError::HelperArity {
                func: "range",
                expected: "1 or 2",
                got: args.len(),
            });
        }
        let mut bounds = Vec::with_capacity(args.len());
        for arg in args {
            let value = self.eval(arg)?;
            match value {
                Value::Num(v) if v.fract() == 0.0 && v.is_finite() => bounds.push(v as i64),
                _ => return Err(EvalError::RangeBound),
            }
        }
        let (start, stop) = if bounds.len() == 1 {
            (0, bounds[0])
        } else {
            (bounds[0], bounds[1])
        };
        Ok(Value::Seq(
            (start..stop).map(|i| Value::Num(i as f64)).collect(),
        ))
    }

    fn eval_generator(
        &mut self,
        element: &Expr,
        clauses: &[CompClause],
    ) -> Result<Value, EvalError> {
        let mut out = Vec::new();
        self.scopes.push(HashMap::new());
        let result = self.expand_clauses(element, clauses, &mut out);
        let _ = self.scopes.pop();
        result?;
        Ok(Value::Seq(out))
    }

    fn expand_clauses(
        &mut self,
        element: &Expr,
        clauses: &[CompClause],
        out: &mut Vec<Value>,
    ) -> Result<(), EvalError> {
        let Some((clause, rest)) = clauses.split_first() else {
            out.push(self.eval(element)?);
            return Ok(());
        };
        let iterable = self.eval(&clause.iter)?;
        let Value::Seq(items) = iterable else {
            return Err(EvalError::NotIterable(iterable.type_name()));
        };
        for item in items {
            self.bind_targets(&clause.targets, item)?;
            self.expand_clauses(element, rest, out)?;
        }
        Ok(())
    }

    fn bind_targets(&mut self, targets: &[String], item: Value) -> Result<(), EvalError> {
        let scope = self
            .scopes
            .last_mut()
            .expect("generator evaluation always runs within a scope");
        if targets.len() == 1 {
            scope.insert(targets[0].clone(), item);
            return Ok(());
        }
        let Value::Seq(parts) = item else {
            return Err(EvalError::TargetArity {
                expected: targets.len(),
                got: 1,
            });
        };
        if parts.len() != targets.len() {
            return Err(EvalError::TargetArity {
                expected: targets.len(),
                got: parts.len(),
            });
        }
        for (target, part) in targets.iter().zip(parts.into_iter()) {
            scope.insert(target.clone(), part);
        }
        Ok(())
    }
}

/// Converts a looked-up component into its evaluation-time value.
///
/// Scalar parameters and variables collapse immediately; indexed ones stay
/// as handles awaiting a subscript.
fn component_to_value(component: &Component) -> Result<Value, EvalError> {
    match component {
        Component::Set(elems) => Ok(Value::Seq(
            elems.iter().cloned().map(Value::from).collect(),
        )),
        Component::Param(table) => {
            if table.arity == 0 {
                match table.values.get(&Vec::new()) {
                    Some(v) => Ok(Value::Num(*v)),
                    None => Err(EvalError::MissingParamValue {
                        name: table.name.clone(),
                        key: String::new(),
                    }),
                }
            } else {
                Ok(Value::Param(table.clone()))
            }
        }
        Component::Var(family) => {
            if family.arity() == 0 {
                Ok(Value::Linear(LinExpr::from_term(family.name.clone(), 1.0)))
            } else {
                Ok(Value::Var(family.clone()))
            }
        }
    }
}

fn apply_unary(op: UnaryOp, value: Value) -> Result<Value, EvalError> {
    match (op, value) {
        (UnaryOp::Neg, Value::Num(v)) => Ok(Value::Num(-v)),
        (UnaryOp::Neg, Value::Linear(e)) => Ok(Value::Linear(e.scale(-1.0))),
        (UnaryOp::Pos, v @ (Value::Num(_) | Value::Linear(_))) => Ok(v),
        (op, v) => Err(EvalError::BadUnary {
            op: op.as_str(),
            operand: v.type_name(),
        }),
    }
}

/// Applies a binary operator, promoting to linear algebra when a decision
/// variable is involved.
pub(crate) fn apply_binary(op: BinOp, left: Value, right: Value) -> Result<Value, EvalError> {
    if let (Value::Num(a), Value::Num(b)) = (&left, &right) {
        return numeric_binary(op, *a, *b);
    }

    let involves_linear =
        matches!(left, Value::Linear(_)) || matches!(right, Value::Linear(_));
    if !involves_linear {
        return Err(EvalError::BadOperands {
            op: op.as_str(),
            left: left.type_name(),
            right: right.type_name(),
        });
    }
    let (Some(lhs), Some(rhs)) = (to_linear(&left), to_linear(&right)) else {
        return Err(EvalError::BadOperands {
            op: op.as_str(),
            left: left.type_name(),
            right: right.type_name(),
        });
    };

    match op {
        BinOp::Add => {
            let mut expr = lhs;
            expr.add_inplace(&rhs);
            Ok(Value::Linear(expr))
        }
        BinOp::Sub => {
            let mut expr = lhs;
            expr.sub_inplace(&rhs);
            Ok(Value::Linear(expr))
        }
        // Only constant * linear stays linear.
        BinOp::Mul => {
            if rhs.is_constant() {
                Ok(Value::Linear(lhs.scale(rhs.constant())))
            } else if lhs.is_constant() {
                Ok(Value::Linear(rhs.scale(lhs.constant())))
            } else {
                Err(EvalError::NonLinear)
            }
        }
        BinOp::Div => {
            if !rhs.is_constant() {
                return Err(EvalError::NonLinear);
            }
            if rhs.constant() == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(Value::Linear(lhs.scale(1.0 / rhs.constant())))
        }
        BinOp::FloorDiv | BinOp::Mod | BinOp::Pow => Err(EvalError::NonLinear),
    }
}

fn numeric_binary(op: BinOp, a: f64, b: f64) -> Result<Value, EvalError> {
    let v = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => {
            if b == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            a / b
        }
        BinOp::FloorDiv => {
            if b == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            (a / b).floor()
        }
        // Result carries the divisor's sign: `(-1) % 7 == 6`.
        BinOp::Mod => {
            if b == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            a - b * (a / b).floor()
        }
        BinOp::Pow => a.powf(b),
    };
    Ok(Value::Num(v))
}

fn to_linear(value: &Value) -> Option<LinExpr> {
    match value {
        Value::Num(v) => Some(LinExpr::from_constant(*v)),
        Value::Linear(e) => Some(e.clone()),
        _ => None,
    }
}

enum Compared {
    Bool(bool),
    Rel(Relation),
}

fn compare_pair(left: &Value, op: CmpOp, right: &Value) -> Result<Compared, EvalError> {
    // A decision variable on either side turns the comparison into a
    // constraint instance rather than a truth value.
    if matches!(left, Value::Linear(_)) || matches!(right, Value::Linear(_)) {
        let (Some(lhs), Some(rhs)) = (to_linear(left), to_linear(right)) else {
            return Err(EvalError::BadOperands {
                op: op.as_str(),
                left: left.type_name(),
                right: right.type_name(),
            });
        };
        let sense = match op {
            CmpOp::Eq => Sense::Eq,
            CmpOp::LtE => Sense::Le,
            CmpOp::GtE => Sense::Ge,
            CmpOp::Lt | CmpOp::Gt => return Err(EvalError::StrictInequality),
            CmpOp::NotEq => {
                return Err(EvalError::BadOperands {
                    op: op.as_str(),
                    left: left.type_name(),
                    right: right.type_name(),
                })
            }
        };
        let mut expr = lhs;
        expr.sub_inplace(&rhs);
        return Ok(Compared::Rel(Relation { expr, sense }));
    }

    match (left, right) {
        (Value::Num(a), Value::Num(b)) => {
            let truth = match op {
                CmpOp::Eq => a == b,
                CmpOp::Lt => a < b,
                CmpOp::LtE => a <= b,
                CmpOp::Gt => a > b,
                CmpOp::GtE => a >= b,
                // The construct allow-list never admits `!=`.
                CmpOp::NotEq => {
                    return Err(EvalError::BadOperands {
                        op: op.as_str(),
                        left: "number",
                        right: "number",
                    })
                }
            };
            Ok(Compared::Bool(truth))
        }
        (Value::Str(a), Value::Str(b)) if op == CmpOp::Eq => Ok(Compared::Bool(a == b)),
        _ => Err(EvalError::BadOperands {
            op: op.as_str(),
            left: left.type_name(),
            right: right.type_name(),
        }),
    }
}

fn int_index(value: &Value) -> Result<i64, EvalError> {
    match value {
        Value::Num(v) if v.fract() == 0.0 && v.is_finite() => Ok(*v as i64),
        other => Err(EvalError::BadIndex(other.type_name().to_string())),
    }
}

fn index_elem(value: &Value) -> Result<IndexElem, EvalError> {
    match value {
        Value::Num(v) if v.fract() == 0.0 && v.is_finite() => Ok(IndexElem::Int(*v as i64)),
        Value::Str(s) => Ok(IndexElem::Str(s.clone())),
        other => Err(EvalError::BadIndex(other.type_name().to_string())),
    }
}

/// Converts a subscript value into an index tuple.
pub(crate) fn index_key(value: &Value) -> Result<Vec<IndexElem>, EvalError> {
    match value {
        Value::Seq(items) => items.iter().map(index_elem).collect(),
        single => Ok(vec![index_elem(single)?]),
    }
}
