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

//! Model construction: from a structured description to a linear program.
//!
//! Components register into an explicit name-to-component map. Each rule is
//! compiled against a whitelist assembled from the declared components, then
//! invoked once per index tuple over the cross-product of its declared index
//! sets. The rules see the model only through the component map handle.

use crate::eval::{
    flattened_var_name, render_key, Component, ComponentMap, EvalContext, IndexElem, LinExpr,
    ParamTable, Value, VarFamily,
};
use crate::rule::compile_rule;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;
use tracing::debug;

use super::errors::ModelError;
use super::lp::{LinearProgram, LpConstraint, LpVariable};
use super::spec::ModelSpec;

/// Matches `model.<component>` references in objective text.
const MODEL_REF_PATTERN: &str = r"model\.\w+";

/// Builds a linear program from a model description.
///
/// Any unsafe rule, missing rule, or evaluation failure aborts the whole
/// build; a partially constructed program is never returned.
pub fn construct_model(spec: &ModelSpec) -> Result<LinearProgram, ModelError> {
    let mut components: ComponentMap = BTreeMap::new();

    for set in &spec.sets {
        debug!(name = %set.name, "creating set");
        let elems: Vec<IndexElem> = set
            .initialize
            .iter()
            .cloned()
            .map(IndexElem::from)
            .collect();
        insert_component(&mut components, &set.name, Component::Set(elems))?;
    }

    if spec.variables.is_empty() {
        return Err(ModelError::NoVariables);
    }
    for var in &spec.variables {
        debug!(name = %var.name, "creating var");
        let domains = index_domains(&components, &var.name, &var.indexes)?;
        insert_component(
            &mut components,
            &var.name,
            Component::Var(VarFamily {
                name: var.name.clone(),
                index_domains: domains,
            }),
        )?;
    }

    for param in &spec.parameters {
        debug!(name = %param.name, "creating param");
        let domains = index_domains(&components, &param.name, &param.indexes)?;
        let mut values = HashMap::new();
        for (key_text, value) in &param.initialize {
            let key = parse_param_key(&param.name, key_text, &domains)?;
            if !param.within.contains(*value) {
                return Err(ModelError::ParamOutsideDomain {
                    param: param.name.clone(),
                    value: *value,
                    domain: param.within.as_str(),
                });
            }
            values.insert(key, *value);
        }
        insert_component(
            &mut components,
            &param.name,
            Component::Param(ParamTable {
                name: param.name.clone(),
                arity: param.indexes.len(),
                values,
            }),
        )?;
    }

    let handle = Rc::new(components);
    let ctx = EvalContext::new();
    let allowed = symbol_table(&handle);

    let mut lp_constraints = Vec::new();
    for constraint in &spec.constraints {
        if let Some(expr_text) = &constraint.expr {
            debug!(name = %constraint.name, expr = %expr_text, "creating constraint");
            let rule = compile_rule(expr_text, &allowed)?;
            let value = rule
                .call(&ctx, &[Value::Model(handle.clone())])
                .map_err(|source| ModelError::Eval {
                    name: constraint.name.clone(),
                    key: String::new(),
                    source,
                })?;
            push_relation(&mut lp_constraints, &constraint.name, &[], value)?;
        } else if let Some(rule_spec) = &constraint.rule {
            let rule_text = rule_spec.to_lambda_text();
            debug!(name = %constraint.name, rule = %rule_text, "creating indexed constraint");
            let mut rule_allowed = allowed.clone();
            rule_allowed.extend(rule_spec.lambda_arguments.iter().cloned());
            let rule = compile_rule(&rule_text, &rule_allowed)?;
            if rule.index_params().len() != constraint.idxs.len() {
                return Err(ModelError::IndexArity {
                    name: constraint.name.clone(),
                    declared: constraint.idxs.len(),
                    takes: rule.index_params().len(),
                });
            }

            let index_sets = index_domains(&handle, &constraint.name, &constraint.idxs)?;
            for key in cross_product(&index_sets) {
                let mut args = Vec::with_capacity(key.len() + 1);
                args.push(Value::Model(handle.clone()));
                args.extend(key.iter().cloned().map(Value::from));
                let value = rule.call(&ctx, &args).map_err(|source| ModelError::Eval {
                    name: constraint.name.clone(),
                    key: render_key(&key),
                    source,
                })?;
                push_relation(&mut lp_constraints, &constraint.name, &key, value)?;
            }
        } else {
            return Err(ModelError::MissingConstraintRule(constraint.name.clone()));
        }
    }

    let objective_text = if let Some(expr) = &spec.objective.expr {
        expr
    } else if let Some(rule) = &spec.objective.rule {
        rule
    } else {
        return Err(ModelError::MissingObjectiveRule);
    };
    debug!(objective = %objective_text, "creating objective");
    // The objective whitelist is scanned from its own text: every
    // `model.<name>` reference it mentions, and nothing else.
    let objective_refs = scan_model_refs(objective_text);
    let objective_rule = compile_rule(objective_text, &objective_refs)?;
    let objective_value = objective_rule
        .call(&ctx, &[Value::Model(handle.clone())])
        .map_err(|source| ModelError::Eval {
            name: "objective".to_string(),
            key: String::new(),
            source,
        })?;
    let objective = match objective_value {
        Value::Linear(expr) => expr,
        Value::Num(v) => LinExpr::from_constant(v),
        other => return Err(ModelError::NotLinearObjective(other.type_name())),
    };

    let mut variables = Vec::new();
    for var in &spec.variables {
        let Some(Component::Var(family)) = handle.get(&var.name) else {
            continue;
        };
        for key in cross_product(&family.index_domains) {
            variables.push(LpVariable {
                name: flattened_var_name(&family.name, &key),
                domain: var.domain,
            });
        }
    }

    Ok(LinearProgram {
        objective,
        sense: spec.objective.optimization_sense,
        constraints: lp_constraints,
        variables,
    })
}

fn insert_component(
    components: &mut ComponentMap,
    name: &str,
    component: Component,
) -> Result<(), ModelError> {
    if components.contains_key(name) {
        return Err(ModelError::DuplicateComponent(name.to_string()));
    }
    components.insert(name.to_string(), component);
    Ok(())
}

/// Resolves named index sets to their member lists.
fn index_domains(
    components: &ComponentMap,
    component: &str,
    set_names: &[String],
) -> Result<Vec<Vec<IndexElem>>, ModelError> {
    let mut domains = Vec::with_capacity(set_names.len());
    for set_name in set_names {
        match components.get(set_name) {
            Some(Component::Set(elems)) => domains.push(elems.clone()),
            _ => {
                return Err(ModelError::UnknownIndexSet {
                    component: component.to_string(),
                    set: set_name.clone(),
                });
            }
        }
    }
    Ok(domains)
}

/// Parses a parameter initializer key against the declared index sets.
///
/// Matching is by rendered member text, so `"0"` finds the integer member 0.
fn parse_param_key(
    param: &str,
    key_text: &str,
    domains: &[Vec<IndexElem>],
) -> Result<Vec<IndexElem>, ModelError> {
    if domains.is_empty() {
        return Ok(Vec::new());
    }
    let parts: Vec<&str> = if domains.len() == 1 {
        vec![key_text]
    } else {
        key_text.split(',').map(str::trim).collect()
    };
    if parts.len() != domains.len() {
        return Err(ModelError::BadParamKey {
            param: param.to_string(),
            key: key_text.to_string(),
            reason: format!("expected {} comma-joined part(s)", domains.len()),
        });
    }
    let mut key = Vec::with_capacity(parts.len());
    for (part, domain) in parts.iter().zip(domains.iter()) {
        let elem = domain.iter().find(|elem| elem.to_string() == *part);
        let Some(elem) = elem else {
            return Err(ModelError::BadParamKey {
                param: param.to_string(),
                key: key_text.to_string(),
                reason: format!("`{part}` is not a member of the index set"),
            });
        };
        key.push(elem.clone());
    }
    Ok(key)
}

/// Assembles the whitelist for constraint rules.
///
/// Every component contributes `model.<name>`, and every index value doubles
/// as a symbol so whitelisted string sentinels can appear in comparisons.
fn symbol_table(components: &ComponentMap) -> HashSet<String> {
    let mut allowed = HashSet::new();
    for (name, component) in components.iter() {
        allowed.insert(format!("model.{name}"));
        match component {
            Component::Set(elems) => {
                for elem in elems {
                    allowed.insert(elem.to_string());
                }
            }
            Component::Param(table) => {
                for key in table.values.keys() {
                    for elem in key {
                        allowed.insert(elem.to_string());
                    }
                }
            }
            Component::Var(family) => {
                for domain in &family.index_domains {
                    for elem in domain {
                        allowed.insert(elem.to_string());
                    }
                }
            }
        }
    }
    allowed
}

fn push_relation(
    out: &mut Vec<LpConstraint>,
    name: &str,
    key: &[IndexElem],
    value: Value,
) -> Result<(), ModelError> {
    match value {
        Value::Relation(relation) => {
            out.push(LpConstraint {
                name: flattened_var_name(name, key),
                expr: relation.expr,
                sense: relation.sense,
            });
            Ok(())
        }
        Value::Skip => {
            debug!(constraint = %name, key = %render_key(key), "skip sentinel, no constraint emitted");
            Ok(())
        }
        other => Err(ModelError::NotARelation {
            name: name.to_string(),
            key: render_key(key),
            got: other.type_name(),
        }),
    }
}

/// Enumerates the cross-product of index domains in declaration order.
///
/// With no domains the product is the single empty tuple (one scalar
/// instance), never the empty set.
fn cross_product(domains: &[Vec<IndexElem>]) -> Vec<Vec<IndexElem>> {
    let mut out = vec![Vec::new()];
    for domain in domains {
        let mut next = Vec::with_capacity(out.len() * domain.len());
        for prefix in &out {
            for elem in domain {
                let mut key = prefix.clone();
                key.push(elem.clone());
                next.push(key);
            }
        }
        out = next;
    }
    out
}

/// Collects the `model.<name>` references appearing in objective text.
fn scan_model_refs(text: &str) -> HashSet<String> {
    let pattern = Regex::new(MODEL_REF_PATTERN).expect("model reference pattern is valid");
    pattern
        .find_iter(text)
        .map(|found| found.as_str().to_string())
        .collect()
}
