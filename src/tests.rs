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

//! Crate unit tests.

use super::*;
use serde_json::json;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;

fn symbols(names: &[&str]) -> HashSet<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn first_caret_column(pointer: &str) -> Option<usize> {
    pointer.chars().position(|ch| ch == '^').map(|idx| idx + 1)
}

fn assert_parse_error_case(case_name: &str, source: &str) {
    let err = parse_expression(source).expect_err("parse should fail");
    assert_eq!(err.line, 1, "{case_name}: unexpected error line");
    assert!(err.column > 0, "{case_name}: expected non-zero column");
    assert!(
        err.message.contains("Syntax error") || err.message.contains("Incomplete input"),
        "{case_name}: unexpected message '{}'",
        err.message
    );

    let expected_snippet = source.lines().next().unwrap_or_default();
    assert_eq!(
        err.snippet, expected_snippet,
        "{case_name}: snippet should match source line"
    );
    assert!(
        err.pointer.contains('^'),
        "{case_name}: missing caret pointer"
    );
    assert_eq!(
        first_caret_column(&err.pointer),
        Some(err.column.min(expected_snippet.chars().count() + 1)),
        "{case_name}: caret column mismatch"
    );
}

fn eval_expression(
    expression: &str,
    allowed: &[&str],
    bindings: &[(&str, Value)],
) -> Result<Value, EvalError> {
    let rule = compile_rule(expression, &symbols(allowed)).expect("expression should compile");
    let mut ctx = EvalContext::new();
    for (name, value) in bindings {
        ctx.bind(*name, value.clone());
    }
    rule.call(&ctx, &[Value::Model(Rc::new(ComponentMap::new()))])
}

fn eval_number(expression: &str) -> f64 {
    match eval_expression(expression, &[], &[]) {
        Ok(Value::Num(v)) => v,
        other => panic!("expected a number for `{expression}`, got {other:?}"),
    }
}

fn staffing_components() -> ComponentMap {
    let days = vec![
        IndexElem::Str("Mon".to_string()),
        IndexElem::Str("Tue".to_string()),
        IndexElem::Str("Wed".to_string()),
    ];
    let mut demand = HashMap::new();
    demand.insert(vec![IndexElem::Str("Mon".to_string())], 2.0);
    demand.insert(vec![IndexElem::Str("Tue".to_string())], 3.0);

    let mut components = ComponentMap::new();
    components.insert("days".to_string(), Component::Set(days.clone()));
    components.insert(
        "staff".to_string(),
        Component::Var(VarFamily {
            name: "staff".to_string(),
            index_domains: vec![days],
        }),
    );
    components.insert(
        "demand".to_string(),
        Component::Param(ParamTable {
            name: "demand".to_string(),
            arity: 1,
            values: demand,
        }),
    );
    components.insert(
        "total".to_string(),
        Component::Var(VarFamily {
            name: "total".to_string(),
            index_domains: Vec::new(),
        }),
    );
    components
}

fn eval_on_model(expression: &str, allowed: &[&str]) -> Result<Value, EvalError> {
    let rule = compile_rule(expression, &symbols(allowed)).expect("expression should compile");
    rule.call(
        &EvalContext::new(),
        &[Value::Model(Rc::new(staffing_components()))],
    )
}

fn staffing_description() -> serde_json::Value {
    json!({
        "objective": {
            "rule": "sum(model.staff[d] for d in model.days)",
            "optimization_sense": "minimize"
        },
        "sets": [
            { "name": "days", "initialize": ["Mon", "Tue", "Wed"], "doc": "planning days" }
        ],
        "parameters": [
            {
                "name": "demand",
                "indexes": ["days"],
                "initialize": { "Mon": 2, "Tue": 3, "Wed": 1 },
                "within": "NonNegativeReals"
            }
        ],
        "variables": [
            { "name": "staff", "indexes": ["days"], "domain": "NonNegativeIntegers" }
        ],
        "constraints": [
            {
                "name": "cover",
                "idxs": ["days"],
                "rule": {
                    "lambda_arguments": ["model", "d"],
                    "lambda_body": "model.staff[d] >= model.demand[d]"
                }
            }
        ]
    })
}

fn build_model(description: serde_json::Value) -> Result<LinearProgram, ModelError> {
    let spec =
        ModelSpec::from_json(&description.to_string()).expect("description should deserialize");
    construct_model(&spec)
}

#[test]
fn accepts_arithmetic_over_whitelisted_names() {
    let cases = vec![
        ("x + 2", vec!["x"]),
        ("x * 2 - 1 / 4", vec!["x"]),
        ("-x + +2", vec!["x"]),
        ("x // 2 % 3 ** 2", vec!["x"]),
        ("(x, 1)", vec!["x"]),
        ("[x, 2, 3]", vec!["x"]),
        ("x[0]", vec!["x"]),
        ("x[d, 2]", vec!["x", "d"]),
        ("0 <= x", vec!["x"]),
        ("0 <= x <= 10", vec!["x"]),
        ("1 if x == 1 else 2", vec!["x"]),
        ("m.x + m.y", vec!["m.x", "m.y"]),
        ("sum(x)", vec!["x"]),
        ("range(7)", vec![]),
        ("ord('a')", vec!["a"]),
        ("m.f(1, 2)", vec!["m.f"]),
    ];

    for (expression, allowed) in cases {
        assert!(
            is_safe(expression, &symbols(&allowed)),
            "`{expression}` should be safe with {allowed:?}"
        );
    }
}

#[test]
fn rejects_free_identifiers_outside_the_whitelist() {
    let cases = vec![
        ("y + 2", vec!["x"]),
        ("x + y", vec!["x"]),
        ("m.x", vec!["m"]),
        ("m.x", vec![]),
        ("x[d]", vec!["x"]),
        ("sum(q for d in s)", vec!["s"]),
    ];

    for (expression, allowed) in cases {
        assert!(
            !is_safe(expression, &symbols(&allowed)),
            "`{expression}` should be unsafe with {allowed:?}"
        );
    }
}

#[test]
fn rejects_calls_outside_the_helper_allow_list() {
    let cases = vec![
        ("__import__('os').system('ls')", vec![]),
        ("min(x, 1)", vec!["x"]),
        ("eval('1')", vec!["1"]),
        ("m.f(1)", vec!["m"]),
        ("(x)(1)", vec!["x"]),
        ("sum(x).real", vec!["x"]),
    ];

    for (expression, allowed) in cases {
        assert!(
            !is_safe(expression, &symbols(&allowed)),
            "`{expression}` should be unsafe with {allowed:?}"
        );
    }
}

#[test]
fn accepts_comprehension_bound_names() {
    let allowed = symbols(&["m.x", "m.wd", "m.epsilon", "d"]);
    assert!(is_safe(
        "sum(m.x[(d+w)%7] for w in m.wd) >= m.epsilon[d]",
        &allowed
    ));
    // `q` is free: no generator clause binds it.
    assert!(!is_safe(
        "sum(m.x[(d+q)%7] for w in m.wd) >= m.epsilon[d]",
        &allowed
    ));

    assert!(is_safe(
        "sum(a * b for (a, b) in m.pairs)",
        &symbols(&["m.pairs"])
    ));
    assert!(is_safe(
        "sum(i + j for i in range(3) for j in range(3))",
        &symbols(&[])
    ));
    assert!(is_safe("[w * 2 for w in m.wd]", &symbols(&["m.wd"])));
}

#[test]
fn string_literals_pass_only_as_whitelisted_sentinels() {
    assert!(is_safe("'Mon'", &symbols(&["Mon"])));
    assert!(is_safe("d == 'Mon'", &symbols(&["d", "Mon"])));
    assert!(!is_safe("'Tue'", &symbols(&["Mon"])));
    assert!(!is_safe("d == 'Tue'", &symbols(&["d", "Mon"])));
}

#[test]
fn skip_sentinel_is_always_allowed() {
    assert!(is_safe("Constraint.Skip", &symbols(&[])));
    assert!(is_safe(
        "Constraint.Skip if d == 0 else x",
        &symbols(&["d", "x"])
    ));
}

#[test]
fn rejects_not_equal_anywhere_in_a_comparison_chain() {
    assert!(!is_safe("x != 1", &symbols(&["x"])));
    assert!(!is_safe("0 <= x != 2", &symbols(&["x"])));
    assert!(is_safe("0 <= x <= 2", &symbols(&["x"])));
}

#[test]
fn attribute_paths_match_literally_without_prefixes() {
    assert!(is_safe("m.a.b", &symbols(&["m.a.b"])));
    assert!(!is_safe("m.a.b", &symbols(&["m.a"])));
    assert!(!is_safe("m.a", &symbols(&["m.a.b"])));
}

#[test]
fn rejects_unparsable_input_without_panicking() {
    let cases = vec![
        "",
        "x +",
        "(x",
        "x = 1",
        "x := 1",
        "import os",
        "lambda m: m.x",
        "x; y",
        "f'{x}'",
        "a if b",
        "{'a': 1}",
        "*x",
        "x[]",
    ];

    for expression in cases {
        assert!(
            !is_safe(expression, &symbols(&["x", "a", "b", "m.x", "os"])),
            "`{expression}` should be unsafe"
        );
    }
}

#[test]
fn is_safe_is_idempotent() {
    let allowed = symbols(&["x"]);
    assert_eq!(is_safe("x + 2", &allowed), is_safe("x + 2", &allowed));
    assert_eq!(is_safe("y + 2", &allowed), is_safe("y + 2", &allowed));
    assert!(is_safe("x + 2", &allowed));
    assert!(!is_safe("y + 2", &allowed));
}

#[test]
fn reports_line_and_column_for_syntax_errors() {
    let cases = vec![
        ("missing rhs", "x + "),
        ("unclosed paren", "(x + 1"),
        ("unclosed bracket", "m.x[d"),
        ("unclosed string", "'Mon"),
        ("missing else arm", "1 if x"),
        ("trailing garbage", "x + 1 extra"),
        ("random garbage", "@@@"),
        ("empty input", ""),
    ];

    for (case_name, source) in cases {
        assert_parse_error_case(case_name, source);
    }
}

#[test]
fn parse_error_display_includes_snippet_and_caret() {
    let err = parse_expression("m.x[d").expect_err("parse should fail");
    let rendered = err.to_string();
    assert!(rendered.contains("line 1"));
    assert!(rendered.contains("m.x[d"));
    assert!(rendered.contains('^'));
}

#[test]
fn parses_operator_precedence() {
    let cases = vec![
        ("2 + 3 * 4", 14.0),
        ("(2 + 3) * 4", 20.0),
        ("10 - 4 - 3", 3.0),
        ("2 ** 3 ** 2", 512.0),
        ("-2 ** 2", -4.0),
        ("2 ** -1", 0.5),
        ("7 // 2", 3.0),
        ("-7 // 2", -4.0),
        ("7 % 3", 1.0),
        ("-1 % 7", 6.0),
        ("1 / 4", 0.25),
    ];

    for (expression, expected) in cases {
        assert_eq!(
            eval_number(expression),
            expected,
            "`{expression}` evaluated wrong"
        );
    }
}

#[test]
fn compiles_lambda_rules_with_index_parameters() {
    let rule = compile_rule("lambda a,b: a + b", &symbols(&["a", "b"])).expect("rule");

    assert_eq!(rule.params(), ["a", "b"]);
    assert_eq!(rule.index_params(), ["b"]);
    let expected: BTreeSet<String> = ["b".to_string()].into_iter().collect();
    assert_eq!(rule.index_parameter_names(), expected);

    let result = rule
        .call(&EvalContext::new(), &[Value::Num(1.0), Value::Num(2.0)])
        .expect("call");
    assert_eq!(result, Value::Num(3.0));
}

#[test]
fn compiles_bare_expressions_with_an_implicit_model_parameter() {
    let rule = compile_rule("x + 2", &symbols(&["x"])).expect("rule");

    assert_eq!(rule.params(), ["model"]);
    assert!(rule.index_params().is_empty());
    assert!(rule.index_parameter_names().is_empty());

    let mut ctx = EvalContext::new();
    ctx.bind("x", Value::Num(5.0));
    let result = rule.call(&ctx, &[Value::Num(0.0)]).expect("call");
    assert_eq!(result, Value::Num(7.0));
}

#[test]
fn compiles_the_weekly_staffing_rule_from_parts() {
    let rule = compile_rule(
        "lambda model, i: sum(model.staff[model.DAYS[(i + j) % 7]] for j in range(5)) >= model.demand[model.DAYS[i]]",
        &symbols(&["model.DAYS", "model.staff", "model.demand"]),
    )
    .expect("rule");
    assert_eq!(rule.index_params(), ["i"]);
}

#[test]
fn rejects_rules_with_no_whitelisted_symbols() {
    let err = compile_rule("x + 2", &symbols(&[])).expect_err("compile should fail");
    assert_eq!(err.expression, "x + 2");
    // The effective whitelist still carries the implicit model parameter.
    assert!(err.allowed_symbols.contains("model"));
    assert!(!err.allowed_symbols.contains("x"));
}

#[test]
fn rejects_injection_attempts() {
    let err = compile_rule("__import__('os').system('ls')", &symbols(&[]))
        .expect_err("compile should fail");
    assert!(err.expression.contains("__import__"));
}

#[test]
fn lambda_split_takes_first_colon() {
    // The first colon is the parameter separator; later colons stay in the body.
    let rule = compile_rule("lambda m: m.costs[':']", &symbols(&["m.costs", ":"])).expect("rule");
    assert_eq!(rule.params(), ["m"]);

    // A colon ahead of the keyword hijacks the split and ruins the body, even
    // though the same text validates fine as a bare expression.
    let allowed = symbols(&["m.flags", ":", "lambda"]);
    assert!(is_safe("m.flags[':'] == 'lambda'", &allowed));
    compile_rule("m.flags[':'] == 'lambda'", &allowed).expect_err("split quirk should reject");
}

#[test]
fn lambda_substring_in_an_identifier_triggers_the_split() {
    // `lambda_flag` is an ordinary identifier, but the substring check fires
    // and there is no colon to split at.
    let allowed = symbols(&["lambda_flag"]);
    compile_rule("lambda_flag + 1", &allowed).expect_err("compile should fail");
    compile_rule("lambda m", &allowed).expect_err("compile should fail");
}

#[test]
fn error_display_lists_the_whitelist() {
    let err = compile_rule("q", &symbols(&["a", "b"])).expect_err("compile should fail");
    let rendered = err.to_string();
    assert!(rendered.contains("expression is not safe: `q`"));
    assert!(rendered.contains("a, b"));

    // A bare expression always carries the implicit model parameter, so the
    // reported whitelist is never empty.
    let err = compile_rule("q", &symbols(&[])).expect_err("compile should fail");
    assert!(err.to_string().contains("model"));
}

#[test]
fn evaluates_comparison_chains_conjunctively() {
    assert_eq!(
        eval_expression("1 <= 2 <= 3", &[], &[]).expect("eval"),
        Value::Bool(true)
    );
    assert_eq!(
        eval_expression("1 <= 2 <= 1", &[], &[]).expect("eval"),
        Value::Bool(false)
    );
    assert_eq!(
        eval_expression("'Mon' == 'Mon'", &["Mon"], &[]).expect("eval"),
        Value::Bool(true)
    );
}

#[test]
fn division_by_zero_is_an_evaluation_error() {
    for expression in ["1 / 0", "1 // 0", "1 % 0"] {
        let err = eval_expression(expression, &[], &[]).expect_err("eval should fail");
        assert!(
            matches!(err, EvalError::DivisionByZero),
            "`{expression}`: unexpected error {err}"
        );
    }
}

#[test]
fn selects_only_one_conditional_branch() {
    // `missing` is whitelisted but never bound; the untaken branch must not
    // be evaluated.
    let value = eval_expression("1 if 2 > 1 else missing", &["missing"], &[]).expect("eval");
    assert_eq!(value, Value::Num(1.0));

    let err =
        eval_expression("missing if 2 > 1 else 1", &["missing"], &[]).expect_err("eval should fail");
    assert!(matches!(err, EvalError::UnknownName(name) if name == "missing"));
}

#[test]
fn aggregates_with_sum_ord_and_range() {
    assert_eq!(eval_number("sum(i * 2 for i in range(4))"), 12.0);
    assert_eq!(eval_number("sum(range(1, 4))"), 6.0);
    assert_eq!(
        eval_expression("ord('b') - ord('a')", &["a", "b"], &[]).expect("eval"),
        Value::Num(1.0)
    );

    let err = eval_expression("sum(1, 2)", &[], &[]).expect_err("eval should fail");
    assert!(matches!(err, EvalError::HelperArity { func: "sum", .. }));
    let err = eval_expression("range(1, 2, 3)", &[], &[]).expect_err("eval should fail");
    assert!(matches!(err, EvalError::HelperArity { func: "range", .. }));
    let err = eval_expression("ord('ab')", &["ab"], &[]).expect_err("eval should fail");
    assert!(matches!(err, EvalError::OrdArgument));
    let err = eval_expression("range(1.5)", &[], &[]).expect_err("eval should fail");
    assert!(matches!(err, EvalError::RangeBound));
}

#[test]
fn destructures_tuple_targets_in_generators() {
    let pairs = Value::Seq(vec![
        Value::Seq(vec![Value::Num(2.0), Value::Num(3.0)]),
        Value::Seq(vec![Value::Num(4.0), Value::Num(5.0)]),
    ]);
    let value = eval_expression(
        "sum(a * b for (a, b) in pairs)",
        &["pairs"],
        &[("pairs", pairs)],
    )
    .expect("eval");
    assert_eq!(value, Value::Num(26.0));

    let ragged = Value::Seq(vec![Value::Seq(vec![
        Value::Num(1.0),
        Value::Num(2.0),
        Value::Num(3.0),
    ])]);
    let err = eval_expression(
        "sum(a + b for (a, b) in pairs)",
        &["pairs"],
        &[("pairs", ragged)],
    )
    .expect_err("eval should fail");
    assert!(matches!(
        err,
        EvalError::TargetArity {
            expected: 2,
            got: 3
        }
    ));
}

#[test]
fn multi_clause_generators_walk_the_cross_product() {
    assert_eq!(eval_number("sum(i + j for i in range(2) for j in range(2))"), 4.0);
}

#[test]
fn negative_indices_count_from_the_end() {
    let days = Value::Seq(vec![
        Value::Str("Mon".to_string()),
        Value::Str("Tue".to_string()),
        Value::Str("Wed".to_string()),
    ]);

    let value =
        eval_expression("days[-1]", &["days"], &[("days", days.clone())]).expect("eval");
    assert_eq!(value, Value::Str("Wed".to_string()));
    let value = eval_expression("days[0]", &["days"], &[("days", days.clone())]).expect("eval");
    assert_eq!(value, Value::Str("Mon".to_string()));

    let err = eval_expression("days[3]", &["days"], &[("days", days.clone())])
        .expect_err("eval should fail");
    assert!(matches!(err, EvalError::IndexOutOfRange(3)));
    let err =
        eval_expression("days[-4]", &["days"], &[("days", days)]).expect_err("eval should fail");
    assert!(matches!(err, EvalError::IndexOutOfRange(-4)));
}

#[test]
fn builds_linear_expressions_from_model_components() {
    let value = eval_on_model(
        "model.staff['Mon'] + 2 * model.staff['Tue']",
        &["model.staff", "Mon", "Tue"],
    )
    .expect("eval");
    let Value::Linear(expr) = value else {
        panic!("expected a linear expression, got {value:?}");
    };
    assert_eq!(expr.coefficient("staff__Mon"), 1.0);
    assert_eq!(expr.coefficient("staff__Tue"), 2.0);
    assert_eq!(expr.constant(), 0.0);

    // Scalar parameters and variables collapse without a subscript.
    let value = eval_on_model("model.demand['Mon'] + 1", &["model.demand", "Mon"]).expect("eval");
    assert_eq!(value, Value::Num(3.0));

    let value = eval_on_model("model.total", &["model.total"]).expect("eval");
    let Value::Linear(expr) = value else {
        panic!("expected a linear expression, got {value:?}");
    };
    assert_eq!(expr.coefficient("total"), 1.0);
}

#[test]
fn comparisons_with_variables_produce_relations() {
    let value = eval_on_model(
        "model.staff['Mon'] >= model.demand['Mon']",
        &["model.staff", "model.demand", "Mon"],
    )
    .expect("eval");
    let Value::Relation(relation) = value else {
        panic!("expected a relation, got {value:?}");
    };
    assert_eq!(relation.sense, Sense::Ge);
    assert_eq!(relation.expr.coefficient("staff__Mon"), 1.0);
    assert_eq!(relation.expr.constant(), -2.0);

    let err = eval_on_model("model.staff['Mon'] > 1", &["model.staff", "Mon"])
        .expect_err("eval should fail");
    assert!(matches!(err, EvalError::StrictInequality));

    let err = eval_on_model("0 <= model.staff['Mon'] <= 5", &["model.staff", "Mon"])
        .expect_err("eval should fail");
    assert!(matches!(err, EvalError::RangedRelation));
}

#[test]
fn nonlinear_operations_are_rejected_at_evaluation() {
    let allowed = &["model.staff", "Mon", "Tue"];

    let err = eval_on_model("model.staff['Mon'] * model.staff['Tue']", allowed)
        .expect_err("eval should fail");
    assert!(matches!(err, EvalError::NonLinear));
    let err = eval_on_model("model.staff['Mon'] // 2", allowed).expect_err("eval should fail");
    assert!(matches!(err, EvalError::NonLinear));
    let err = eval_on_model("2 / model.staff['Mon']", allowed).expect_err("eval should fail");
    assert!(matches!(err, EvalError::NonLinear));
    let err = eval_on_model("model.staff['Mon'] / 0", allowed).expect_err("eval should fail");
    assert!(matches!(err, EvalError::DivisionByZero));

    let value = eval_on_model("model.staff['Mon'] / 2", allowed).expect("eval");
    let Value::Linear(expr) = value else {
        panic!("expected a linear expression, got {value:?}");
    };
    assert_eq!(expr.coefficient("staff__Mon"), 0.5);
}

#[test]
fn skip_sentinel_evaluates_to_skip() {
    let value = eval_on_model("Constraint.Skip", &[]).expect("eval");
    assert!(matches!(value, Value::Skip));

    let value =
        eval_on_model("Constraint.Skip if 1 == 1 else model.total", &["model.total"]).expect("eval");
    assert!(matches!(value, Value::Skip));
}

#[test]
fn subscript_errors_name_the_component() {
    let err = eval_on_model("model.demand['Wed']", &["model.demand", "Wed"])
        .expect_err("eval should fail");
    assert!(
        matches!(&err, EvalError::MissingParamValue { name, key } if name == "demand" && key == "Wed")
    );

    let err = eval_on_model("model.staff['Sun']", &["model.staff", "Sun"])
        .expect_err("eval should fail");
    assert!(matches!(&err, EvalError::UnknownIndex { name, .. } if name == "staff"));

    let err = eval_on_model("model.staff['Mon', 'Tue']", &["model.staff", "Mon", "Tue"])
        .expect_err("eval should fail");
    assert!(matches!(
        err,
        EvalError::SubscriptArity {
            expected: 1,
            got: 2,
            ..
        }
    ));

    let err = eval_on_model("model.ghost", &["model.ghost"]).expect_err("eval should fail");
    assert!(matches!(&err, EvalError::UnknownComponent(name) if name == "ghost"));

    let err = eval_on_model("model.staff.name", &["model.staff.name"])
        .expect_err("eval should fail");
    assert!(matches!(err, EvalError::NoAttributes("variable")));

    // Components are data, never callables.
    let err = eval_on_model("model.staff(1)", &["model.staff"]).expect_err("eval should fail");
    assert!(matches!(&err, EvalError::NotCallable(name) if name == "model.staff"));
}

#[test]
fn rules_are_pure_and_reinvocable() {
    let rule = compile_rule("x + 1", &symbols(&["x"])).expect("rule");
    let mut ctx = EvalContext::new();
    ctx.bind("x", Value::Num(1.0));

    let first = rule.call(&ctx, &[Value::Num(0.0)]).expect("call");
    let second = rule.call(&ctx, &[Value::Num(0.0)]).expect("call");
    assert_eq!(first, second);

    let err = rule
        .call(&ctx, &[Value::Num(0.0), Value::Num(1.0)])
        .expect_err("call should fail");
    assert!(matches!(
        err,
        EvalError::RuleArity {
            expected: 1,
            got: 2
        }
    ));
}

#[test]
fn evaluates_a_weekly_coverage_rule() {
    let week: Vec<IndexElem> = (0..7).map(IndexElem::Int).collect();
    let mut epsilon = HashMap::new();
    epsilon.insert(vec![IndexElem::Int(5)], 1.0);

    let mut components = ComponentMap::new();
    components.insert(
        "wd".to_string(),
        Component::Set((0..5).map(IndexElem::Int).collect()),
    );
    components.insert(
        "x".to_string(),
        Component::Var(VarFamily {
            name: "x".to_string(),
            index_domains: vec![week],
        }),
    );
    components.insert(
        "epsilon".to_string(),
        Component::Param(ParamTable {
            name: "epsilon".to_string(),
            arity: 1,
            values: epsilon,
        }),
    );

    let rule = compile_rule(
        "lambda model, d: sum(model.x[(d + w) % 7] for w in model.wd) >= model.epsilon[d]",
        &symbols(&["model.x", "model.wd", "model.epsilon"]),
    )
    .expect("rule");
    let value = rule
        .call(
            &EvalContext::new(),
            &[Value::Model(Rc::new(components)), Value::Num(5.0)],
        )
        .expect("call");

    let Value::Relation(relation) = value else {
        panic!("expected a relation, got {value:?}");
    };
    assert_eq!(relation.sense, Sense::Ge);
    assert_eq!(relation.expr.term_count(), 5);
    for day in [5, 6, 0, 1, 2] {
        assert_eq!(relation.expr.coefficient(&format!("x__{day}")), 1.0);
    }
    assert_eq!(relation.expr.constant(), -1.0);
}

#[test]
fn constructs_a_linear_program_from_a_model_description() {
    let lp = build_model(staffing_description()).expect("model should build");

    assert_eq!(lp.sense, OptimizationSense::Minimize);
    assert_eq!(lp.objective.term_count(), 3);
    for day in ["Mon", "Tue", "Wed"] {
        assert_eq!(lp.objective.coefficient(&format!("staff__{day}")), 1.0);
    }

    assert_eq!(lp.constraints.len(), 3);
    assert_eq!(lp.constraints[0].name, "cover__Mon");
    assert_eq!(lp.constraints[0].sense, Sense::Ge);
    assert_eq!(lp.constraints[0].expr.coefficient("staff__Mon"), 1.0);
    assert_eq!(lp.constraints[0].rhs(), 2.0);
    assert_eq!(lp.constraints[2].name, "cover__Wed");
    assert_eq!(lp.constraints[2].rhs(), 1.0);

    let names: Vec<&str> = lp.variables.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, ["staff__Mon", "staff__Tue", "staff__Wed"]);
    assert!(lp
        .variables
        .iter()
        .all(|v| v.domain == Domain::NonNegativeIntegers));
}

#[test]
fn emits_lp_format_text() {
    let lp = build_model(staffing_description()).expect("model should build");
    let text = lp.to_lp_string();

    assert!(text.starts_with("Minimize\n obj: +1 staff__Mon +1 staff__Tue +1 staff__Wed\n"));
    assert!(text.contains("Subject To\n"));
    assert!(text.contains(" cover__Mon: +1 staff__Mon >= 2\n"));
    assert!(text.contains(" cover__Tue: +1 staff__Tue >= 3\n"));
    assert!(text.contains(" cover__Wed: +1 staff__Wed >= 1\n"));
    assert!(text.contains("General\n staff__Mon\n staff__Tue\n staff__Wed\n"));
    assert!(text.ends_with("End\n"));
}

#[test]
fn skip_sentinel_suppresses_constraint_instances() {
    let mut description = staffing_description();
    description["constraints"][0]["rule"]["lambda_body"] =
        json!("Constraint.Skip if d == 'Wed' else model.staff[d] >= model.demand[d]");

    let lp = build_model(description).expect("model should build");
    assert_eq!(lp.constraints.len(), 2);
    assert!(lp.constraints.iter().all(|c| c.name != "cover__Wed"));
}

#[test]
fn constraints_require_a_rule_or_an_expression() {
    let mut description = staffing_description();
    description["constraints"][0] = json!({ "name": "empty", "idxs": [] });
    let err = build_model(description).expect_err("build should fail");
    assert!(matches!(err, ModelError::MissingConstraintRule(name) if name == "empty"));

    let mut description = staffing_description();
    description["objective"] = json!({ "optimization_sense": "maximize" });
    let err = build_model(description).expect_err("build should fail");
    assert!(matches!(err, ModelError::MissingObjectiveRule));
}

#[test]
fn expression_constraints_bind_the_whole_model() {
    let description = json!({
        "objective": { "rule": "model.total", "optimization_sense": "minimize" },
        "sets": [],
        "parameters": [],
        "variables": [
            { "name": "total", "indexes": [], "domain": "Reals" }
        ],
        "constraints": [
            { "name": "floor", "idxs": [], "expr": "model.total >= 10" }
        ]
    });

    let lp = build_model(description).expect("model should build");
    assert_eq!(lp.constraints.len(), 1);
    assert_eq!(lp.constraints[0].name, "floor");
    assert_eq!(lp.constraints[0].expr.coefficient("total"), 1.0);
    assert_eq!(lp.constraints[0].rhs(), 10.0);

    let text = lp.to_lp_string();
    assert!(text.contains(" floor: +1 total >= 10\n"));
    assert!(text.contains("Bounds\n total free\n"));
    assert!(!text.contains("General"));
}

#[test]
fn unsafe_rules_abort_the_whole_build() {
    let mut description = staffing_description();
    description["constraints"][0]["rule"]["lambda_body"] = json!("model.hacked[d] >= 0");
    let err = build_model(description).expect_err("build should fail");
    assert!(matches!(err, ModelError::UnsafeExpression(_)));

    let mut description = staffing_description();
    description["constraints"][0]["rule"]["lambda_body"] = json!("__import__('os').system('ls')");
    let err = build_model(description).expect_err("build should fail");
    assert!(matches!(err, ModelError::UnsafeExpression(_)));
}

#[test]
fn duplicate_components_and_missing_sets_are_errors() {
    let mut description = staffing_description();
    description["sets"] = json!([
        { "name": "days", "initialize": ["Mon"] },
        { "name": "days", "initialize": ["Tue"] }
    ]);
    let err = build_model(description).expect_err("build should fail");
    assert!(matches!(err, ModelError::DuplicateComponent(name) if name == "days"));

    let mut description = staffing_description();
    description["variables"][0]["indexes"] = json!(["weeks"]);
    let err = build_model(description).expect_err("build should fail");
    assert!(matches!(err, ModelError::UnknownIndexSet { set, .. } if set == "weeks"));

    let mut description = staffing_description();
    description["variables"] = json!([]);
    let err = build_model(description).expect_err("build should fail");
    assert!(matches!(err, ModelError::NoVariables));
}

#[test]
fn parameter_keys_and_domains_are_validated() {
    let mut description = staffing_description();
    description["parameters"][0]["initialize"] = json!({ "Thu": 1 });
    let err = build_model(description).expect_err("build should fail");
    assert!(matches!(err, ModelError::BadParamKey { param, .. } if param == "demand"));

    let mut description = staffing_description();
    description["parameters"][0]["initialize"] = json!({ "Mon": -1 });
    let err = build_model(description).expect_err("build should fail");
    assert!(matches!(err, ModelError::ParamOutsideDomain { value, .. } if value == -1.0));
}

#[test]
fn multi_index_parameter_keys_are_comma_joined() {
    let description = json!({
        "objective": {
            "rule": "sum(model.staff[d] for d in model.days)",
            "optimization_sense": "minimize"
        },
        "sets": [
            { "name": "days", "initialize": ["Mon", "Tue"] },
            { "name": "shifts", "initialize": [1, 2] }
        ],
        "parameters": [
            {
                "name": "req",
                "indexes": ["days", "shifts"],
                "initialize": { "Mon,1": 5, "Tue,2": 4 },
                "within": "NonNegativeReals"
            }
        ],
        "variables": [
            { "name": "staff", "indexes": ["days"], "domain": "NonNegativeReals" }
        ],
        "constraints": [
            { "name": "floor", "idxs": [], "expr": "model.staff['Mon'] >= model.req['Mon', 1]" }
        ]
    });

    let lp = build_model(description).expect("model should build");
    assert_eq!(lp.constraints.len(), 1);
    assert_eq!(lp.constraints[0].rhs(), 5.0);
}

#[test]
fn rule_index_arity_must_match_declared_sets() {
    let mut description = staffing_description();
    description["constraints"][0]["idxs"] = json!([]);
    let err = build_model(description).expect_err("build should fail");
    assert!(matches!(
        err,
        ModelError::IndexArity {
            declared: 0,
            takes: 1,
            ..
        }
    ));
}

#[test]
fn objective_whitelist_comes_from_its_own_text() {
    // The scan whitelists whatever the text references; an unknown component
    // passes validation and fails at evaluation instead.
    let mut description = staffing_description();
    description["objective"]["rule"] = json!("model.ghost");
    let err = build_model(description).expect_err("build should fail");
    assert!(matches!(&err, ModelError::Eval { name, .. } if name == "objective"));

    // A string literal is outside the scanned whitelist, so it is unsafe here
    // even though constraint rules may use it.
    let mut description = staffing_description();
    description["objective"]["rule"] = json!("model.staff['Mon']");
    let err = build_model(description).expect_err("build should fail");
    assert!(matches!(err, ModelError::UnsafeExpression(_)));
}

#[test]
fn objective_must_be_linear() {
    let mut description = staffing_description();
    description["objective"]["rule"] = json!("model.days");
    let err = build_model(description).expect_err("build should fail");
    assert!(matches!(err, ModelError::NotLinearObjective("sequence")));
}

#[test]
fn rule_values_must_be_relations_or_skip() {
    let mut description = staffing_description();
    description["constraints"][0]["rule"]["lambda_body"] = json!("model.demand[d]");
    let err = build_model(description).expect_err("build should fail");
    assert!(
        matches!(&err, ModelError::NotARelation { name, key, got } if name == "cover" && key == "Mon" && *got == "number")
    );
}

#[test]
fn descriptions_reject_unknown_domains_and_senses() {
    let mut description = staffing_description();
    description["variables"][0]["domain"] = json!("Complex");
    ModelSpec::from_json(&description.to_string()).expect_err("deserialize should fail");

    let mut description = staffing_description();
    description["objective"]["optimization_sense"] = json!("sideways");
    ModelSpec::from_json(&description.to_string()).expect_err("deserialize should fail");
}

#[test]
fn domains_classify_integrality_and_bounds() {
    assert!(Domain::NonNegativeIntegers.is_integer());
    assert!(!Domain::NonNegativeReals.is_integer());
    assert_eq!(Domain::NonNegativeIntegers.lower_bound(), Some(0.0));
    assert_eq!(Domain::NonPositiveReals.upper_bound(), Some(0.0));
    assert_eq!(Domain::Reals.lower_bound(), None);

    assert!(Domain::NonNegativeIntegers.contains(2.0));
    assert!(!Domain::NonNegativeIntegers.contains(1.5));
    assert!(!Domain::NonNegativeIntegers.contains(-1.0));
    assert!(Domain::Reals.contains(-3.5));
    assert!(!Domain::NonPositiveIntegers.contains(1.0));
}
