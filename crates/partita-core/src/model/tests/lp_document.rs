use super::support::knapsack_model;
use crate::model::{Model, ModelDocument, ModelError};
use crate::types::Sense;
use partita_expr::ComparisonSense;

const TOY: &str = r#"{
  "name": "toy",
  "sense": "max",
  "objective_constant": 2.0,
  "variables": [
    { "name": "x", "upper": 4, "integer": true, "objective": 1.0 },
    { "name": "y", "lower": null, "objective": -1.0 }
  ],
  "constraints": [
    { "name": "c1", "sense": "<=", "rhs": 3, "terms": { "x": 1, "y": 1 } },
    { "name": "c2", "sense": "eq", "rhs": 1, "terms": { "y": 2 } }
  ]
}"#;

#[test]
fn document_defaults_and_aliases() {
    let model = Model::from_json_str(TOY).unwrap();
    assert_eq!(model.name(), "toy");
    assert_eq!(model.objective().sense, Some(Sense::Maximize));
    assert_eq!(model.objective().constant, 2.0);

    let x = model.variable_by_name("x").unwrap();
    let y = model.variable_by_name("y").unwrap();
    let xv = model.get_variable(x).unwrap();
    assert_eq!(xv.bounds.lower, 0.0);
    assert_eq!(xv.bounds.upper, 4.0);
    assert!(xv.is_integer);
    let yv = model.get_variable(y).unwrap();
    assert_eq!(yv.bounds.lower, f64::NEG_INFINITY);
    assert_eq!(yv.bounds.upper, f64::INFINITY);

    let c2 = model.constraint_by_name("c2").unwrap();
    assert_eq!(model.get_constraint(c2).unwrap().sense, ComparisonSense::Equal);
    assert_eq!(model.coefficient(y, c2), 2.0);
}

#[test]
fn document_rejects_unknown_variables() {
    let text = r#"{ "variables": [], "constraints": [
        { "name": "c", "sense": "ge", "rhs": 0, "terms": { "ghost": 1 } } ] }"#;
    let err = Model::from_json_str(text).unwrap_err();
    assert!(matches!(err, ModelError::InvalidDocument { .. }));
    assert!(err.to_string().contains("ghost"));
}

#[test]
fn document_from_model_preserves_structure() {
    let model = knapsack_model();
    let document = ModelDocument::from_model(&model);
    assert_eq!(document.variables.len(), 3);
    assert_eq!(document.constraints[0].terms["z"], 4.0);
    let rebuilt = document.into_model().unwrap();
    assert_eq!(rebuilt.num_coefficients(), model.num_coefficients());
    assert_eq!(rebuilt.objective().sense, Some(Sense::Maximize));
}

#[test]
fn lp_text_lists_every_section() {
    let model = Model::from_json_str(TOY).unwrap();
    let text = model.to_lp_string();
    assert!(text.starts_with("\\ Problem: toy\nMaximize\n"));
    assert!(text.contains(" obj: 1 x - 1 y + 2\n"));
    assert!(text.contains(" c1: 1 x + 1 y <= 3\n"));
    assert!(text.contains(" y free\n"));
    assert!(text.contains(" 0 <= x <= 4\n"));
    assert!(text.contains("General\n x\n"));
    assert!(text.ends_with("End\n"));
}
