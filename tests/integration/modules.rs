//! Integration tests for module loading, scoping and export
//! Tests how modules, consistency checking and the converter interact

use kgsym_ast::Expr;
use kgsym_convert::Converter;
use kgsym_graph::{Graph, GraphError, ItemSpec, MATH_MODULE_URI, Object, Settings, ids};
use std::fs;
use tempfile::TempDir;

const GEOMETRY: &str = r#"{
    "uri": "kgsym:/geometry",
    "prefix": "ge",
    "relations": [
        {"key": "R8000", "label": "has radius", "functional": true}
    ],
    "items": [
        {"key": "I8000", "label": "circle", "subclass_of": "I12"},
        {"key": "I8001", "label": "unit circle", "instance_of": "I8000"},
        {"key": "I8002", "label": "radius", "instance_of": "I35", "latex": "r"}
    ]
}"#;

#[test]
fn test_module_file_from_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("geometry.json");
    fs::write(&path, GEOMETRY).unwrap();

    let mut graph = Graph::with_settings(&Settings::default());
    let uri = graph.load_module_from_path(&path, None, false).unwrap();
    assert_eq!(uri, "kgsym:/geometry");
    assert_eq!(graph.prefix_uri("ge"), Some("kgsym:/geometry"));

    let circle = graph.resolve("ge__I8000").unwrap();
    let unit = graph.resolve("I8001__unit_circle").unwrap();
    assert!(graph.is_class(circle));
    assert!(graph.is_instance_of(unit, circle));
    assert!(graph.is_instance_of(unit, ids::MATHEMATICAL_OBJECT));
    assert!(graph.is_functional(graph.resolve("R8000").unwrap()));
}

#[test]
fn test_functional_relation_from_module() {
    let mut graph = Graph::with_settings(&Settings::default());
    graph.load_module_from_str(GEOMETRY, None, false).unwrap();
    graph.start_module("kgsym:/session").unwrap();

    let unit = graph.resolve("I8001").unwrap();
    graph.set_relation(unit, "R8000", 1i64).unwrap();
    match graph.set_relation(unit, "R8000__has_radius", 2i64) {
        Err(GraphError::Inconsistent { .. }) => {}
        _ => panic!("Expected second object to be rejected"),
    }
    assert_eq!(graph.get(unit, "R8000").unwrap(), Some(&Object::from(1i64)));

    graph.disable_consistency_checking();
    graph.set_relation(unit, "R8000", 2i64).unwrap();
    match graph.get(unit, "R8000") {
        Err(GraphError::MultipleObjects { count, .. }) => assert_eq!(count, 2),
        _ => panic!("Expected multiple objects"),
    }
}

#[test]
fn test_label_mismatch_in_reference() {
    let mut graph = Graph::with_settings(&Settings::default());
    graph.load_module_from_str(GEOMETRY, None, false).unwrap();

    match graph.resolve("I8000__square") {
        Err(GraphError::LabelMismatch { actual, .. }) => assert_eq!(actual, "circle"),
        _ => panic!("Expected label mismatch"),
    }
}

#[test]
fn test_consistency_checking_toggle() {
    let mut graph = Graph::with_settings(&Settings::default());
    graph.load_math_module().unwrap();
    graph.start_module("kgsym:/session").unwrap();
    let sin = graph.resolve("ma__I5010__sin").unwrap();
    let thing = graph.create_item(ItemSpec::new("thing")).unwrap();

    // sin is an operation, not a class
    match graph.set_relation(thing, ids::IS_INSTANCE_OF, sin) {
        Err(GraphError::Inconsistent { .. }) => {}
        _ => panic!("Expected inconsistent statement"),
    }
    assert_eq!(graph.instance_of(thing), None);

    graph.disable_consistency_checking();
    graph.set_relation(thing, ids::IS_INSTANCE_OF, sin).unwrap();
    assert_eq!(graph.instance_of(thing), Some(sin));
    graph.enable_consistency_checking();
    assert!(graph.consistency_checking());
}

#[test]
fn test_scoped_conversion_and_unload() {
    let mut graph = Graph::with_settings(&Settings::default());
    graph.load_math_module().unwrap();
    let converter = Converter::new(&graph).unwrap();

    let node = {
        let mut scope = graph.uri_scope("kgsym:/scratch", "sc").unwrap();
        let x = scope
            .create_item(ItemSpec::new("x").instance_of(ids::REAL_NUMBER))
            .unwrap();
        let x = converter.items_to_symbols(&scope, &[x]).unwrap().remove(0);
        let formula = Expr::apply("exp", vec![Expr::neg(x)]);
        converter.expr_to_graph(&mut scope, &formula).unwrap()
    };
    assert_eq!(graph.active_module(), None);
    assert_eq!(graph.item(node).unwrap().module, "kgsym:/scratch");
    assert!(graph.describe(node).contains("I5013[\"exp\"]"));

    let before = graph.statement_count();
    graph.unload_module("kgsym:/scratch").unwrap();
    assert!(graph.item(node).is_none());
    assert!(graph.statement_count() < before);
    assert!(graph.module(MATH_MODULE_URI).is_some());
    assert!(graph.module("kgsym:/scratch").is_none());
}

#[test]
fn test_converter_survives_math_module_reload() {
    let mut graph = Graph::with_settings(&Settings::default());
    graph.load_math_module().unwrap();
    graph.start_module("kgsym:/session").unwrap();
    let converter = Converter::new(&graph).unwrap();

    graph.unload_module(MATH_MODULE_URI).unwrap();
    graph.load_math_module().unwrap();

    let n = graph
        .create_item(ItemSpec::new("n").instance_of(ids::INTEGER_NUMBER))
        .unwrap();
    let node = converter
        .latex_to_graph(&mut graph, r"\sum_{k=1}^{n} k", &[n])
        .unwrap();
    assert_eq!(
        graph.get_item(node, "R35").unwrap(),
        Some(graph.resolve("ma__I5000").unwrap())
    );
    match converter.graph_to_expr(&graph, node).unwrap() {
        Expr::Sum { index, .. } => assert_eq!(index.name, "k"),
        _ => panic!("Expected sum"),
    }
}

#[test]
fn test_json_export_of_converted_formula() {
    let mut graph = Graph::with_settings(&Settings::default());
    graph.load_math_module().unwrap();
    graph.start_module("kgsym:/session").unwrap();
    let converter = Converter::new(&graph).unwrap();
    let half = converter
        .expr_to_graph(&mut graph, &Expr::number(kgsym_ast::Number::Rational(1, 2)))
        .unwrap();
    assert_eq!(
        graph.get(half, ids::HAS_NUMERIC_VALUE).unwrap(),
        Some(&Object::Literal(kgsym_graph::Literal::Rational(1, 2)))
    );

    let json: serde_json::Value = serde_json::from_str(&graph.to_json().unwrap()).unwrap();
    let modules: Vec<&str> = json["modules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|module| module["uri"].as_str().unwrap())
        .collect();
    assert_eq!(modules, ["kgsym:/math", "kgsym:/session"]);

    let key = graph.key(half).unwrap();
    let numeric = json["statements"]
        .as_array()
        .unwrap()
        .iter()
        .find(|statement| statement["subject"] == key && statement["relation"] == "R40")
        .unwrap();
    assert_eq!(numeric["object"]["literal"]["rational"], serde_json::json!([1, 2]));
}
