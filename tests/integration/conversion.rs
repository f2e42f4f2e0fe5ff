//! Integration tests for expression <-> graph conversion
//! Tests the converter against a graph holding the math module

use kgsym_ast::{Expr, KgError, Symbol};
use kgsym_convert::{ConvertError, Converter};
use kgsym_graph::{Graph, ItemId, ItemSpec, Settings, ids};
use kgsym_parser::parse_expr;
use proptest::prelude::*;

struct Session {
    graph: Graph,
    converter: Converter,
}

fn session() -> Session {
    let mut graph = Graph::with_settings(&Settings::default());
    graph.load_math_module().unwrap();
    graph.start_module("kgsym:/session").unwrap();
    let converter = Converter::new(&graph).unwrap();
    Session { graph, converter }
}

fn real_numbers(graph: &mut Graph, labels: &[&str]) -> Vec<ItemId> {
    labels
        .iter()
        .map(|label| {
            graph
                .create_item(ItemSpec::new(*label).instance_of(ids::REAL_NUMBER))
                .unwrap()
        })
        .collect()
}

#[test]
fn test_sum_of_products_with_auto_keys() {
    let Session {
        mut graph,
        converter,
    } = session();
    let items = real_numbers(&mut graph, &["a", "b", "c"]);
    let keys: Vec<&str> = items.iter().map(|id| graph.key(*id).unwrap()).collect();
    assert_eq!(keys, ["I1000", "I1001", "I1002"]);

    let symbols = converter.items_to_symbols(&graph, &items).unwrap();
    let (a, b, c) = (&symbols[0], &symbols[1], &symbols[2]);
    let formula = Expr::add(vec![
        a.clone(),
        Expr::mul(vec![b.clone(), Expr::add(vec![a.clone(), c.clone()])]),
    ]);
    let res = converter.expr_to_graph(&mut graph, &formula).unwrap();

    assert_eq!(
        graph.get_item(res, "R4__is_instance_of").unwrap(),
        Some(ids::MATHEMATICAL_OBJECT)
    );
    assert_eq!(
        graph.get_item(res, "R35__is_applied_mapping_of").unwrap(),
        Some(graph.resolve("I55").unwrap())
    );

    let tuple = graph
        .get_item(res, "R36__has_argument_tuple")
        .unwrap()
        .unwrap();
    assert_eq!(graph.instance_of(tuple), Some(ids::TUPLE));
    let elements = graph.item_objects(tuple, "R39__has_element").unwrap();
    assert_eq!(elements.len(), 2);
    assert_eq!(graph.key(elements[1]), Some("I1000"));

    let product = elements[0];
    assert_eq!(graph.get_item(product, "R35").unwrap(), Some(ids::MUL));
    assert_eq!(graph.label(product), Some("b*(a + c)"));
    let factors = graph.tuple_elements(product);
    assert_eq!(graph.key(factors[0]), Some("I1001"));
    assert_eq!(graph.get_item(factors[1], "R35").unwrap(), Some(ids::ADD));

    assert_eq!(converter.graph_to_expr(&graph, res).unwrap(), formula);
}

#[test]
fn test_latex_formula_against_module_items() {
    let mut graph = Graph::with_settings(&Settings::default());
    graph.load_math_module().unwrap();
    graph
        .load_module_from_str(
            r#"{
                "uri": "kgsym:/kinematics",
                "prefix": "ki",
                "items": [
                    {"key": "I7000", "label": "velocity", "instance_of": "I35", "latex": "v"},
                    {"key": "I7001", "label": "time", "instance_of": "I35", "latex": "t"},
                    {"key": "I7002", "label": "acceleration", "instance_of": "I35", "latex": "a"}
                ]
            }"#,
            None,
            false,
        )
        .unwrap();
    graph.start_module("kgsym:/session").unwrap();
    let converter = Converter::new(&graph).unwrap();
    let items: Vec<ItemId> = ["I7000", "I7001", "I7002"]
        .iter()
        .map(|key| graph.resolve(key).unwrap())
        .collect();

    let node = converter
        .latex_to_graph(&mut graph, r"v t + \frac{1}{2} a t^2", &items)
        .unwrap();

    let expr = converter.graph_to_expr(&graph, node).unwrap();
    let keyed: Vec<Option<String>> = expr.symbols().into_iter().map(|s| s.key).collect();
    assert_eq!(keyed.len(), 3);
    assert!(keyed.iter().all(Option::is_some));
    // symbols read back from the graph are named by item label
    assert!(expr.symbols().contains(&Symbol::with_key("time", "I7001")));

    let prefixed = graph.resolve("ki__I7000__velocity").unwrap();
    assert_eq!(prefixed, items[0]);
}

#[test]
fn test_latex_unknown_symbol_creates_nothing() {
    let Session {
        mut graph,
        converter,
    } = session();
    let before = graph.len();

    let err = converter
        .latex_to_graph(&mut graph, r"\frac{q}{r}", &[])
        .unwrap_err();
    assert!(matches!(
        err,
        ConvertError::Expr(KgError::UnresolvedSymbol { .. })
    ));
    assert_eq!(graph.len(), before);
}

#[test]
fn test_structural_equality_of_independent_conversions() {
    let Session {
        mut graph,
        converter,
    } = session();
    let items = real_numbers(&mut graph, &["x", "y"]);
    let symbols = converter.items_to_symbols(&graph, &items).unwrap();
    let (x, y) = (&symbols[0], &symbols[1]);

    let left = Expr::add(vec![Expr::pow(x.clone(), Expr::integer(2)), y.clone()]);
    let right = Expr::add(vec![y.clone(), Expr::pow(x.clone(), Expr::integer(2))]);
    let other = Expr::add(vec![Expr::pow(x.clone(), Expr::integer(3)), y.clone()]);

    let left_node = converter.expr_to_graph(&mut graph, &left).unwrap();
    let right_node = converter.expr_to_graph(&mut graph, &right).unwrap();
    let other_node = converter.expr_to_graph(&mut graph, &other).unwrap();

    assert_ne!(left_node, right_node);
    assert!(graph.structurally_equal(left_node, right_node));
    assert!(!graph.structurally_equal(left_node, other_node));
}

#[test]
fn test_call_derivative_node() {
    let Session {
        mut graph,
        converter,
    } = session();
    let items = real_numbers(&mut graph, &["x"]);
    let x = converter.items_to_symbols(&graph, &items).unwrap().remove(0);
    let Expr::Symbol(x_symbol) = x.clone() else {
        panic!("Expected symbol");
    };

    let derivative = Expr::derivative(Expr::pow(x, Expr::integer(3)), x_symbol.clone());
    let node = converter.expr_to_graph(&mut graph, &derivative).unwrap();
    let two = converter.expr_to_graph(&mut graph, &Expr::integer(2)).unwrap();

    let called = converter.call_node(&mut graph, node, &[two]).unwrap();
    assert_eq!(
        graph.get_item(called, "R35").unwrap(),
        Some(converter.vocabulary().evaluated_at)
    );
    let back = converter.graph_to_expr(&graph, called).unwrap();
    assert_eq!(back, Expr::subs(derivative, x_symbol, Expr::integer(2)));

    let value = back.evaluate(&std::collections::HashMap::new()).unwrap();
    assert!((value - 12.0).abs() < 1e-6);
}

#[test]
fn test_call_non_callable_node() {
    let Session {
        mut graph,
        converter,
    } = session();
    let items = real_numbers(&mut graph, &["x"]);
    let symbols = converter.items_to_symbols(&graph, &items).unwrap();
    let node = converter
        .expr_to_graph(&mut graph, &Expr::apply("sin", symbols))
        .unwrap();

    let err = converter.call_node(&mut graph, node, &[items[0]]).unwrap_err();
    assert!(matches!(err, ConvertError::Expr(KgError::NotCallable { .. })));
}

#[test]
fn test_unloading_math_module_breaks_converter() {
    let mut graph = Graph::with_settings(&Settings::default());
    graph.load_math_module().unwrap();
    graph.unload_module("kgsym:/math").unwrap();

    let err = Converter::new(&graph).err().unwrap();
    assert!(matches!(err, ConvertError::MathModuleMissing { .. }));
}

#[test]
fn test_failed_conversion_is_rolled_back() {
    let Session {
        mut graph,
        converter,
    } = session();
    let x = real_numbers(&mut graph, &["x"])[0];
    let parsed = parse_expr("(x+1)**2 * zzz(x)").unwrap();
    let formula = parsed.map_symbols(&mut |symbol| {
        (symbol.name == "x").then(|| Symbol::with_key("x", "I1000"))
    });
    let before = (graph.len(), graph.statement_count());

    match converter.expr_to_graph(&mut graph, &formula) {
        Err(ConvertError::UnknownMapping { name }) => assert_eq!(name, "zzz"),
        _ => panic!("Expected unknown mapping"),
    }
    assert_eq!((graph.len(), graph.statement_count()), before);
    assert_eq!(graph.module("kgsym:/session").unwrap().items(), &[x]);
}

#[test]
fn test_node_inside_its_own_tuple() {
    let Session {
        mut graph,
        converter,
    } = session();
    let node = graph
        .create_item(ItemSpec::new("loop").instance_of(ids::MATHEMATICAL_OBJECT))
        .unwrap();
    let tuple = graph
        .create_item(ItemSpec::new("argument tuple").instance_of(ids::TUPLE))
        .unwrap();
    graph.disable_consistency_checking();
    graph.set_relation(tuple, ids::HAS_ELEMENT, node).unwrap();
    graph.set_relation(node, ids::IS_APPLIED_MAPPING_OF, ids::MUL).unwrap();
    graph.set_relation(node, ids::HAS_ARGUMENT_TUPLE, tuple).unwrap();

    match converter.graph_to_expr(&graph, node) {
        Err(ConvertError::Malformed { node: key, .. }) => assert!(key.starts_with('I')),
        _ => panic!("Expected malformed node"),
    }
}

#[test]
fn test_deeply_nested_latex_is_rejected() {
    let Session {
        mut graph,
        converter,
    } = session();
    let before = graph.len();
    let deep = format!("{}x{}", "(".repeat(50_000), ")".repeat(50_000));

    let err = converter.latex_to_graph(&mut graph, &deep, &[]).unwrap_err();
    assert!(matches!(err, ConvertError::Expr(KgError::Syntax { .. })));
    assert_eq!(graph.len(), before);
}

fn arb_formula() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        (-4i64..5).prop_map(Expr::integer),
        (0usize..3).prop_map(|index| Expr::Symbol(Symbol::with_key(
            ["a", "b", "c"][index],
            ["I1000", "I1001", "I1002"][index],
        ))),
    ];
    leaf.prop_recursive(3, 12, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 2..4).prop_map(Expr::add),
            prop::collection::vec(inner.clone(), 2..4).prop_map(Expr::mul),
            inner.prop_map(|arg| Expr::apply("cos", vec![arg])),
        ]
    })
}

proptest! {
    #[test]
    fn conversions_of_equal_formulas_are_structurally_equal(formula in arb_formula()) {
        let Session { mut graph, converter } = session();
        real_numbers(&mut graph, &["a", "b", "c"]);

        let first = converter.expr_to_graph(&mut graph, &formula).unwrap();
        let second = converter.expr_to_graph(&mut graph, &formula).unwrap();
        prop_assert!(graph.structurally_equal(first, second));
        let text = formula.to_string();
        prop_assert_eq!(graph.label(first), Some(text.as_str()));
    }
}
