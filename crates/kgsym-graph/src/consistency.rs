//! Rules applied to statements before they enter the graph.

use crate::builtins::ids;
use crate::entity::{Literal, Object, Statement};
use crate::Graph;

/// Check `statement` against the graph as it is now. Returns the reason on
/// rejection.
pub(crate) fn check(graph: &Graph, statement: &Statement) -> Result<(), String> {
    check_functional(graph, statement)?;
    check_object(graph, statement)
}

fn check_functional(graph: &Graph, statement: &Statement) -> Result<(), String> {
    if !graph.is_functional(statement.relation) {
        return Ok(());
    }
    let existing = graph
        .statements_of(statement.subject)
        .filter(|s| s.relation == statement.relation)
        .count();
    if existing > 0 {
        return Err("functional relation already has an object".to_string());
    }
    Ok(())
}

/// Type rules on the object, independent of other statements of the subject
pub(crate) fn check_object(graph: &Graph, statement: &Statement) -> Result<(), String> {
    let relation = statement.relation;
    let object = &statement.object;

    if relation == ids::HAS_LABEL
        || relation == ids::HAS_DESCRIPTION
        || relation == ids::HAS_LATEX_STRING
    {
        return match object {
            Object::Literal(Literal::Text(_)) => Ok(()),
            _ => Err("object must be a text literal".to_string()),
        };
    }

    if relation == ids::IS_FUNCTIONAL {
        return match object {
            Object::Literal(Literal::Boolean(_)) => Ok(()),
            _ => Err("object must be a boolean literal".to_string()),
        };
    }

    if relation == ids::HAS_NUMERIC_VALUE {
        return match object {
            Object::Literal(literal) if literal.is_numeric() => Ok(()),
            _ => Err("object must be a numeric literal".to_string()),
        };
    }

    if relation == ids::IS_INSTANCE_OF || relation == ids::IS_SUBCLASS_OF {
        return match object.as_item() {
            Some(class) if graph.is_class(class) => Ok(()),
            Some(other) => Err(format!("{} is not a class", graph.display_key(other))),
            None => Err("object must be a class item".to_string()),
        };
    }

    if relation == ids::IS_APPLIED_MAPPING_OF {
        return expect_instance(graph, object, ids::MATHEMATICAL_OPERATION, "mathematical operation");
    }

    if relation == ids::HAS_ARGUMENT_TUPLE {
        return expect_instance(graph, object, ids::TUPLE, "tuple");
    }

    if relation == ids::HAS_ELEMENT && object.as_item().is_none() {
        return Err("tuple elements must be items".to_string());
    }

    Ok(())
}

fn expect_instance(graph: &Graph, object: &Object, class: crate::ItemId, name: &str) -> Result<(), String> {
    match object.as_item() {
        Some(item) if graph.is_instance_of(item, class) => Ok(()),
        Some(item) => Err(format!("{} is not an instance of {name}", graph.display_key(item))),
        None => Err(format!("object must be an instance of {name}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ItemSpec;

    fn graph_with_item() -> (Graph, crate::ItemId) {
        let mut graph = Graph::new();
        graph.start_module("kgsym:/test").unwrap();
        let item = graph
            .create_item(ItemSpec::new("x").instance_of(ids::REAL_NUMBER))
            .unwrap();
        (graph, item)
    }

    #[test]
    fn test_label_must_be_text() {
        let (graph, item) = graph_with_item();
        let statement = Statement::new(item, ids::HAS_DESCRIPTION, Literal::Integer(3));
        assert!(check_object(&graph, &statement).is_err());
        let statement = Statement::new(item, ids::HAS_DESCRIPTION, "a variable");
        assert!(check_object(&graph, &statement).is_ok());
    }

    #[test]
    fn test_instance_of_needs_class() {
        let (graph, item) = graph_with_item();
        // I55 add is an operation, not a class
        let statement = Statement::new(item, ids::IS_SUBCLASS_OF, ids::ADD);
        let reason = check_object(&graph, &statement).unwrap_err();
        assert!(reason.contains("I55"), "{reason}");
    }

    #[test]
    fn test_mapping_and_tuple_types() {
        let (graph, item) = graph_with_item();
        let statement = Statement::new(item, ids::IS_APPLIED_MAPPING_OF, ids::MUL);
        assert!(check_object(&graph, &statement).is_ok());
        let statement = Statement::new(item, ids::IS_APPLIED_MAPPING_OF, ids::REAL_NUMBER);
        assert!(check_object(&graph, &statement).is_err());
        let statement = Statement::new(item, ids::HAS_ARGUMENT_TUPLE, item);
        assert!(check_object(&graph, &statement).is_err());
    }

    #[test]
    fn test_numeric_value() {
        let (graph, item) = graph_with_item();
        let statement = Statement::new(item, ids::HAS_NUMERIC_VALUE, Literal::Rational(1, 2));
        assert!(check_object(&graph, &statement).is_ok());
        let statement = Statement::new(item, ids::HAS_NUMERIC_VALUE, "two");
        assert!(check_object(&graph, &statement).is_err());
    }

    #[test]
    fn test_functional_relation_takes_one_object() {
        let (graph, item) = graph_with_item();
        // x already has R4 = I35
        let statement = Statement::new(item, ids::IS_INSTANCE_OF, ids::INTEGER_NUMBER);
        assert!(check(&graph, &statement).is_err());
        // R39 is not functional
        let statement = Statement::new(item, ids::HAS_ELEMENT, ids::ADD);
        assert!(check(&graph, &statement).is_ok());
    }
}
