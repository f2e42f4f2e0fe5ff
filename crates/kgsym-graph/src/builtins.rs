//! Builtin relations and items with stable keys.
//!
//! The builtin module is installed first, in table order, so every builtin
//! has a fixed [`ItemId`] listed in [`ids`].

use crate::entity::{EntityKind, Literal, Statement};
use crate::{Graph, ItemId};

pub const BUILTINS_URI: &str = "kgsym:/builtins";

pub mod keys {
    pub const HAS_LABEL: &str = "R1";
    pub const HAS_DESCRIPTION: &str = "R2";
    pub const IS_SUBCLASS_OF: &str = "R3";
    pub const IS_INSTANCE_OF: &str = "R4";
    pub const IS_FUNCTIONAL: &str = "R22";
    pub const HAS_LATEX_STRING: &str = "R24";
    pub const IS_APPLIED_MAPPING_OF: &str = "R35";
    pub const HAS_ARGUMENT_TUPLE: &str = "R36";
    pub const HAS_ELEMENT: &str = "R39";
    pub const HAS_NUMERIC_VALUE: &str = "R40";

    pub const GENERAL_ITEM: &str = "I1";
    pub const METACLASS: &str = "I2";
    pub const MATHEMATICAL_OPERATION: &str = "I7";
    pub const MATHEMATICAL_OBJECT: &str = "I12";
    pub const TUPLE: &str = "I33";
    pub const COMPLEX_NUMBER: &str = "I34";
    pub const REAL_NUMBER: &str = "I35";
    pub const RATIONAL_NUMBER: &str = "I36";
    pub const INTEGER_NUMBER: &str = "I37";
    pub const NON_NEGATIVE_INTEGER: &str = "I38";
    pub const POSITIVE_INTEGER: &str = "I39";
    pub const ADD: &str = "I55";
    pub const MUL: &str = "I56";
    pub const POW: &str = "I57";
}

pub mod ids {
    use crate::ItemId;

    pub const HAS_LABEL: ItemId = ItemId(0);
    pub const HAS_DESCRIPTION: ItemId = ItemId(1);
    pub const IS_SUBCLASS_OF: ItemId = ItemId(2);
    pub const IS_INSTANCE_OF: ItemId = ItemId(3);
    pub const IS_FUNCTIONAL: ItemId = ItemId(4);
    pub const HAS_LATEX_STRING: ItemId = ItemId(5);
    pub const IS_APPLIED_MAPPING_OF: ItemId = ItemId(6);
    pub const HAS_ARGUMENT_TUPLE: ItemId = ItemId(7);
    pub const HAS_ELEMENT: ItemId = ItemId(8);
    pub const HAS_NUMERIC_VALUE: ItemId = ItemId(9);

    pub const GENERAL_ITEM: ItemId = ItemId(10);
    pub const METACLASS: ItemId = ItemId(11);
    pub const MATHEMATICAL_OPERATION: ItemId = ItemId(12);
    pub const MATHEMATICAL_OBJECT: ItemId = ItemId(13);
    pub const TUPLE: ItemId = ItemId(14);
    pub const COMPLEX_NUMBER: ItemId = ItemId(15);
    pub const REAL_NUMBER: ItemId = ItemId(16);
    pub const RATIONAL_NUMBER: ItemId = ItemId(17);
    pub const INTEGER_NUMBER: ItemId = ItemId(18);
    pub const NON_NEGATIVE_INTEGER: ItemId = ItemId(19);
    pub const POSITIVE_INTEGER: ItemId = ItemId(20);
    pub const ADD: ItemId = ItemId(21);
    pub const MUL: ItemId = ItemId(22);
    pub const POW: ItemId = ItemId(23);
}

struct Builtin {
    key: &'static str,
    label: &'static str,
    kind: EntityKind,
    functional: bool,
    instance_of: Option<ItemId>,
    subclass_of: Option<ItemId>,
    description: &'static str,
}

const fn relation(
    key: &'static str,
    label: &'static str,
    functional: bool,
    description: &'static str,
) -> Builtin {
    Builtin {
        key,
        label,
        kind: EntityKind::Relation,
        functional,
        instance_of: None,
        subclass_of: None,
        description,
    }
}

const fn class(
    key: &'static str,
    label: &'static str,
    subclass_of: Option<ItemId>,
    description: &'static str,
) -> Builtin {
    Builtin {
        key,
        label,
        kind: EntityKind::Item,
        functional: false,
        instance_of: Some(ids::METACLASS),
        subclass_of,
        description,
    }
}

const fn operation(key: &'static str, label: &'static str, description: &'static str) -> Builtin {
    Builtin {
        key,
        label,
        kind: EntityKind::Item,
        functional: false,
        instance_of: Some(ids::MATHEMATICAL_OPERATION),
        subclass_of: None,
        description,
    }
}

// Order must match `ids`
const BUILTINS: &[Builtin] = &[
    relation(keys::HAS_LABEL, "has label", true, "human readable name"),
    relation(keys::HAS_DESCRIPTION, "has description", true, "free text description"),
    relation(keys::IS_SUBCLASS_OF, "is subclass of", true, "subject class specializes object class"),
    relation(keys::IS_INSTANCE_OF, "is instance of", true, "subject is an instance of the object class"),
    relation(keys::IS_FUNCTIONAL, "is functional", true, "relation takes at most one object per subject"),
    relation(keys::HAS_LATEX_STRING, "has LaTeX string", true, "LaTeX rendering of the subject"),
    relation(keys::IS_APPLIED_MAPPING_OF, "is applied mapping of", true, "operation applied to build the subject"),
    relation(keys::HAS_ARGUMENT_TUPLE, "has argument tuple", true, "arguments of an applied mapping"),
    relation(keys::HAS_ELEMENT, "has element", false, "element of a tuple, in order"),
    relation(keys::HAS_NUMERIC_VALUE, "has numeric value", true, "value of a number item"),
    class(keys::GENERAL_ITEM, "general item", None, "root of the class hierarchy"),
    class(keys::METACLASS, "metaclass", Some(ids::GENERAL_ITEM), "class of all classes"),
    class(keys::MATHEMATICAL_OPERATION, "mathematical operation", Some(ids::GENERAL_ITEM), "mapping that builds mathematical objects"),
    class(keys::MATHEMATICAL_OBJECT, "mathematical object", Some(ids::GENERAL_ITEM), "result of applying a mathematical operation"),
    class(keys::TUPLE, "tuple", Some(ids::MATHEMATICAL_OBJECT), "ordered collection of elements"),
    class(keys::COMPLEX_NUMBER, "complex number", Some(ids::MATHEMATICAL_OBJECT), "element of the complex numbers"),
    class(keys::REAL_NUMBER, "real number", Some(ids::COMPLEX_NUMBER), "element of the real numbers"),
    class(keys::RATIONAL_NUMBER, "rational number", Some(ids::REAL_NUMBER), "quotient of two integers"),
    class(keys::INTEGER_NUMBER, "integer number", Some(ids::RATIONAL_NUMBER), "element of the integers"),
    class(keys::NON_NEGATIVE_INTEGER, "non-negative integer", Some(ids::INTEGER_NUMBER), "integer greater or equal zero"),
    class(keys::POSITIVE_INTEGER, "positive integer", Some(ids::NON_NEGATIVE_INTEGER), "integer greater than zero"),
    operation(keys::ADD, "add", "sum of the argument tuple"),
    operation(keys::MUL, "mul", "product of the argument tuple"),
    operation(keys::POW, "pow", "first argument raised to the second"),
];

/// Create the builtin module in an empty graph. Statements bypass
/// consistency checking since the class hierarchy is still being built.
pub(crate) fn install(graph: &mut Graph) {
    graph.register_builtin_module(BUILTINS_URI);

    for builtin in BUILTINS {
        graph.insert_entity(builtin.key, builtin.label, builtin.kind, BUILTINS_URI);
    }

    for (index, builtin) in BUILTINS.iter().enumerate() {
        let id = ItemId::from_index(index);
        graph.push_statement(Statement::new(
            id,
            ids::HAS_LABEL,
            Literal::Text(builtin.label.to_string()),
        ));
        graph.push_statement(Statement::new(
            id,
            ids::HAS_DESCRIPTION,
            Literal::Text(builtin.description.to_string()),
        ));
        if builtin.kind == EntityKind::Relation && builtin.functional {
            graph.push_statement(Statement::new(id, ids::IS_FUNCTIONAL, Literal::Boolean(true)));
        }
        if let Some(class) = builtin.instance_of {
            graph.push_statement(Statement::new(id, ids::IS_INSTANCE_OF, class));
        }
        if let Some(parent) = builtin.subclass_of {
            graph.push_statement(Statement::new(id, ids::IS_SUBCLASS_OF, parent));
        }
    }
}
