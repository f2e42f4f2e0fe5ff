//! Mapping items of the math module, resolved once per converter.

use crate::ConvertError;
use kgsym_graph::{Graph, ItemId, MATH_MODULE_URI};

pub const SUM_OVER_INDEX: &str = "I5000";
pub const LIMITS: &str = "I5001";
pub const INTEGRAL: &str = "I5002";
pub const DEFINITE_INTEGRAL: &str = "I5003";
pub const DERIVATIVE: &str = "I5004";
pub const EVALUATED_AT_POINT: &str = "I5005";

/// Functions with a fixed mapping item, by the name the parsers produce
pub const FUNCTIONS: &[(&str, &str)] = &[
    ("sin", "I5010"),
    ("cos", "I5011"),
    ("tan", "I5012"),
    ("exp", "I5013"),
    ("log", "I5014"),
    ("sqrt", "I5015"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    pub sum: ItemId,
    pub limits: ItemId,
    pub integral: ItemId,
    pub definite_integral: ItemId,
    pub derivative: ItemId,
    pub evaluated_at: ItemId,
    functions: Vec<(&'static str, ItemId)>,
}

impl Vocabulary {
    /// # Errors
    ///
    /// Returns `ConvertError::MathModuleMissing` when the math module is not
    /// loaded or lacks one of the mapping items
    pub fn resolve(graph: &Graph) -> Result<Self, ConvertError> {
        if graph.module(MATH_MODULE_URI).is_none() {
            return Err(ConvertError::MathModuleMissing {
                uri: MATH_MODULE_URI.to_string(),
                detail: "load it with load_math_module".to_string(),
            });
        }

        let item = |key: &str| match graph.item_by_key(key).and_then(|id| graph.item(id)) {
            Some(item) if item.module == MATH_MODULE_URI => Ok(item.id),
            _ => Err(ConvertError::MathModuleMissing {
                uri: MATH_MODULE_URI.to_string(),
                detail: format!("{key} is missing"),
            }),
        };

        let mut functions = Vec::with_capacity(FUNCTIONS.len());
        for (name, key) in FUNCTIONS {
            functions.push((*name, item(*key)?));
        }

        Ok(Self {
            sum: item(SUM_OVER_INDEX)?,
            limits: item(LIMITS)?,
            integral: item(INTEGRAL)?,
            definite_integral: item(DEFINITE_INTEGRAL)?,
            derivative: item(DERIVATIVE)?,
            evaluated_at: item(EVALUATED_AT_POINT)?,
            functions,
        })
    }

    /// Whether every mapping item is still present in `graph`
    #[must_use]
    pub fn is_live(&self, graph: &Graph) -> bool {
        [
            self.sum,
            self.limits,
            self.integral,
            self.definite_integral,
            self.derivative,
            self.evaluated_at,
        ]
        .into_iter()
        .chain(self.functions.iter().map(|(_, id)| *id))
        .all(|id| graph.item(id).is_some())
    }

    /// Mapping item of a named function such as `sin`
    #[must_use]
    pub fn function(&self, name: &str) -> Option<ItemId> {
        self.functions
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(_, id)| *id)
    }

    /// Name of the function whose mapping item is `id`
    #[must_use]
    pub fn function_name(&self, id: ItemId) -> Option<&'static str> {
        self.functions
            .iter()
            .find(|(_, known)| *known == id)
            .map(|(name, _)| *name)
    }
}
