//! Text and JSON views of the graph.

use crate::builtins::{BUILTINS_URI, ids};
use crate::entity::{EntityKind, Item, ItemId, Literal, Object};
use crate::{Graph, GraphError};
use serde::Serialize;
use std::fmt::Write;

#[derive(Serialize)]
struct GraphExport<'a> {
    modules: Vec<ModuleExport<'a>>,
    items: Vec<ItemExport<'a>>,
    statements: Vec<StatementExport<'a>>,
}

#[derive(Serialize)]
struct ModuleExport<'a> {
    uri: &'a str,
    prefix: Option<&'a str>,
}

#[derive(Serialize)]
struct ItemExport<'a> {
    key: &'a str,
    label: &'a str,
    kind: EntityKind,
    module: &'a str,
}

#[derive(Serialize)]
struct StatementExport<'a> {
    subject: &'a str,
    relation: &'a str,
    object: ObjectExport<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum ObjectExport<'a> {
    Item(&'a str),
    Literal(&'a Literal),
}

impl Graph {
    /// Render `node` and the statements below it as an indented tree.
    ///
    /// Argument tuples and their elements are expanded, other objects are
    /// shown as `key["label"]`.
    #[must_use]
    pub fn describe(&self, node: ItemId) -> String {
        let mut out = String::new();
        match self.item(node) {
            Some(item) => {
                let _ = writeln!(out, "{}", item.short());
                self.describe_into(node, 1, &mut out);
            }
            None => {
                let _ = writeln!(out, "{}", self.display_key(node));
            }
        }
        out
    }

    fn describe_into(&self, node: ItemId, depth: usize, out: &mut String) {
        if depth > 64 {
            return;
        }
        let indent = "  ".repeat(depth);
        for statement in self.statements_of(node) {
            if statement.relation == ids::HAS_LABEL {
                continue;
            }
            let relation = self.short(statement.relation);
            let object = match &statement.object {
                Object::Item(id) => self.short(*id),
                Object::Literal(literal) => literal.to_string(),
            };
            let _ = writeln!(out, "{indent}{relation}: {object}");

            let expand = statement.relation == ids::HAS_ARGUMENT_TUPLE
                || statement.relation == ids::HAS_ELEMENT;
            if let (true, Object::Item(child)) = (expand, &statement.object) {
                self.describe_into(*child, depth + 1, out);
            }
        }
    }

    fn short(&self, id: ItemId) -> String {
        self.item(id)
            .map_or_else(|| self.display_key(id), Item::short)
    }

    /// Pretty JSON of every module, item and statement outside the builtin module
    ///
    /// # Errors
    ///
    /// Returns `GraphError::Format` if serialization fails
    pub fn to_json(&self) -> Result<String, GraphError> {
        let user_item = |id: ItemId| {
            self.item(id)
                .is_some_and(|item| item.module != BUILTINS_URI)
        };
        let key = |id: ItemId| self.key(id).unwrap_or("");

        let export = GraphExport {
            modules: self
                .modules()
                .filter(|module| module.uri != BUILTINS_URI)
                .map(|module| ModuleExport {
                    uri: &module.uri,
                    prefix: module.prefix.as_deref(),
                })
                .collect(),
            items: self
                .items()
                .filter(|item| item.module != BUILTINS_URI)
                .map(|item| ItemExport {
                    key: &item.key,
                    label: &item.label,
                    kind: item.kind,
                    module: &item.module,
                })
                .collect(),
            statements: self
                .statements()
                .filter(|statement| user_item(statement.subject))
                .map(|statement| StatementExport {
                    subject: key(statement.subject),
                    relation: key(statement.relation),
                    object: match &statement.object {
                        Object::Item(id) => ObjectExport::Item(key(*id)),
                        Object::Literal(literal) => ObjectExport::Literal(literal),
                    },
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&export)?)
    }
}
