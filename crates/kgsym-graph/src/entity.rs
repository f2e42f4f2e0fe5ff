//! Entities, literals and statements stored in the graph.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Dense arena index of an item or relation.
///
/// Ids are never reused, so an id taken before a module was unloaded keeps
/// pointing at nothing rather than at a newer entity.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub(crate) u32);

impl ItemId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Item,
    Relation,
}

impl EntityKind {
    /// Leading letter of keys of this kind
    #[must_use]
    pub const fn key_prefix(self) -> char {
        match self {
            Self::Item => 'I',
            Self::Relation => 'R',
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Item => write!(f, "item"),
            Self::Relation => write!(f, "relation"),
        }
    }
}

/// An item or relation together with the module that created it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub key: String,
    pub label: String,
    pub kind: EntityKind,
    pub module: String,
}

impl Item {
    /// Full uri such as `kgsym:/math#I5000`
    #[must_use]
    pub fn uri(&self) -> String {
        format!("{}#{}", self.module, self.key)
    }

    /// Short reference in the `key["label"]` form used by `describe`
    #[must_use]
    pub fn short(&self) -> String {
        format!("{}[\"{}\"]", self.key, self.label)
    }
}

/// Literal object of a statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Literal {
    Text(String),
    Boolean(bool),
    Integer(i64),
    Rational(i64, i64),
    Float(f64),
}

impl Literal {
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Rational(..) | Self::Float(_))
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text:?}"),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Rational(numerator, denominator) => write!(f, "{numerator}/{denominator}"),
            Self::Float(value) => write!(f, "{value:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Item(ItemId),
    Literal(Literal),
}

impl Object {
    #[must_use]
    pub const fn as_item(&self) -> Option<ItemId> {
        match self {
            Self::Item(id) => Some(*id),
            Self::Literal(_) => None,
        }
    }

    #[must_use]
    pub const fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Literal(literal) => Some(literal),
            Self::Item(_) => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        self.as_literal().and_then(Literal::as_text)
    }
}

impl From<ItemId> for Object {
    fn from(id: ItemId) -> Self {
        Self::Item(id)
    }
}

impl From<Literal> for Object {
    fn from(literal: Literal) -> Self {
        Self::Literal(literal)
    }
}

impl From<&str> for Object {
    fn from(text: &str) -> Self {
        Self::Literal(Literal::Text(text.to_string()))
    }
}

impl From<String> for Object {
    fn from(text: String) -> Self {
        Self::Literal(Literal::Text(text))
    }
}

impl From<bool> for Object {
    fn from(value: bool) -> Self {
        Self::Literal(Literal::Boolean(value))
    }
}

impl From<i64> for Object {
    fn from(value: i64) -> Self {
        Self::Literal(Literal::Integer(value))
    }
}

impl From<f64> for Object {
    fn from(value: f64) -> Self {
        Self::Literal(Literal::Float(value))
    }
}

/// `subject relation object`, kept in insertion order
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub subject: ItemId,
    pub relation: ItemId,
    pub object: Object,
}

impl Statement {
    #[must_use]
    pub fn new(subject: ItemId, relation: ItemId, object: impl Into<Object>) -> Self {
        Self {
            subject,
            relation,
            object: object.into(),
        }
    }

    pub(crate) fn mentions_any(&self, ids: &HashSet<ItemId>) -> bool {
        ids.contains(&self.subject)
            || ids.contains(&self.relation)
            || self.object.as_item().is_some_and(|id| ids.contains(&id))
    }
}

/// Parameters of [`crate::Graph::create_item`]
#[derive(Debug, Clone, Default)]
pub struct ItemSpec {
    pub key: Option<String>,
    pub label: String,
    pub instance_of: Option<ItemId>,
    pub subclass_of: Option<ItemId>,
    pub description: Option<String>,
    pub latex: Option<String>,
}

impl ItemSpec {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    #[must_use]
    pub const fn instance_of(mut self, class: ItemId) -> Self {
        self.instance_of = Some(class);
        self
    }

    #[must_use]
    pub const fn subclass_of(mut self, class: ItemId) -> Self {
        self.subclass_of = Some(class);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn latex(mut self, latex: impl Into<String>) -> Self {
        self.latex = Some(latex.into());
        self
    }
}

/// Parameters of [`crate::Graph::create_relation`]
#[derive(Debug, Clone, Default)]
pub struct RelationSpec {
    pub key: Option<String>,
    pub label: String,
    pub functional: bool,
    pub description: Option<String>,
}

impl RelationSpec {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    #[must_use]
    pub const fn functional(mut self) -> Self {
        self.functional = true;
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Check that `key` looks like `I123` or `R45`
#[must_use]
pub fn is_valid_key(key: &str, kind: EntityKind) -> bool {
    let mut chars = key.chars();
    chars.next() == Some(kind.key_prefix())
        && !chars.as_str().is_empty()
        && chars.all(|c| c.is_ascii_digit())
}
