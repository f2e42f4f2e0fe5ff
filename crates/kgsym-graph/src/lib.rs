//! Item/relation knowledge graph
//!
//! Every entity is an item (`I<n>`) or a relation (`R<n>`) owned by a
//! module. Facts are `subject relation object` statements kept in insertion
//! order; the order of `R39 has element` statements is the tuple order.
//! Relations can be addressed by key (`"R36"`), by key with label
//! (`"R36__has_argument_tuple"`), with a module prefix (`"ma__I5000"`), or
//! by [`ItemId`].

use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

pub mod builtins;
mod consistency;
pub mod entity;
mod error;
mod export;
pub mod module;
pub mod settings;

pub use builtins::{BUILTINS_URI, ids, keys};
pub use entity::{
    EntityKind, Item, ItemId, ItemSpec, Literal, Object, RelationSpec, Statement, is_valid_key,
};
pub use error::GraphError;
pub use module::{
    ItemEntry, MATH_MODULE_PREFIX, MATH_MODULE_URI, Module, ModuleFile, ModuleScope, RelationEntry,
};
pub use settings::Settings;

/// Anything that names an entity: an [`ItemId`] or a reference string
pub trait EntityRef {
    /// # Errors
    ///
    /// Returns `GraphError` when the reference names no live entity
    fn to_id(&self, graph: &Graph) -> Result<ItemId, GraphError>;
}

impl EntityRef for ItemId {
    fn to_id(&self, graph: &Graph) -> Result<ItemId, GraphError> {
        graph.require(*self).map(|item| item.id)
    }
}

impl EntityRef for str {
    fn to_id(&self, graph: &Graph) -> Result<ItemId, GraphError> {
        graph.resolve(self)
    }
}

impl EntityRef for String {
    fn to_id(&self, graph: &Graph) -> Result<ItemId, GraphError> {
        graph.resolve(self)
    }
}

impl<T: EntityRef + ?Sized> EntityRef for &T {
    fn to_id(&self, graph: &Graph) -> Result<ItemId, GraphError> {
        (**self).to_id(graph)
    }
}

const MAX_DEPTH: usize = 256;

/// Position in the entity arena, see [`Graph::checkpoint`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    entities: usize,
    next_auto_key: u64,
}

pub struct Graph {
    entities: Vec<Option<Item>>,
    by_key: HashMap<String, ItemId>,
    statements: Vec<Statement>,
    by_subject: HashMap<ItemId, Vec<usize>>,
    modules: Vec<Module>,
    prefixes: HashMap<String, String>,
    scopes: Vec<String>,
    consistency_checking: bool,
    next_auto_key: u64,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// A graph holding the builtin module, configured from the environment
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(Settings::current())
    }

    #[must_use]
    pub fn with_settings(settings: &Settings) -> Self {
        let mut graph = Self {
            entities: Vec::new(),
            by_key: HashMap::new(),
            statements: Vec::new(),
            by_subject: HashMap::new(),
            modules: Vec::new(),
            prefixes: HashMap::new(),
            scopes: Vec::new(),
            consistency_checking: settings.consistency_checking,
            next_auto_key: settings.first_auto_key,
        };
        builtins::install(&mut graph);
        graph
    }

    pub const fn enable_consistency_checking(&mut self) {
        self.consistency_checking = true;
    }

    pub const fn disable_consistency_checking(&mut self) {
        self.consistency_checking = false;
    }

    #[must_use]
    pub const fn consistency_checking(&self) -> bool {
        self.consistency_checking
    }

    /// Create an item in the active module
    ///
    /// # Errors
    ///
    /// Returns `GraphError` when no module is active, the key is invalid or
    /// taken, a referenced class is unknown, or consistency checking
    /// rejects one of the item's statements
    pub fn create_item(&mut self, spec: ItemSpec) -> Result<ItemId, GraphError> {
        let module = self.active_uri()?;
        let key = self.claim_key(spec.key, EntityKind::Item)?;
        let id = ItemId::from_index(self.entities.len());

        let mut statements = vec![Statement::new(id, ids::HAS_LABEL, spec.label.as_str())];
        if let Some(class) = spec.instance_of {
            self.require(class)?;
            statements.push(Statement::new(id, ids::IS_INSTANCE_OF, class));
        }
        if let Some(parent) = spec.subclass_of {
            self.require(parent)?;
            statements.push(Statement::new(id, ids::IS_SUBCLASS_OF, parent));
        }
        if let Some(description) = spec.description {
            statements.push(Statement::new(id, ids::HAS_DESCRIPTION, description));
        }
        if let Some(latex) = spec.latex {
            statements.push(Statement::new(id, ids::HAS_LATEX_STRING, latex));
        }

        self.admit(&key, &statements)?;
        self.insert_entity(&key, &spec.label, EntityKind::Item, &module);
        for statement in statements {
            self.push_statement(statement);
        }
        debug!(%key, label = %spec.label, %module, "created item");
        Ok(id)
    }

    /// Create a relation in the active module
    ///
    /// # Errors
    ///
    /// Returns `GraphError` when no module is active or the key is invalid or taken
    pub fn create_relation(&mut self, spec: RelationSpec) -> Result<ItemId, GraphError> {
        let module = self.active_uri()?;
        let key = self.claim_key(spec.key, EntityKind::Relation)?;
        let id = ItemId::from_index(self.entities.len());

        let mut statements = vec![Statement::new(id, ids::HAS_LABEL, spec.label.as_str())];
        if spec.functional {
            statements.push(Statement::new(id, ids::IS_FUNCTIONAL, true));
        }
        if let Some(description) = spec.description {
            statements.push(Statement::new(id, ids::HAS_DESCRIPTION, description));
        }

        self.admit(&key, &statements)?;
        self.insert_entity(&key, &spec.label, EntityKind::Relation, &module);
        for statement in statements {
            self.push_statement(statement);
        }
        debug!(%key, label = %spec.label, %module, "created relation");
        Ok(id)
    }

    /// Add the statement `subject relation object`
    ///
    /// # Errors
    ///
    /// Returns `GraphError` when an entity is unknown, `relation` is not a
    /// relation, or consistency checking rejects the statement
    pub fn set_relation(
        &mut self,
        subject: ItemId,
        relation: impl EntityRef,
        object: impl Into<Object>,
    ) -> Result<(), GraphError> {
        self.require(subject)?;
        let relation = self.relation_id(relation)?;
        let object = object.into();
        if let Object::Item(id) = &object {
            self.require(*id)?;
        }

        let statement = Statement {
            subject,
            relation,
            object,
        };
        if self.consistency_checking {
            if let Err(reason) = consistency::check(self, &statement) {
                return Err(self.rejected(&statement, reason));
            }
        }
        self.push_statement(statement);
        Ok(())
    }

    /// All objects of `subject relation`, in insertion order
    ///
    /// # Errors
    ///
    /// Returns `GraphError` when `relation` does not name a relation
    pub fn objects(
        &self,
        subject: ItemId,
        relation: impl EntityRef,
    ) -> Result<Vec<&Object>, GraphError> {
        let relation = self.relation_id(relation)?;
        Ok(self
            .statements_of(subject)
            .filter(|s| s.relation == relation)
            .map(|s| &s.object)
            .collect())
    }

    /// The single object of `subject relation`, if any
    ///
    /// # Errors
    ///
    /// Returns `GraphError::MultipleObjects` when there is more than one
    pub fn get(
        &self,
        subject: ItemId,
        relation: impl EntityRef,
    ) -> Result<Option<&Object>, GraphError> {
        let relation = self.relation_id(relation)?;
        let objects = self.objects(subject, relation)?;
        match objects.as_slice() {
            [] => Ok(None),
            [object] => Ok(Some(*object)),
            _ => Err(GraphError::MultipleObjects {
                subject: self.display_key(subject),
                relation: self.display_key(relation),
                count: objects.len(),
            }),
        }
    }

    /// Like [`Graph::get`], keeping only item objects
    ///
    /// # Errors
    ///
    /// See [`Graph::get`]
    pub fn get_item(
        &self,
        subject: ItemId,
        relation: impl EntityRef,
    ) -> Result<Option<ItemId>, GraphError> {
        Ok(self.get(subject, relation)?.and_then(Object::as_item))
    }

    /// Like [`Graph::objects`], keeping only item objects
    ///
    /// # Errors
    ///
    /// See [`Graph::objects`]
    pub fn item_objects(
        &self,
        subject: ItemId,
        relation: impl EntityRef,
    ) -> Result<Vec<ItemId>, GraphError> {
        Ok(self
            .objects(subject, relation)?
            .into_iter()
            .filter_map(Object::as_item)
            .collect())
    }

    /// Like [`Graph::get`], keeping only literal objects
    ///
    /// # Errors
    ///
    /// See [`Graph::get`]
    pub fn literal(
        &self,
        subject: ItemId,
        relation: impl EntityRef,
    ) -> Result<Option<&Literal>, GraphError> {
        Ok(self.get(subject, relation)?.and_then(Object::as_literal))
    }

    /// Statements with `subject` as subject, in insertion order
    pub fn statements_of(&self, subject: ItemId) -> impl Iterator<Item = &Statement> + '_ {
        self.by_subject
            .get(&subject)
            .into_iter()
            .flatten()
            .filter_map(|&index| self.statements.get(index))
    }

    /// Every statement, in insertion order
    pub fn statements(&self) -> impl Iterator<Item = &Statement> + '_ {
        self.statements.iter()
    }

    #[must_use]
    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.entities.get(id.index()).and_then(Option::as_ref)
    }

    /// Live items and relations in creation order
    pub fn items(&self) -> impl Iterator<Item = &Item> + '_ {
        self.entities.iter().flatten()
    }

    #[must_use]
    pub fn item_by_key(&self, key: &str) -> Option<ItemId> {
        self.by_key.get(key).copied()
    }

    #[must_use]
    pub fn label(&self, id: ItemId) -> Option<&str> {
        self.item(id).map(|item| item.label.as_str())
    }

    #[must_use]
    pub fn key(&self, id: ItemId) -> Option<&str> {
        self.item(id).map(|item| item.key.as_str())
    }

    /// Items whose label is exactly `label`, in creation order
    #[must_use]
    pub fn items_with_label(&self, label: &str) -> Vec<ItemId> {
        self.items()
            .filter(|item| item.label == label)
            .map(|item| item.id)
            .collect()
    }

    /// Resolve `"I35"`, `"R36__has_argument_tuple"`, `"ma__I5000"` or
    /// `"ma__I5000__sum_over_index"`. The label part matches either
    /// literally or with its underscores read as spaces.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::UnknownEntity` when the key or prefix is
    /// unknown and `GraphError::LabelMismatch` when the label disagrees
    pub fn resolve(&self, reference: &str) -> Result<ItemId, GraphError> {
        let unknown = || GraphError::UnknownEntity {
            reference: reference.to_string(),
        };

        let (prefix, rest) = match reference.split_once("__") {
            Some((head, tail))
                if !is_valid_key(head, EntityKind::Item)
                    && !is_valid_key(head, EntityKind::Relation) =>
            {
                (Some(head), tail)
            }
            _ => (None, reference),
        };
        let (key, label) = match rest.split_once("__") {
            Some((key, label)) => (key, Some(label)),
            None => (rest, None),
        };

        let id = self.item_by_key(key).ok_or_else(unknown)?;
        let item = self.require(id)?;

        if let Some(prefix) = prefix {
            let uri = self.prefixes.get(prefix).ok_or_else(unknown)?;
            if &item.module != uri {
                return Err(unknown());
            }
        }

        if let Some(label) = label {
            let expected = label.replace('_', " ");
            if label != item.label && expected != item.label {
                return Err(GraphError::LabelMismatch {
                    key: item.key.clone(),
                    expected,
                    actual: item.label.clone(),
                });
            }
        }

        Ok(id)
    }

    /// Object of `R4 is instance of`
    #[must_use]
    pub fn instance_of(&self, id: ItemId) -> Option<ItemId> {
        self.first_item(id, ids::IS_INSTANCE_OF)
    }

    /// Object of `R3 is subclass of`
    #[must_use]
    pub fn subclass_of(&self, id: ItemId) -> Option<ItemId> {
        self.first_item(id, ids::IS_SUBCLASS_OF)
    }

    /// Whether `class` equals `ancestor` or reaches it through `R3`
    #[must_use]
    pub fn is_subclass_of(&self, class: ItemId, ancestor: ItemId) -> bool {
        let mut current = Some(class);
        for _ in 0..MAX_DEPTH {
            match current {
                Some(id) if id == ancestor => return true,
                Some(id) => current = self.subclass_of(id),
                None => return false,
            }
        }
        false
    }

    #[must_use]
    pub fn is_instance_of(&self, item: ItemId, class: ItemId) -> bool {
        self.instance_of(item)
            .is_some_and(|direct| self.is_subclass_of(direct, class))
    }

    /// Whether `id` is a class: an instance of `I2 metaclass` or a subclass of something
    #[must_use]
    pub fn is_class(&self, id: ItemId) -> bool {
        id == ids::METACLASS
            || self.is_instance_of(id, ids::METACLASS)
            || self.subclass_of(id).is_some()
    }

    #[must_use]
    pub fn is_functional(&self, relation: ItemId) -> bool {
        self.statements_of(relation).any(|s| {
            s.relation == ids::IS_FUNCTIONAL && s.object == Object::Literal(Literal::Boolean(true))
        })
    }

    /// Value of `R40 has numeric value`
    #[must_use]
    pub fn numeric_value(&self, id: ItemId) -> Option<&Literal> {
        self.statements_of(id)
            .find(|s| s.relation == ids::HAS_NUMERIC_VALUE)
            .and_then(|s| s.object.as_literal())
    }

    /// Elements of the `R36` argument tuple of an applied mapping, in order
    #[must_use]
    pub fn tuple_elements(&self, node: ItemId) -> Vec<ItemId> {
        self.first_item(node, ids::HAS_ARGUMENT_TUPLE)
            .map(|tuple| {
                self.statements_of(tuple)
                    .filter(|s| s.relation == ids::HAS_ELEMENT)
                    .filter_map(|s| s.object.as_item())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether two nodes denote the same expression: the same item, equal
    /// numeric values, or the same mapping applied to pairwise equal
    /// arguments in the same order
    #[must_use]
    pub fn structurally_equal(&self, a: ItemId, b: ItemId) -> bool {
        self.structurally_equal_at(a, b, 0)
    }

    fn structurally_equal_at(&self, a: ItemId, b: ItemId, depth: usize) -> bool {
        if a == b {
            return true;
        }
        if depth > MAX_DEPTH {
            return false;
        }
        let mapping = |id| self.first_item(id, ids::IS_APPLIED_MAPPING_OF);
        match (mapping(a), mapping(b)) {
            (Some(left), Some(right)) => {
                let left_args = self.tuple_elements(a);
                let right_args = self.tuple_elements(b);
                left == right
                    && left_args.len() == right_args.len()
                    && left_args
                        .iter()
                        .zip(&right_args)
                        .all(|(x, y)| self.structurally_equal_at(*x, *y, depth + 1))
            }
            (None, None) => match (self.numeric_value(a), self.numeric_value(b)) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
            _ => false,
        }
    }

    /// Number of live items and relations, builtins included
    #[must_use]
    pub fn len(&self) -> usize {
        self.items().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }

    /// Marker for undoing entity creation with [`Graph::rollback`]
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            entities: self.entities.len(),
            next_auto_key: self.next_auto_key,
        }
    }

    /// Remove every entity created since `checkpoint`, with the statements
    /// that mention them, and hand their automatic keys out again
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        let created: Vec<ItemId> = (checkpoint.entities..self.entities.len())
            .map(ItemId::from_index)
            .filter(|id| self.item(*id).is_some())
            .collect();
        if !created.is_empty() {
            debug!(entities = created.len(), "rolling back");
            self.remove_entities(&created);
        }
        self.next_auto_key = self.next_auto_key.min(checkpoint.next_auto_key);
    }

    pub(crate) fn require(&self, id: ItemId) -> Result<&Item, GraphError> {
        self.item(id).ok_or_else(|| GraphError::UnknownEntity {
            reference: format!("#{}", id.index()),
        })
    }

    fn relation_id(&self, relation: impl EntityRef) -> Result<ItemId, GraphError> {
        let id = relation.to_id(self)?;
        let item = self.require(id)?;
        if item.kind != EntityKind::Relation {
            return Err(GraphError::NotARelation {
                key: item.key.clone(),
            });
        }
        Ok(id)
    }

    fn first_item(&self, subject: ItemId, relation: ItemId) -> Option<ItemId> {
        self.statements_of(subject)
            .find(|s| s.relation == relation)
            .and_then(|s| s.object.as_item())
    }

    /// Key for messages; removed entities show as `#<index>`
    pub(crate) fn display_key(&self, id: ItemId) -> String {
        self.key(id)
            .map_or_else(|| format!("#{}", id.index()), str::to_string)
    }

    fn active_uri(&self) -> Result<String, GraphError> {
        self.active_module()
            .map(str::to_string)
            .ok_or(GraphError::NoActiveModule)
    }

    fn claim_key(&mut self, key: Option<String>, kind: EntityKind) -> Result<String, GraphError> {
        match key {
            Some(key) => {
                if !is_valid_key(&key, kind) {
                    return Err(GraphError::InvalidKey {
                        key,
                        kind: kind.to_string(),
                    });
                }
                if self.by_key.contains_key(&key) {
                    return Err(GraphError::DuplicateKey { key });
                }
                Ok(key)
            }
            None => loop {
                let key = format!("{}{}", kind.key_prefix(), self.next_auto_key);
                self.next_auto_key += 1;
                if !self.by_key.contains_key(&key) {
                    break Ok(key);
                }
            },
        }
    }

    /// Type-check the statements of a new entity
    fn admit(&self, key: &str, statements: &[Statement]) -> Result<(), GraphError> {
        if !self.consistency_checking {
            return Ok(());
        }
        for statement in statements {
            if let Err(reason) = consistency::check_object(self, statement) {
                warn!(subject = %key, relation = %self.display_key(statement.relation), %reason, "rejected statement");
                return Err(GraphError::Inconsistent {
                    subject: key.to_string(),
                    relation: self.display_key(statement.relation),
                    reason,
                });
            }
        }
        Ok(())
    }

    pub(crate) fn rejected(&self, statement: &Statement, reason: String) -> GraphError {
        let subject = self.display_key(statement.subject);
        let relation = self.display_key(statement.relation);
        warn!(%subject, %relation, %reason, "rejected statement");
        GraphError::Inconsistent {
            subject,
            relation,
            reason,
        }
    }

    pub(crate) fn insert_entity(
        &mut self,
        key: &str,
        label: &str,
        kind: EntityKind,
        module: &str,
    ) -> ItemId {
        let id = ItemId::from_index(self.entities.len());
        self.entities.push(Some(Item {
            id,
            key: key.to_string(),
            label: label.to_string(),
            kind,
            module: module.to_string(),
        }));
        self.by_key.insert(key.to_string(), id);
        if let Some(owner) = self.modules.iter_mut().find(|m| m.uri == module) {
            owner.members.push(id);
        }
        id
    }

    pub(crate) fn push_statement(&mut self, statement: Statement) {
        let index = self.statements.len();
        self.by_subject
            .entry(statement.subject)
            .or_default()
            .push(index);
        self.statements.push(statement);
    }

    /// Drop entities and every statement that mentions them
    pub(crate) fn remove_entities(&mut self, removed: &[ItemId]) {
        let removed: HashSet<ItemId> = removed.iter().copied().collect();
        for id in &removed {
            if let Some(item) = self.entities.get_mut(id.index()).and_then(Option::take) {
                self.by_key.remove(&item.key);
            }
        }
        for module in &mut self.modules {
            module.members.retain(|id| !removed.contains(id));
        }
        self.statements
            .retain(|statement| !statement.mentions_any(&removed));

        self.by_subject.clear();
        for (index, statement) in self.statements.iter().enumerate() {
            self.by_subject
                .entry(statement.subject)
                .or_default()
                .push(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> Graph {
        let mut graph = Graph::with_settings(&Settings::default());
        graph.start_module("kgsym:/test").unwrap();
        graph
    }

    fn real(graph: &mut Graph, label: &str) -> ItemId {
        graph
            .create_item(ItemSpec::new(label).instance_of(ids::REAL_NUMBER))
            .unwrap()
    }

    #[test]
    fn test_auto_keys_start_at_first_auto_key() {
        let mut graph = graph();
        let a = real(&mut graph, "a");
        let b = real(&mut graph, "b");
        assert_eq!(graph.key(a), Some("I1000"));
        assert_eq!(graph.key(b), Some("I1001"));
        assert_eq!(graph.instance_of(a), Some(ids::REAL_NUMBER));
        assert_eq!(graph.item(a).map(Item::uri), Some("kgsym:/test#I1000".to_string()));
    }

    #[test]
    fn test_auto_keys_skip_taken_keys() {
        let mut graph = graph();
        graph
            .create_item(ItemSpec::new("taken").key("I1000"))
            .unwrap();
        let next = real(&mut graph, "a");
        assert_eq!(graph.key(next), Some("I1001"));
    }

    #[test]
    fn test_create_item_requires_module() {
        let mut graph = Graph::with_settings(&Settings::default());
        let err = graph.create_item(ItemSpec::new("a")).unwrap_err();
        assert!(matches!(err, GraphError::NoActiveModule));
    }

    #[test]
    fn test_duplicate_and_invalid_keys() {
        let mut graph = graph();
        let err = graph
            .create_item(ItemSpec::new("again").key("I35"))
            .unwrap_err();
        assert!(matches!(err, GraphError::DuplicateKey { .. }));

        let err = graph
            .create_item(ItemSpec::new("bad").key("R5000"))
            .unwrap_err();
        assert!(matches!(err, GraphError::InvalidKey { .. }));
    }

    #[test]
    fn test_create_item_rejects_non_class() {
        let mut graph = graph();
        // I55 add is not a class
        let err = graph
            .create_item(ItemSpec::new("x").instance_of(ids::ADD))
            .unwrap_err();
        assert!(matches!(err, GraphError::Inconsistent { .. }));
        // nothing was created
        assert!(graph.items_with_label("x").is_empty());
    }

    #[test]
    fn test_short_access_forms() {
        let mut graph = graph();
        let a = real(&mut graph, "a");
        assert_eq!(graph.get_item(a, "R4").unwrap(), Some(ids::REAL_NUMBER));
        assert_eq!(
            graph.get_item(a, "R4__is_instance_of").unwrap(),
            Some(ids::REAL_NUMBER)
        );
        assert_eq!(
            graph.get_item(a, ids::IS_INSTANCE_OF).unwrap(),
            Some(ids::REAL_NUMBER)
        );

        let err = graph.get_item(a, "R4__has_label").unwrap_err();
        assert!(matches!(err, GraphError::LabelMismatch { .. }));

        // items are not relations
        let err = graph.get(a, "I35").unwrap_err();
        assert!(matches!(err, GraphError::NotARelation { .. }));
    }

    #[test]
    fn test_resolve_with_label() {
        let graph = graph();
        assert_eq!(graph.resolve("I35__real_number").unwrap(), ids::REAL_NUMBER);
        assert!(graph.resolve("I9999").is_err());
        assert!(graph.resolve("zz__I35").is_err());
    }

    #[test]
    fn test_resolve_label_with_underscore() {
        let mut graph = graph();
        let x1 = real(&mut graph, "x_1");
        let spaced = real(&mut graph, "x 2");
        assert_eq!(graph.resolve("I1000__x_1").unwrap(), x1);
        assert_eq!(graph.resolve("I1001__x_2").unwrap(), spaced);
        match graph.resolve("I1000__x_2") {
            Err(GraphError::LabelMismatch { actual, .. }) => assert_eq!(actual, "x_1"),
            _ => panic!("Expected label mismatch"),
        }
    }

    #[test]
    fn test_objects_keep_insertion_order() {
        let mut graph = graph();
        let tuple = graph
            .create_item(ItemSpec::new("tuple").instance_of(ids::TUPLE))
            .unwrap();
        let a = real(&mut graph, "a");
        let b = real(&mut graph, "b");
        graph.set_relation(tuple, "R39", b).unwrap();
        graph.set_relation(tuple, "R39", a).unwrap();
        graph.set_relation(tuple, "R39", b).unwrap();
        assert_eq!(graph.item_objects(tuple, "R39").unwrap(), vec![b, a, b]);
    }

    #[test]
    fn test_get_on_non_functional_relation() {
        let mut graph = graph();
        let tuple = graph
            .create_item(ItemSpec::new("tuple").instance_of(ids::TUPLE))
            .unwrap();
        let a = real(&mut graph, "a");
        graph.set_relation(tuple, "R39", a).unwrap();
        graph.set_relation(tuple, "R39", a).unwrap();
        let err = graph.get(tuple, "R39").unwrap_err();
        assert!(matches!(err, GraphError::MultipleObjects { count: 2, .. }));
    }

    #[test]
    fn test_functional_relation_rejects_second_object() {
        let mut graph = graph();
        let a = real(&mut graph, "a");
        let err = graph
            .set_relation(a, "R4", ids::INTEGER_NUMBER)
            .unwrap_err();
        assert!(matches!(err, GraphError::Inconsistent { .. }));

        graph.disable_consistency_checking();
        graph.set_relation(a, "R4", ids::INTEGER_NUMBER).unwrap();
        assert_eq!(graph.objects(a, "R4").unwrap().len(), 2);
    }

    #[test]
    fn test_literals() {
        let mut graph = graph();
        let two = graph
            .create_item(ItemSpec::new("2").instance_of(ids::INTEGER_NUMBER))
            .unwrap();
        graph.set_relation(two, "R40", 2i64).unwrap();
        assert_eq!(graph.literal(two, "R40").unwrap(), Some(&Literal::Integer(2)));
        assert_eq!(graph.numeric_value(two), Some(&Literal::Integer(2)));
        assert_eq!(
            graph.get(two, "R1").unwrap().and_then(Object::as_text),
            Some("2")
        );
    }

    #[test]
    fn test_items_with_label() {
        let mut graph = graph();
        let first = real(&mut graph, "x");
        let second = real(&mut graph, "x");
        assert_eq!(graph.items_with_label("x"), vec![first, second]);
        assert_eq!(graph.items_with_label("add"), vec![ids::ADD]);
    }

    #[test]
    fn test_structural_equality() {
        let mut graph = graph();
        let a = real(&mut graph, "a");
        let b = real(&mut graph, "b");

        let node = |graph: &mut Graph, args: &[ItemId]| {
            let node = graph
                .create_item(ItemSpec::new("node").instance_of(ids::MATHEMATICAL_OBJECT))
                .unwrap();
            let tuple = graph
                .create_item(ItemSpec::new("tuple").instance_of(ids::TUPLE))
                .unwrap();
            graph.set_relation(node, "R35", ids::ADD).unwrap();
            graph.set_relation(node, "R36", tuple).unwrap();
            for arg in args {
                graph.set_relation(tuple, "R39", *arg).unwrap();
            }
            node
        };

        let ab = node(&mut graph, &[a, b]);
        let ab_again = node(&mut graph, &[a, b]);
        let ba = node(&mut graph, &[b, a]);
        assert!(graph.structurally_equal(ab, ab_again));
        assert!(!graph.structurally_equal(ab, ba));
        assert!(!graph.structurally_equal(a, b));
    }

    #[test]
    fn test_relation_creation() {
        let mut graph = graph();
        let relation = graph
            .create_relation(RelationSpec::new("has parent").functional())
            .unwrap();
        assert_eq!(graph.key(relation), Some("R1000"));
        assert!(graph.is_functional(relation));

        let a = real(&mut graph, "a");
        let b = real(&mut graph, "b");
        graph.set_relation(a, relation, b).unwrap();
        assert!(graph.set_relation(a, "R1000__has_parent", a).is_err());
    }

    #[test]
    fn test_rollback_removes_new_entities() {
        let mut graph = graph();
        let a = real(&mut graph, "a");
        let before = (graph.len(), graph.statement_count());
        let checkpoint = graph.checkpoint();

        let tuple = graph
            .create_item(ItemSpec::new("tuple").instance_of(ids::TUPLE))
            .unwrap();
        graph.set_relation(tuple, ids::HAS_ELEMENT, a).unwrap();
        let b = real(&mut graph, "b");
        graph.rollback(checkpoint);

        assert_eq!((graph.len(), graph.statement_count()), before);
        assert!(graph.item(tuple).is_none());
        assert!(graph.item(b).is_none());
        assert!(graph.resolve("I1002").is_err());
        assert_eq!(graph.module("kgsym:/test").unwrap().items(), &[a]);
        assert_eq!(graph.instance_of(a), Some(ids::REAL_NUMBER));

        // keys handed out after the rollback continue where the checkpoint was
        let c = real(&mut graph, "c");
        assert_eq!(graph.key(c), Some("I1001"));
        assert_ne!(c, tuple);
    }
}
