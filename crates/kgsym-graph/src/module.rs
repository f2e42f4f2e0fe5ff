//! Modules, namespace scopes and the JSON module loader.
//!
//! Every entity belongs to the module that was active when it was created.
//! Scopes form a stack: [`Graph::start_module`] and [`Graph::end_module`]
//! push and pop explicitly, [`Graph::uri_scope`] returns a guard that pops
//! on drop.

use crate::builtins::{BUILTINS_URI, ids};
use crate::consistency;
use crate::entity::{EntityKind, ItemId, Statement, is_valid_key};
use crate::{Graph, GraphError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use tracing::{debug, info, warn};

pub const MATH_MODULE_URI: &str = "kgsym:/math";
pub const MATH_MODULE_PREFIX: &str = "ma";
const MATH_MODULE_SOURCE: &str = include_str!("../modules/math.json");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub uri: String,
    pub prefix: Option<String>,
    pub(crate) members: Vec<ItemId>,
}

impl Module {
    fn new(uri: &str) -> Self {
        Self {
            uri: uri.to_string(),
            prefix: None,
            members: Vec::new(),
        }
    }

    /// Entities created in this module, in creation order
    #[must_use]
    pub fn items(&self) -> &[ItemId] {
        &self.members
    }
}

/// On-disk module definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleFile {
    pub uri: String,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub relations: Vec<RelationEntry>,
    #[serde(default)]
    pub items: Vec<ItemEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationEntry {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub functional: bool,
    #[serde(default)]
    pub description: Option<String>,
}

/// Item definition; `instance_of` and `subclass_of` take any reference
/// accepted by [`Graph::resolve`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemEntry {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub instance_of: Option<String>,
    #[serde(default)]
    pub subclass_of: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub latex: Option<String>,
}

/// Active module scope; pops itself when dropped
pub struct ModuleScope<'g> {
    graph: &'g mut Graph,
    uri: String,
}

impl ModuleScope<'_> {
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl Deref for ModuleScope<'_> {
    type Target = Graph;

    fn deref(&self) -> &Graph {
        &*self.graph
    }
}

impl DerefMut for ModuleScope<'_> {
    fn deref_mut(&mut self) -> &mut Graph {
        &mut *self.graph
    }
}

impl Drop for ModuleScope<'_> {
    fn drop(&mut self) {
        self.graph.pop_scope(&self.uri);
    }
}

impl Graph {
    /// Uri of the innermost active scope
    #[must_use]
    pub fn active_module(&self) -> Option<&str> {
        self.scopes.last().map(String::as_str)
    }

    #[must_use]
    pub fn module(&self, uri: &str) -> Option<&Module> {
        self.modules.iter().find(|module| module.uri == uri)
    }

    /// Loaded modules, builtins first
    pub fn modules(&self) -> impl Iterator<Item = &Module> + '_ {
        self.modules.iter()
    }

    /// Uri bound to `prefix`
    #[must_use]
    pub fn prefix_uri(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(String::as_str)
    }

    /// Make `uri` the active module, registering it if needed
    ///
    /// # Errors
    ///
    /// Returns `GraphError::BuiltinModule` for the builtin module
    pub fn start_module(&mut self, uri: &str) -> Result<(), GraphError> {
        self.register_module(uri, None)?;
        self.scopes.push(uri.to_string());
        debug!(%uri, depth = self.scopes.len(), "entered module scope");
        Ok(())
    }

    /// Leave the innermost module scope, returning its uri
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NoActiveModule` when no scope is active
    pub fn end_module(&mut self) -> Result<String, GraphError> {
        let uri = self.scopes.pop().ok_or(GraphError::NoActiveModule)?;
        debug!(%uri, depth = self.scopes.len(), "left module scope");
        Ok(uri)
    }

    /// Enter `uri` with `prefix` bound until the returned guard drops
    ///
    /// # Errors
    ///
    /// Returns `GraphError::PrefixConflict` when `prefix` names another
    /// module and `GraphError::BuiltinModule` for the builtin module
    pub fn uri_scope(&mut self, uri: &str, prefix: &str) -> Result<ModuleScope<'_>, GraphError> {
        self.register_module(uri, Some(prefix))?;
        self.scopes.push(uri.to_string());
        Ok(ModuleScope {
            graph: self,
            uri: uri.to_string(),
        })
    }

    /// Load a module definition from JSON text, returning its uri
    ///
    /// With `reuse_loaded` an already-loaded module of the same uri is
    /// returned unchanged. A module whose statements fail consistency
    /// checking is rolled back completely.
    ///
    /// # Errors
    ///
    /// Returns `GraphError` on malformed JSON, invalid or taken keys,
    /// unknown references, prefix conflicts or rejected statements
    pub fn load_module_from_str(
        &mut self,
        source: &str,
        prefix: Option<&str>,
        reuse_loaded: bool,
    ) -> Result<String, GraphError> {
        let file: ModuleFile = serde_json::from_str(source)?;
        self.load_module_file(&file, prefix, reuse_loaded)
    }

    /// Load a module definition file
    ///
    /// # Errors
    ///
    /// Returns `GraphError::Io` when the file cannot be read, otherwise as
    /// [`Graph::load_module_from_str`]
    pub fn load_module_from_path(
        &mut self,
        path: impl AsRef<Path>,
        prefix: Option<&str>,
        reuse_loaded: bool,
    ) -> Result<String, GraphError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| GraphError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_module_from_str(&source, prefix, reuse_loaded)
    }

    /// Load the bundled math module under the `ma` prefix, reusing it if loaded
    ///
    /// # Errors
    ///
    /// Returns `GraphError` when its keys clash with existing entities
    pub fn load_math_module(&mut self) -> Result<String, GraphError> {
        self.load_module_from_str(MATH_MODULE_SOURCE, Some(MATH_MODULE_PREFIX), true)
    }

    /// Remove a module, its entities and every statement mentioning them
    ///
    /// # Errors
    ///
    /// Returns `GraphError::BuiltinModule` for the builtin module and
    /// `GraphError::UnknownModule` when `uri` is not loaded
    pub fn unload_module(&mut self, uri: &str) -> Result<(), GraphError> {
        if uri == BUILTINS_URI {
            return Err(GraphError::BuiltinModule {
                uri: uri.to_string(),
            });
        }
        let removed = self
            .module(uri)
            .map(|module| module.members.len())
            .ok_or_else(|| GraphError::UnknownModule {
                uri: uri.to_string(),
            })?;
        self.remove_module(uri);
        info!(%uri, items = removed, "unloaded module");
        Ok(())
    }

    pub(crate) fn register_builtin_module(&mut self, uri: &str) {
        self.modules.push(Module::new(uri));
    }

    fn register_module(&mut self, uri: &str, prefix: Option<&str>) -> Result<(), GraphError> {
        if uri == BUILTINS_URI {
            return Err(GraphError::BuiltinModule {
                uri: uri.to_string(),
            });
        }
        if let Some(prefix) = prefix {
            self.check_prefix(prefix, uri)?;
        }
        if self.module(uri).is_none() {
            self.modules.push(Module::new(uri));
        }
        if let Some(prefix) = prefix {
            self.prefixes.insert(prefix.to_string(), uri.to_string());
            if let Some(module) = self.modules.iter_mut().find(|m| m.uri == uri) {
                module.prefix.get_or_insert_with(|| prefix.to_string());
            }
        }
        Ok(())
    }

    fn check_prefix(&self, prefix: &str, uri: &str) -> Result<(), GraphError> {
        match self.prefixes.get(prefix) {
            Some(bound) if bound != uri => Err(GraphError::PrefixConflict {
                prefix: prefix.to_string(),
                bound: bound.clone(),
            }),
            _ => Ok(()),
        }
    }

    pub(crate) fn pop_scope(&mut self, uri: &str) {
        if let Some(position) = self.scopes.iter().rposition(|scope| scope == uri) {
            self.scopes.remove(position);
        }
    }

    fn load_module_file(
        &mut self,
        file: &ModuleFile,
        prefix: Option<&str>,
        reuse_loaded: bool,
    ) -> Result<String, GraphError> {
        let prefix = prefix.or(file.prefix.as_deref());

        if self.module(&file.uri).is_some() {
            if !reuse_loaded {
                return Err(GraphError::ModuleAlreadyLoaded {
                    uri: file.uri.clone(),
                });
            }
            if let Some(prefix) = prefix {
                self.register_module(&file.uri, Some(prefix))?;
            }
            debug!(uri = %file.uri, "reusing loaded module");
            return Ok(file.uri.clone());
        }

        self.check_new_keys(file)?;
        self.register_module(&file.uri, prefix)?;

        self.scopes.push(file.uri.clone());
        let result = self.populate(file);
        self.pop_scope(&file.uri);

        if let Err(err) = result {
            warn!(uri = %file.uri, %err, "module rejected, rolling back");
            self.remove_module(&file.uri);
            return Err(err);
        }

        info!(
            uri = %file.uri,
            items = file.items.len(),
            relations = file.relations.len(),
            "loaded module"
        );
        Ok(file.uri.clone())
    }

    fn check_new_keys(&self, file: &ModuleFile) -> Result<(), GraphError> {
        let mut seen = HashSet::new();
        let keys = file
            .relations
            .iter()
            .map(|r| (r.key.as_str(), EntityKind::Relation))
            .chain(file.items.iter().map(|i| (i.key.as_str(), EntityKind::Item)));

        for (key, kind) in keys {
            if !is_valid_key(key, kind) {
                return Err(GraphError::InvalidKey {
                    key: key.to_string(),
                    kind: kind.to_string(),
                });
            }
            if !seen.insert(key) || self.item_by_key(key).is_some() {
                return Err(GraphError::DuplicateKey {
                    key: key.to_string(),
                });
            }
        }
        Ok(())
    }

    fn populate(&mut self, file: &ModuleFile) -> Result<(), GraphError> {
        let uri = file.uri.as_str();
        let mut created = Vec::with_capacity(file.relations.len() + file.items.len());

        for entry in &file.relations {
            let id = self.insert_entity(&entry.key, &entry.label, EntityKind::Relation, uri);
            self.push_statement(Statement::new(id, ids::HAS_LABEL, entry.label.as_str()));
            if entry.functional {
                self.push_statement(Statement::new(id, ids::IS_FUNCTIONAL, true));
            }
            if let Some(description) = &entry.description {
                self.push_statement(Statement::new(id, ids::HAS_DESCRIPTION, description.as_str()));
            }
            created.push(id);
        }

        for entry in &file.items {
            let id = self.insert_entity(&entry.key, &entry.label, EntityKind::Item, uri);
            self.push_statement(Statement::new(id, ids::HAS_LABEL, entry.label.as_str()));
            if let Some(description) = &entry.description {
                self.push_statement(Statement::new(id, ids::HAS_DESCRIPTION, description.as_str()));
            }
            if let Some(latex) = &entry.latex {
                self.push_statement(Statement::new(id, ids::HAS_LATEX_STRING, latex.as_str()));
            }
            created.push(id);
        }

        // classes may be defined further down the same file
        for entry in &file.items {
            let Some(id) = self.item_by_key(&entry.key) else {
                continue;
            };
            if let Some(class) = &entry.instance_of {
                let class = self.resolve(class)?;
                self.push_statement(Statement::new(id, ids::IS_INSTANCE_OF, class));
            }
            if let Some(parent) = &entry.subclass_of {
                let parent = self.resolve(parent)?;
                self.push_statement(Statement::new(id, ids::IS_SUBCLASS_OF, parent));
            }
        }

        if self.consistency_checking {
            for id in created {
                for statement in self.statements_of(id) {
                    if let Err(reason) = consistency::check_object(self, statement) {
                        return Err(self.rejected(statement, reason));
                    }
                }
            }
        }
        Ok(())
    }

    fn remove_module(&mut self, uri: &str) {
        let Some(position) = self.modules.iter().position(|m| m.uri == uri) else {
            return;
        };
        let module = self.modules.remove(position);
        self.remove_entities(&module.members);
        self.prefixes.retain(|_, bound| bound != uri);
        self.scopes.retain(|scope| scope != uri);
    }
}
