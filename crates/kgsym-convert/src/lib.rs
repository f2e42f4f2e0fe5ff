//! Conversion between expression trees and the knowledge graph
//!
//! [`Converter::expr_to_graph`] mirrors a canonical [`Expr`] into applied
//! mapping nodes, [`Converter::graph_to_expr`] reads them back, and
//! [`Converter::latex_to_graph`] parses a LaTeX formula and binds its
//! symbols to candidate items on the way.

use kgsym_ast::{Expr, Symbol};
use kgsym_graph::{Graph, ItemId, ItemSpec, ids};
use kgsym_parser::{BoundRole, Candidate, Resolved, SymbolResolver};
use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use tracing::debug;

mod error;
mod from_graph;
mod to_graph;
pub mod vocabulary;

pub use error::ConvertError;
pub use vocabulary::Vocabulary;

/// Deepest node nesting the conversions follow in either direction
pub const MAX_DEPTH: usize = 128;

/// Converts between expressions and the graph holding the math module.
///
/// The mapping items are looked up again whenever the math module was
/// unloaded and loaded since the last conversion.
pub struct Converter {
    vocabulary: RefCell<Vocabulary>,
}

impl Converter {
    /// # Errors
    ///
    /// Returns `ConvertError::MathModuleMissing` when the math module is not loaded
    pub fn new(graph: &Graph) -> Result<Self, ConvertError> {
        Ok(Self {
            vocabulary: RefCell::new(Vocabulary::resolve(graph)?),
        })
    }

    /// Mapping items as of the last conversion
    #[must_use]
    pub fn vocabulary(&self) -> Vocabulary {
        self.vocabulary.borrow().clone()
    }

    /// Mapping items of the math module currently loaded in `graph`
    fn current(&self, graph: &Graph) -> Result<Ref<'_, Vocabulary>, ConvertError> {
        let live = self.vocabulary.borrow().is_live(graph);
        if !live {
            let fresh = Vocabulary::resolve(graph)?;
            debug!(sum = graph.key(fresh.sum).unwrap_or_default(), "math module reloaded");
            *self.vocabulary.borrow_mut() = fresh;
        }
        Ok(self.vocabulary.borrow())
    }

    /// Symbols named by the items' labels and linked to their keys
    ///
    /// # Errors
    ///
    /// Returns `ConvertError::Graph` for an unknown item
    pub fn items_to_symbols(
        &self,
        graph: &Graph,
        items: &[ItemId],
    ) -> Result<Vec<Expr>, ConvertError> {
        items
            .iter()
            .map(|id| -> Result<Expr, ConvertError> {
                let item = graph.item(*id).ok_or_else(|| kgsym_graph::GraphError::UnknownEntity {
                    reference: format!("#{}", id.index()),
                })?;
                Ok(Expr::Symbol(Symbol::with_key(item.label.clone(), item.key.clone())))
            })
            .collect()
    }

    /// Resolver candidates for `items`, with their `R24` LaTeX strings
    ///
    /// # Errors
    ///
    /// Returns `ConvertError::Graph` for an unknown item
    pub fn candidates(&self, graph: &Graph, items: &[ItemId]) -> Result<Vec<Candidate>, ConvertError> {
        let mut candidates = Vec::with_capacity(items.len());
        for id in items {
            let item = graph.item(*id).ok_or_else(|| kgsym_graph::GraphError::UnknownEntity {
                reference: format!("#{}", id.index()),
            })?;
            let mut candidate = Candidate::new(item.key.clone(), item.label.clone());
            if let Some(latex) = graph
                .literal(*id, ids::HAS_LATEX_STRING)?
                .and_then(|literal| literal.as_text())
            {
                candidate = candidate.with_latex(latex);
            }
            candidates.push(candidate);
        }
        Ok(candidates)
    }

    /// Parse `latex`, bind its symbols to `items` and mirror it into the graph
    ///
    /// # Errors
    ///
    /// Returns `ConvertError::Expr` for syntax errors and unresolved or
    /// ambiguous names, otherwise as [`Converter::expr_to_graph`]
    pub fn latex_to_graph(
        &self,
        graph: &mut Graph,
        latex: &str,
        items: &[ItemId],
    ) -> Result<ItemId, ConvertError> {
        let parsed = kgsym_parser::parse_latex(latex)?;
        self.latex_expr_to_graph(graph, &parsed, items)
    }

    /// Like [`Converter::latex_to_graph`] for an already parsed formula
    ///
    /// # Errors
    ///
    /// See [`Converter::latex_to_graph`]
    pub fn latex_expr_to_graph(
        &self,
        graph: &mut Graph,
        parsed: &Expr,
        items: &[ItemId],
    ) -> Result<ItemId, ConvertError> {
        atomically(graph, |graph| {
            let expr = self.bind_symbols(graph, parsed, items)?;
            self.expr_to_graph(graph, &expr)
        })
    }

    /// Resolve the symbols of a parsed expression against `items`.
    ///
    /// Bound variables without a candidate get a new item in the active
    /// module: sum indices are integers, other variables real numbers.
    ///
    /// # Errors
    ///
    /// Returns `ConvertError::Expr` for unresolved or ambiguous names and
    /// `ConvertError::Graph` when the new items cannot be created
    pub fn bind_symbols(
        &self,
        graph: &mut Graph,
        parsed: &Expr,
        items: &[ItemId],
    ) -> Result<Expr, ConvertError> {
        let resolver = SymbolResolver::new(self.candidates(graph, items)?);
        let Resolved { expr, fresh } = resolver.resolve(parsed)?;
        if fresh.is_empty() {
            return Ok(expr);
        }

        let keys = atomically(graph, |graph| {
            let mut keys = HashMap::new();
            for symbol in &fresh {
                let class = match symbol.role {
                    BoundRole::SumIndex => ids::INTEGER_NUMBER,
                    BoundRole::Integration
                    | BoundRole::Differentiation
                    | BoundRole::Substitution => ids::REAL_NUMBER,
                };
                let id = graph.create_item(ItemSpec::new(symbol.name.clone()).instance_of(class))?;
                let key = graph.key(id).unwrap_or_default().to_string();
                debug!(name = %symbol.name, %key, role = ?symbol.role, "created item for bound variable");
                keys.insert(symbol.name.clone(), key);
            }
            Ok(keys)
        })?;

        Ok(expr.map_symbols(&mut |symbol| match &symbol.key {
            Some(_) => None,
            None => keys
                .get(&symbol.name)
                .map(|key| Symbol::with_key(symbol.name.clone(), key.clone())),
        }))
    }

    /// Apply the expression at `node` to `args` and mirror the result.
    ///
    /// Only derivatives and indefinite integrals are callable; the result
    /// is the expression evaluated at the given point.
    ///
    /// # Errors
    ///
    /// Returns `ConvertError::Expr` with `KgError::NotCallable` or
    /// `KgError::Arity` when the call is not possible
    pub fn call_node(
        &self,
        graph: &mut Graph,
        node: ItemId,
        args: &[ItemId],
    ) -> Result<ItemId, ConvertError> {
        let callee = self.graph_to_expr(graph, node)?;
        let args = args
            .iter()
            .map(|arg| self.graph_to_expr(graph, *arg))
            .collect::<Result<Vec<_>, _>>()?;
        let result = callee.call(&args)?;
        self.expr_to_graph(graph, &result)
    }
}

/// Run `convert` and remove whatever it created in `graph` if it fails
fn atomically<T>(
    graph: &mut Graph,
    convert: impl FnOnce(&mut Graph) -> Result<T, ConvertError>,
) -> Result<T, ConvertError> {
    let checkpoint = graph.checkpoint();
    let result = convert(graph);
    if let Err(err) = &result {
        debug!(%err, "conversion failed, removing its items");
        graph.rollback(checkpoint);
    }
    result
}
