//! Graph nodes back to canonical expression trees.

use crate::{ConvertError, Converter, MAX_DEPTH, Vocabulary};
use kgsym_ast::{Expr, Number, Symbol};
use kgsym_graph::{Graph, ItemId, Literal, ids};
use tracing::debug;

impl Converter {
    /// Rebuild the expression below `node` through the canonical constructors
    ///
    /// Items without a mapping become symbols named by their label and keyed
    /// by their key, or numbers when they carry `R40 has numeric value`.
    ///
    /// # Errors
    ///
    /// Returns `ConvertError::Malformed` when a node's argument tuple does not
    /// fit its mapping or the nodes nest deeper than [`MAX_DEPTH`] levels
    /// (a tuple that contains its own node does), and
    /// `ConvertError::MathModuleMissing` when the math module is not loaded
    pub fn graph_to_expr(&self, graph: &Graph, node: ItemId) -> Result<Expr, ConvertError> {
        let vocabulary = self.current(graph)?;
        Reader {
            vocabulary: &vocabulary,
            graph,
        }
        .node(node, 0)
    }
}

struct Reader<'a> {
    vocabulary: &'a Vocabulary,
    graph: &'a Graph,
}

impl Reader<'_> {
    fn node(&self, node: ItemId, depth: usize) -> Result<Expr, ConvertError> {
        if depth > MAX_DEPTH {
            return Err(self.malformed(node, &format!("nesting exceeds {MAX_DEPTH} levels")));
        }
        let depth = depth + 1;
        let graph = self.graph;
        let Some(mapping) = graph.get_item(node, ids::IS_APPLIED_MAPPING_OF)? else {
            return self.leaf(node);
        };
        let args = graph.tuple_elements(node);
        let vocabulary = self.vocabulary;

        let expr = if mapping == ids::ADD {
            Expr::add(self.nodes(&args, depth)?)
        } else if mapping == ids::MUL {
            Expr::mul(self.nodes(&args, depth)?)
        } else if mapping == ids::POW {
            let [base, exponent] = self.arity(node, &args)?;
            Expr::pow(self.node(base, depth)?, self.node(exponent, depth)?)
        } else if mapping == vocabulary.sum {
            let [term, index, limits] = self.arity(node, &args)?;
            let (lower, upper) = self.limits(limits, depth)?;
            Expr::sum(self.node(term, depth)?, self.variable(index)?, lower, upper)
        } else if mapping == vocabulary.integral {
            let [integrand, var] = self.arity(node, &args)?;
            Expr::integral(self.node(integrand, depth)?, self.variable(var)?, None)
        } else if mapping == vocabulary.definite_integral {
            let [integrand, var, limits] = self.arity(node, &args)?;
            Expr::integral(
                self.node(integrand, depth)?,
                self.variable(var)?,
                Some(self.limits(limits, depth)?),
            )
        } else if mapping == vocabulary.derivative {
            let [inner, var] = self.arity(node, &args)?;
            Expr::derivative(self.node(inner, depth)?, self.variable(var)?)
        } else if mapping == vocabulary.evaluated_at {
            let [inner, var, point] = self.arity(node, &args)?;
            Expr::subs(
                self.node(inner, depth)?,
                self.variable(var)?,
                self.node(point, depth)?,
            )
        } else if mapping == vocabulary.limits {
            return Err(self.malformed(node, "limits only appear inside sums and integrals"));
        } else {
            let args = self.nodes(&args, depth)?;
            match vocabulary.function_name(mapping) {
                Some("sqrt") => match <[Expr; 1]>::try_from(args) {
                    Ok([radicand]) => Expr::pow(radicand, Expr::Number(Number::Rational(1, 2))),
                    Err(_) => return Err(self.malformed(node, "sqrt takes one argument")),
                },
                Some(name) => Expr::apply(name, args),
                None => {
                    let func = self.variable(mapping)?;
                    Expr::Apply { func, args }
                }
            }
        };

        debug!(node = graph.key(node).unwrap_or_default(), %expr, "converted node");
        Ok(expr)
    }

    fn nodes(&self, nodes: &[ItemId], depth: usize) -> Result<Vec<Expr>, ConvertError> {
        let mut exprs = Vec::with_capacity(nodes.len());
        for node in nodes {
            exprs.push(self.node(*node, depth)?);
        }
        Ok(exprs)
    }

    fn leaf(&self, node: ItemId) -> Result<Expr, ConvertError> {
        match self.graph.numeric_value(node) {
            Some(literal) => {
                let number = match literal {
                    Literal::Integer(value) => Some(Number::Integer(*value)),
                    Literal::Rational(numerator, denominator) => {
                        Number::rational(*numerator, *denominator)
                    }
                    Literal::Float(value) => Some(Number::Float(*value)),
                    Literal::Text(_) | Literal::Boolean(_) => None,
                };
                number
                    .map(Expr::Number)
                    .ok_or_else(|| self.malformed(node, "invalid numeric value"))
            }
            None => Ok(Expr::Symbol(self.variable(node)?)),
        }
    }

    fn variable(&self, node: ItemId) -> Result<Symbol, ConvertError> {
        let item = self
            .graph
            .item(node)
            .ok_or_else(|| self.malformed(node, "dangling reference"))?;
        Ok(Symbol::with_key(item.label.clone(), item.key.clone()))
    }

    fn limits(&self, node: ItemId, depth: usize) -> Result<(Expr, Expr), ConvertError> {
        if self.graph.get_item(node, ids::IS_APPLIED_MAPPING_OF)? != Some(self.vocabulary.limits) {
            return Err(self.malformed(node, "expected limits"));
        }
        let [lower, upper] = self.arity(node, &self.graph.tuple_elements(node))?;
        Ok((self.node(lower, depth)?, self.node(upper, depth)?))
    }

    fn arity<const N: usize>(&self, node: ItemId, args: &[ItemId]) -> Result<[ItemId; N], ConvertError> {
        <[ItemId; N]>::try_from(args).map_err(|_| {
            self.malformed(node, &format!("expected {N} arguments, found {}", args.len()))
        })
    }

    fn malformed(&self, node: ItemId, reason: &str) -> ConvertError {
        ConvertError::Malformed {
            node: self.graph.key(node).unwrap_or("?").to_string(),
            reason: reason.to_string(),
        }
    }
}
