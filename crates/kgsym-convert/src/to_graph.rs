//! Expression trees to graph nodes.
//!
//! Every operation becomes a `mathematical object` item that is an applied
//! mapping of the operation, with its operands collected in an argument
//! tuple. Operand order is the argument order of the canonical expression.

use crate::{ConvertError, Converter, MAX_DEPTH, Vocabulary, atomically};
use kgsym_ast::{Expr, Number, Symbol};
use kgsym_graph::{Graph, ItemId, ItemSpec, Literal, ids};
use tracing::debug;

impl Converter {
    /// Mirror `expr` into the active module of `graph`, returning the root node
    ///
    /// Nothing is left behind in the graph when the conversion fails.
    ///
    /// # Errors
    ///
    /// Returns `ConvertError::UnboundSymbol` for symbols without an item key,
    /// `ConvertError::UnknownMapping` for unknown functions,
    /// `ConvertError::TooDeep` past [`MAX_DEPTH`] levels and
    /// `ConvertError::Graph` when item creation fails (no active module,
    /// rejected statements)
    pub fn expr_to_graph(&self, graph: &mut Graph, expr: &Expr) -> Result<ItemId, ConvertError> {
        let vocabulary = self.current(graph)?;
        atomically(graph, |graph| {
            Writer {
                vocabulary: &vocabulary,
                graph,
            }
            .expr(expr, 0)
        })
    }
}

struct Writer<'a> {
    vocabulary: &'a Vocabulary,
    graph: &'a mut Graph,
}

impl Writer<'_> {
    fn expr(&mut self, expr: &Expr, depth: usize) -> Result<ItemId, ConvertError> {
        if depth > MAX_DEPTH {
            return Err(ConvertError::TooDeep { limit: MAX_DEPTH });
        }
        let depth = depth + 1;
        let node = match expr {
            Expr::Number(number) => self.number_item(*number)?,
            Expr::Symbol(symbol) => self.symbol_item(symbol)?,
            Expr::Add(terms) => {
                let args = self.exprs(terms, depth)?;
                self.mapping_node(expr.to_string(), ids::ADD, &args)?
            }
            Expr::Mul(factors) => {
                let args = self.exprs(factors, depth)?;
                self.mapping_node(expr.to_string(), ids::MUL, &args)?
            }
            Expr::Pow(base, exponent) => {
                let args = [self.expr(base, depth)?, self.expr(exponent, depth)?];
                self.mapping_node(expr.to_string(), ids::POW, &args)?
            }
            Expr::Apply { func, args } => {
                let mapping = self.function_mapping(func)?;
                let args = self.exprs(args, depth)?;
                self.mapping_node(expr.to_string(), mapping, &args)?
            }
            Expr::Sum {
                term,
                index,
                lower,
                upper,
            } => {
                let term = self.expr(term, depth)?;
                let index = self.symbol_item(index)?;
                let limits = self.limits_node(lower, upper, depth)?;
                self.mapping_node(expr.to_string(), self.vocabulary.sum, &[term, index, limits])?
            }
            Expr::Integral {
                integrand,
                var,
                bounds,
            } => {
                let integrand = self.expr(integrand, depth)?;
                let var = self.symbol_item(var)?;
                match bounds {
                    None => self.mapping_node(
                        expr.to_string(),
                        self.vocabulary.integral,
                        &[integrand, var],
                    )?,
                    Some((lower, upper)) => {
                        let limits = self.limits_node(lower, upper, depth)?;
                        self.mapping_node(
                            expr.to_string(),
                            self.vocabulary.definite_integral,
                            &[integrand, var, limits],
                        )?
                    }
                }
            }
            Expr::Derivative { expr: inner, var } => {
                let inner = self.expr(inner, depth)?;
                let var = self.symbol_item(var)?;
                self.mapping_node(expr.to_string(), self.vocabulary.derivative, &[inner, var])?
            }
            Expr::Subs {
                expr: inner,
                var,
                point,
            } => {
                let inner = self.expr(inner, depth)?;
                let var = self.symbol_item(var)?;
                let point = self.expr(point, depth)?;
                self.mapping_node(
                    expr.to_string(),
                    self.vocabulary.evaluated_at,
                    &[inner, var, point],
                )?
            }
        };
        Ok(node)
    }

    fn exprs(&mut self, exprs: &[Expr], depth: usize) -> Result<Vec<ItemId>, ConvertError> {
        let mut nodes = Vec::with_capacity(exprs.len());
        for expr in exprs {
            nodes.push(self.expr(expr, depth)?);
        }
        Ok(nodes)
    }

    /// `node R4 I12; node R35 mapping; node R36 tuple; tuple R39 arg...`
    fn mapping_node(
        &mut self,
        label: String,
        mapping: ItemId,
        args: &[ItemId],
    ) -> Result<ItemId, ConvertError> {
        let graph = &mut *self.graph;
        let tuple = graph.create_item(ItemSpec::new("argument tuple").instance_of(ids::TUPLE))?;
        for arg in args {
            graph.set_relation(tuple, ids::HAS_ELEMENT, *arg)?;
        }

        let node = graph.create_item(ItemSpec::new(label).instance_of(ids::MATHEMATICAL_OBJECT))?;
        graph.set_relation(node, ids::IS_APPLIED_MAPPING_OF, mapping)?;
        graph.set_relation(node, ids::HAS_ARGUMENT_TUPLE, tuple)?;

        debug!(
            node = graph.key(node).unwrap_or_default(),
            mapping = graph.key(mapping).unwrap_or_default(),
            args = args.len(),
            "created applied mapping"
        );
        Ok(node)
    }

    fn limits_node(
        &mut self,
        lower: &Expr,
        upper: &Expr,
        depth: usize,
    ) -> Result<ItemId, ConvertError> {
        let args = [self.expr(lower, depth)?, self.expr(upper, depth)?];
        self.mapping_node(format!("({lower}, {upper})"), self.vocabulary.limits, &args)
    }

    fn symbol_item(&self, symbol: &Symbol) -> Result<ItemId, ConvertError> {
        let key = symbol
            .key
            .as_deref()
            .ok_or_else(|| ConvertError::UnboundSymbol {
                name: symbol.name.clone(),
            })?;
        Ok(self.graph.resolve(key)?)
    }

    fn function_mapping(&self, func: &Symbol) -> Result<ItemId, ConvertError> {
        if let Some(key) = &func.key {
            return Ok(self.graph.resolve(key)?);
        }
        self.vocabulary
            .function(&func.name)
            .ok_or_else(|| ConvertError::UnknownMapping {
                name: func.name.clone(),
            })
    }

    /// A fresh item per occurrence, classified by the kind of number
    fn number_item(&mut self, number: Number) -> Result<ItemId, ConvertError> {
        let (class, value) = match number {
            Number::Integer(value) => (ids::INTEGER_NUMBER, Literal::Integer(value)),
            Number::Rational(numerator, denominator) => {
                (ids::RATIONAL_NUMBER, Literal::Rational(numerator, denominator))
            }
            Number::Float(value) => (ids::REAL_NUMBER, Literal::Float(value)),
        };
        let item = self
            .graph
            .create_item(ItemSpec::new(number.to_string()).instance_of(class))?;
        self.graph.set_relation(item, ids::HAS_NUMERIC_VALUE, value)?;
        Ok(item)
    }
}
