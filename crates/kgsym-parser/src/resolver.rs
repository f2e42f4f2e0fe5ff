//! Binding of parsed symbols to candidate graph items.
//!
//! A parsed formula only carries names. The resolver matches each free
//! name against a list of candidate items, first by LaTeX spelling and then
//! by label, and stores the matching item key on the symbol. Variables bound
//! inside the formula (sum indices, integration and differentiation
//! variables) may be left without a candidate; they are reported as fresh
//! so the caller can create items for them.

use kgsym_ast::{Expr, KgError, Symbol};

/// Function names with a fixed meaning that need no candidate item
pub const KNOWN_FUNCTIONS: &[&str] = &["sin", "cos", "tan", "exp", "log", "sqrt"];

/// A graph item that a formula symbol may refer to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub key: String,
    pub label: String,
    pub latex: Option<String>,
}

impl Candidate {
    #[must_use]
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            latex: None,
        }
    }

    #[must_use]
    pub fn with_latex(mut self, latex: impl Into<String>) -> Self {
        self.latex = Some(latex.into());
        self
    }

    fn matches_latex(&self, name: &str) -> bool {
        self.latex
            .as_deref()
            .is_some_and(|latex| normalize_latex_name(latex) == name)
    }

    fn matches_label(&self, name: &str) -> bool {
        self.label == name || normalize_latex_name(&self.label) == name
    }
}

/// Spell a LaTeX name the way the parser names symbols: `\alpha` -> `alpha`,
/// `x_{1}` -> `x_1`
#[must_use]
pub fn normalize_latex_name(latex: &str) -> String {
    latex
        .chars()
        .filter(|c| !matches!(c, '\\' | '{' | '}') && !c.is_whitespace())
        .collect()
}

/// How a variable is bound inside a formula
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundRole {
    SumIndex,
    Integration,
    Differentiation,
    Substitution,
}

/// A bound variable that matched no candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreshSymbol {
    pub name: String,
    pub role: BoundRole,
}

/// Resolution result: the keyed expression plus the fresh variables
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub expr: Expr,
    pub fresh: Vec<FreshSymbol>,
}

/// Names bound by enclosing sums, integrals and derivatives
struct Scope<'a> {
    binding: Option<&'a Symbol>,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    const fn root() -> Self {
        Self {
            binding: None,
            parent: None,
        }
    }

    const fn with_parent(binding: &'a Symbol, parent: &'a Scope<'a>) -> Self {
        Self {
            binding: Some(binding),
            parent: Some(parent),
        }
    }

    /// Innermost binding of `name`, checking parent scopes if not found locally
    fn get(&self, name: &str) -> Option<&'a Symbol> {
        match self.binding {
            Some(symbol) if symbol.name == name => Some(symbol),
            _ => self.parent.and_then(|parent| parent.get(name)),
        }
    }
}

pub struct SymbolResolver {
    candidates: Vec<Candidate>,
}

impl SymbolResolver {
    #[must_use]
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    #[must_use]
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Find the single candidate for `name`.
    ///
    /// LaTeX spellings take precedence over labels.
    ///
    /// # Errors
    ///
    /// Returns `KgError::AmbiguousSymbol` when several candidates match equally.
    pub fn lookup(&self, name: &str) -> Result<Option<&Candidate>, KgError> {
        let by_latex: Vec<&Candidate> = self
            .candidates
            .iter()
            .filter(|c| c.matches_latex(name))
            .collect();
        let matches = if by_latex.is_empty() {
            self.candidates
                .iter()
                .filter(|c| c.matches_label(name))
                .collect()
        } else {
            by_latex
        };

        match matches.as_slice() {
            [] => Ok(None),
            [single] => Ok(Some(*single)),
            many => Err(KgError::AmbiguousSymbol {
                name: name.to_string(),
                candidates: many.iter().map(|c| c.key.clone()).collect(),
            }),
        }
    }

    /// Key every symbol of `expr`.
    ///
    /// # Errors
    ///
    /// Returns `KgError::UnresolvedSymbol` for a free symbol or unknown
    /// function without a candidate and `KgError::AmbiguousSymbol` when a
    /// name matches several candidates.
    pub fn resolve(&self, expr: &Expr) -> Result<Resolved, KgError> {
        let mut fresh = Vec::new();
        let expr = self.resolve_in(expr, &Scope::root(), &mut fresh)?;
        tracing::debug!(%expr, fresh = fresh.len(), "resolved formula symbols");
        Ok(Resolved { expr, fresh })
    }

    fn free_symbol(&self, symbol: &Symbol, scope: &Scope<'_>) -> Result<Symbol, KgError> {
        if symbol.key.is_some() {
            return Ok(symbol.clone());
        }
        if let Some(bound) = scope.get(&symbol.name) {
            return Ok(bound.clone());
        }
        match self.lookup(&symbol.name)? {
            Some(candidate) => Ok(Symbol::with_key(symbol.name.clone(), candidate.key.clone())),
            None => Err(KgError::UnresolvedSymbol {
                name: symbol.name.clone(),
            }),
        }
    }

    fn bind(
        &self,
        symbol: &Symbol,
        role: BoundRole,
        fresh: &mut Vec<FreshSymbol>,
    ) -> Result<Symbol, KgError> {
        if symbol.key.is_some() {
            return Ok(symbol.clone());
        }
        if let Some(candidate) = self.lookup(&symbol.name)? {
            return Ok(Symbol::with_key(symbol.name.clone(), candidate.key.clone()));
        }
        if !fresh.iter().any(|f| f.name == symbol.name) {
            fresh.push(FreshSymbol {
                name: symbol.name.clone(),
                role,
            });
        }
        Ok(symbol.clone())
    }

    fn resolve_all(
        &self,
        exprs: &[Expr],
        scope: &Scope<'_>,
        fresh: &mut Vec<FreshSymbol>,
    ) -> Result<Vec<Expr>, KgError> {
        exprs
            .iter()
            .map(|e| self.resolve_in(e, scope, fresh))
            .collect()
    }

    fn resolve_in(
        &self,
        expr: &Expr,
        scope: &Scope<'_>,
        fresh: &mut Vec<FreshSymbol>,
    ) -> Result<Expr, KgError> {
        let resolved = match expr {
            Expr::Number(n) => Expr::Number(*n),
            Expr::Symbol(symbol) => Expr::Symbol(self.free_symbol(symbol, scope)?),
            Expr::Add(terms) => Expr::add(self.resolve_all(terms, scope, fresh)?),
            Expr::Mul(factors) => Expr::mul(self.resolve_all(factors, scope, fresh)?),
            Expr::Pow(base, exponent) => Expr::pow(
                self.resolve_in(base, scope, fresh)?,
                self.resolve_in(exponent, scope, fresh)?,
            ),
            Expr::Apply { func, args } => {
                let func = if func.key.is_some() {
                    func.clone()
                } else if let Some(candidate) = self.lookup(&func.name)? {
                    Symbol::with_key(func.name.clone(), candidate.key.clone())
                } else if KNOWN_FUNCTIONS.contains(&func.name.as_str()) {
                    func.clone()
                } else {
                    return Err(KgError::UnresolvedSymbol {
                        name: func.name.clone(),
                    });
                };
                Expr::Apply {
                    func,
                    args: self.resolve_all(args, scope, fresh)?,
                }
            }
            Expr::Sum {
                term,
                index,
                lower,
                upper,
            } => {
                let lower = self.resolve_in(lower, scope, fresh)?;
                let upper = self.resolve_in(upper, scope, fresh)?;
                let index = self.bind(index, BoundRole::SumIndex, fresh)?;
                let inner = Scope::with_parent(&index, scope);
                let term = self.resolve_in(term, &inner, fresh)?;
                Expr::sum(term, index, lower, upper)
            }
            Expr::Integral {
                integrand,
                var,
                bounds,
            } => {
                let bounds = match bounds {
                    Some((lower, upper)) => Some((
                        self.resolve_in(lower, scope, fresh)?,
                        self.resolve_in(upper, scope, fresh)?,
                    )),
                    None => None,
                };
                let var = self.bind(var, BoundRole::Integration, fresh)?;
                let inner = Scope::with_parent(&var, scope);
                let integrand = self.resolve_in(integrand, &inner, fresh)?;
                Expr::integral(integrand, var, bounds)
            }
            Expr::Derivative { expr, var } => {
                let var = self.bind(var, BoundRole::Differentiation, fresh)?;
                let inner = Scope::with_parent(&var, scope);
                let expr = self.resolve_in(expr, &inner, fresh)?;
                Expr::derivative(expr, var)
            }
            Expr::Subs { expr, var, point } => {
                let point = self.resolve_in(point, scope, fresh)?;
                let var = self.bind(var, BoundRole::Substitution, fresh)?;
                let inner = Scope::with_parent(&var, scope);
                let expr = self.resolve_in(expr, &inner, fresh)?;
                Expr::subs(expr, var, point)
            }
        };
        Ok(resolved)
    }
}
