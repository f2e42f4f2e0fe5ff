//! Canonical symbolic expressions.
//!
//! Use the constructor functions (`Expr::add`, `Expr::mul`, `Expr::pow`, ...)
//! instead of building variants by hand. They flatten nested sums and
//! products, fold numeric constants, collect like terms and sort arguments,
//! so two equal expressions built in different ways compare equal.
//!
//! Argument order:
//! - sums order terms by their non-numeric part, compound terms first and
//!   the constant last (`b*(a + c) + a`, `x**2 - 2*x + 1`)
//! - products put the coefficient first and compound factors last (`2*b*(a + c)`)

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::{KgError, Number};

/// A named symbol, optionally bound to a graph item key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol {
    pub name: String,
    pub key: Option<String>,
}

impl Symbol {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: None,
        }
    }

    #[must_use]
    pub fn with_key(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: Some(key.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Number(Number),
    Symbol(Symbol),
    Add(Vec<Expr>),
    Mul(Vec<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    /// Application of a named function such as `sin(x)`
    Apply { func: Symbol, args: Vec<Expr> },
    /// `Sum(term, (index, lower, upper))`
    Sum {
        term: Box<Expr>,
        index: Symbol,
        lower: Box<Expr>,
        upper: Box<Expr>,
    },
    /// Indefinite when `bounds` is `None`
    Integral {
        integrand: Box<Expr>,
        var: Symbol,
        bounds: Option<(Box<Expr>, Box<Expr>)>,
    },
    Derivative { expr: Box<Expr>, var: Symbol },
    /// `expr` with `var` evaluated at `point`
    Subs {
        expr: Box<Expr>,
        var: Symbol,
        point: Box<Expr>,
    },
}

impl Expr {
    #[must_use]
    pub const fn integer(value: i64) -> Self {
        Self::Number(Number::Integer(value))
    }

    #[must_use]
    pub const fn zero() -> Self {
        Self::integer(0)
    }

    #[must_use]
    pub const fn one() -> Self {
        Self::integer(1)
    }

    #[must_use]
    pub fn number(value: impl Into<Number>) -> Self {
        Self::Number(value.into())
    }

    #[must_use]
    pub fn symbol(name: impl Into<String>) -> Self {
        Self::Symbol(Symbol::new(name))
    }

    #[must_use]
    pub fn apply(func: impl Into<String>, args: Vec<Self>) -> Self {
        Self::Apply {
            func: Symbol::new(func),
            args,
        }
    }

    /// Canonical sum of `terms`
    #[must_use]
    pub fn add(terms: Vec<Self>) -> Self {
        let mut constant = Number::Integer(0);
        let mut collected: Vec<(Self, Number)> = Vec::new();

        for term in flatten(terms, |e| matches!(e, Self::Add(_))) {
            match term {
                Self::Number(n) => constant = constant.add(n),
                other => {
                    let (coefficient, rest) = other.split_coefficient();
                    match collected.iter_mut().find(|(existing, _)| *existing == rest) {
                        Some(slot) => slot.1 = slot.1.add(coefficient),
                        None => collected.push((rest, coefficient)),
                    }
                }
            }
        }

        collected.sort_by(|(a, _), (b, _)| add_order(a, b));
        let mut args: Vec<Self> = collected
            .into_iter()
            .filter(|(_, coefficient)| !coefficient.is_zero())
            .map(|(term, coefficient)| term.scaled(coefficient))
            .collect();
        if !constant.is_zero() {
            args.push(Self::Number(constant));
        }

        match args.len() {
            0 => Self::zero(),
            1 => args.remove(0),
            _ => Self::Add(args),
        }
    }

    /// Canonical product of `factors`
    #[must_use]
    pub fn mul(factors: Vec<Self>) -> Self {
        let mut coefficient = Number::Integer(1);
        let mut powers: Vec<(Self, Self)> = Vec::new();

        for factor in flatten(factors, |e| matches!(e, Self::Mul(_))) {
            let (base, exponent) = match factor {
                Self::Number(n) => {
                    coefficient = coefficient.mul(n);
                    continue;
                }
                Self::Pow(base, exponent) => (*base, *exponent),
                other => (other, Self::one()),
            };
            match powers.iter_mut().find(|(existing, _)| *existing == base) {
                Some(slot) => {
                    let merged = std::mem::replace(&mut slot.1, Self::zero());
                    slot.1 = Self::add(vec![merged, exponent]);
                }
                None => powers.push((base, exponent)),
            }
        }

        if coefficient.is_zero() {
            return Self::Number(coefficient);
        }

        let mut args = Vec::new();
        for (base, exponent) in powers {
            match Self::pow(base, exponent) {
                Self::Number(n) => coefficient = coefficient.mul(n),
                Self::Mul(inner) => {
                    for factor in inner {
                        match factor {
                            Self::Number(n) => coefficient = coefficient.mul(n),
                            other => args.push(other),
                        }
                    }
                }
                other => args.push(other),
            }
        }

        if coefficient.is_zero() {
            return Self::Number(coefficient);
        }
        args.sort();
        if !coefficient.is_one() {
            args.insert(0, Self::Number(coefficient));
        }

        match args.len() {
            0 => Self::Number(coefficient),
            1 => args.remove(0),
            _ => Self::Mul(args),
        }
    }

    /// Canonical power
    #[must_use]
    pub fn pow(base: Self, exponent: Self) -> Self {
        if let Self::Number(e) = &exponent {
            if e.is_exact() && e.is_zero() {
                return Self::one();
            }
            if e.is_exact() && e.is_one() {
                return base;
            }
        }
        if let Self::Number(b) = &base {
            if b.is_exact() && b.is_one() {
                return Self::one();
            }
        }
        match (base, exponent) {
            (Self::Number(b), Self::Number(e)) => {
                if let Some(k) = e.as_integer() {
                    if let Some(value) = b.pow_int(k) {
                        return Self::Number(value);
                    }
                } else if !b.is_exact() || !e.is_exact() {
                    let value = b.as_f64().powf(e.as_f64());
                    if value.is_finite() {
                        return Self::Number(Number::Float(value));
                    }
                }
                Self::Pow(Box::new(Self::Number(b)), Box::new(Self::Number(e)))
            }
            (Self::Pow(inner_base, inner_exponent), Self::Number(e)) if e.as_integer().is_some() => {
                Self::pow(*inner_base, Self::mul(vec![*inner_exponent, Self::Number(e)]))
            }
            (base, exponent) => Self::Pow(Box::new(base), Box::new(exponent)),
        }
    }

    #[must_use]
    pub fn neg(expr: Self) -> Self {
        Self::mul(vec![Self::integer(-1), expr])
    }

    #[must_use]
    pub fn sub(left: Self, right: Self) -> Self {
        Self::add(vec![left, Self::neg(right)])
    }

    #[must_use]
    pub fn div(numerator: Self, denominator: Self) -> Self {
        Self::mul(vec![numerator, Self::pow(denominator, Self::integer(-1))])
    }

    #[must_use]
    pub fn sum(term: Self, index: Symbol, lower: Self, upper: Self) -> Self {
        Self::Sum {
            term: Box::new(term),
            index,
            lower: Box::new(lower),
            upper: Box::new(upper),
        }
    }

    #[must_use]
    pub fn integral(integrand: Self, var: Symbol, bounds: Option<(Self, Self)>) -> Self {
        Self::Integral {
            integrand: Box::new(integrand),
            var,
            bounds: bounds.map(|(lower, upper)| (Box::new(lower), Box::new(upper))),
        }
    }

    /// Derivative of `expr` with respect to `var`.
    ///
    /// Collapses to zero when `expr` does not depend on `var`.
    #[must_use]
    pub fn derivative(expr: Self, var: Symbol) -> Self {
        if !expr.has_free(&var) {
            return Self::zero();
        }
        Self::Derivative {
            expr: Box::new(expr),
            var,
        }
    }

    #[must_use]
    pub fn subs(expr: Self, var: Symbol, point: Self) -> Self {
        Self::Subs {
            expr: Box::new(expr),
            var,
            point: Box::new(point),
        }
    }

    /// Call a derivative or an indefinite integral with a point.
    ///
    /// `Derivative(f, x)(p)` becomes `Subs(Derivative(f, x), x, p)`.
    ///
    /// # Errors
    ///
    /// Returns `KgError::NotCallable` for every other expression and
    /// `KgError::Arity` when not exactly one argument is given.
    pub fn call(&self, args: &[Self]) -> Result<Self, KgError> {
        let var = match self {
            Self::Derivative { var, .. }
            | Self::Integral {
                var, bounds: None, ..
            } => var,
            other => {
                return Err(KgError::NotCallable {
                    expr: other.to_string(),
                });
            }
        };
        match args {
            [point] => Ok(Self::subs(self.clone(), var.clone(), point.clone())),
            _ => Err(KgError::Arity {
                func: self.to_string(),
                expected: 1,
                actual: args.len(),
            }),
        }
    }

    /// Split `3*x*y` into `(3, x*y)`
    #[must_use]
    pub fn split_coefficient(self) -> (Number, Self) {
        match self {
            Self::Mul(mut factors) => match factors.first() {
                Some(Self::Number(n)) => {
                    let n = *n;
                    factors.remove(0);
                    let rest = if factors.len() == 1 {
                        factors.remove(0)
                    } else {
                        Self::Mul(factors)
                    };
                    (n, rest)
                }
                _ => (Number::Integer(1), Self::Mul(factors)),
            },
            Self::Number(n) => (n, Self::one()),
            other => (Number::Integer(1), other),
        }
    }

    fn scaled(self, coefficient: Number) -> Self {
        if coefficient.is_one() && coefficient.is_exact() {
            return self;
        }
        match self {
            Self::Mul(mut factors) => {
                factors.insert(0, Self::Number(coefficient));
                Self::Mul(factors)
            }
            other => Self::Mul(vec![Self::Number(coefficient), other]),
        }
    }

    /// Immediate children in argument order
    #[must_use]
    pub fn children(&self) -> Vec<&Self> {
        match self {
            Self::Number(_) | Self::Symbol(_) => Vec::new(),
            Self::Add(args) | Self::Mul(args) | Self::Apply { args, .. } => args.iter().collect(),
            Self::Pow(base, exponent) => vec![base.as_ref(), exponent.as_ref()],
            Self::Sum {
                term, lower, upper, ..
            } => vec![term.as_ref(), lower.as_ref(), upper.as_ref()],
            Self::Integral {
                integrand, bounds, ..
            } => {
                let mut out = vec![integrand.as_ref()];
                if let Some((lower, upper)) = bounds {
                    out.push(lower.as_ref());
                    out.push(upper.as_ref());
                }
                out
            }
            Self::Derivative { expr, .. } => vec![expr.as_ref()],
            Self::Subs { expr, point, .. } => vec![expr.as_ref(), point.as_ref()],
        }
    }

    /// Symbols that are not bound by a sum, definite integral or substitution
    #[must_use]
    pub fn free_symbols(&self) -> BTreeSet<Symbol> {
        let mut out = BTreeSet::new();
        self.collect_free(&mut out);
        out
    }

    fn collect_free(&self, out: &mut BTreeSet<Symbol>) {
        match self {
            Self::Number(_) => {}
            Self::Symbol(symbol) => {
                out.insert(symbol.clone());
            }
            Self::Add(args) | Self::Mul(args) | Self::Apply { args, .. } => {
                for arg in args {
                    arg.collect_free(out);
                }
            }
            Self::Pow(base, exponent) => {
                base.collect_free(out);
                exponent.collect_free(out);
            }
            Self::Sum {
                term,
                index,
                lower,
                upper,
            } => {
                out.extend(term.free_symbols().into_iter().filter(|s| s != index));
                lower.collect_free(out);
                upper.collect_free(out);
            }
            Self::Integral {
                integrand,
                var,
                bounds: None,
            } => {
                integrand.collect_free(out);
                out.insert(var.clone());
            }
            Self::Integral {
                integrand,
                var,
                bounds: Some((lower, upper)),
            } => {
                out.extend(integrand.free_symbols().into_iter().filter(|s| s != var));
                lower.collect_free(out);
                upper.collect_free(out);
            }
            Self::Derivative { expr, var } => {
                expr.collect_free(out);
                out.insert(var.clone());
            }
            Self::Subs { expr, var, point } => {
                out.extend(expr.free_symbols().into_iter().filter(|s| s != var));
                point.collect_free(out);
            }
        }
    }

    #[must_use]
    pub fn has_free(&self, var: &Symbol) -> bool {
        self.free_symbols().contains(var)
    }

    /// Replace free occurrences of `var` by `value` and renormalize.
    ///
    /// Occurrences bound by a sum, definite integral or substitution over
    /// `var` are left alone.
    #[must_use]
    pub fn substitute(&self, var: &Symbol, value: &Self) -> Self {
        match self {
            Self::Number(_) => self.clone(),
            Self::Symbol(symbol) if symbol == var => value.clone(),
            Self::Symbol(_) => self.clone(),
            Self::Add(args) => Self::add(args.iter().map(|a| a.substitute(var, value)).collect()),
            Self::Mul(args) => Self::mul(args.iter().map(|a| a.substitute(var, value)).collect()),
            Self::Pow(base, exponent) => {
                Self::pow(base.substitute(var, value), exponent.substitute(var, value))
            }
            Self::Apply { func, args } => Self::Apply {
                func: func.clone(),
                args: args.iter().map(|a| a.substitute(var, value)).collect(),
            },
            Self::Sum {
                term,
                index,
                lower,
                upper,
            } => {
                let term = if index == var {
                    term.as_ref().clone()
                } else {
                    term.substitute(var, value)
                };
                Self::sum(
                    term,
                    index.clone(),
                    lower.substitute(var, value),
                    upper.substitute(var, value),
                )
            }
            Self::Integral {
                integrand,
                var: bound,
                bounds: Some((lower, upper)),
            } => {
                let integrand = if bound == var {
                    integrand.as_ref().clone()
                } else {
                    integrand.substitute(var, value)
                };
                Self::integral(
                    integrand,
                    bound.clone(),
                    Some((lower.substitute(var, value), upper.substitute(var, value))),
                )
            }
            // An indefinite integral or a derivative over `var` is a function
            // of `var`, so evaluate it there instead of rewriting inside.
            Self::Integral {
                var: bound,
                bounds: None,
                ..
            }
            | Self::Derivative { var: bound, .. }
                if bound == var =>
            {
                Self::subs(self.clone(), var.clone(), value.clone())
            }
            Self::Integral {
                integrand,
                var: bound,
                bounds: None,
            } => Self::integral(integrand.substitute(var, value), bound.clone(), None),
            Self::Derivative { expr, var: bound } => {
                Self::derivative(expr.substitute(var, value), bound.clone())
            }
            Self::Subs {
                expr,
                var: bound,
                point,
            } => {
                let expr = if bound == var {
                    expr.as_ref().clone()
                } else {
                    expr.substitute(var, value)
                };
                Self::subs(expr, bound.clone(), point.substitute(var, value))
            }
        }
    }

    /// Every symbol occurrence, bound variables included, function names excluded
    #[must_use]
    pub fn symbols(&self) -> BTreeSet<Symbol> {
        let mut out = BTreeSet::new();
        self.visit_symbols(&mut |symbol| {
            out.insert(symbol.clone());
        });
        out
    }

    fn visit_symbols(&self, visit: &mut dyn FnMut(&Symbol)) {
        match self {
            Self::Symbol(symbol) => visit(symbol),
            Self::Sum { index: var, .. }
            | Self::Integral { var, .. }
            | Self::Derivative { var, .. }
            | Self::Subs { var, .. } => visit(var),
            _ => {}
        }
        for child in self.children() {
            child.visit_symbols(visit);
        }
    }

    /// Rebuild the expression with symbols replaced where `f` returns `Some`.
    ///
    /// Variables bound by sums, integrals, derivatives and substitutions are
    /// passed through `f` as well. Function names are not.
    #[must_use]
    pub fn map_symbols(&self, f: &mut dyn FnMut(&Symbol) -> Option<Symbol>) -> Self {
        let mut rename = |symbol: &Symbol| f(symbol).unwrap_or_else(|| symbol.clone());
        self.rebuild(&mut rename)
    }

    fn rebuild(&self, rename: &mut dyn FnMut(&Symbol) -> Symbol) -> Self {
        match self {
            Self::Number(n) => Self::Number(*n),
            Self::Symbol(symbol) => Self::Symbol(rename(symbol)),
            Self::Add(args) => Self::add(args.iter().map(|a| a.rebuild(rename)).collect()),
            Self::Mul(args) => Self::mul(args.iter().map(|a| a.rebuild(rename)).collect()),
            Self::Pow(base, exponent) => Self::pow(base.rebuild(rename), exponent.rebuild(rename)),
            Self::Apply { func, args } => Self::Apply {
                func: func.clone(),
                args: args.iter().map(|a| a.rebuild(rename)).collect(),
            },
            Self::Sum {
                term,
                index,
                lower,
                upper,
            } => Self::sum(
                term.rebuild(rename),
                rename(index),
                lower.rebuild(rename),
                upper.rebuild(rename),
            ),
            Self::Integral {
                integrand,
                var,
                bounds,
            } => {
                let integrand = integrand.rebuild(rename);
                let var = rename(var);
                let bounds = bounds
                    .as_ref()
                    .map(|(lower, upper)| (lower.rebuild(rename), upper.rebuild(rename)));
                Self::integral(integrand, var, bounds)
            }
            Self::Derivative { expr, var } => {
                let expr = expr.rebuild(rename);
                Self::derivative(expr, rename(var))
            }
            Self::Subs { expr, var, point } => {
                let expr = expr.rebuild(rename);
                let var = rename(var);
                Self::subs(expr, var, point.rebuild(rename))
            }
        }
    }

    /// Variant rank used for canonical ordering
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Number(_) => 0,
            Self::Symbol(_) => 1,
            Self::Pow(..) => 2,
            Self::Mul(_) => 3,
            Self::Add(_) => 4,
            Self::Apply { .. } => 5,
            Self::Sum { .. } => 6,
            Self::Integral { .. } => 7,
            Self::Derivative { .. } => 8,
            Self::Subs { .. } => 9,
        }
    }
}

fn flatten(items: Vec<Expr>, nested: impl Fn(&Expr) -> bool) -> Vec<Expr> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if nested(&item) {
            match item {
                Expr::Add(inner) | Expr::Mul(inner) => out.extend(inner),
                other => out.push(other),
            }
        } else {
            out.push(item);
        }
    }
    out
}

/// Compound terms first, then by structure
fn add_order(a: &Expr, b: &Expr) -> Ordering {
    b.rank().cmp(&a.rank()).then_with(|| a.cmp(b))
}

impl PartialOrd for Expr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Expr {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank()).then_with(|| match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.cmp(b),
            (Self::Symbol(a), Self::Symbol(b)) => a.cmp(b),
            (Self::Add(a), Self::Add(b)) | (Self::Mul(a), Self::Mul(b)) => a.cmp(b),
            (Self::Pow(a_base, a_exp), Self::Pow(b_base, b_exp)) => {
                a_base.cmp(b_base).then_with(|| a_exp.cmp(b_exp))
            }
            (
                Self::Apply { func: f, args: a },
                Self::Apply { func: g, args: b },
            ) => f.cmp(g).then_with(|| a.cmp(b)),
            (
                Self::Sum {
                    term: t1,
                    index: i1,
                    lower: l1,
                    upper: u1,
                },
                Self::Sum {
                    term: t2,
                    index: i2,
                    lower: l2,
                    upper: u2,
                },
            ) => (t1, i1, l1, u1).cmp(&(t2, i2, l2, u2)),
            (
                Self::Integral {
                    integrand: f1,
                    var: v1,
                    bounds: b1,
                },
                Self::Integral {
                    integrand: f2,
                    var: v2,
                    bounds: b2,
                },
            ) => (f1, v1, b1).cmp(&(f2, v2, b2)),
            (Self::Derivative { expr: e1, var: v1 }, Self::Derivative { expr: e2, var: v2 }) => {
                (e1, v1).cmp(&(e2, v2))
            }
            (
                Self::Subs {
                    expr: e1,
                    var: v1,
                    point: p1,
                },
                Self::Subs {
                    expr: e2,
                    var: v2,
                    point: p2,
                },
            ) => (e1, v1, p1).cmp(&(e2, v2, p2)),
            _ => Ordering::Equal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(name: &str) -> Expr {
        Expr::symbol(name)
    }

    #[test]
    fn test_add_puts_compound_terms_first() {
        // a + b*(a + c)
        let expr = Expr::add(vec![
            sym("a"),
            Expr::mul(vec![sym("b"), Expr::add(vec![sym("a"), sym("c")])]),
        ]);
        match &expr {
            Expr::Add(args) => {
                assert_eq!(args.len(), 2);
                assert_eq!(args[1], sym("a"));
                match &args[0] {
                    Expr::Mul(factors) => {
                        assert_eq!(factors[0], sym("b"));
                        assert_eq!(factors[1], Expr::add(vec![sym("a"), sym("c")]));
                    }
                    other => panic!("Expected product, got {other:?}"),
                }
            }
            other => panic!("Expected sum, got {other:?}"),
        }
    }

    #[test]
    fn test_add_collects_like_terms() {
        let expr = Expr::add(vec![sym("x"), sym("x"), Expr::integer(2), Expr::integer(3)]);
        assert_eq!(
            expr,
            Expr::Add(vec![
                Expr::Mul(vec![Expr::integer(2), sym("x")]),
                Expr::integer(5)
            ])
        );

        // x - x cancels
        assert_eq!(Expr::sub(sym("x"), sym("x")), Expr::zero());
    }

    #[test]
    fn test_add_flattens_nested_sums() {
        let inner = Expr::add(vec![sym("a"), sym("b")]);
        let outer = Expr::add(vec![inner, sym("c")]);
        assert_eq!(outer, Expr::Add(vec![sym("a"), sym("b"), sym("c")]));
    }

    #[test]
    fn test_mul_merges_powers_and_orders_factors() {
        let expr = Expr::mul(vec![sym("x"), Expr::integer(3), sym("x")]);
        assert_eq!(
            expr,
            Expr::Mul(vec![
                Expr::integer(3),
                Expr::Pow(Box::new(sym("x")), Box::new(Expr::integer(2)))
            ])
        );

        // x * x**-1 cancels
        let cancelled = Expr::div(sym("x"), sym("x"));
        assert_eq!(cancelled, Expr::one());
    }

    #[test]
    fn test_mul_by_zero_annihilates() {
        let expr = Expr::mul(vec![sym("x"), Expr::zero(), sym("y")]);
        assert_eq!(expr, Expr::zero());
    }

    #[test]
    fn test_pow_rules() {
        assert_eq!(Expr::pow(sym("x"), Expr::zero()), Expr::one());
        assert_eq!(Expr::pow(sym("x"), Expr::one()), sym("x"));
        assert_eq!(Expr::pow(Expr::integer(2), Expr::integer(3)), Expr::integer(8));
        assert_eq!(
            Expr::pow(Expr::integer(2), Expr::integer(-1)),
            Expr::Number(Number::Rational(1, 2))
        );
        // (x**2)**3 = x**6
        let nested = Expr::pow(Expr::pow(sym("x"), Expr::integer(2)), Expr::integer(3));
        assert_eq!(nested, Expr::pow(sym("x"), Expr::integer(6)));
    }

    #[test]
    fn test_division_by_zero_stays_symbolic() {
        let expr = Expr::div(Expr::one(), Expr::zero());
        assert!(matches!(expr, Expr::Pow(..)));
    }

    #[test]
    fn test_derivative_of_constant_collapses() {
        let x = Symbol::new("x");
        assert_eq!(Expr::derivative(sym("y"), x.clone()), Expr::zero());
        assert!(matches!(
            Expr::derivative(sym("x"), x),
            Expr::Derivative { .. }
        ));
    }

    #[test]
    fn test_call_derivative_yields_substitution() {
        let x = Symbol::new("x");
        let derivative = Expr::derivative(Expr::pow(sym("x"), Expr::integer(2)), x.clone());
        let called = derivative.call(&[Expr::integer(3)]).unwrap();
        match called {
            Expr::Subs { expr, var, point } => {
                assert_eq!(*expr, derivative);
                assert_eq!(var, x);
                assert_eq!(*point, Expr::integer(3));
            }
            other => panic!("Expected Subs, got {other:?}"),
        }
    }

    #[test]
    fn test_call_indefinite_integral() {
        let integral = Expr::integral(sym("x"), Symbol::new("x"), None);
        assert!(matches!(
            integral.call(&[Expr::one()]),
            Ok(Expr::Subs { .. })
        ));
    }

    #[test]
    fn test_call_rejects_other_expressions() {
        let err = sym("x").call(&[Expr::one()]).unwrap_err();
        assert!(matches!(err, KgError::NotCallable { .. }));

        let definite = Expr::integral(
            sym("x"),
            Symbol::new("x"),
            Some((Expr::zero(), Expr::one())),
        );
        assert!(definite.call(&[Expr::one()]).is_err());

        let derivative = Expr::derivative(sym("x"), Symbol::new("x"));
        let err = derivative.call(&[]).unwrap_err();
        assert!(matches!(err, KgError::Arity { expected: 1, actual: 0, .. }));
    }

    #[test]
    fn test_free_symbols_respect_binders() {
        let i = Symbol::new("i");
        let sum = Expr::sum(
            Expr::mul(vec![sym("a"), sym("i")]),
            i.clone(),
            Expr::one(),
            sym("n"),
        );
        let free = sum.free_symbols();
        assert!(free.contains(&Symbol::new("a")));
        assert!(free.contains(&Symbol::new("n")));
        assert!(!free.contains(&i));

        // bound variables still show up in symbols()
        assert!(sum.symbols().contains(&i));
    }

    #[test]
    fn test_map_symbols_keys_every_occurrence() {
        let i = Symbol::new("i");
        let sum = Expr::sum(sym("i"), i, Expr::one(), sym("n"));
        let keyed = sum.map_symbols(&mut |s| Some(Symbol::with_key(s.name.clone(), "I9")));
        for symbol in keyed.symbols() {
            assert_eq!(symbol.key.as_deref(), Some("I9"));
        }
    }

    #[test]
    fn test_substitute_renormalizes() {
        // (x + 1)*y with x = 2 folds to 3*y
        let expr = Expr::mul(vec![Expr::add(vec![sym("x"), Expr::one()]), sym("y")]);
        let result = expr.substitute(&Symbol::new("x"), &Expr::integer(2));
        assert_eq!(result, Expr::mul(vec![Expr::integer(3), sym("y")]));
    }

    #[test]
    fn test_substitute_skips_bound_variable() {
        let i = Symbol::new("i");
        let sum = Expr::sum(sym("i"), i.clone(), Expr::one(), sym("i"));
        // the upper limit is free, the term is bound
        let result = sum.substitute(&i, &Expr::integer(4));
        assert_eq!(result, Expr::sum(sym("i"), i, Expr::one(), Expr::integer(4)));
    }

    #[test]
    fn test_substitute_into_derivative_evaluates_at_point() {
        let x = Symbol::new("x");
        let derivative = Expr::derivative(Expr::pow(sym("x"), Expr::integer(3)), x.clone());
        let result = derivative.substitute(&x, &Expr::integer(2));
        assert_eq!(result, derivative.call(&[Expr::integer(2)]).unwrap());
    }
}
