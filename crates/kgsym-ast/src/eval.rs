//! Numeric evaluation of expressions.

use std::collections::HashMap;

use crate::{Expr, KgError, Symbol};

const SIMPSON_INTERVALS: usize = 1000;
const DIFFERENCE_STEP: f64 = 1e-5;
const MAX_SUM_TERMS: i64 = 1_000_000;

impl Expr {
    /// Evaluate to a float with symbol values taken from `bindings` by name.
    ///
    /// `pi` and `E` evaluate to their constants when not bound. Sums are
    /// iterated, definite integrals use Simpson's rule and derivatives use a
    /// central difference at the bound value of their variable.
    ///
    /// # Errors
    ///
    /// Returns `KgError::Unbound` for free symbols without a value and
    /// `KgError::Evaluation` for expressions that have no numeric value.
    pub fn evaluate(&self, bindings: &HashMap<String, f64>) -> Result<f64, KgError> {
        let value = match self {
            Self::Number(n) => n.as_f64(),
            Self::Symbol(symbol) => lookup(symbol, bindings)?,
            Self::Add(terms) => {
                let mut total = 0.0;
                for term in terms {
                    total += term.evaluate(bindings)?;
                }
                total
            }
            Self::Mul(factors) => {
                let mut product = 1.0;
                for factor in factors {
                    product *= factor.evaluate(bindings)?;
                }
                product
            }
            Self::Pow(base, exponent) => base.evaluate(bindings)?.powf(exponent.evaluate(bindings)?),
            Self::Apply { func, args } => {
                let values = args
                    .iter()
                    .map(|arg| arg.evaluate(bindings))
                    .collect::<Result<Vec<_>, _>>()?;
                apply_function(&func.name, &values)?
            }
            Self::Sum {
                term,
                index,
                lower,
                upper,
            } => {
                let lower = as_bound(lower.evaluate(bindings)?)?;
                let upper = as_bound(upper.evaluate(bindings)?)?;
                if upper.saturating_sub(lower) > MAX_SUM_TERMS {
                    return Err(KgError::Evaluation {
                        message: format!("sum over {} has too many terms", index.name),
                    });
                }
                let mut scope = bindings.clone();
                let mut total = 0.0;
                for i in lower..=upper {
                    scope.insert(index.name.clone(), i as f64);
                    total += term.evaluate(&scope)?;
                }
                total
            }
            Self::Integral {
                integrand,
                var,
                bounds: Some((lower, upper)),
            } => {
                let a = lower.evaluate(bindings)?;
                let b = upper.evaluate(bindings)?;
                simpson(integrand, var, a, b, bindings)?
            }
            Self::Integral { var, .. } => {
                return Err(KgError::Evaluation {
                    message: format!("indefinite integral over {} has no value", var.name),
                });
            }
            Self::Derivative { expr, var } => {
                let at = lookup(var, bindings)?;
                let mut scope = bindings.clone();
                scope.insert(var.name.clone(), at + DIFFERENCE_STEP);
                let ahead = expr.evaluate(&scope)?;
                scope.insert(var.name.clone(), at - DIFFERENCE_STEP);
                let behind = expr.evaluate(&scope)?;
                (ahead - behind) / (2.0 * DIFFERENCE_STEP)
            }
            Self::Subs { expr, var, point } => {
                let mut scope = bindings.clone();
                scope.insert(var.name.clone(), point.evaluate(bindings)?);
                expr.evaluate(&scope)?
            }
        };
        if value.is_nan() {
            return Err(KgError::Evaluation {
                message: format!("{self} is not a number"),
            });
        }
        Ok(value)
    }
}

fn lookup(symbol: &Symbol, bindings: &HashMap<String, f64>) -> Result<f64, KgError> {
    if let Some(value) = bindings.get(&symbol.name) {
        return Ok(*value);
    }
    match symbol.name.as_str() {
        "pi" => Ok(std::f64::consts::PI),
        "E" => Ok(std::f64::consts::E),
        _ => Err(KgError::Unbound {
            name: symbol.name.clone(),
        }),
    }
}

fn as_bound(value: f64) -> Result<i64, KgError> {
    if value.fract() != 0.0 || !value.is_finite() {
        return Err(KgError::Evaluation {
            message: format!("summation bound {value} is not an integer"),
        });
    }
    Ok(value as i64)
}

fn apply_function(name: &str, args: &[f64]) -> Result<f64, KgError> {
    let value = match (name, args) {
        ("sin", [x]) => x.sin(),
        ("cos", [x]) => x.cos(),
        ("tan", [x]) => x.tan(),
        ("exp", [x]) => x.exp(),
        ("log", [x]) => x.ln(),
        ("log", [x, base]) => x.ln() / base.ln(),
        ("sqrt", [x]) => x.sqrt(),
        ("sin" | "cos" | "tan" | "exp" | "sqrt", _) => {
            return Err(KgError::Arity {
                func: name.to_string(),
                expected: 1,
                actual: args.len(),
            });
        }
        _ => {
            return Err(KgError::Evaluation {
                message: format!("function {name} has no numeric definition"),
            });
        }
    };
    Ok(value)
}

fn simpson(
    integrand: &Expr,
    var: &Symbol,
    a: f64,
    b: f64,
    bindings: &HashMap<String, f64>,
) -> Result<f64, KgError> {
    let h = (b - a) / SIMPSON_INTERVALS as f64;
    let mut scope = bindings.clone();
    let mut sample = |x: f64| -> Result<f64, KgError> {
        scope.insert(var.name.clone(), x);
        integrand.evaluate(&scope)
    };

    let mut total = sample(a)? + sample(b)?;
    for k in 1..SIMPSON_INTERVALS {
        let weight = if k % 2 == 1 { 4.0 } else { 2.0 };
        total += weight * sample(a + k as f64 * h)?;
    }
    Ok(total * h / 3.0)
}
