//! Semantic actions for the infix grammar.

use kgsym_ast::{Expr, Number, Span, Symbol};

/// Error raised by a grammar action, located at the offending call or literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionError {
    pub message: String,
    pub span: Span,
}

impl ActionError {
    #[must_use]
    pub const fn new(message: String, span: Span) -> Self {
        Self { message, span }
    }
}

/// Call argument: a plain expression or a parenthesised tuple like `(i, 1, n)`
#[derive(Debug, Clone)]
pub enum Arg {
    Expr(Expr),
    Tuple(Vec<Expr>),
}

pub fn integer(text: &str) -> Result<Expr, String> {
    text.parse::<i64>()
        .map(Expr::integer)
        .map_err(|_| format!("integer literal {text} is out of range"))
}

pub fn float(text: &str) -> Result<Expr, String> {
    Number::parse(text)
        .map(Expr::Number)
        .ok_or_else(|| format!("invalid number {text}"))
}

fn variable(func: &str, expr: &Expr) -> Result<Symbol, String> {
    match expr {
        Expr::Symbol(symbol) => Ok(symbol.clone()),
        other => Err(format!("{func}: expected a variable, got {other}")),
    }
}

fn limits(func: &str, items: &[Expr]) -> Result<(Symbol, Expr, Expr), String> {
    match items {
        [var, lower, upper] => Ok((variable(func, var)?, lower.clone(), upper.clone())),
        _ => Err(format!(
            "{func}: limits take the form (variable, lower, upper), got {} items",
            items.len()
        )),
    }
}

fn usage(func: &str, form: &str) -> String {
    format!("{func} expects {form}")
}

/// Build the expression for `name(args)`
pub fn call(name: String, args: Vec<Arg>) -> Result<Expr, String> {
    match name.as_str() {
        "Sum" | "summation" => match args.as_slice() {
            [Arg::Expr(term), Arg::Tuple(items)] => {
                let (index, lower, upper) = limits(&name, items)?;
                Ok(Expr::sum(term.clone(), index, lower, upper))
            }
            _ => Err(usage(&name, "(term, (index, lower, upper))")),
        },
        "Integral" | "integrate" => match args.as_slice() {
            [Arg::Expr(integrand), Arg::Expr(var)] => Ok(Expr::integral(
                integrand.clone(),
                variable(&name, var)?,
                None,
            )),
            [Arg::Expr(integrand), Arg::Tuple(items)] => {
                let (var, lower, upper) = limits(&name, items)?;
                Ok(Expr::integral(integrand.clone(), var, Some((lower, upper))))
            }
            _ => Err(usage(&name, "(integrand, x) or (integrand, (x, lower, upper))")),
        },
        "Derivative" | "diff" => match args.as_slice() {
            [Arg::Expr(expr), vars @ ..] if !vars.is_empty() => {
                let mut result = expr.clone();
                for var in vars {
                    match var {
                        Arg::Expr(var) => result = Expr::derivative(result, variable(&name, var)?),
                        Arg::Tuple(_) => return Err(usage(&name, "(expr, x, ...)")),
                    }
                }
                Ok(result)
            }
            _ => Err(usage(&name, "(expr, x, ...)")),
        },
        "Subs" => match args.as_slice() {
            [Arg::Expr(expr), Arg::Expr(var), Arg::Expr(point)] => Ok(Expr::subs(
                expr.clone(),
                variable(&name, var)?,
                point.clone(),
            )),
            _ => Err(usage(&name, "(expr, x, point)")),
        },
        "sqrt" => match args.as_slice() {
            [Arg::Expr(radicand)] => Ok(Expr::pow(
                radicand.clone(),
                Expr::Number(Number::Rational(1, 2)),
            )),
            _ => Err(usage(&name, "one argument")),
        },
        _ => {
            let mut exprs = Vec::with_capacity(args.len());
            for arg in args {
                match arg {
                    Arg::Expr(expr) => exprs.push(expr),
                    Arg::Tuple(_) => {
                        return Err(format!("{name}: tuple arguments are not supported"));
                    }
                }
            }
            Ok(Expr::apply(name, exprs))
        }
    }
}
