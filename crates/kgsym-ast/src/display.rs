//! Infix rendering of expressions.
//!
//! Output uses `**` for powers and function-call syntax for sums, integrals,
//! derivatives and substitutions, so it parses back to the same expression.

use std::fmt;

use crate::{Expr, Number};

const ADD: u8 = 1;
const MUL: u8 = 2;
const POW: u8 = 3;
const ATOM: u8 = 4;

impl Expr {
    fn precedence(&self) -> u8 {
        match self {
            Self::Add(_) => ADD,
            Self::Mul(_) => MUL,
            Self::Number(n) if n.is_negative() || matches!(n, Number::Rational(..)) => MUL,
            Self::Pow(_, exponent) if is_negative_number(exponent) => MUL,
            Self::Pow(..) => POW,
            _ => ATOM,
        }
    }

    fn wrapped(&self, min_precedence: u8) -> String {
        if self.precedence() < min_precedence {
            format!("({self})")
        } else {
            self.to_string()
        }
    }

    /// `Some(-term)` when the term carries a negative coefficient
    fn negated(&self) -> Option<Self> {
        match self {
            Self::Number(n) if n.is_negative() => Some(Self::Number(n.neg())),
            Self::Mul(factors) => match factors.first() {
                Some(Self::Number(n)) if n.is_negative() => {
                    let mut rest = factors.clone();
                    rest[0] = Self::Number(n.neg());
                    Some(Self::mul(rest))
                }
                _ => None,
            },
            _ => None,
        }
    }
}

fn is_negative_number(expr: &Expr) -> bool {
    matches!(expr, Expr::Number(n) if n.is_negative())
}

fn write_product(f: &mut fmt::Formatter<'_>, factors: &[Expr]) -> fmt::Result {
    if let Some((Expr::Number(n), rest)) = factors.split_first() {
        if n.is_exact() && *n == Number::Integer(-1) && !rest.is_empty() {
            write!(f, "-")?;
            return match rest {
                [single] => write!(f, "{}", single.wrapped(POW)),
                _ => write_product(f, rest),
            };
        }
    }

    let mut numerator = Vec::new();
    let mut denominator = Vec::new();
    for factor in factors {
        match factor {
            Expr::Pow(base, exponent) => match exponent.as_ref() {
                Expr::Number(e) if e.is_negative() => {
                    denominator.push(Expr::pow(base.as_ref().clone(), Expr::Number(e.neg())));
                }
                _ => numerator.push(factor.wrapped(MUL)),
            },
            other => numerator.push(other.wrapped(MUL)),
        }
    }

    if numerator.is_empty() {
        write!(f, "1")?;
    } else {
        write!(f, "{}", numerator.join("*"))?;
    }
    match denominator.as_slice() {
        [] => Ok(()),
        [single] => write!(f, "/{}", single.wrapped(POW)),
        many => {
            let parts: Vec<String> = many.iter().map(|d| d.wrapped(MUL)).collect();
            write!(f, "/({})", parts.join("*"))
        }
    }
}

fn join(args: &[Expr]) -> String {
    args.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Symbol(symbol) => write!(f, "{}", symbol.name),
            Self::Add(terms) => {
                for (position, term) in terms.iter().enumerate() {
                    match (position, term.negated()) {
                        (0, _) => write!(f, "{term}")?,
                        (_, Some(positive)) => write!(f, " - {}", positive.wrapped(MUL))?,
                        (_, None) => write!(f, " + {term}")?,
                    }
                }
                Ok(())
            }
            Self::Mul(factors) => write_product(f, factors),
            Self::Pow(_, exponent) if is_negative_number(exponent) => {
                write_product(f, std::slice::from_ref(self))
            }
            Self::Pow(base, exponent) => {
                write!(f, "{}**{}", base.wrapped(ATOM), exponent.wrapped(ATOM))
            }
            Self::Apply { func, args } => write!(f, "{}({})", func.name, join(args)),
            Self::Sum {
                term,
                index,
                lower,
                upper,
            } => write!(f, "Sum({term}, ({}, {lower}, {upper}))", index.name),
            Self::Integral {
                integrand,
                var,
                bounds: None,
            } => write!(f, "Integral({integrand}, {})", var.name),
            Self::Integral {
                integrand,
                var,
                bounds: Some((lower, upper)),
            } => write!(f, "Integral({integrand}, ({}, {lower}, {upper}))", var.name),
            Self::Derivative { expr, var } => write!(f, "Derivative({expr}, {})", var.name),
            Self::Subs { expr, var, point } => write!(f, "Subs({expr}, {}, {point})", var.name),
        }
    }
}
