//! Numeric leaves of an expression tree.
//!
//! Integers and rationals are exact. Arithmetic that would overflow `i64`
//! degrades to `Float` instead of panicking.

use std::cmp::Ordering;
use std::fmt;

/// A numeric constant
#[derive(Debug, Clone, Copy)]
pub enum Number {
    Integer(i64),
    /// Always reduced, denominator > 1
    Rational(i64, i64),
    Float(f64),
}

impl Number {
    /// Build a reduced rational. Returns `None` for a zero denominator.
    #[must_use]
    pub fn rational(numerator: i64, denominator: i64) -> Option<Self> {
        if denominator == 0 {
            return None;
        }
        Some(normalize(i128::from(numerator), i128::from(denominator)))
    }

    /// Parse a literal such as `3`, `-1/2` or `2.5`
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some((num, den)) = text.split_once('/') {
            let num = num.trim().parse::<i64>().ok()?;
            let den = den.trim().parse::<i64>().ok()?;
            return Self::rational(num, den);
        }
        if let Ok(value) = text.parse::<i64>() {
            return Some(Self::Integer(value));
        }
        text.parse::<f64>().ok().filter(|v| v.is_finite()).map(Self::Float)
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        match *self {
            Self::Integer(value) => value == 0,
            Self::Rational(..) => false,
            Self::Float(value) => value == 0.0,
        }
    }

    #[must_use]
    pub fn is_one(&self) -> bool {
        match *self {
            Self::Integer(value) => value == 1,
            Self::Rational(..) => false,
            Self::Float(value) => value == 1.0,
        }
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        match *self {
            Self::Integer(value) => value < 0,
            Self::Rational(num, _) => num < 0,
            Self::Float(value) => value < 0.0,
        }
    }

    #[must_use]
    pub const fn is_exact(&self) -> bool {
        !matches!(self, Self::Float(_))
    }

    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match *self {
            Self::Integer(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Integer(value) => value as f64,
            Self::Rational(num, den) => num as f64 / den as f64,
            Self::Float(value) => value,
        }
    }

    fn parts(self) -> Option<(i128, i128)> {
        match self {
            Self::Integer(value) => Some((i128::from(value), 1)),
            Self::Rational(num, den) => Some((i128::from(num), i128::from(den))),
            Self::Float(_) => None,
        }
    }

    #[must_use]
    pub fn add(self, other: Self) -> Self {
        if let (Some((a, b)), Some((c, d))) = (self.parts(), other.parts()) {
            let sum = a
                .checked_mul(d)
                .zip(c.checked_mul(b))
                .and_then(|(left, right)| left.checked_add(right));
            if let (Some(num), Some(den)) = (sum, b.checked_mul(d)) {
                return normalize(num, den);
            }
        }
        Self::Float(self.as_f64() + other.as_f64())
    }

    #[must_use]
    pub fn mul(self, other: Self) -> Self {
        if let (Some((a, b)), Some((c, d))) = (self.parts(), other.parts()) {
            if let (Some(num), Some(den)) = (a.checked_mul(c), b.checked_mul(d)) {
                return normalize(num, den);
            }
        }
        Self::Float(self.as_f64() * other.as_f64())
    }

    #[must_use]
    pub fn neg(self) -> Self {
        self.mul(Self::Integer(-1))
    }

    /// Multiplicative inverse, `None` for zero
    #[must_use]
    pub fn recip(self) -> Option<Self> {
        if self.is_zero() {
            return None;
        }
        match self.parts() {
            Some((num, den)) => Some(normalize(den, num)),
            None => Some(Self::Float(1.0 / self.as_f64())),
        }
    }

    /// Integer power. `None` when a negative power of zero is requested.
    #[must_use]
    pub fn pow_int(self, exponent: i64) -> Option<Self> {
        if let Self::Float(value) = self {
            let exponent = i32::try_from(exponent).ok()?;
            return Some(Self::Float(value.powi(exponent)));
        }
        if exponent < 0 {
            return self.recip()?.pow_int(exponent.checked_neg()?);
        }
        let mut result = Self::Integer(1);
        let mut base = self;
        let mut remaining = exponent;
        while remaining > 0 {
            if remaining & 1 == 1 {
                result = result.mul(base);
            }
            base = base.mul(base);
            remaining >>= 1;
        }
        Some(result)
    }

    const fn variant_rank(&self) -> u8 {
        match self {
            Self::Integer(_) => 0,
            Self::Rational(..) => 1,
            Self::Float(_) => 2,
        }
    }
}

fn gcd(mut a: i128, mut b: i128) -> i128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a.abs()
}

fn normalize(num: i128, den: i128) -> Number {
    let divisor = gcd(num, den).max(1);
    let (mut num, mut den) = (num / divisor, den / divisor);
    if den < 0 {
        num = -num;
        den = -den;
    }
    match (i64::try_from(num), i64::try_from(den)) {
        (Ok(num), Ok(1)) => Number::Integer(num),
        (Ok(num), Ok(den)) => Number::Rational(num, den),
        _ => Number::Float(num as f64 / den as f64),
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Number {}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.parts(), other.parts()) {
            (Some((a, b)), Some((c, d))) => (a * d).cmp(&(c * b)),
            _ => self
                .as_f64()
                .total_cmp(&other.as_f64())
                .then_with(|| self.variant_rank().cmp(&other.variant_rank())),
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Rational(num, den) => write!(f, "{num}/{den}"),
            // Debug keeps the decimal point so the text parses back as a float
            Self::Float(value) => write!(f, "{value:?}"),
        }
    }
}
