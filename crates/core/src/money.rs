use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

/// Statement amount held as a decimal rounded to two places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(Decimal);

const CURRENCY_PREFIXES: &[&str] = &["INR", "RS.", "RS", "USD", "EUR", "GBP"];

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::from(cents) / Decimal::from(100))
    }

    pub fn from_decimal(decimal: Decimal) -> Self {
        Money(decimal.round_dp(2))
    }

    /// Spreadsheet numbers arrive as floats; non-finite values are rejected.
    pub fn from_f64(value: f64) -> Option<Self> {
        Decimal::from_f64(value).map(Self::from_decimal)
    }

    /// Parses a statement amount such as `1,234.50`, `$99.99`, `(75.25)`,
    /// `₹ 500` or `1,000.00 CR`. Blank or unparsable input yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut s = raw.trim().to_uppercase();
        for suffix in [" CR", " DR", "CR", "DR"] {
            if let Some(stripped) = s.strip_suffix(suffix) {
                s = stripped.trim_end().to_string();
                break;
            }
        }
        for prefix in CURRENCY_PREFIXES {
            if let Some(stripped) = s.strip_prefix(prefix) {
                s = stripped.trim_start().to_string();
                break;
            }
        }

        let (negative, s) = match s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
            Some(inner) => (true, inner.to_string()),
            None => (false, s),
        };
        let s = s.replace([',', '$', '₹', '€', '£', ' '], "");
        if s.is_empty() {
            return None;
        }

        let mut dec = Decimal::from_str(&s).ok()?;
        if negative {
            dec = -dec;
        }
        Some(Self::from_decimal(dec))
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn abs(self) -> Self {
        Money(self.0.abs())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Money(self.0 - rhs.0)
    }
}
