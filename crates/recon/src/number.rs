//! Numeric coercion for loosely-typed sheet cells.
//!
//! Cells arrive as text. Anything that does not parse is treated as absent by
//! the callers; nothing here fails.

use std::fmt;
use std::iter::Sum;
use std::ops::Add;

use serde::{Serialize, Serializer};

/// Parse a cell as a finite number. Blank or non-numeric text yields `None`.
pub fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Format with exactly two decimal places.
pub fn format2(n: f64) -> String {
    format!("{n:.2}")
}

/// Fixed-point hundredths, used for summary totals so repeated runs add up
/// to identical values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Centi(pub i64);

impl Centi {
    pub const ZERO: Centi = Centi(0);

    pub fn from_f64(n: f64) -> Self {
        Centi((n * 100.0).round() as i64)
    }

    /// Parse a cell; blank or unparsable cells contribute nothing.
    pub fn from_cell(s: &str) -> Option<Self> {
        parse_number(s).map(Self::from_f64)
    }

    pub fn from_units(units: i64) -> Self {
        Centi(units * 100)
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Centi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Serialize for Centi {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl Add for Centi {
    type Output = Centi;

    fn add(self, rhs: Centi) -> Centi {
        Centi(self.0 + rhs.0)
    }
}

impl Sum for Centi {
    fn sum<I: Iterator<Item = Centi>>(iter: I) -> Centi {
        iter.fold(Centi::ZERO, Add::add)
    }
}
