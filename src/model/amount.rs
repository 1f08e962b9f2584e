//! Parsing of raw amount values into `Decimal`.
//!
//! Amounts arrive as form text, CSV text or SQLite numbers. Text may be written in plain
//! (`12.50`) or scientific (`1.25e1`) notation and may carry surrounding whitespace.

use crate::db::Field;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// An error that can occur when a raw value cannot be converted into a `Decimal`.
#[derive(Debug, Clone, PartialEq)]
pub struct AmountError(String);

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' is not convertible to a number", self.0)
    }
}

impl std::error::Error for AmountError {}

/// Converts `field` into a decimal number. `None` (a missing field) is zero.
pub(crate) fn parse(field: Option<&Field>) -> Result<Decimal, AmountError> {
    let Some(field) = field else {
        return Ok(Decimal::ZERO);
    };
    match field {
        Field::Integer(i) => Ok(Decimal::from(*i)),
        Field::Real(r) => Decimal::from_f64(*r)
            .map(|d| d.normalize())
            .ok_or_else(|| AmountError(r.to_string())),
        Field::Text(s) => parse_str(s),
        other => Err(AmountError(other.to_string())),
    }
}

fn parse_str(s: &str) -> Result<Decimal, AmountError> {
    let trimmed = s.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| AmountError(s.to_string()))
}
