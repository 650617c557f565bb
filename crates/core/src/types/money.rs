//! Money helpers for decimal prices.
//!
//! Prices are stored and summed as [`Decimal`] in the currency's major unit
//! (euros). Conversion to integer minor units (cents) happens only at the
//! payment-provider boundary, so totals never pass through floating point.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// ISO 4217 currency code used throughout the shop.
pub const CURRENCY: &str = "eur";

/// Errors that can occur when parsing a user-supplied price.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input is not a decimal number.
    #[error("price must be a number")]
    Invalid,
    /// Prices must be strictly positive.
    #[error("price must be greater than zero")]
    NotPositive,
    /// More than two fractional digits.
    #[error("price must have at most two decimal places")]
    TooPrecise,
}

/// Parse a price from form input.
///
/// # Errors
///
/// Returns [`PriceError`] if the input is not a number, not strictly
/// positive, or has more than two decimal places.
pub fn parse_price(input: &str) -> Result<Decimal, PriceError> {
    let price: Decimal = input.trim().parse().map_err(|_| PriceError::Invalid)?;

    if price <= Decimal::ZERO {
        return Err(PriceError::NotPositive);
    }

    if price.normalize().scale() > 2 {
        return Err(PriceError::TooPrecise);
    }

    Ok(price)
}

/// Convert a major-unit amount to integer minor units (cents).
///
/// `19.99` becomes `1999`, exactly. Returns `None` on overflow.
#[must_use]
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    (amount * Decimal::ONE_HUNDRED).round().to_i64()
}

/// Format a major-unit amount for display, e.g. `19.99 €`.
#[must_use]
pub fn format_price(amount: Decimal) -> String {
    format!("{amount:.2} €")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_minor_units_exact() {
        // The classic float trap: 19.99 * 100 must be 1999, never 1998/2000.
        assert_eq!(to_minor_units(dec("19.99")), Some(1999));
        assert_eq!(to_minor_units(dec("10")), Some(1000));
        assert_eq!(to_minor_units(dec("0.01")), Some(1));
        assert_eq!(to_minor_units(dec("1234.56")), Some(123_456));
    }

    #[test]
    fn test_parse_price_valid() {
        assert_eq!(parse_price("19.99"), Ok(dec("19.99")));
        assert_eq!(parse_price(" 5 "), Ok(dec("5")));
        assert_eq!(parse_price("0.50"), Ok(dec("0.50")));
    }

    #[test]
    fn test_parse_price_rejects_bad_input() {
        assert_eq!(parse_price("abc"), Err(PriceError::Invalid));
        assert_eq!(parse_price(""), Err(PriceError::Invalid));
        assert_eq!(parse_price("0"), Err(PriceError::NotPositive));
        assert_eq!(parse_price("-3.50"), Err(PriceError::NotPositive));
        assert_eq!(parse_price("1.999"), Err(PriceError::TooPrecise));
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(dec("19.99")), "19.99 €");
        assert_eq!(format_price(dec("20")), "20.00 €");
    }
}
