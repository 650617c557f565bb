//! Custom Askama template filters.

use std::fmt::Display;

/// Format a decimal amount as a price.
///
/// Usage in templates: `{{ product.price|money }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn money(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format!("{value:.2} €"))
}
