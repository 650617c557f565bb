//! Stripe Checkout client.
//!
//! Only the minimal contract this shop needs: create a hosted checkout
//! session from a list of priced line items and a success/cancel URL pair,
//! getting back an opaque session id and the hosted payment page URL. The
//! client completes payment out-of-band; Stripe then calls the success URL.

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use tangelo_core::CURRENCY;

use crate::config::StripeConfig;

/// Stripe API base URL.
const BASE_URL: &str = "https://api.stripe.com/v1";

/// Errors that can occur when talking to Stripe.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("parse error: {0}")]
    Parse(String),
}

/// One line of a checkout session request. `unit_amount` is in minor units
/// (cents).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLineItem {
    pub name: String,
    pub description: String,
    pub quantity: u32,
    pub unit_amount: i64,
}

/// A created checkout session: the opaque handle and the hosted page URL.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    secret_key: SecretString,
}

impl StripeClient {
    /// Create a new Stripe client.
    #[must_use]
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key: config.secret_key.clone(),
        }
    }

    /// Create a hosted checkout session.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Api` if Stripe rejects the request, or
    /// `PaymentError::Http`/`PaymentError::Parse` on transport and decoding
    /// failures.
    pub async fn create_checkout_session(
        &self,
        customer_email: &str,
        line_items: &[CheckoutLineItem],
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, PaymentError> {
        let params = session_params(customer_email, line_items, success_url, cancel_url);

        let response = self
            .client
            .post(format!("{BASE_URL}/checkout/sessions"))
            .bearer_auth(self.secret_key.expose_secret())
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(api_error(status, message));
        }

        response
            .json::<CheckoutSession>()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))
    }
}

fn api_error(status: StatusCode, message: String) -> PaymentError {
    PaymentError::Api {
        status: status.as_u16(),
        message,
    }
}

/// Encode a session request as Stripe's bracketed form parameters.
fn session_params(
    customer_email: &str,
    line_items: &[CheckoutLineItem],
    success_url: &str,
    cancel_url: &str,
) -> Vec<(String, String)> {
    let mut params = vec![
        ("mode".to_owned(), "payment".to_owned()),
        ("payment_method_types[0]".to_owned(), "card".to_owned()),
        ("customer_email".to_owned(), customer_email.to_owned()),
        ("success_url".to_owned(), success_url.to_owned()),
        ("cancel_url".to_owned(), cancel_url.to_owned()),
    ];

    for (i, item) in line_items.iter().enumerate() {
        params.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
        params.push((
            format!("line_items[{i}][price_data][currency]"),
            CURRENCY.to_owned(),
        ));
        params.push((
            format!("line_items[{i}][price_data][unit_amount]"),
            item.unit_amount.to_string(),
        ));
        params.push((
            format!("line_items[{i}][price_data][product_data][name]"),
            item.name.clone(),
        ));
        params.push((
            format!("line_items[{i}][price_data][product_data][description]"),
            item.description.clone(),
        ));
    }

    params
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_session_params_shape() {
        let items = vec![CheckoutLineItem {
            name: "Tangelo Crate".to_owned(),
            description: "A crate of tangelos".to_owned(),
            quantity: 2,
            unit_amount: 1999,
        }];

        let params = session_params(
            "buyer@example.com",
            &items,
            "https://shop.example/checkout/success",
            "https://shop.example/checkout/cancel",
        );

        let get = |key: &str| {
            params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("mode"), Some("payment"));
        assert_eq!(get("customer_email"), Some("buyer@example.com"));
        assert_eq!(get("line_items[0][quantity]"), Some("2"));
        assert_eq!(get("line_items[0][price_data][currency]"), Some("eur"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("1999"));
        assert_eq!(
            get("line_items[0][price_data][product_data][name]"),
            Some("Tangelo Crate")
        );
    }

    #[test]
    fn test_session_deserializes() {
        let json = r#"{"id":"cs_test_123","url":"https://checkout.stripe.com/c/pay/cs_test_123","object":"checkout.session"}"#;
        let session: CheckoutSession = serde_json::from_str(json).unwrap();
        assert_eq!(session.id, "cs_test_123");
        assert!(session.url.starts_with("https://checkout.stripe.com/"));
    }
}
