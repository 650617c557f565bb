//! Checkout route handlers.
//!
//! `GET /checkout` prices the cart and creates the payment session; the
//! user completes payment on the provider's hosted page, which then sends
//! them back to the success or cancel callback.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::Redirect};
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::routes::cart::{CartItemView, cart_total};
use crate::services::checkout::CheckoutService;
use crate::state::AppState;

/// Checkout page template: the priced cart and the hosted payment link.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub items: Vec<CartItemView>,
    pub total: String,
    pub payment_url: String,
    pub logged_in: bool,
}

/// Start a checkout attempt.
#[instrument(skip(state, user))]
pub async fn begin(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<CheckoutTemplate> {
    let base_url = &state.config().base_url;
    let success_url = format!("{base_url}/checkout/success");
    let cancel_url = format!("{base_url}/checkout/cancel");

    let started = CheckoutService::new(state.pool(), state.payments())
        .begin(&user, &success_url, &cancel_url)
        .await?;

    Ok(CheckoutTemplate {
        items: started.cart.entries.iter().map(CartItemView::from).collect(),
        total: cart_total(&started.cart.entries),
        payment_url: started.session.url,
        logged_in: true,
    })
}

/// Success callback: snapshot the cart into an order and clear it.
#[instrument(skip(state, user))]
pub async fn success(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Redirect> {
    CheckoutService::new(state.pool(), state.payments())
        .complete(&user)
        .await?;

    Ok(Redirect::to("/orders"))
}

/// Cancel callback: nothing was charged, back to the cart.
#[instrument]
pub async fn cancel() -> Redirect {
    Redirect::to("/cart")
}
