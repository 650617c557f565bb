//! Cart route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Form, extract::State, response::Redirect};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use tangelo_core::{ProductId, format_price};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::cart::{CartEntry, CartService};
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Debug, Clone)]
pub struct CartItemView {
    pub product_id: i32,
    pub title: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
    pub image_url: String,
}

impl From<&CartEntry> for CartItemView {
    fn from(entry: &CartEntry) -> Self {
        let line_total = Decimal::from(entry.quantity) * entry.product.price;

        Self {
            product_id: entry.product.id.as_i32(),
            title: entry.product.title.clone(),
            quantity: entry.quantity,
            price: format_price(entry.product.price),
            line_price: format_price(line_total),
            image_url: format!("/images/{}", entry.product.image_path),
        }
    }
}

/// Sum of the resolved entries, formatted for display.
pub fn cart_total(entries: &[CartEntry]) -> String {
    let total: Decimal = entries
        .iter()
        .map(|e| Decimal::from(e.quantity) * e.product.price)
        .sum();
    format_price(total)
}

/// Add/remove form data.
#[derive(Debug, Deserialize)]
pub struct CartItemForm {
    pub product_id: i32,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartTemplate {
    pub items: Vec<CartItemView>,
    pub total: String,
    pub logged_in: bool,
}

/// Display the cart page.
#[instrument(skip(state, user))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<CartTemplate> {
    let entries = CartService::new(state.pool()).populate(user.id).await?;

    Ok(CartTemplate {
        items: entries.iter().map(CartItemView::from).collect(),
        total: cart_total(&entries),
        logged_in: true,
    })
}

/// Add one unit of a product to the cart.
#[instrument(skip(state, user))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<CartItemForm>,
) -> Result<Redirect> {
    CartService::new(state.pool())
        .add_to_cart(user.id, ProductId::new(form.product_id))
        .await?;

    Ok(Redirect::to("/cart"))
}

/// Remove a product's line from the cart.
#[instrument(skip(state, user))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<CartItemForm>,
) -> Result<Redirect> {
    CartService::new(state.pool())
        .remove_from_cart(user.id, ProductId::new(form.product_id))
        .await?;

    Ok(Redirect::to("/cart"))
}
