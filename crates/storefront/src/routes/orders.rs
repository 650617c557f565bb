//! Order history and invoice download handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::Response,
};
use tracing::instrument;

use tangelo_core::{OrderId, format_price};

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::Order;
use crate::services::invoice;
use crate::state::AppState;

/// Order line display data for templates.
#[derive(Debug, Clone)]
pub struct OrderLineView {
    pub title: String,
    pub quantity: u32,
    pub unit_price: String,
}

/// Order display data for templates.
#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: i32,
    pub created_at: String,
    pub total: String,
    pub lines: Vec<OrderLineView>,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.as_i32(),
            created_at: order.created_at.format("%Y-%m-%d %H:%M").to_string(),
            total: format_price(order.total()),
            lines: order
                .lines
                .iter()
                .map(|l| OrderLineView {
                    title: l.product.title.clone(),
                    quantity: l.quantity,
                    unit_price: format_price(l.product.price),
                })
                .collect(),
        }
    }
}

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/list.html")]
pub struct OrdersTemplate {
    pub orders: Vec<OrderView>,
    pub logged_in: bool,
}

/// Order history page.
#[instrument(skip(state, user))]
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<OrdersTemplate> {
    let orders = OrderRepository::new(state.pool())
        .list_by_user(user.id)
        .await?;

    Ok(OrdersTemplate {
        orders: orders.iter().map(OrderView::from).collect(),
        logged_in: true,
    })
}

/// Stream an order's invoice.
///
/// The PDF is regenerated from the immutable order on every request and
/// written to the invoice directory while the same bytes stream to the
/// client. Response headers are finalized before the first chunk goes out.
#[instrument(skip(state, user))]
pub async fn invoice(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Response> {
    let order_id = OrderId::new(id);

    let order = OrderRepository::new(state.pool())
        .find_by_id(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;

    // Never produce a byte for somebody else's order.
    if !invoice::owned_by(&order, user.id) {
        return Err(AppError::Unauthorized(format!("order {order_id}")));
    }

    let filename = invoice::filename(order_id);
    let path = state.config().invoice_dir.join(&filename);

    let mut chunks = invoice::spawn_render(order, path);
    let body = Body::from_stream(async_stream::stream! {
        while let Some(chunk) = chunks.recv().await {
            yield Ok::<_, std::convert::Infallible>(chunk);
        }
    });

    Response::builder()
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{filename}\""),
        )
        .body(body)
        .map_err(|e| AppError::Internal(format!("invoice response: {e}")))
}
