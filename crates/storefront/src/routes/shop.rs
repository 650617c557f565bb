//! Public catalog route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, Query, State};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use tangelo_core::ProductId;

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::Product;
use crate::state::AppState;

/// Catalog page size.
const ITEMS_PER_PAGE: i64 = 4;

/// Pagination query parameters.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

/// Product display data for templates.
#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: i32,
    pub title: String,
    pub price: Decimal,
    pub description: String,
    pub image_url: String,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.as_i32(),
            title: product.title.clone(),
            price: product.price,
            description: product.description.clone(),
            image_url: format!("/images/{}", product.image_path),
        }
    }
}

/// Pagination state for the catalog pages.
#[derive(Debug, Clone)]
pub struct Pager {
    pub current: i64,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous: i64,
    pub next: i64,
    pub last: i64,
}

impl Pager {
    /// Derive pagination state from a 1-based page and a total row count.
    #[must_use]
    pub fn new(current: i64, total: i64, per_page: i64) -> Self {
        let last = (total.max(0) + per_page - 1) / per_page;
        let last = last.max(1);

        Self {
            current,
            has_previous: current > 1,
            has_next: current < last,
            previous: current - 1,
            next: current + 1,
            last,
        }
    }
}

/// Catalog listing template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/product_list.html")]
pub struct ProductListTemplate {
    pub products: Vec<ProductView>,
    pub pager: Pager,
    pub logged_in: bool,
}

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/product_detail.html")]
pub struct ProductDetailTemplate {
    pub product: ProductView,
    pub logged_in: bool,
}

/// Paginated product listing; serves `/` and `/products`.
#[instrument(skip(state, auth))]
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(auth): OptionalAuth,
    Query(query): Query<PageQuery>,
) -> Result<ProductListTemplate> {
    let page = query.page.unwrap_or(1).max(1);

    let (products, total) = ProductRepository::new(state.pool())
        .list_page(page, ITEMS_PER_PAGE)
        .await?;

    Ok(ProductListTemplate {
        products: products.iter().map(ProductView::from).collect(),
        pager: Pager::new(page, total, ITEMS_PER_PAGE),
        logged_in: auth.is_some(),
    })
}

/// Product detail page.
#[instrument(skip(state, auth))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(auth): OptionalAuth,
    Path(id): Path<i32>,
) -> Result<ProductDetailTemplate> {
    let product = ProductRepository::new(state.pool())
        .find_by_id(ProductId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    Ok(ProductDetailTemplate {
        product: ProductView::from(&product),
        logged_in: auth.is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pager_first_page() {
        let pager = Pager::new(1, 9, 4);
        assert!(!pager.has_previous);
        assert!(pager.has_next);
        assert_eq!(pager.next, 2);
        assert_eq!(pager.last, 3);
    }

    #[test]
    fn test_pager_last_page() {
        let pager = Pager::new(3, 9, 4);
        assert!(pager.has_previous);
        assert!(!pager.has_next);
        assert_eq!(pager.previous, 2);
    }

    #[test]
    fn test_pager_exact_multiple() {
        // 8 products at 4 per page is exactly 2 pages
        let pager = Pager::new(2, 8, 4);
        assert!(!pager.has_next);
        assert_eq!(pager.last, 2);
    }

    #[test]
    fn test_pager_empty_catalog() {
        let pager = Pager::new(1, 0, 4);
        assert!(!pager.has_previous);
        assert!(!pager.has_next);
        assert_eq!(pager.last, 1);
    }
}
