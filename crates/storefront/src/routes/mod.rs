//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                        - Catalog, paginated
//! GET  /products                - Same listing
//! GET  /products/{id}           - Product detail
//!
//! # Cart (requires auth)
//! GET  /cart                    - Cart page
//! POST /cart/add                - Add one unit of a product
//! POST /cart/remove             - Remove a product's line
//!
//! # Checkout (requires auth)
//! GET  /checkout                - Price the cart, create a payment session
//! GET  /checkout/success        - Provider success callback: snapshot order
//! GET  /checkout/cancel         - Back to the cart
//!
//! # Orders (requires auth)
//! GET  /orders                  - Order history
//! GET  /orders/{id}/invoice     - Streamed PDF invoice
//!
//! # Admin (requires auth, owner-scoped)
//! GET  /admin/products          - Own products
//! GET  /admin/products/new      - Add form
//! POST /admin/products          - Create (multipart, image required)
//! GET  /admin/products/{id}/edit - Edit form
//! POST /admin/products/{id}     - Update (multipart, image optional)
//! POST /admin/products/{id}/delete - Delete
//!
//! # Auth
//! GET/POST /login, /signup      - Password authentication
//! POST /logout
//! GET/POST /reset               - Request a reset link by email
//! GET  /reset/{token}           - New-password form behind the link
//! POST /new-password            - Complete the reset
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod orders;
pub mod shop;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/remove", post(cart::remove))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(admin::list).post(admin::create))
        .route("/products/new", get(admin::new_form))
        .route("/products/{id}", post(admin::update))
        .route("/products/{id}/edit", get(admin::edit_form))
        .route("/products/{id}/delete", post(admin::delete))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/signup", get(auth::signup_page).post(auth::signup))
        .route("/logout", post(auth::logout))
        .route("/reset", get(auth::reset_page).post(auth::reset))
        .route("/reset/{token}", get(auth::new_password_page))
        .route("/new-password", post(auth::new_password))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Catalog
        .route("/", get(shop::index))
        .route("/products", get(shop::index))
        .route("/products/{id}", get(shop::show))
        // Cart
        .nest("/cart", cart_routes())
        // Checkout
        .route("/checkout", get(checkout::begin))
        .route("/checkout/success", get(checkout::success))
        .route("/checkout/cancel", get(checkout::cancel))
        // Orders & invoices
        .route("/orders", get(orders::list))
        .route("/orders/{id}/invoice", get(orders::invoice))
        // Admin
        .nest("/admin", admin_routes())
        // Auth
        .merge(auth_routes())
}
