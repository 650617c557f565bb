//! Service layer: one module per collaborator or orchestration concern.
//!
//! Services take the authenticated identity and typed inputs explicitly and
//! return domain values or typed errors, so each operation is testable
//! without an HTTP harness.

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod email;
pub mod images;
pub mod invoice;
pub mod payments;

pub use auth::AuthService;
pub use cart::CartService;
pub use checkout::CheckoutService;
pub use email::EmailService;
pub use images::ImageStore;
pub use payments::StripeClient;
