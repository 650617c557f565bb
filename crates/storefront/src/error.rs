//! Unified error handling with Sentry integration.
//!
//! All route handlers return `Result<T, AppError>`. Validation problems are
//! handled at the form boundary where possible (re-rendering the form);
//! everything that bubbles up here is turned into the matching redirect,
//! 404 page, 422 message, or generic 500 page. Internal causes are logged
//! and captured to Sentry, never shown to the user.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::checkout::CheckoutError;
use crate::services::images::ImageError;
use crate::services::payments::PaymentError;

/// Generic error page shown for any 500-class failure.
#[derive(Template)]
#[template(path = "error/500.html")]
struct ServerErrorTemplate;

/// Page shown when a referenced resource does not exist.
#[derive(Template)]
#[template(path = "error/404.html")]
struct NotFoundTemplate;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart operation failed.
    #[error("cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout orchestration failed.
    #[error("checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Payment provider call failed.
    #[error("payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Image store rejected or failed an operation.
    #[error("image error: {0}")]
    Image(#[from] ImageError),

    /// Bad input that slipped past the form boundary.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// No authenticated user on a protected route.
    #[error("unauthenticated")]
    Unauthenticated,

    /// Ownership mismatch; the resource is never exposed.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "request error"
            );
        }

        match self {
            Self::Unauthenticated => Redirect::to("/login").into_response(),

            Self::Unauthorized(resource) => {
                // Redirect to a safe default page rather than exposing
                // whether the resource exists.
                tracing::warn!(%resource, "ownership mismatch");
                Redirect::to("/").into_response()
            }

            Self::NotFound(_) | Self::Cart(CartError::ProductNotFound(_)) => {
                not_found_response()
            }

            Self::Validation(message) => {
                (StatusCode::UNPROCESSABLE_ENTITY, message).into_response()
            }

            Self::Image(ImageError::UnsupportedType(_)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Attached file is not an image".to_owned(),
            )
                .into_response(),

            Self::Checkout(CheckoutError::EmptyCart) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Your cart is empty".to_owned(),
            )
                .into_response(),

            Self::Checkout(CheckoutError::AmountOutOfRange(title)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("The price of {title} cannot be charged"),
            )
                .into_response(),

            Self::Auth(err) if !is_auth_server_error(&err) => {
                (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()).into_response()
            }

            // Database, payment, and everything else internal: generic page,
            // no details leak to the client.
            _ => server_error_response(),
        }
    }
}

impl AppError {
    /// Whether this error should be captured and rendered as a 500.
    fn is_server_error(&self) -> bool {
        match self {
            Self::Database(_) | Self::Payment(_) | Self::Internal(_) => true,
            Self::Image(err) => matches!(err, ImageError::Io(_)),
            Self::Cart(err) => matches!(err, CartError::Repository(_)),
            Self::Checkout(err) => !matches!(
                err,
                CheckoutError::EmptyCart | CheckoutError::AmountOutOfRange(_)
            ),
            Self::Auth(err) => is_auth_server_error(err),
            Self::Validation(_)
            | Self::NotFound(_)
            | Self::Unauthenticated
            | Self::Unauthorized(_) => false,
        }
    }
}

fn is_auth_server_error(err: &AuthError) -> bool {
    matches!(err, AuthError::PasswordHash | AuthError::Repository(_))
}

fn not_found_response() -> Response {
    match NotFoundTemplate.render() {
        Ok(body) => (StatusCode::NOT_FOUND, Html(body)).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "Page Not Found").into_response(),
    }
}

fn server_error_response() -> Response {
    match ServerErrorTemplate.render() {
        Ok(body) => (StatusCode::INTERNAL_SERVER_ERROR, Html(body)).into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server Error").into_response(),
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tangelo_core::ProductId;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_not_found_is_404() {
        assert_eq!(
            status_of(AppError::NotFound("order 9".to_owned())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Cart(CartError::ProductNotFound(ProductId::new(1)))),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_validation_class_is_422() {
        assert_eq!(
            status_of(AppError::Validation("title is required".to_owned())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(AppError::Checkout(CheckoutError::EmptyCart)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(AppError::Image(ImageError::UnsupportedType(
                "image/gif".to_owned()
            ))),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_unauthenticated_redirects_to_login() {
        let response = AppError::Unauthenticated.into_response();
        assert!(response.status().is_redirection());
        assert_eq!(
            response
                .headers()
                .get(axum::http::header::LOCATION)
                .and_then(|v| v.to_str().ok()),
            Some("/login")
        );
    }

    #[test]
    fn test_unauthorized_redirects_to_safe_default() {
        let response = AppError::Unauthorized("order 3".to_owned()).into_response();
        assert!(response.status().is_redirection());
        assert_eq!(
            response
                .headers()
                .get(axum::http::header::LOCATION)
                .and_then(|v| v.to_str().ok()),
            Some("/")
        );
    }

    #[test]
    fn test_internal_class_is_500() {
        assert_eq!(
            status_of(AppError::Internal("boom".to_owned())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(AppError::Database(crate::db::RepositoryError::NotFound)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
