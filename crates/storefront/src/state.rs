//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::services::email::EmailService;
use crate::services::images::ImageStore;
use crate::services::payments::StripeClient;

/// Error creating application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("email transport error: {0}")]
    Email(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the database pool and external clients.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    pool: PgPool,
    payments: StripeClient,
    email: EmailService,
    images: ImageStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP transport cannot be configured.
    pub fn new(config: AppConfig, pool: PgPool) -> Result<Self, StateError> {
        let payments = StripeClient::new(&config.stripe);
        let email = EmailService::new(&config.email)?;
        let images = ImageStore::new(config.image_dir.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                payments,
                email,
                images,
            }),
        })
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the payment provider client.
    #[must_use]
    pub fn payments(&self) -> &StripeClient {
        &self.inner.payments
    }

    /// Get a reference to the email service.
    #[must_use]
    pub fn email(&self) -> &EmailService {
        &self.inner.email
    }

    /// Get a reference to the product image store.
    #[must_use]
    pub fn images(&self) -> &ImageStore {
        &self.inner.images
    }
}
