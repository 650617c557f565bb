//! User domain type.

use chrono::{DateTime, Utc};

use tangelo_core::{Email, UserId};

/// A shop user.
///
/// The password hash is never part of the domain type; repositories hand it
/// out only to the auth service.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub created_at: DateTime<Utc>,
}
