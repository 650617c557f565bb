//! Session-stored types and keys.

use serde::{Deserialize, Serialize};

use tangelo_core::{Email, UserId};

/// Keys under which values are stored in the session.
pub mod session_keys {
    /// The authenticated user ([`super::CurrentUser`]).
    pub const CURRENT_USER: &str = "current_user";
}

/// The authenticated identity, carried explicitly into every operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Email,
}
