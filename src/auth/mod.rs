pub mod extractors;
pub mod middleware;
pub mod password;
pub mod session;

use serde::{Deserialize, Serialize};
use validator::Validate;

// Re-export necessary items
pub use extractors::AuthenticatedSession;
pub use middleware::SessionMiddleware;
pub use password::{hash_password, verify_password};
pub use session::{Session, SessionManager, SessionSettings, SESSION_COOKIE_NAME};

/// Body of `POST /sign-up` and `POST /sign-in`.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AuthRequest {
    /// Between 4 and 20 characters. Matched case-insensitively.
    #[validate(length(min = 4, max = 20))]
    pub username: String,
    /// Between 8 and 50 characters.
    #[validate(length(min = 8, max = 50))]
    pub password: String,
}
