use sqlx::FromRow;

/// Provider id used for username/password keys.
pub const USERNAME_PROVIDER: &str = "username";

/// A credential binding a provider and provider-specific user id to a hashed secret.
///
/// The key id is `"<provider>:<provider user id>"`; the primary key on that column is
/// what rejects a second sign-up for the same username.
#[derive(Debug, Clone, FromRow)]
pub struct Key {
    pub id: String,
    pub user_id: String,
    pub hashed_password: Option<String>,
}

impl Key {
    pub fn key_id(provider: &str, provider_user_id: &str) -> String {
        format!("{}:{}", provider, provider_user_id)
    }

    /// Key id for a username credential. Usernames are matched case-insensitively.
    pub fn username_key_id(username: &str) -> String {
        Self::key_id(USERNAME_PROVIDER, &username.to_lowercase())
    }
}
