use actix_web::cookie::{time, Cookie, SameSite};
use actix_web::web;
use chrono::{Duration, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::error::AppError;
use crate::models::user::Key;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE_NAME: &str = "auth_session";

/// Tunables for session lifetime, cookies and password hashing.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// How long a new session stays active.
    pub active_period: Duration,
    /// How long past `active_period` an idle session can still be renewed.
    pub idle_period: Duration,
    /// Rotate idle sessions instead of rejecting them.
    pub renew_idle: bool,
    /// Mark the session cookie `Secure`.
    pub secure_cookie: bool,
    /// bcrypt work factor used for new keys.
    pub bcrypt_cost: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            active_period: Duration::hours(24),
            idle_period: Duration::days(14),
            renew_idle: true,
            secure_cookie: false,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

/// A server-side session.
///
/// Expiry timestamps are unix milliseconds. A session is *active* until
/// `active_expires`, *idle* until `idle_expires`, and dead afterwards.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub active_expires: i64,
    pub idle_expires: i64,
    /// Set when the session was created or rotated during this request, so the
    /// cookie has to be (re)issued.
    #[sqlx(skip)]
    pub fresh: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Idle,
    Dead,
}

impl Session {
    pub fn state_at(&self, now_ms: i64) -> SessionState {
        if now_ms > self.idle_expires {
            SessionState::Dead
        } else if now_ms > self.active_expires {
            SessionState::Idle
        } else {
            SessionState::Active
        }
    }
}

/// Issues and validates sessions against the store.
///
/// Holds its own handle to the pool so it can be shared as `web::Data` and used by
/// both the session middleware and the sign-up/sign-in handlers.
#[derive(Clone)]
pub struct SessionManager {
    pool: SqlitePool,
    settings: SessionSettings,
}

impl SessionManager {
    pub fn new(pool: SqlitePool, settings: SessionSettings) -> Self {
        Self { pool, settings }
    }

    /// Creates a user with a username key, then a session for it.
    ///
    /// The user and key rows are written in one transaction; a key conflict rolls
    /// both back and yields `DuplicateUser`. The session is a separate write.
    pub async fn sign_up(&self, username: &str, password: String) -> Result<Session, AppError> {
        let cost = self.settings.bcrypt_cost;
        let hashed = web::block(move || hash_password(&password, cost)).await??;

        let user_id = Uuid::new_v4().to_string();
        let key_id = Key::username_key_id(username);

        let mut tx = self.pool.begin().await?;
        sqlx::query(r#"INSERT INTO "user" (id, username) VALUES (?1, ?2)"#)
            .bind(&user_id)
            .bind(username)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO user_key (id, user_id, hashed_password) VALUES (?1, ?2, ?3)")
            .bind(&key_id)
            .bind(&user_id)
            .bind(&hashed)
            .execute(&mut *tx)
            .await
            .map_err(|err| match err {
                sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                    AppError::DuplicateUser
                }
                other => AppError::from(other),
            })?;
        tx.commit().await?;

        log::info!("Created user {} ({})", user_id, key_id);
        self.create_session(&user_id).await
    }

    /// Verifies a username key and opens a new session for its user.
    pub async fn sign_in(&self, username: &str, password: String) -> Result<Session, AppError> {
        let key = sqlx::query_as::<_, Key>(
            "SELECT id, user_id, hashed_password FROM user_key WHERE id = ?1",
        )
        .bind(Key::username_key_id(username))
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        let hashed = key.hashed_password.ok_or(AppError::InvalidCredentials)?;
        let valid = web::block(move || verify_password(&password, &hashed)).await??;
        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        self.delete_dead_user_sessions(&key.user_id).await?;
        self.create_session(&key.user_id).await
    }

    pub async fn create_session(&self, user_id: &str) -> Result<Session, AppError> {
        let now = Utc::now().timestamp_millis();
        let active_expires = now + self.settings.active_period.num_milliseconds();
        let session = Session {
            id: generate_session_id(),
            user_id: user_id.to_string(),
            active_expires,
            idle_expires: active_expires + self.settings.idle_period.num_milliseconds(),
            fresh: true,
        };

        sqlx::query(
            "INSERT INTO user_session (id, user_id, active_expires, idle_expires)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(session.active_expires)
        .bind(session.idle_expires)
        .execute(&self.pool)
        .await?;

        Ok(session)
    }

    /// Looks up a session token.
    ///
    /// Dead sessions are deleted and reported as absent. Idle sessions are rotated
    /// into a fresh session when renewal is enabled, otherwise treated as dead.
    pub async fn validate_session(&self, token: &str) -> Result<Option<Session>, AppError> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT id, user_id, active_expires, idle_expires FROM user_session WHERE id = ?1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        let Some(session) = session else {
            return Ok(None);
        };

        match session.state_at(Utc::now().timestamp_millis()) {
            SessionState::Active => Ok(Some(session)),
            SessionState::Idle if self.settings.renew_idle => {
                let renewed = self.create_session(&session.user_id).await?;
                self.invalidate_session(&session.id).await?;
                log::debug!("Renewed idle session for user {}", session.user_id);
                Ok(Some(renewed))
            }
            SessionState::Idle | SessionState::Dead => {
                self.invalidate_session(&session.id).await?;
                Ok(None)
            }
        }
    }

    pub async fn invalidate_session(&self, token: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM user_session WHERE id = ?1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Removes every session of `user_id` that is past its idle expiry.
    pub async fn delete_dead_user_sessions(&self, user_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM user_session WHERE user_id = ?1 AND idle_expires < ?2")
            .bind(user_id)
            .bind(Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Cookie carrying `session`, valid until the session's idle expiry.
    pub fn session_cookie(&self, session: &Session) -> Cookie<'static> {
        let remaining = (session.idle_expires - Utc::now().timestamp_millis()).max(0);
        Cookie::build(SESSION_COOKIE_NAME, session.id.clone())
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.settings.secure_cookie)
            .max_age(time::Duration::milliseconds(remaining))
            .finish()
    }

    /// Cookie that clears the session cookie on the client.
    pub fn blank_cookie(&self) -> Cookie<'static> {
        let mut cookie = Cookie::build(SESSION_COOKIE_NAME, "")
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.settings.secure_cookie)
            .finish();
        cookie.make_removal();
        cookie
    }
}

fn generate_session_id() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}
