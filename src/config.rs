use std::env;
use std::fmt;

use chrono::Duration;

use crate::auth::SessionSettings;

/// Error raised when an environment variable is present but cannot be parsed.
#[derive(Debug, PartialEq, Eq)]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid value for {}: {:?}", self.var, self.value)
    }
}

impl std::error::Error for ConfigError {}

/// Upper bound for either session period: one hundred years.
const MAX_SESSION_SECS: i64 = 60 * 60 * 24 * 365 * 100;

/// Deployment mode. `Prod` marks session cookies as `Secure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Dev,
    Prod,
}

pub struct Config {
    pub database_url: String,
    pub server_port: u16,
    pub server_host: String,
    pub app_env: AppEnv,
    pub session_active_secs: i64,
    pub session_idle_secs: i64,
    pub session_renew_idle: bool,
    pub bcrypt_cost: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Missing keys fall back to
    /// their defaults; present keys that do not parse are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_env = match lookup("APP_ENV") {
            None => AppEnv::Dev,
            Some(value) => match value.to_ascii_uppercase().as_str() {
                "DEV" => AppEnv::Dev,
                "PROD" => AppEnv::Prod,
                _ => {
                    return Err(ConfigError {
                        var: "APP_ENV",
                        value,
                    })
                }
            },
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://db.sqlite".to_string()),
            server_port: parse_or(&lookup, "SERVER_PORT", 3000)?,
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            app_env,
            session_active_secs: session_secs(&lookup, "SESSION_ACTIVE_SECS", 60 * 60 * 24)?,
            session_idle_secs: session_secs(&lookup, "SESSION_IDLE_SECS", 60 * 60 * 24 * 14)?,
            session_renew_idle: parse_or(&lookup, "SESSION_RENEW_IDLE", true)?,
            bcrypt_cost: parse_or(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            active_period: Duration::seconds(self.session_active_secs),
            idle_period: Duration::seconds(self.session_idle_secs),
            renew_idle: self.session_renew_idle,
            secure_cookie: self.app_env == AppEnv::Prod,
            bcrypt_cost: self.bcrypt_cost,
        }
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError { var, value }),
    }
}

/// A session period in seconds, between one second and `MAX_SESSION_SECS`.
fn session_secs<F>(lookup: &F, var: &'static str, default: i64) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs = parse_or(lookup, var, default)?;
    if (1..=MAX_SESSION_SECS).contains(&secs) {
        Ok(secs)
    } else {
        Err(ConfigError {
            var,
            value: secs.to_string(),
        })
    }
}
