//! Application configuration

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use questline_domain::{Role, UserId, MAX_SHORT_ID_LENGTH, MIN_SHORT_ID_LENGTH};

/// Application configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite database file (documents, files, sessions)
    pub database_path: PathBuf,

    /// HTTP bind host
    pub server_host: String,
    /// HTTP bind port
    pub server_port: u16,

    /// CORS allowed origins (comma-separated, or "*" for any). Unset disables CORS.
    pub cors_allowed_origins: Option<String>,

    /// Largest accepted upload body in bytes
    pub max_upload_bytes: usize,

    /// Short identifier generation
    pub short_ids: ShortIdConfig,

    /// Sessions granted at startup
    pub session_seed: Vec<SessionGrant>,
}

/// Short identifier generation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortIdConfig {
    /// Characters per generated id (at least 7)
    pub length: usize,
    /// Fresh ids tried before a create gives up on collisions
    pub attempts: u32,
}

impl ShortIdConfig {
    /// Rejects lengths no short id can have.
    pub fn check(&self) -> Result<()> {
        if !(MIN_SHORT_ID_LENGTH..=MAX_SHORT_ID_LENGTH).contains(&self.length) {
            bail!(
                "SHORT_ID_LENGTH must be between {} and {}, got {}",
                MIN_SHORT_ID_LENGTH,
                MAX_SHORT_ID_LENGTH,
                self.length
            );
        }
        Ok(())
    }
}

impl Default for ShortIdConfig {
    fn default() -> Self {
        Self {
            length: 8,
            attempts: 5,
        }
    }
}

/// A bearer token granted to a user at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
    pub token: String,
    pub role: Role,
    pub user_id: UserId,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let short_ids = ShortIdConfig {
            length: env::var("SHORT_ID_LENGTH")
                .unwrap_or_else(|_| "8".to_string())
                .parse()
                .context("SHORT_ID_LENGTH must be a positive integer")?,
            attempts: env::var("SHORT_ID_ATTEMPTS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("SHORT_ID_ATTEMPTS must be a positive integer")?,
        };
        short_ids.check()?;

        Ok(Self {
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "./data/questline.db".to_string())
                .into(),

            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .or_else(|_| env::var("PORT"))
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("SERVER_PORT must be a valid port number")?,

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),

            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .unwrap_or_else(|_| (10 * 1024 * 1024).to_string())
                .parse()
                .context("MAX_UPLOAD_BYTES must be a byte count")?,

            short_ids,

            session_seed: parse_session_seed(&env::var("SESSION_SEED").unwrap_or_default())?,
        })
    }

    /// Configuration for tests: everything default, database at `database_path`.
    #[cfg(test)]
    pub fn for_tests(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            cors_allowed_origins: None,
            max_upload_bytes: 1024 * 1024,
            short_ids: ShortIdConfig::default(),
            session_seed: Vec::new(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// Parses `token:role:user-uuid` entries separated by commas.
pub fn parse_session_seed(raw: &str) -> Result<Vec<SessionGrant>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let mut parts = entry.splitn(3, ':');
            let (Some(token), Some(role), Some(user)) = (parts.next(), parts.next(), parts.next())
            else {
                bail!("SESSION_SEED entry must be token:role:user-uuid");
            };
            if token.is_empty() {
                bail!("SESSION_SEED entry has an empty token");
            }
            Ok(SessionGrant {
                token: token.to_string(),
                role: role
                    .parse()
                    .with_context(|| format!("SESSION_SEED role for token {}", token))?,
                user_id: user
                    .parse()
                    .with_context(|| format!("SESSION_SEED user id for token {}", token))?,
            })
        })
        .collect()
}
