// ⚙️ Configuration
// Environment variables with development defaults.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_DB_PATH: &str = "bookstore.db";
const DEFAULT_USER: &str = "camila";
const DEFAULT_PASSWORD: &str = "ca2004";

/// The single credential pair accepted by HTTP Basic auth.
/// Only a SHA-256 digest of the password is kept in memory.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password_digest: [u8; 32],
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password_digest: digest(password),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn verify(&self, username: &str, password: &str) -> bool {
        // constant-time over the digest bytes
        let candidate = digest(password);
        let same_password = candidate
            .iter()
            .zip(self.password_digest.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0;
        same_password && username == self.username
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

fn digest(password: &str) -> [u8; 32] {
    Sha256::digest(password.as_bytes()).into()
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: String,
    pub db_path: PathBuf,
    pub credentials: Credentials,
    pub opening_balance: f64,
    pub seed_csv: Option<PathBuf>,
}

impl Config {
    /// Read `BOOKSTORE_*` variables from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let addr = lookup("BOOKSTORE_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let db_path = lookup("BOOKSTORE_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        let credentials = match (lookup("BOOKSTORE_USER"), lookup("BOOKSTORE_PASSWORD")) {
            (Some(user), Some(password)) => Credentials::new(&user, &password),
            _ => {
                tracing::warn!(
                    "BOOKSTORE_USER/BOOKSTORE_PASSWORD not set; using insecure dev credentials"
                );
                Credentials::new(DEFAULT_USER, DEFAULT_PASSWORD)
            }
        };

        let opening_balance = match lookup("BOOKSTORE_OPENING_BALANCE") {
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .with_context(|| format!("BOOKSTORE_OPENING_BALANCE is not a number: {raw}"))?,
            None => 0.0,
        };

        Ok(Self {
            addr,
            db_path,
            credentials,
            opening_balance,
            seed_csv: lookup("BOOKSTORE_SEED_CSV").map(PathBuf::from),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            credentials: Credentials::new(DEFAULT_USER, DEFAULT_PASSWORD),
            opening_balance: 0.0,
            seed_csv: None,
        }
    }
}
