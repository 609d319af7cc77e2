use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::catalog::ChemicalCatalog;

const DEFAULT_DATABASE_URL: &str = "sqlite://inventory.db?mode=rwc";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_EXPIRY_WARNING_DAYS: i64 = 30;
const MAX_EXPIRY_WARNING_DAYS: i64 = 3650;
const DEV_JWT_SECRET: &str = "development-only-secret-change-me-before-deploying";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("chemical catalog {path}: {reason}")]
    Catalog { path: String, reason: String },

    #[error("failed to hash admin password: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

/// What to do with an issue line that takes more than is on hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuePolicy {
    /// Record it and report a warning.
    Warn,
    /// Drop that line, keep the rest of the batch.
    Reject,
}

impl FromStr for IssuePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(IssuePolicy::Warn),
            "reject" => Ok(IssuePolicy::Reject),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    /// bcrypt hash of the shared admin secret
    pub admin_password_hash: String,
    pub issue_policy: IssuePolicy,
    pub expiry_warning_days: i64,
    pub catalog: ChemicalCatalog,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let development = env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("development"))
            .unwrap_or(false);

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let port = parse_var("PORT", DEFAULT_PORT)?;

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if development => {
                log::warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
            _ => return Err(ConfigError::Missing("JWT_SECRET")),
        };

        let admin_password_hash = match (env::var("ADMIN_PASSWORD_HASH"), env::var("ADMIN_PASSWORD")) {
            (Ok(hash), _) if !hash.is_empty() => hash,
            (_, Ok(plain)) if !plain.is_empty() => bcrypt::hash(plain, bcrypt::DEFAULT_COST)?,
            _ => return Err(ConfigError::Missing("ADMIN_PASSWORD_HASH or ADMIN_PASSWORD")),
        };

        let issue_policy = match env::var("ISSUE_POLICY") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid { name: "ISSUE_POLICY", value: raw })?,
            Err(_) => IssuePolicy::Warn,
        };

        let expiry_warning_days =
            expiry_window(parse_var("EXPIRY_WARNING_DAYS", DEFAULT_EXPIRY_WARNING_DAYS)?)?;

        let catalog = match env::var("CHEMICAL_CATALOG") {
            Ok(path) if !path.is_empty() => ChemicalCatalog::from_json_file(&PathBuf::from(path))?,
            _ => ChemicalCatalog::default(),
        };

        Ok(Self {
            database_url,
            port,
            jwt_secret,
            admin_password_hash,
            issue_policy,
            expiry_warning_days,
            catalog,
        })
    }
}

/// Warning window in days, 0 through ten years.
fn expiry_window(days: i64) -> Result<i64, ConfigError> {
    if (0..=MAX_EXPIRY_WARNING_DAYS).contains(&days) {
        Ok(days)
    } else {
        Err(ConfigError::Invalid { name: "EXPIRY_WARNING_DAYS", value: days.to_string() })
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(default),
    }
}
