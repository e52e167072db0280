use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use tracing::warn;

/// Configuration for the reputation and view-tracking core
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CivicConfig {
    /// Database configuration
    pub database: DatabaseConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Reputation ledger configuration
    pub reputation: ReputationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    pub postgres_url: String,
    /// Enable PostgreSQL (if false, uses in-memory fallback)
    pub postgres_enabled: bool,
    /// Connection pool size
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Emit span open/close events
    pub log_spans: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationConfig {
    /// Points awarded for a successful verification
    pub verification_reward: f64,
    /// Number of log entries shown in the recent activity feed
    pub recent_activity_limit: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            postgres_url: "postgresql://localhost:5432/civicverify".to_string(),
            postgres_enabled: false,
            max_connections: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_spans: false,
        }
    }
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            verification_reward: 0.1,
            recent_activity_limit: 5,
        }
    }
}

impl CivicConfig {
    /// Load configuration from environment variables and validate it
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // Database configuration
        if let Some(url) = lookup("CIVIC_POSTGRES_URL") {
            config.database.postgres_url = url;
        }

        if let Some(enabled) = lookup("CIVIC_POSTGRES_ENABLED") {
            config.database.postgres_enabled = parse_var("CIVIC_POSTGRES_ENABLED", &enabled)?;
        }

        if let Some(max) = lookup("CIVIC_POSTGRES_MAX_CONNECTIONS") {
            config.database.max_connections = parse_var("CIVIC_POSTGRES_MAX_CONNECTIONS", &max)?;
        }

        // Logging configuration
        if let Some(level) = lookup("CIVIC_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Some(spans) = lookup("CIVIC_LOG_SPANS") {
            config.logging.log_spans = parse_var("CIVIC_LOG_SPANS", &spans)?;
        }

        // Reputation configuration
        if let Some(reward) = lookup("CIVIC_VERIFICATION_REWARD") {
            config.reputation.verification_reward =
                parse_var("CIVIC_VERIFICATION_REWARD", &reward)?;
        }

        if let Some(limit) = lookup("CIVIC_RECENT_ACTIVITY_LIMIT") {
            config.reputation.recent_activity_limit =
                parse_var("CIVIC_RECENT_ACTIVITY_LIMIT", &limit)?;
        }

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration for consistency
    pub fn validate(&self) -> Result<()> {
        if self.database.postgres_enabled {
            if self.database.postgres_url.is_empty() {
                return Err(anyhow::anyhow!(
                    "PostgreSQL is enabled but CIVIC_POSTGRES_URL is empty"
                ));
            }
            if !self.database.postgres_url.starts_with("postgres://")
                && !self.database.postgres_url.starts_with("postgresql://")
            {
                return Err(anyhow::anyhow!(
                    "PostgreSQL URL must use the postgres:// or postgresql:// scheme: {}",
                    redact_database_url(&self.database.postgres_url)
                ));
            }
        }

        if self.database.max_connections == 0 {
            return Err(anyhow::anyhow!("Connection pool size must be non-zero"));
        }

        if !self.reputation.verification_reward.is_finite() {
            return Err(anyhow::anyhow!("Verification reward must be a finite number"));
        }

        if self.reputation.verification_reward < 0.0 {
            warn!(
                reward = self.reputation.verification_reward,
                "Verification reward is negative; verifications will lower reputation"
            );
        }

        if self.reputation.recent_activity_limit == 0 {
            return Err(anyhow::anyhow!("Recent activity limit must be non-zero"));
        }

        Ok(())
    }
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("Invalid {} value", name))
}

/// Mask the password of a connection string before it reaches the logs
pub fn redact_database_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };

    match credentials.split_once(':') {
        Some((user, _password)) => format!("{}://{}:***@{}", scheme, user, host),
        None => format!("{}://{}@{}", scheme, credentials, host),
    }
}
