use payroll_core::rollback::RollbackPolicy;
use payroll_engine::EngineConfig;

/// A configuration value that could not be parsed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be {expected}, got '{value}'")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Executor and rollback policy handed to the engine.
    pub engine: EngineConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default                 |
    /// |----------------------------------|-------------------------|
    /// | `HOST`                           | `0.0.0.0`               |
    /// | `PORT`                           | `3000`                  |
    /// | `CORS_ORIGINS`                   | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`           | `30`                    |
    /// | `EXECUTION_MAX_CONCURRENCY`      | `1`                     |
    /// | `ROLLBACK_HIGH_IMPACT_THRESHOLD` | `100000000`             |
    /// | `ROLLBACK_MEDIUM_AGE_DAYS`       | `7`                     |
    /// | `ROLLBACK_HIGH_AGE_DAYS`         | `14`                    |
    /// | `ROLLBACK_SECS_PER_ITEM`         | `2`                     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let policy = RollbackPolicy::default();

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parse(&lookup, "PORT", 3000u16, "a valid u16")?;

        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        for origin in &cors_origins {
            if origin.parse::<axum::http::HeaderValue>().is_err() {
                return Err(ConfigError::Invalid {
                    key: "CORS_ORIGINS",
                    value: origin.clone(),
                    expected: "a list of valid origins",
                });
            }
        }

        let request_timeout_secs =
            parse(&lookup, "REQUEST_TIMEOUT_SECS", 30u64, "a valid u64")?;

        let engine = EngineConfig {
            max_concurrency: parse(
                &lookup,
                "EXECUTION_MAX_CONCURRENCY",
                EngineConfig::default().max_concurrency,
                "a positive integer",
            )?,
            rollback: RollbackPolicy {
                high_impact_threshold: parse(
                    &lookup,
                    "ROLLBACK_HIGH_IMPACT_THRESHOLD",
                    policy.high_impact_threshold,
                    "a number",
                )?,
                medium_age_days: parse(
                    &lookup,
                    "ROLLBACK_MEDIUM_AGE_DAYS",
                    policy.medium_age_days,
                    "a whole number of days",
                )?,
                high_age_days: parse(
                    &lookup,
                    "ROLLBACK_HIGH_AGE_DAYS",
                    policy.high_age_days,
                    "a whole number of days",
                )?,
                secs_per_item: parse(
                    &lookup,
                    "ROLLBACK_SECS_PER_ITEM",
                    policy.secs_per_item,
                    "a whole number of seconds",
                )?,
            },
        };

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            engine,
        })
    }
}

fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            value,
            expected,
        }),
    }
}
