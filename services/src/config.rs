use roster_utils::version_info::RuntimeEnv;
use serde::Deserialize;
use std::env::vars;
use std::fmt::Display;
use tracing::info;

use crate::table::QueryLimits;

#[derive(Debug, Clone, Deserialize)]
pub enum Env {
    #[serde(rename = "local")]
    Local,
    #[serde(rename = "test")]
    Test,
    #[serde(rename = "prod")]
    Prod,
}

impl From<&Env> for RuntimeEnv {
    fn from(env: &Env) -> Self {
        match env {
            Env::Local => RuntimeEnv::Local,
            Env::Test => RuntimeEnv::Test,
            Env::Prod => RuntimeEnv::Prod,
        }
    }
}

impl Display for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Env::Local => write!(f, "local"),
            Env::Test => write!(f, "test"),
            Env::Prod => write!(f, "prod"),
        }
    }
}

/// Where filtering, ordering and paging of the listing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum QueryStrategy {
    /// Translate the query into SQL.
    #[default]
    #[serde(rename = "pushdown")]
    Pushdown,
    /// Fetch every row, then evaluate the query in process.
    #[serde(rename = "in-memory")]
    InMemory,
}

impl Display for QueryStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryStrategy::Pushdown => write!(f, "pushdown"),
            QueryStrategy::InMemory => write!(f, "in-memory"),
        }
    }
}

// The final, validated configuration struct.
#[derive(Debug, Clone)]
pub struct Config {
    env: Env,
    database_url: String,
    server_addr: String,
    port: u16,
    // Project id for Cloud Trace, only needed outside local
    google_cloud_project: Option<String>,
    jwt_secret: String,
    query_limits: QueryLimits,
    query_strategy: QueryStrategy,
}

// Environment variables as read, before defaults are applied.
#[derive(Deserialize)]
struct RawConfig {
    env: Env,
    database_url: String,
    server_addr: Option<String>,
    port: Option<u16>,
    google_cloud_project: Option<String>,
    jwt_secret: Option<String>,
    max_page_size: Option<u32>,
    default_page_size: Option<u32>,
    search_max_len: Option<usize>,
    query_strategy: Option<QueryStrategy>,
}

impl Config {
    /// Create a test configuration with default values.
    ///
    /// This function is available for both unit tests and integration tests.
    /// It should not be used in production code.
    pub fn new_for_test() -> Self {
        Self {
            env: Env::Local,
            database_url: "postgres://localhost:5432/test".to_string(),
            server_addr: "127.0.0.1".to_string(),
            port: 8080,
            google_cloud_project: None,
            jwt_secret: "test-jwt-secret-key-for-local-development".to_string(),
            query_limits: QueryLimits::default(),
            query_strategy: QueryStrategy::default(),
        }
    }

    /// Replace the session signing secret.
    pub fn with_jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.jwt_secret = secret.into();
        self
    }

    /// Replace the listing limits.
    pub fn with_query_limits(mut self, limits: QueryLimits) -> Self {
        self.query_limits = limits;
        self
    }

    pub fn environment(&self) -> &Env {
        &self.env
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_local(&self) -> bool {
        matches!(self.env, Env::Local)
    }

    pub fn google_cloud_project(&self) -> Option<&str> {
        self.google_cloud_project.as_deref()
    }

    /// Get the JWT secret for verifying session tokens.
    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    pub fn query_limits(&self) -> QueryLimits {
        self.query_limits
    }

    pub fn query_strategy(&self) -> QueryStrategy {
        self.query_strategy
    }

    /// Initializes configuration by reading from environment variables
    /// and applying environment-aware defaults.
    pub fn init() -> anyhow::Result<Self> {
        info!("Loading configuration from environment variables");

        let raw_config: RawConfig = serde_env::from_iter(vars())?;
        Self::from_raw(raw_config)
    }

    fn from_raw(raw_config: RawConfig) -> anyhow::Result<Self> {
        let RawConfig {
            env,
            database_url,
            server_addr,
            port,
            google_cloud_project,
            jwt_secret,
            max_page_size,
            default_page_size,
            search_max_len,
            query_strategy,
        } = raw_config;

        let server_addr = match server_addr {
            Some(addr) => {
                info!("Using provided SERVER_ADDR: {}", addr);
                addr
            }
            None => {
                let default_addr = match env {
                    Env::Local => "127.0.0.1",
                    _ => "0.0.0.0",
                };
                info!(
                    "SERVER_ADDR not set, defaulting to {} for {} environment",
                    default_addr, env
                );
                default_addr.to_string()
            }
        };

        let port = match port {
            Some(port) => port,
            None if matches!(env, Env::Local) => {
                info!("PORT not set, defaulting to 8080 for local environment");
                8080
            }
            None => anyhow::bail!("PORT must be set for {} environment", env),
        };

        // JWT secret is required for production, optional for local/test
        let jwt_secret = match jwt_secret {
            Some(secret) => secret,
            None if matches!(env, Env::Local | Env::Test) => {
                info!("JWT_SECRET not set, using default for {} environment", env);
                "default-jwt-secret-for-local-development-only".to_string()
            }
            None => anyhow::bail!("JWT_SECRET must be set for {} environment", env),
        };

        if matches!(env, Env::Prod) && google_cloud_project.is_none() {
            anyhow::bail!("GOOGLE_CLOUD_PROJECT must be set for {} environment", env);
        }

        let defaults = QueryLimits::default();
        let max_page_size = max_page_size.unwrap_or(defaults.max_page_size);
        if max_page_size == 0 {
            anyhow::bail!("MAX_PAGE_SIZE must be at least 1");
        }
        let default_page_size = default_page_size.unwrap_or(defaults.default_page_size);
        if default_page_size == 0 || default_page_size > max_page_size {
            anyhow::bail!(
                "DEFAULT_PAGE_SIZE must be between 1 and MAX_PAGE_SIZE ({}), got {}",
                max_page_size,
                default_page_size
            );
        }
        let search_max_len = search_max_len.unwrap_or(defaults.search_max_len);
        if search_max_len == 0 {
            anyhow::bail!("SEARCH_MAX_LEN must be at least 1");
        }

        let query_strategy = query_strategy.unwrap_or_default();
        info!("Listing queries use the {} strategy", query_strategy);

        Ok(Config {
            env,
            database_url,
            server_addr,
            port,
            google_cloud_project,
            jwt_secret,
            query_limits: QueryLimits {
                max_page_size,
                default_page_size,
                search_max_len,
            },
            query_strategy,
        })
    }
}
