use std::{env, time::Duration};

use anyhow::{Context, Result};

pub const DEFAULT_API_URL: &str = "https://economia.awesomeapi.com.br/json/last/USD-BRL";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub api_url: String,
    pub database_url: String,
    /// Bound for the whole `/cotacao` request.
    pub total_timeout: Duration,
    pub fetch_timeout: Duration,
    pub persist_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            database_url: "sqlite://cotacoes.db".to_string(),
            total_timeout: Duration::from_millis(250),
            fetch_timeout: Duration::from_millis(200),
            persist_timeout: Duration::from_millis(10),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            bind: lookup("COTACAO_BIND").unwrap_or(defaults.bind),
            api_url: lookup("COTACAO_API_URL").unwrap_or(defaults.api_url),
            database_url: lookup("COTACAO_DATABASE_URL").unwrap_or(defaults.database_url),
            total_timeout: millis(&lookup, "COTACAO_TOTAL_TIMEOUT_MS", defaults.total_timeout)?,
            fetch_timeout: millis(&lookup, "COTACAO_FETCH_TIMEOUT_MS", defaults.fetch_timeout)?,
            persist_timeout: millis(
                &lookup,
                "COTACAO_PERSIST_TIMEOUT_MS",
                defaults.persist_timeout,
            )?,
        };
        config.validate()?;

        Ok(config)
    }

    /// Deadlines must shrink at every hop: total > fetch > persist.
    pub fn validate(&self) -> Result<()> {
        if self.persist_timeout.is_zero() {
            anyhow::bail!("Persist timeout must be greater than zero");
        }
        if self.fetch_timeout <= self.persist_timeout {
            anyhow::bail!(
                "Fetch timeout ({:?}) must be longer than persist timeout ({:?})",
                self.fetch_timeout,
                self.persist_timeout
            );
        }
        if self.total_timeout <= self.fetch_timeout {
            anyhow::bail!(
                "Total timeout ({:?}) must be longer than fetch timeout ({:?})",
                self.total_timeout,
                self.fetch_timeout
            );
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: String,
    pub timeout: Duration,
    pub output: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080/cotacao".to_string(),
            timeout: Duration::from_millis(300),
            output: "cotacao.txt".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let timeout = millis(&lookup, "COTACAO_CLIENT_TIMEOUT_MS", defaults.timeout)?;
        if timeout.is_zero() {
            anyhow::bail!("Client timeout must be greater than zero");
        }

        Ok(Self {
            server_url: lookup("COTACAO_SERVER_URL").unwrap_or(defaults.server_url),
            timeout,
            output: lookup("COTACAO_OUTPUT").unwrap_or(defaults.output),
        })
    }
}

fn millis(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Result<Duration> {
    match lookup(key) {
        Some(value) => {
            let ms = value.trim().parse::<u64>().with_context(|| {
                format!("{} must be a number of milliseconds, got {:?}", key, value)
            })?;
            Ok(Duration::from_millis(ms))
        }
        None => Ok(default),
    }
}
