//! Server configuration read from the environment.

use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;
use crate::state::EdgeSettings;

/// Default pool size for the checkpoint store.
const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default limit on a single narration call.
const DEFAULT_NARRATION_TIMEOUT_SECS: u64 = 20;

/// Default number of events queued per connection before it is dropped.
const DEFAULT_CONNECTION_BUFFER: usize = 64;

/// Runtime configuration for the API server.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres URL of the checkpoint store.
    pub database_url: String,
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Maximum pooled database connections.
    pub database_max_connections: u32,
    /// Narration service endpoint; narration is disabled when unset.
    pub narrator_url: Option<String>,
    /// Upper bound on one narration call.
    pub narration_timeout: Duration,
    /// Outbound queue capacity per live connection.
    pub connection_buffer: usize,
    /// OTLP collector endpoint; span export is disabled when unset.
    pub otlp_endpoint: Option<String>,
}

impl Config {
    /// Reads configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or a numeric
    /// variable does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| AppError::Config("DATABASE_URL environment variable must be set".into()))?;

        Ok(Self {
            database_url,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_var(&lookup, "PORT", 3000)?,
            database_max_connections: parse_var(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_DATABASE_MAX_CONNECTIONS,
            )?,
            narrator_url: non_empty(lookup("NARRATOR_URL")),
            narration_timeout: Duration::from_secs(parse_var(
                &lookup,
                "NARRATION_TIMEOUT_SECS",
                DEFAULT_NARRATION_TIMEOUT_SECS,
            )?),
            connection_buffer: parse_var(&lookup, "CONNECTION_BUFFER", DEFAULT_CONNECTION_BUFFER)?
                .max(1),
            otlp_endpoint: non_empty(lookup("OTEL_EXPORTER_OTLP_ENDPOINT")),
        })
    }

    /// Socket address to listen on.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `HOST:PORT` is not a valid address.
    pub fn bind_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }

    /// Limits applied by the HTTP/WS edge.
    #[must_use]
    pub fn edge_settings(&self) -> EdgeSettings {
        EdgeSettings {
            narration_timeout: self.narration_timeout,
            connection_buffer: self.connection_buffer,
        }
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} is invalid: {e}"))),
        None => Ok(default),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
