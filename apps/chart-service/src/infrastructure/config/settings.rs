//! Service Configuration Settings
//!
//! Configuration types for the chart service, loaded from environment
//! variables.

use std::path::Path;

use crate::domain::subscription::DuplicatePolicy;
use crate::domain::symbol::SymbolRegistry;

/// Server port settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// gRPC server port.
    pub grpc_port: u16,
    /// Health check HTTP port (0 = disabled).
    pub health_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            grpc_port: 50051,
            health_port: 8081,
        }
    }
}

/// Per-call stream settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSettings {
    /// Capacity of the per-call response channel.
    pub buffer: usize,
    /// Handling of repeated symbols in one request.
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            buffer: 64,
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

/// Synthetic price generator settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratorSettings {
    /// Lowest opening price.
    pub base_price_min: f64,
    /// Highest opening price.
    pub base_price_max: f64,
    /// Maximum close/wick distance as a fraction of the open.
    pub max_spread_pct: f64,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            base_price_min: 10.0,
            base_price_max: 500.0,
            max_spread_pct: 0.02,
        }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServiceConfig {
    /// Server port settings.
    pub server: ServerSettings,
    /// Stream settings.
    pub stream: StreamSettings,
    /// Generator settings.
    pub generator: GeneratorSettings,
    /// Recognized symbols; `None` uses the built-in list.
    pub symbols: Option<Vec<String>>,
}

impl ServiceConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but unusable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from a dotenv-style file, ignoring the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a value is unusable.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let entries = dotenvy::from_path_iter(path)
            .map_err(|e| ConfigError::EnvFile(format!("{}: {e}", path.display())))?
            .collect::<Result<std::collections::HashMap<_, _>, _>>()
            .map_err(|e| ConfigError::EnvFile(format!("{}: {e}", path.display())))?;

        Self::from_lookup(|key| entries.get(key).cloned())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but unusable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let server = ServerSettings {
            grpc_port: parse_u16(&lookup, "CHART_SERVICE_GRPC_PORT", defaults.server.grpc_port),
            health_port: parse_u16(
                &lookup,
                "CHART_SERVICE_HEALTH_PORT",
                defaults.server.health_port,
            ),
        };

        let duplicate_policy = match lookup("CHART_SERVICE_DUPLICATE_POLICY") {
            Some(value) => DuplicatePolicy::parse(&value)
                .ok_or_else(|| ConfigError::invalid("CHART_SERVICE_DUPLICATE_POLICY", &value))?,
            None => defaults.stream.duplicate_policy,
        };

        let stream = StreamSettings {
            buffer: parse_usize(&lookup, "CHART_SERVICE_STREAM_BUFFER", defaults.stream.buffer)
                .max(1),
            duplicate_policy,
        };

        let generator = GeneratorSettings {
            base_price_min: parse_f64(
                &lookup,
                "CHART_SERVICE_BASE_PRICE_MIN",
                defaults.generator.base_price_min,
            )?,
            base_price_max: parse_f64(
                &lookup,
                "CHART_SERVICE_BASE_PRICE_MAX",
                defaults.generator.base_price_max,
            )?,
            max_spread_pct: parse_f64(
                &lookup,
                "CHART_SERVICE_MAX_SPREAD_PCT",
                defaults.generator.max_spread_pct,
            )?,
        };

        if !(generator.base_price_min >= 0.0 && generator.base_price_min < generator.base_price_max)
        {
            return Err(ConfigError::invalid(
                "CHART_SERVICE_BASE_PRICE_MIN",
                &generator.base_price_min.to_string(),
            ));
        }
        if !(generator.max_spread_pct > 0.0 && generator.max_spread_pct < 1.0) {
            return Err(ConfigError::invalid(
                "CHART_SERVICE_MAX_SPREAD_PCT",
                &generator.max_spread_pct.to_string(),
            ));
        }

        let symbols = match lookup("CHART_SERVICE_SYMBOLS") {
            Some(value) => {
                let list: Vec<String> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_uppercase)
                    .collect();
                if list.is_empty() {
                    return Err(ConfigError::EmptyValue("CHART_SERVICE_SYMBOLS".to_string()));
                }
                Some(list)
            }
            None => None,
        };

        Ok(Self {
            server,
            stream,
            generator,
            symbols,
        })
    }

    /// Build the symbol registry this configuration describes.
    #[must_use]
    pub fn registry(&self) -> SymbolRegistry {
        self.symbols
            .as_ref()
            .map_or_else(SymbolRegistry::default, |symbols| {
                SymbolRegistry::with_symbols(symbols.iter().map(String::as_str))
            })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable has a value outside its accepted range.
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Rejected value.
        value: String,
    },
    /// Env file could not be read or parsed.
    #[error("failed to load env file {0}")]
    EnvFile(String),
}

impl ConfigError {
    fn invalid(key: &str, value: &str) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

fn parse_u16<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: u16) -> u16 {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_usize<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: usize) -> usize {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_f64<F: Fn(&str) -> Option<String>>(
    lookup: &F,
    key: &str,
    default: f64,
) -> Result<f64, ConfigError> {
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ConfigError::invalid(key, &value)),
        None => Ok(default),
    }
}
