//! Coordinator configuration.
//!
//! All durations accept strings like `30s`, `5m`, or `1h` from the
//! environment; defaults match the documented contract.

use std::time::Duration;

use infermesh_auth::TokenConfig;
use infermesh_registry::{CircuitBreakerConfig, RegistryConfig};
use infermesh_scheduler::McdaWeights;

/// Configuration for the coordinator process.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Port for the control-plane listener.
    pub coordinator_port: u16,
    /// Port for the REST-compatible client listener.
    pub http_port: u16,
    /// Heartbeat age past which an agent is considered dead.
    pub heartbeat_timeout: Duration,
    /// Session-token lifetime.
    pub token_ttl: Duration,
    /// Period of the registry cleanup tick.
    pub cleanup_interval: Duration,
    /// MCDA scoring weights.
    pub weights: McdaWeights,
    /// Circuit-breaker thresholds and timers.
    pub circuit_breaker: CircuitBreakerConfig,
    /// Per-request timeout; also bounds the shutdown drain.
    pub request_timeout: Duration,
    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            coordinator_port: 50051,
            http_port: 8080,
            heartbeat_timeout: Duration::from_secs(30),
            token_ttl: Duration::from_secs(120),
            cleanup_interval: Duration::from_secs(60),
            weights: McdaWeights::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            request_timeout: Duration::from_secs(30),
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl CoordinatorConfig {
    /// Load configuration from the environment, falling back to defaults.
    ///
    /// Recognized variables: `COORDINATOR_PORT`, `COORDINATOR_HTTP_PORT`,
    /// `HEARTBEAT_TIMEOUT`, `TOKEN_TTL`, `CLEANUP_INTERVAL`. Unparseable
    /// values are ignored with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(port) = env_parsed("COORDINATOR_PORT") {
            config.coordinator_port = port;
        }
        if let Some(port) = env_parsed("COORDINATOR_HTTP_PORT") {
            config.http_port = port;
        }
        if let Some(timeout) = env_duration("HEARTBEAT_TIMEOUT") {
            config.heartbeat_timeout = timeout;
        }
        if let Some(ttl) = env_duration("TOKEN_TTL") {
            config.token_ttl = ttl;
        }
        if let Some(interval) = env_duration("CLEANUP_INTERVAL") {
            config.cleanup_interval = interval;
        }

        config
    }

    /// Registry configuration derived from this config.
    #[must_use]
    pub const fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            heartbeat_timeout: self.heartbeat_timeout,
            cleanup_interval: self.cleanup_interval,
            circuit_breaker: self.circuit_breaker,
        }
    }

    /// Signing-authority configuration derived from this config.
    #[must_use]
    pub fn token_config(&self) -> TokenConfig {
        TokenConfig {
            token_ttl: self.token_ttl,
            ..TokenConfig::default()
        }
    }

    /// Heartbeat interval suggested to agents at registration.
    #[must_use]
    pub const fn suggested_heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout.as_secs() / 2)
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable configuration value");
            None
        }
    }
}

fn env_duration(key: &str) -> Option<Duration> {
    let raw = std::env::var(key).ok()?;
    match parse_duration(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(key, value = %raw, error = %err, "Ignoring unparseable duration");
            None
        }
    }
}

/// Parse a duration string like `30s`, `5m`, or `1h`.
///
/// A bare number is taken as seconds.
///
/// # Errors
///
/// Returns a description of the problem for empty strings, non-numeric
/// prefixes, and unknown suffixes.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let (num_str, suffix) = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or((s, ""), |(i, _)| (&s[..i], &s[i..]));

    let num: u64 = num_str
        .parse()
        .map_err(|_| format!("invalid number in duration: {s}"))?;

    let multiplier = match suffix.trim() {
        "ms" => return Ok(Duration::from_millis(num)),
        "" | "s" | "sec" | "secs" => 1,
        "m" | "min" | "mins" => 60,
        "h" | "hr" | "hrs" => 3600,
        other => return Err(format!("unknown duration suffix: {other}")),
    };

    Ok(Duration::from_secs(num * multiplier))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.coordinator_port, 50051);
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.heartbeat_timeout, Duration::from_secs(30));
        assert_eq!(config.cleanup_interval, Duration::from_secs(60));
        assert!(config.token_ttl >= Duration::from_secs(60));
        assert!(config.token_ttl <= Duration::from_secs(300));
    }

    #[test]
    fn suggested_interval_is_half_the_timeout() {
        let config = CoordinatorConfig::default();
        assert_eq!(
            config.suggested_heartbeat_interval(),
            Duration::from_secs(15)
        );
    }

    #[test]
    fn parse_duration_accepts_common_forms() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("45").unwrap(), Duration::from_secs(45));
    }

    #[test]
    fn parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("fast").is_err());
        assert!(parse_duration("10parsecs").is_err());
    }

    #[test]
    fn derived_configs_carry_values_through() {
        let config = CoordinatorConfig {
            heartbeat_timeout: Duration::from_secs(20),
            token_ttl: Duration::from_secs(90),
            ..CoordinatorConfig::default()
        };
        assert_eq!(
            config.registry_config().heartbeat_timeout,
            Duration::from_secs(20)
        );
        assert_eq!(config.token_config().token_ttl, Duration::from_secs(90));
    }
}
