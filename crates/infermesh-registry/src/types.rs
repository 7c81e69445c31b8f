//! Registry data model: agent records, payloads, and tuning knobs.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Observable status of a registered agent.
///
/// Heartbeat pressure moves agents between `Healthy` and `Degraded`; the
/// circuit breaker moves them between `Offline` and `HalfOpen`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Fully operational; eligible for scheduling.
    Healthy,
    /// Under resource pressure but still operational; scored with a penalty.
    Degraded,
    /// Circuit breaker probing recovery; limited traffic allowed.
    HalfOpen,
    /// Circuit breaker open; no traffic until the retry timer fires.
    Offline,
}

impl AgentStatus {
    /// True if new work may be routed to an agent in this status.
    #[must_use]
    pub const fn is_routable(self) -> bool {
        matches!(self, Self::Healthy | Self::Degraded | Self::HalfOpen)
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::HalfOpen => "half_open",
            Self::Offline => "offline",
        };
        f.write_str(s)
    }
}

/// Registration payload sent by an agent when it joins the mesh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRegistration {
    /// Agent-supplied unique id.
    pub agent_id: String,
    /// `host:port` clients use to stream inference traffic; opaque here.
    pub endpoint: String,
    /// Total VRAM capacity in MB.
    #[serde(default)]
    pub total_vram_mb: i64,
    /// Total RAM capacity in MB.
    #[serde(default)]
    pub total_ram_mb: i64,
    /// Declared concurrency cap.
    #[serde(default)]
    pub max_jobs: i32,
    /// Models the agent can serve; empty means "any model".
    #[serde(default)]
    pub supported_models: Vec<String>,
    /// Opaque agent metadata, propagated unchanged.
    #[serde(default)]
    pub capabilities: HashMap<String, String>,
}

/// One heartbeat message from an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heartbeat {
    /// The reporting agent.
    pub agent_id: String,
    /// Free VRAM in MB.
    pub free_vram_mb: i64,
    /// Free RAM in MB.
    pub free_ram_mb: i64,
    /// Jobs currently executing.
    pub running_jobs: i32,
    /// Jobs queued on the agent.
    pub queued_jobs: i32,
    /// CPU utilization, 0-100.
    pub cpu_percent: f64,
    /// Agent-measured round-trip time to the coordinator, in ms.
    pub rtt_ms: f64,
    /// Agent-side unix timestamp of the sample; informational only.
    #[serde(default)]
    pub timestamp: i64,
}

/// Full record for one registered agent.
///
/// All registry reads return clones of this record, so holders never
/// observe (or cause) concurrent mutation of registry state.
#[derive(Debug, Clone, Serialize)]
pub struct AgentRecord {
    /// Agent-supplied unique id; the registry key.
    pub id: String,
    /// `host:port` clients use to stream inference traffic.
    pub endpoint: String,
    /// Total VRAM capacity in MB.
    pub total_vram_mb: i64,
    /// Total RAM capacity in MB.
    pub total_ram_mb: i64,
    /// Declared concurrency cap.
    pub max_jobs: i32,
    /// Models the agent can serve; empty means "any model".
    pub supported_models: Vec<String>,
    /// Opaque agent metadata.
    pub capabilities: HashMap<String, String>,

    /// Free VRAM in MB, from the latest heartbeat.
    pub free_vram_mb: i64,
    /// Free RAM in MB, from the latest heartbeat.
    pub free_ram_mb: i64,
    /// Jobs currently executing, from the latest heartbeat.
    pub running_jobs: i32,
    /// Jobs queued on the agent, from the latest heartbeat.
    pub queued_jobs: i32,
    /// CPU utilization 0-100, from the latest heartbeat.
    pub cpu_percent: f64,
    /// Round-trip time in ms, from the latest heartbeat.
    pub rtt_ms: f64,
    /// When the latest heartbeat was applied.
    pub last_heartbeat: DateTime<Utc>,
    /// When the agent registered.
    pub registered_at: DateTime<Utc>,

    /// Collapsed liveness/health/circuit status.
    pub status: AgentStatus,
    /// Consecutive failures recorded against the agent.
    pub failure_count: i32,
    /// Consecutive successes recorded for the agent.
    pub success_count: i32,
    /// When the last failure was recorded.
    pub last_failure_time: Option<DateTime<Utc>>,
    /// When the circuit breaker next changes state on its own.
    pub next_retry_time: Option<DateTime<Utc>>,
}

impl AgentRecord {
    /// VRAM utilization in `[0, 1]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn vram_utilization(&self) -> f64 {
        let total = self.total_vram_mb.max(1) as f64;
        (self.total_vram_mb - self.free_vram_mb) as f64 / total
    }
}

/// Circuit breaker tuning. The defaults are part of the contract.
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    /// Failures before the circuit opens.
    pub failure_threshold: i32,
    /// Time spent open before probing recovery.
    pub recovery_timeout: Duration,
    /// Successes needed to close a half-open circuit.
    pub success_threshold: i32,
    /// Maximum time in the half-open state before reopening.
    pub half_open_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 2,
            half_open_timeout: Duration::from_secs(10),
        }
    }
}

/// Registry tuning.
#[derive(Debug, Clone, Copy)]
pub struct RegistryConfig {
    /// Heartbeat age past which an agent is considered dead and removed.
    pub heartbeat_timeout: Duration,
    /// Period of the background cleanup tick.
    pub cleanup_interval: Duration,
    /// Circuit breaker thresholds and timers.
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout: Duration::from_secs(30),
            cleanup_interval: Duration::from_secs(60),
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

/// Aggregate agent counts.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RegistryStats {
    /// All registered agents.
    pub total: usize,
    /// Agents currently in `Healthy` status.
    pub healthy: usize,
}
