//! The in-memory registry implementation.
//!
//! A single `RwLock` protects the agent map. All status transitions are
//! computed inside the write lock, so observers never see inconsistent
//! `(status, failure_count, next_retry_time)` tuples. Reads return clones.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration as TimeDelta;
use infermesh_core::Clock;
use tokio::sync::RwLock;

use crate::error::{RegistryError, Result};
use crate::types::{
    AgentRecord, AgentRegistration, AgentStatus, Heartbeat, RegistryConfig, RegistryStats,
};

/// Trait defining the agent registry operations.
///
/// This is the seam the scheduler and the surface depend on; tests can
/// substitute a fake without standing up the real registry.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Register an agent, replacing any prior record under the same id.
    ///
    /// Replacement resets the circuit-breaker counters.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::InvalidRegistration` if the payload fails
    /// validation.
    async fn register(&self, registration: AgentRegistration) -> Result<AgentRecord>;

    /// Remove an agent from the registry.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` if the id is unknown.
    async fn deregister(&self, agent_id: &str) -> Result<()>;

    /// Apply a heartbeat to an agent's runtime metrics.
    ///
    /// Out-of-range metrics are clamped and logged. Pressure transitions
    /// between `Healthy` and `Degraded` are applied here; heartbeats never
    /// move a record out of `Offline` or `HalfOpen`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` if the id is unknown.
    async fn update_health(&self, heartbeat: &Heartbeat) -> Result<()>;

    /// Get a copy of a single agent record.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` if the id is unknown.
    async fn get_agent(&self, agent_id: &str) -> Result<AgentRecord>;

    /// Snapshot of all agents currently in `Healthy` status.
    async fn list_healthy_agents(&self) -> Vec<AgentRecord>;

    /// Snapshot of all agents regardless of status.
    async fn list_all_agents(&self) -> Vec<AgentRecord>;

    /// Aggregate agent counts.
    async fn get_stats(&self) -> RegistryStats;

    /// Record a successful operation against an agent's circuit breaker.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` if the id is unknown.
    async fn record_success(&self, agent_id: &str) -> Result<()>;

    /// Record a failed operation against an agent's circuit breaker.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` if the id is unknown.
    async fn record_failure(&self, agent_id: &str) -> Result<()>;

    /// Current circuit state (the collapsed status) of an agent.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` if the id is unknown.
    async fn get_circuit_state(&self, agent_id: &str) -> Result<AgentStatus>;
}

/// In-memory [`Registry`] implementation.
pub struct InMemoryRegistry {
    agents: RwLock<HashMap<String, AgentRecord>>,
    clock: Arc<dyn Clock>,
    config: RegistryConfig,
    heartbeat_timeout: TimeDelta,
    recovery_timeout: TimeDelta,
    half_open_timeout: TimeDelta,
}

fn to_delta(d: std::time::Duration) -> TimeDelta {
    TimeDelta::from_std(d).unwrap_or(TimeDelta::MAX)
}

impl InMemoryRegistry {
    /// Create a registry with the given configuration and clock.
    #[must_use]
    pub fn new(config: RegistryConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
            clock,
            config,
            heartbeat_timeout: to_delta(config.heartbeat_timeout),
            recovery_timeout: to_delta(config.circuit_breaker.recovery_timeout),
            half_open_timeout: to_delta(config.circuit_breaker.half_open_timeout),
        }
    }

    /// Apply one cleanup tick.
    ///
    /// Heartbeat-death removals and timer-driven circuit transitions share
    /// one write-lock critical section so observers never see torn state.
    /// The tick is idempotent.
    pub async fn run_cleanup(&self) {
        let now = self.clock.now();
        let mut agents = self.agents.write().await;

        let mut dead = Vec::new();
        for (id, agent) in agents.iter_mut() {
            // Heartbeat death is terminal; re-registration is required.
            if now - agent.last_heartbeat > self.heartbeat_timeout {
                agent.status = AgentStatus::Offline;
                dead.push(id.clone());
                continue;
            }

            match agent.status {
                AgentStatus::Offline => {
                    if agent.next_retry_time.is_some_and(|t| now >= t) {
                        agent.status = AgentStatus::HalfOpen;
                        agent.next_retry_time = Some(now + self.half_open_timeout);
                        tracing::info!(
                            agent_id = %agent.id,
                            "Circuit breaker half-open, probing recovery"
                        );
                    }
                }
                AgentStatus::HalfOpen => {
                    if agent.next_retry_time.is_some_and(|t| now >= t) {
                        agent.status = AgentStatus::Offline;
                        agent.next_retry_time = Some(now + self.recovery_timeout);
                        tracing::warn!(
                            agent_id = %agent.id,
                            "Half-open window expired, circuit breaker reopened"
                        );
                    }
                }
                AgentStatus::Degraded => {
                    if agent.free_vram_mb > 2048 && agent.cpu_percent < 80.0 {
                        agent.status = AgentStatus::Healthy;
                        agent.failure_count = 0;
                        tracing::info!(
                            agent_id = %agent.id,
                            "Agent recovered from degraded state"
                        );
                    }
                }
                AgentStatus::Healthy => {}
            }
        }

        for id in &dead {
            agents.remove(id);
            tracing::warn!(agent_id = %id, "Agent removed after missed heartbeats");
        }
        if !dead.is_empty() {
            tracing::info!(removed = dead.len(), "Cleanup tick completed");
        }
    }

    /// Drive [`run_cleanup`](Self::run_cleanup) on the configured interval.
    ///
    /// Spawn this once from the construction root; it never returns.
    pub async fn run_cleanup_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.cleanup_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.run_cleanup().await;
        }
    }

    fn validate(registration: &AgentRegistration) -> Result<()> {
        if registration.agent_id.is_empty() {
            return Err(RegistryError::InvalidRegistration(
                "agent_id is required".into(),
            ));
        }
        if registration.endpoint.is_empty() {
            return Err(RegistryError::InvalidRegistration(
                "endpoint is required".into(),
            ));
        }
        if registration.total_vram_mb < 0
            || registration.total_ram_mb < 0
            || registration.max_jobs < 0
        {
            return Err(RegistryError::InvalidRegistration(
                "capacities must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

fn clamp_i64(agent_id: &str, field: &'static str, value: i64, max: i64) -> i64 {
    let clamped = value.clamp(0, max.max(0));
    if clamped != value {
        tracing::warn!(
            agent_id = %agent_id,
            field,
            reported = value,
            clamped,
            "Heartbeat metric out of range, clamped"
        );
    }
    clamped
}

fn clamp_i32(agent_id: &str, field: &'static str, value: i32, max: i32) -> i32 {
    let clamped = value.clamp(0, max.max(0));
    if clamped != value {
        tracing::warn!(
            agent_id = %agent_id,
            field,
            reported = value,
            clamped,
            "Heartbeat metric out of range, clamped"
        );
    }
    clamped
}

#[async_trait]
impl Registry for InMemoryRegistry {
    async fn register(&self, registration: AgentRegistration) -> Result<AgentRecord> {
        Self::validate(&registration)?;

        let now = self.clock.now();
        let record = AgentRecord {
            id: registration.agent_id,
            endpoint: registration.endpoint,
            total_vram_mb: registration.total_vram_mb,
            total_ram_mb: registration.total_ram_mb,
            max_jobs: registration.max_jobs,
            supported_models: registration.supported_models,
            capabilities: registration.capabilities,
            free_vram_mb: registration.total_vram_mb,
            free_ram_mb: registration.total_ram_mb,
            running_jobs: 0,
            queued_jobs: 0,
            cpu_percent: 0.0,
            rtt_ms: 0.0,
            last_heartbeat: now,
            registered_at: now,
            status: AgentStatus::Healthy,
            failure_count: 0,
            success_count: 0,
            last_failure_time: None,
            next_retry_time: None,
        };

        let mut agents = self.agents.write().await;
        let replaced = agents.insert(record.id.clone(), record.clone()).is_some();

        tracing::info!(
            agent_id = %record.id,
            endpoint = %record.endpoint,
            total_vram_mb = record.total_vram_mb,
            max_jobs = record.max_jobs,
            replaced,
            "Agent registered"
        );

        Ok(record)
    }

    async fn deregister(&self, agent_id: &str) -> Result<()> {
        let mut agents = self.agents.write().await;
        if agents.remove(agent_id).is_none() {
            return Err(RegistryError::NotFound(agent_id.to_string()));
        }
        tracing::info!(agent_id = %agent_id, "Agent deregistered");
        Ok(())
    }

    async fn update_health(&self, heartbeat: &Heartbeat) -> Result<()> {
        let now = self.clock.now();
        let mut agents = self.agents.write().await;
        let agent = agents
            .get_mut(&heartbeat.agent_id)
            .ok_or_else(|| RegistryError::NotFound(heartbeat.agent_id.clone()))?;

        agent.free_vram_mb = clamp_i64(
            &agent.id,
            "free_vram_mb",
            heartbeat.free_vram_mb,
            agent.total_vram_mb,
        );
        agent.free_ram_mb = clamp_i64(
            &agent.id,
            "free_ram_mb",
            heartbeat.free_ram_mb,
            agent.total_ram_mb,
        );
        agent.running_jobs = clamp_i32(
            &agent.id,
            "running_jobs",
            heartbeat.running_jobs,
            agent.max_jobs,
        );
        agent.queued_jobs = clamp_i32(&agent.id, "queued_jobs", heartbeat.queued_jobs, i32::MAX);
        agent.cpu_percent = heartbeat.cpu_percent;
        agent.rtt_ms = heartbeat.rtt_ms;
        agent.last_heartbeat = now;

        // Pressure transitions apply only to healthy/degraded records.
        if matches!(agent.status, AgentStatus::Healthy | AgentStatus::Degraded) {
            let vram_util = agent.vram_utilization();
            if vram_util > 0.9 || agent.cpu_percent > 90.0 || agent.free_vram_mb < 512 {
                if agent.status == AgentStatus::Healthy {
                    agent.status = AgentStatus::Degraded;
                    tracing::warn!(
                        agent_id = %agent.id,
                        vram_util,
                        cpu_percent = agent.cpu_percent,
                        free_vram_mb = agent.free_vram_mb,
                        "Agent degraded under resource pressure"
                    );
                }
            } else if agent.status == AgentStatus::Degraded
                && vram_util < 0.7
                && agent.cpu_percent < 70.0
            {
                agent.status = AgentStatus::Healthy;
                agent.failure_count = 0;
                tracing::info!(agent_id = %agent.id, "Agent recovered to healthy");
            }
        }

        Ok(())
    }

    async fn get_agent(&self, agent_id: &str) -> Result<AgentRecord> {
        let agents = self.agents.read().await;
        agents
            .get(agent_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(agent_id.to_string()))
    }

    async fn list_healthy_agents(&self) -> Vec<AgentRecord> {
        let agents = self.agents.read().await;
        agents
            .values()
            .filter(|a| a.status == AgentStatus::Healthy)
            .cloned()
            .collect()
    }

    async fn list_all_agents(&self) -> Vec<AgentRecord> {
        let agents = self.agents.read().await;
        agents.values().cloned().collect()
    }

    async fn get_stats(&self) -> RegistryStats {
        let agents = self.agents.read().await;
        let healthy = agents
            .values()
            .filter(|a| a.status == AgentStatus::Healthy)
            .count();
        RegistryStats {
            total: agents.len(),
            healthy,
        }
    }

    async fn record_success(&self, agent_id: &str) -> Result<()> {
        let mut agents = self.agents.write().await;
        let agent = agents
            .get_mut(agent_id)
            .ok_or_else(|| RegistryError::NotFound(agent_id.to_string()))?;

        agent.success_count += 1;
        agent.failure_count = 0;

        if agent.status == AgentStatus::HalfOpen
            && agent.success_count >= self.config.circuit_breaker.success_threshold
        {
            agent.status = AgentStatus::Healthy;
            agent.success_count = 0;
            agent.failure_count = 0;
            tracing::info!(agent_id = %agent_id, "Circuit breaker closed, agent recovered");
        }

        Ok(())
    }

    async fn record_failure(&self, agent_id: &str) -> Result<()> {
        let now = self.clock.now();
        let mut agents = self.agents.write().await;
        let agent = agents
            .get_mut(agent_id)
            .ok_or_else(|| RegistryError::NotFound(agent_id.to_string()))?;

        agent.failure_count += 1;
        agent.success_count = 0;
        agent.last_failure_time = Some(now);

        if agent.failure_count >= self.config.circuit_breaker.failure_threshold {
            agent.status = AgentStatus::Offline;
            agent.next_retry_time = Some(now + self.recovery_timeout);
            tracing::warn!(
                agent_id = %agent_id,
                failure_count = agent.failure_count,
                next_retry = %agent.next_retry_time.unwrap_or(now),
                "Circuit breaker opened, agent offline"
            );
        }

        Ok(())
    }

    async fn get_circuit_state(&self, agent_id: &str) -> Result<AgentStatus> {
        let agents = self.agents.read().await;
        agents
            .get(agent_id)
            .map(|a| a.status)
            .ok_or_else(|| RegistryError::NotFound(agent_id.to_string()))
    }
}
