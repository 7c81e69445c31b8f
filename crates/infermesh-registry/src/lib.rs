//! Agent registry for the infermesh control plane.
//!
//! This crate is the single source of truth for the liveness and resource
//! state of all registered inference agents. It tracks three orthogonal
//! dimensions per agent and collapses them into one observable status:
//!
//! - **Liveness**: heartbeat recency; agents that miss heartbeats past the
//!   configured timeout are removed.
//! - **Health**: resource pressure reported by heartbeats moves agents
//!   between `Healthy` and `Degraded`.
//! - **Circuit**: repeated failures open a per-agent circuit breaker
//!   (`Offline`), which probes recovery through `HalfOpen`.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use infermesh_core::SystemClock;
//! use infermesh_registry::{
//!     AgentRegistration, InMemoryRegistry, Registry, RegistryConfig,
//! };
//!
//! # async fn example() -> infermesh_registry::Result<()> {
//! let registry = InMemoryRegistry::new(RegistryConfig::default(), Arc::new(SystemClock));
//!
//! registry
//!     .register(AgentRegistration {
//!         agent_id: "gpu-01".into(),
//!         endpoint: "10.0.0.5:9000".into(),
//!         total_vram_mb: 24_576,
//!         total_ram_mb: 65_536,
//!         max_jobs: 4,
//!         supported_models: vec!["llama3:7b".into()],
//!         capabilities: Default::default(),
//!     })
//!     .await?;
//!
//! let stats = registry.get_stats().await;
//! assert_eq!(stats.total, 1);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod memory;
pub mod types;

pub use error::{RegistryError, Result};
pub use memory::{InMemoryRegistry, Registry};
pub use types::{
    AgentRecord, AgentRegistration, AgentStatus, CircuitBreakerConfig, Heartbeat, RegistryConfig,
    RegistryStats,
};
