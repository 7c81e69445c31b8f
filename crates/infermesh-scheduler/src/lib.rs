//! Agent selection for the infermesh control plane.
//!
//! The scheduler is a pure decision function over a registry snapshot: given
//! a desired model it returns the best agent, or a typed failure. Two
//! implementations live behind the [`Scheduler`] trait:
//!
//! - [`McdaScheduler`] - weighted multi-criteria ranking over free VRAM,
//!   job load, network RTT, and historical throughput.
//! - [`RoundRobinScheduler`] - simple rotation, kept for deployments that
//!   want predictable spreading over clever placement.
//!
//! Neither blocks on I/O: both operate on defensive-copy snapshots taken
//! from the registry.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod estimate;
pub mod mcda;
pub mod round_robin;

pub use error::{Result, ScheduleError};
pub use estimate::estimated_vram_requirement;
pub use mcda::{AgentScore, McdaScheduler, McdaWeights, Scheduler};
pub use round_robin::RoundRobinScheduler;
