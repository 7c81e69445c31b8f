//! Control-plane surface for the infermesh inference mesh.
//!
//! Clients ask the coordinator where to run an inference; the coordinator
//! picks the best agent, mints a signed session capability, and returns the
//! agent's direct endpoint. Inference traffic then flows client-to-agent;
//! the coordinator never proxies or observes it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   POST /v1/inference    ┌──────────────────────────────┐
//! │  Client  │────────────────────────▶│     infermesh-coordinator    │
//! └────┬─────┘   endpoint + token      │  ┌─────────┐  ┌───────────┐  │
//!      │                               │  │Scheduler│  │  Signing  │  │
//!      │ direct stream (out of scope)  │  │ (MCDA)  │  │ authority │  │
//!      ▼                               │  └────┬────┘  └───────────┘  │
//! ┌──────────┐  register / heartbeats  │       ▼                      │
//! │  Agent   │◀───────────────────────▶│   Agent registry             │
//! └──────────┘   ws acks / public key  └──────────────────────────────┘
//! ```
//!
//! Two listeners are served from one state: the control router (agents and
//! routing clients) and a small REST-compatible client router.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod tokens;

pub use config::CoordinatorConfig;
pub use error::ApiError;
pub use routes::{client_router, control_router};
pub use state::CoordinatorState;
pub use tokens::TokenIndex;
