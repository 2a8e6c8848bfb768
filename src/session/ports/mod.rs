//! Port definitions for the session subsystem.

mod client;
mod factory;

pub use client::{AgentClient, ClientError, ClientResult, NewSessionSpec, SessionQuery};
pub use factory::{BackendConfig, ClientFactory};
