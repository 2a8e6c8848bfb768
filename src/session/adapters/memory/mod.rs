//! In-memory session adapters for tests and local development.

mod client;
mod factory;

pub use client::{DEFAULT_REPLY_PREFIX, InMemoryAgentClient, ScriptedReply, SessionGrant};
pub use factory::InMemoryClientFactory;
