//! Agent sessions: backend clients, scope codec, and session control.
//!
//! A session is a conversation with one coding-agent backend. This module
//! owns the uniform client surface over those backends, the codec that
//! embeds orchestration scope into backend-persisted metadata, the lazy
//! client registry, and the gateway service that publishes lifecycle
//! events around every session operation.
//!
//! The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port definitions in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Application services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
