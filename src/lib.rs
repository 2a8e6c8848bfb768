//! Gropius: agent session orchestration for task execution.
//!
//! This crate drives AI coding-agent backends through a uniform session
//! interface and executes a task's subtasks unattended, one agent session
//! per subtask, with cooperative stop control.
//!
//! # Architecture
//!
//! Gropius follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (backends, stores)
//!
//! # Modules
//!
//! - [`session`]: Backend-agnostic agent sessions and the client registry
//! - [`execution`]: Runs working through a task's subtasks
//! - [`events`]: The in-process event bus transports subscribe to

pub mod events;
pub mod execution;
pub mod session;
