//! Execution bounded context: unattended runs over a task's subtasks.
//!
//! Organised hexagonally:
//!
//! - `domain`: runs, subtasks, and their lifecycle rules
//! - `ports`: traits the services depend on (store, prompt builder)
//! - `adapters`: in-memory store and template prompt builder
//! - `services`: the run state machine itself

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
