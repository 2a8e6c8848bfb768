//! Unit tests for the session module.
//!
//! Tests are organised by concept: domain state machines, the scope codec,
//! the in-memory backend, the simulated control overlay, the client
//! registry, and the session service.

mod client_tests;
