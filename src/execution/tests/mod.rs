//! Unit tests for the execution module.
//!
//! Tests are organised by concept: the run and subtask state machines, the
//! in-memory store and its patch types, prompt rendering, and the execution
//! service driving full runs.
