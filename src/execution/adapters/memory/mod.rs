//! In-memory execution adapters for tests and local development.

mod store;

pub use store::InMemoryExecutionStore;
