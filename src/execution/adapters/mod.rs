//! Adapters implementing the execution ports.

pub mod memory;
mod templates;

pub use templates::{DEFAULT_EXECUTION_TEMPLATE, TemplatePromptBuilder};
