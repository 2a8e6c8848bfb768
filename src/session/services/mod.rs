//! Application services for the session subsystem.

mod registry;
mod sessions;

pub use registry::{ClientRegistry, RegistryError};
pub use sessions::{SessionService, SessionServiceError};
