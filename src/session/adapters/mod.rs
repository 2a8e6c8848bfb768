//! Adapters implementing the session ports.

mod control;
pub mod memory;

pub use control::{
    PAUSE_CONTROL_MESSAGE, RESUME_CONTROL_MESSAGE, STOP_CONTROL_MESSAGE, SimulatedControlClient,
};
