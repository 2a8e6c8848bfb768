//! Step definitions for execution run behaviour scenarios.

pub mod world;

mod given;
mod then;
mod when;
