//! Logging abstractions
//!
//! A small trait-object logger so every component can log without caring
//! which host process (agent server, benchmark harness, tests) it runs in.

mod console;
mod noop;
mod traits;

pub use console::ConsoleLogger;
pub use noop::NoOpLogger;
pub use traits::{Logger, SharedLogger};
