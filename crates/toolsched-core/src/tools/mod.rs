//! Tool registry
//!
//! One addressable collection of every tool the session's providers expose.

mod registry;

pub use registry::{RegisteredTool, RegistryError, RegistryResult, ToolRegistry};
