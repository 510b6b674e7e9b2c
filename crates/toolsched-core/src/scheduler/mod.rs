//! Ranking-oracle client
//!
//! The oracle is an external collaborator consumed over three HTTP-shaped
//! operations: register, search, log. This module implements the protocol
//! and nothing of the ranking itself.

mod client;
mod types;

pub use client::{SchedulerApi, SchedulerClient, SchedulerError, SchedulerResult};
pub use types::{LogRequest, RankedToolRef, RegisterRequest, RegisterResponse};
