//! Selection middleware
//!
//! Per-turn tool narrowing against the ranking oracle, plus transparent
//! timing and telemetry around every tool invocation.

mod selection;

pub use selection::{FallbackPolicy, RankingOutcome, SelectionMiddleware};
