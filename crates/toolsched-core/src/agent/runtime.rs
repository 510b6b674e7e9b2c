//! Model runtime seam
//!
//! The model is a black box: it takes the transcript so far plus the tool
//! descriptors it is allowed to see, and produces one turn (text, tool
//! calls, or both). The orchestrator owns the loop; the runtime owns one
//! turn.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{AgentMessage, ToolDescriptor, TurnOutput};

/// Model-runtime errors
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Model call failed: {0}")]
    ModelCallFailed(String),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// One model turn over the current transcript and visible tools
#[async_trait]
pub trait ModelRuntime: Send + Sync {
    /// Produce the next turn. `tools` is the filtered set for this turn only.
    async fn next_turn(
        &self,
        transcript: &[AgentMessage],
        tools: &[ToolDescriptor],
    ) -> RuntimeResult<TurnOutput>;
}

/// Scripted behavior for the test runtime
#[derive(Debug)]
pub enum ScriptMode {
    /// Play turns in order; after the last one, produce an empty final turn
    Sequence(Vec<TurnOutput>),
    /// Produce the same turn forever (budget tests)
    Repeat(TurnOutput),
    /// Fail every turn with this message
    Fail(String),
}

/// Deterministic runtime for tests
///
/// Records the tool ids visible on every turn so tests can assert what the
/// middleware exposed.
pub struct ScriptedRuntime {
    mode: Mutex<ScriptModeState>,
    seen_toolsets: Mutex<Vec<Vec<String>>>,
}

enum ScriptModeState {
    Sequence(VecDeque<TurnOutput>),
    Repeat(TurnOutput),
    Fail(String),
}

impl ScriptedRuntime {
    /// Create a runtime from a script mode
    pub fn new(mode: ScriptMode) -> Self {
        let state = match mode {
            ScriptMode::Sequence(turns) => ScriptModeState::Sequence(turns.into()),
            ScriptMode::Repeat(turn) => ScriptModeState::Repeat(turn),
            ScriptMode::Fail(message) => ScriptModeState::Fail(message),
        };
        Self {
            mode: Mutex::new(state),
            seen_toolsets: Mutex::new(Vec::new()),
        }
    }

    /// A runtime that immediately answers with fixed text
    pub fn answering(text: impl Into<String>) -> Self {
        Self::new(ScriptMode::Sequence(vec![TurnOutput::text(text)]))
    }

    /// Tool ids visible on each turn so far, in turn order
    pub fn seen_toolsets(&self) -> Vec<Vec<String>> {
        self.seen_toolsets.lock().unwrap().clone()
    }

    /// Number of turns taken so far
    pub fn turns_taken(&self) -> usize {
        self.seen_toolsets.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelRuntime for ScriptedRuntime {
    async fn next_turn(
        &self,
        _transcript: &[AgentMessage],
        tools: &[ToolDescriptor],
    ) -> RuntimeResult<TurnOutput> {
        self.seen_toolsets
            .lock()
            .unwrap()
            .push(tools.iter().map(|t| t.id.clone()).collect());

        let mut mode = self.mode.lock().unwrap();
        match &mut *mode {
            ScriptModeState::Sequence(turns) => Ok(turns.pop_front().unwrap_or_default()),
            ScriptModeState::Repeat(turn) => Ok(turn.clone()),
            ScriptModeState::Fail(message) => Err(RuntimeError::ModelCallFailed(message.clone())),
        }
    }
}
