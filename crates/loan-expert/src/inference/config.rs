use serde::{Deserialize, Serialize};

use super::conflict::ConflictStrategy;
use super::trace::DEFAULT_TRACE_CAPACITY;

/// Which inference chains an evaluation runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainingMode {
    Forward,
    Backward,
    #[default]
    Both,
}

impl ChainingMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "forward" => Some(Self::Forward),
            "backward" => Some(Self::Backward),
            "both" => Some(Self::Both),
            _ => None,
        }
    }

    pub fn runs_forward(self) -> bool {
        matches!(self, Self::Forward | Self::Both)
    }

    pub fn runs_backward(self) -> bool {
        matches!(self, Self::Backward | Self::Both)
    }
}

/// Knobs fixed when the engine is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub chaining_mode: ChainingMode,
    pub conflict_strategy: ConflictStrategy,
    pub trace_capacity: usize,
    pub parallel_batch: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chaining_mode: ChainingMode::Both,
            conflict_strategy: ConflictStrategy::PrioritySpecificity,
            trace_capacity: DEFAULT_TRACE_CAPACITY,
            parallel_batch: true,
        }
    }
}
