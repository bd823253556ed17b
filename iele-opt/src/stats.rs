//! Pass statistics, serializable for tooling that tracks optimizer output

use serde::{Deserialize, Serialize};

/// Per-function counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionStatistics {
    pub function: String,
    pub cfg_nodes: usize,
    pub cfg_edges: usize,
    pub liveness_iterations: usize,
    pub operands_rewritten: usize,
    pub self_copies_erased: usize,
    pub dead_instructions_erased: usize,
}

/// Counters for one run over a contract
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassStatistics {
    pub contract: String,
    pub functions: Vec<FunctionStatistics>,
}

impl PassStatistics {
    pub fn dead_instructions_erased(&self) -> usize {
        self.functions.iter().map(|f| f.dead_instructions_erased).sum()
    }

    pub fn operands_rewritten(&self) -> usize {
        self.functions.iter().map(|f| f.operands_rewritten).sum()
    }

    pub fn self_copies_erased(&self) -> usize {
        self.functions.iter().map(|f| f.self_copies_erased).sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
