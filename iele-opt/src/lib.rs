//! IELE IR - Optimization
//!
//! Control flow graph construction, liveness analysis and the liveness-based
//! dead code elimination pass, preceded by block-local copy propagation.

pub mod cfg;
pub mod copy_propagation;
pub mod dce;
pub mod liveness;
pub mod stats;

pub use cfg::{Cfg, CfgNode, CfgNodeId};
pub use copy_propagation::{propagate_copies, CopyPropagationStats};
pub use dce::{eliminate_dead_code, may_have_side_effects, optimize_function};
pub use liveness::{LiveSet, Liveness};
pub use stats::{FunctionStatistics, PassStatistics};

use iele_ir::{Context, ContractId, IrResult};
use log::info;

/// Options for the optimizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizerOptions {
    pub copy_propagation: bool,
    pub dead_code_elimination: bool,
    pub trace_liveness: bool,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        Self {
            copy_propagation: true,
            dead_code_elimination: true,
            trace_liveness: false,
        }
    }
}

/// Run copy propagation and dead code elimination over every function of `contract`
pub fn run_liveness_and_dead_code_elimination(ctx: &mut Context, contract: ContractId) -> IrResult<PassStatistics> {
    run_liveness_and_dead_code_elimination_with_options(ctx, contract, &OptimizerOptions::default())
}

/// Run the pass with options
pub fn run_liveness_and_dead_code_elimination_with_options(
    ctx: &mut Context,
    contract: ContractId,
    options: &OptimizerOptions,
) -> IrResult<PassStatistics> {
    let mut stats = PassStatistics { contract: ctx.name(contract).to_string(), functions: Vec::new() };
    let functions: Vec<_> = ctx.functions(contract).collect();
    for function in functions {
        stats.functions.push(optimize_function(ctx, function, options)?);
    }
    info!(
        "dead code elimination on '{}': {} instructions erased in {} functions",
        stats.contract,
        stats.dead_instructions_erased(),
        stats.functions.len()
    );
    Ok(stats)
}
