//! Dead Code Elimination
//!
//! Erases instructions none of whose results is live afterwards. Calls and
//! intrinsics are always kept, as are instructions that may throw at run time
//! (division by zero, oversized exponents and widths) and instructions without
//! results.

use crate::cfg::Cfg;
use crate::copy_propagation::propagate_copies;
use crate::liveness::Liveness;
use crate::stats::FunctionStatistics;
use crate::OptimizerOptions;
use iele_ir::{BlockId, Context, FunctionId, InstId, IrResult, Opcode};
use log::{debug, trace};

/// Opcodes kept even when their result is unused
pub fn may_have_side_effects(opcode: Opcode) -> bool {
    opcode.is_call()
        || opcode.is_intrinsic()
        || matches!(
            opcode,
            Opcode::Div
                | Opcode::Mod
                | Opcode::Exp
                | Opcode::AddMod
                | Opcode::MulMod
                | Opcode::ExpMod
                | Opcode::Log2
                | Opcode::SExt
                | Opcode::BSwap
        )
}

fn is_removable(ctx: &Context, liveness: &Liveness, inst: InstId) -> bool {
    if may_have_side_effects(ctx.opcode(inst)) || ctx.results(inst).is_empty() {
        return false;
    }
    !liveness.has_live_result(ctx, inst)
}

/// Erase dead instructions of `function` according to `liveness`
///
/// Instructions outside every CFG node are unreachable and count as dead.
pub fn eliminate_dead_code(ctx: &mut Context, function: FunctionId, liveness: &Liveness) -> IrResult<usize> {
    let blocks: Vec<BlockId> = ctx.blocks(function).collect();
    let mut erased = 0;
    for block in blocks {
        let mut cursor = ctx.first_instruction(block);
        while let Some(inst) = cursor {
            if is_removable(ctx, liveness, inst) {
                trace!("erasing dead '{}'", ctx.display_instruction(inst));
                cursor = ctx.erase_from_parent(inst)?;
                erased += 1;
            } else {
                cursor = ctx.next_instruction(inst);
            }
        }
    }
    Ok(erased)
}

/// Copy propagation, liveness and dead code elimination over one function
pub fn optimize_function(
    ctx: &mut Context,
    function: FunctionId,
    options: &OptimizerOptions,
) -> IrResult<FunctionStatistics> {
    let mut stats = FunctionStatistics { function: ctx.name(function).to_string(), ..Default::default() };

    if options.copy_propagation {
        let blocks: Vec<BlockId> = ctx.blocks(function).collect();
        for block in blocks {
            let copies = propagate_copies(ctx, block)?;
            stats.operands_rewritten += copies.operands_rewritten;
            stats.self_copies_erased += copies.self_copies_erased;
        }
    }

    let cfg = Cfg::build(ctx, function)?;
    stats.cfg_nodes = cfg.len();
    stats.cfg_edges = cfg.edge_count();
    if options.trace_liveness {
        trace!("{}", cfg.display(ctx));
    }

    let liveness = Liveness::compute(ctx, &cfg);
    stats.liveness_iterations = liveness.iterations();
    if options.trace_liveness {
        liveness.trace_sets(ctx, &cfg);
    }

    if options.dead_code_elimination {
        stats.dead_instructions_erased = eliminate_dead_code(ctx, function, &liveness)?;
    }

    debug!(
        "optimized '{}': {} operands forwarded, {} self-copies and {} dead instructions erased",
        stats.function, stats.operands_rewritten, stats.self_copies_erased, stats.dead_instructions_erased
    );
    Ok(stats)
}
