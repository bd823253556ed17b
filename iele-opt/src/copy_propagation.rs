//! Copy Propagation
//!
//! Block-local forwarding of `%dst = %src` copies. Later reads of `%dst` in
//! the same block are rewritten to read `%src` until either local is
//! redefined. Self-copies are erased. Repeats until the block is stable.

use iele_ir::{BlockId, Context, InstId, IrResult, LocalId, Opcode, ValueId};
use log::trace;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyPropagationStats {
    /// Operands rewritten from the copy's destination to its source
    pub operands_rewritten: usize,
    /// `%x = %x` copies erased
    pub self_copies_erased: usize,
}

/// The `(dst, src)` pair of a local-to-local copy
fn local_copy(ctx: &Context, inst: InstId) -> Option<(LocalId, LocalId)> {
    if ctx.opcode(inst) != Opcode::Assign {
        return None;
    }
    let dst = ctx.results(inst).first().copied()?;
    let src = ctx.operands(inst).first().copied()?;
    Some((dst, ctx.dyn_cast::<LocalId>(src)?))
}

/// Forward the copy at `copy` into the rest of its block
fn forward_copy(
    ctx: &mut Context,
    copy: InstId,
    dst: LocalId,
    src: LocalId,
    stats: &mut CopyPropagationStats,
) -> IrResult<bool> {
    let mut changed = false;
    let mut cursor = ctx.next_instruction(copy);
    while let Some(inst) = cursor {
        let targets: Vec<usize> = ctx
            .operands(inst)
            .iter()
            .enumerate()
            .filter(|(_, operand)| **operand == ValueId::from(dst))
            .map(|(index, _)| index)
            .collect();
        for index in targets {
            ctx.set_operand(inst, index, src)?;
            stats.operands_rewritten += 1;
            changed = true;
        }

        // an instruction may read the old value and redefine it at once
        if ctx.results(inst).iter().any(|result| *result == dst || *result == src) {
            break;
        }
        cursor = ctx.next_instruction(inst);
    }
    Ok(changed)
}

fn propagate_once(ctx: &mut Context, block: BlockId, stats: &mut CopyPropagationStats) -> IrResult<bool> {
    let mut changed = false;
    let mut cursor = ctx.first_instruction(block);
    while let Some(inst) = cursor {
        let Some((dst, src)) = local_copy(ctx, inst) else {
            cursor = ctx.next_instruction(inst);
            continue;
        };

        if dst == src {
            trace!("erasing self-copy of %{}", ctx.name(dst));
            cursor = ctx.erase_from_parent(inst)?;
            stats.self_copies_erased += 1;
            changed = true;
            continue;
        }

        if forward_copy(ctx, inst, dst, src, stats)? {
            trace!("forwarded %{} = %{}", ctx.name(dst), ctx.name(src));
            changed = true;
        }
        cursor = ctx.next_instruction(inst);
    }
    Ok(changed)
}

/// Run copy propagation on one block until nothing changes
pub fn propagate_copies(ctx: &mut Context, block: BlockId) -> IrResult<CopyPropagationStats> {
    let mut stats = CopyPropagationStats::default();
    while propagate_once(ctx, block, &mut stats)? {}
    Ok(stats)
}
