//! Control Flow Graph
//!
//! IELE blocks may contain conditional branches in the middle, so a block is
//! split into straight-line nodes: each node runs up to and including a
//! maximal streak of conditional branches, or up to an unconditional
//! terminator. Instructions after an unconditional terminator are
//! unreachable and belong to no node.
//!
//! Edges come from branch targets (always the last operand) and from
//! fall-through into the next node or the next block.

use iele_ir::{BlockId, Context, FunctionId, InstId, IrError, IrResult, Opcode};
use log::{debug, trace};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::ops::Range;

/// Index of a node in its [`Cfg`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CfgNodeId(pub usize);

/// A straight-line slice of one block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfgNode {
    pub block: BlockId,
    /// Position of the first instruction within the block
    pub start: usize,
    /// Position of the last instruction within the block, inclusive
    pub end: usize,
    /// The covered instructions, front to back; empty only for an empty block
    pub instructions: Vec<InstId>,
}

impl CfgNode {
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn last_instruction(&self) -> Option<InstId> {
        self.instructions.last().copied()
    }
}

#[derive(Debug, Clone)]
pub struct Cfg {
    function: FunctionId,
    nodes: Vec<CfgNode>,
    successors: Vec<BTreeSet<CfgNodeId>>,
    predecessors: Vec<BTreeSet<CfgNodeId>>,
    by_position: HashMap<(BlockId, usize), CfgNodeId>,
    /// Node indices of each block, in function order
    by_block: Vec<(BlockId, Range<usize>)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BranchKind {
    Conditional,
    Unconditional,
}

/// Classify a `br`; any other operand count is malformed
fn branch_kind(ctx: &Context, inst: InstId) -> IrResult<Option<BranchKind>> {
    if ctx.opcode(inst) != Opcode::Br {
        return Ok(None);
    }
    match ctx.operands(inst).len() {
        1 => Ok(Some(BranchKind::Unconditional)),
        2 => Ok(Some(BranchKind::Conditional)),
        n => Err(IrError::malformed_instruction(format!("'br' with {} operands", n))),
    }
}

fn is_conditional_branch(ctx: &Context, inst: InstId) -> IrResult<bool> {
    Ok(branch_kind(ctx, inst)? == Some(BranchKind::Conditional))
}

fn is_unconditional_terminator(ctx: &Context, inst: InstId) -> IrResult<bool> {
    match ctx.opcode(inst) {
        Opcode::Ret | Opcode::Revert => Ok(true),
        Opcode::Br => Ok(branch_kind(ctx, inst)? == Some(BranchKind::Unconditional)),
        _ => Ok(false),
    }
}

impl Cfg {
    /// Build the graph of `function`
    pub fn build(ctx: &Context, function: FunctionId) -> IrResult<Cfg> {
        let mut cfg = Cfg {
            function,
            nodes: Vec::new(),
            successors: Vec::new(),
            predecessors: Vec::new(),
            by_position: HashMap::new(),
            by_block: Vec::new(),
        };

        for block in ctx.blocks(function) {
            let first = cfg.nodes.len();
            cfg.split_block(ctx, block)?;
            cfg.by_block.push((block, first..cfg.nodes.len()));
        }
        for position in 0..cfg.by_block.len() {
            let (block, nodes) = cfg.by_block[position].clone();
            let next_block = cfg.by_block.get(position + 1).map(|(next, _)| *next);
            cfg.connect_block(ctx, block, nodes, next_block)?;
        }

        debug!(
            "built CFG for '{}': {} nodes, {} edges",
            ctx.name(function),
            cfg.nodes.len(),
            cfg.edge_count()
        );
        Ok(cfg)
    }

    fn add_node(&mut self, block: BlockId, instructions: &[InstId], start: usize, end: usize) {
        let id = CfgNodeId(self.nodes.len());
        let covered = if instructions.is_empty() {
            Vec::new()
        } else {
            instructions[start..=end].to_vec()
        };
        trace!("CFG node {:?}: block {} [{}..={}]", id, block, start, end);
        self.nodes.push(CfgNode { block, start, end, instructions: covered });
        self.successors.push(BTreeSet::new());
        self.predecessors.push(BTreeSet::new());
        self.by_position.insert((block, start), id);
    }

    fn split_block(&mut self, ctx: &Context, block: BlockId) -> IrResult<()> {
        let instructions: Vec<InstId> = ctx.instructions(block).collect();
        if instructions.is_empty() {
            self.add_node(block, &instructions, 0, 0);
            return Ok(());
        }

        let len = instructions.len();
        let mut start = 0;
        let mut index = 0;
        while index < len {
            while index < len && !ctx.opcode(instructions[index]).is_terminator() {
                index += 1;
            }
            while index < len && is_conditional_branch(ctx, instructions[index])? {
                index += 1;
            }

            if index == len {
                self.add_node(block, &instructions, start, index - 1);
            } else if !ctx.opcode(instructions[index]).is_terminator() {
                // a run of conditional branches followed by more code
                self.add_node(block, &instructions, start, index - 1);
                start = index;
            } else {
                // the remaining terminator is unconditional
                self.add_node(block, &instructions, start, index);
                if index + 1 < len {
                    trace!(
                        "{} unreachable instructions after terminator in '{}'",
                        len - index - 1,
                        ctx.name(block)
                    );
                }
                break;
            }
        }
        Ok(())
    }

    fn add_edge(&mut self, from: CfgNodeId, to: CfgNodeId) {
        self.successors[from.0].insert(to);
        self.predecessors[to.0].insert(from);
    }

    fn connect_block(
        &mut self,
        ctx: &Context,
        block: BlockId,
        nodes: Range<usize>,
        next_block: Option<BlockId>,
    ) -> IrResult<()> {
        let block_len = ctx.instruction_count(block);
        for id in nodes.map(CfgNodeId) {
            let node = self.nodes[id.0].clone();

            for &inst in node.instructions.iter().rev() {
                if ctx.opcode(inst) != Opcode::Br {
                    break;
                }
                branch_kind(ctx, inst)?;
                let target = ctx.branch_target(inst).ok_or_else(|| {
                    IrError::malformed_instruction(format!(
                        "branch in '{}' does not target a block",
                        ctx.name(block)
                    ))
                })?;
                let successor = self.by_position.get(&(target, 0)).copied().ok_or_else(|| {
                    IrError::unresolved_control_flow(format!(
                        "branch in '{}' targets '{}', which is not a block of '{}'",
                        ctx.name(block),
                        ctx.name(target),
                        ctx.name(self.function)
                    ))
                })?;
                self.add_edge(id, successor);
            }

            let falls_through = match node.last_instruction() {
                None => true,
                Some(last) => !is_unconditional_terminator(ctx, last)?,
            };
            if falls_through {
                let following = if !node.is_empty() && node.end + 1 < block_len {
                    self.by_position.get(&(block, node.end + 1)).copied()
                } else {
                    next_block.and_then(|next| self.by_position.get(&(next, 0)).copied())
                };
                if let Some(following) = following {
                    self.add_edge(id, following);
                }
            }
        }
        Ok(())
    }

    pub fn function(&self) -> FunctionId {
        self.function
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: CfgNodeId) -> &CfgNode {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (CfgNodeId, &CfgNode)> + '_ {
        self.nodes.iter().enumerate().map(|(index, node)| (CfgNodeId(index), node))
    }

    /// Node starting at `start` in `block`
    pub fn node_at(&self, block: BlockId, start: usize) -> Option<CfgNodeId> {
        self.by_position.get(&(block, start)).copied()
    }

    /// Nodes of `block`, front to back; none when `block` is not in the function
    pub fn block_nodes(&self, block: BlockId) -> impl Iterator<Item = CfgNodeId> {
        self.by_block
            .iter()
            .find(|(candidate, _)| *candidate == block)
            .map(|(_, nodes)| nodes.clone())
            .unwrap_or_default()
            .map(CfgNodeId)
    }

    /// Node holding the first instruction of the function's first block
    pub fn entry(&self) -> Option<CfgNodeId> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(CfgNodeId(0))
        }
    }

    pub fn successors(&self, id: CfgNodeId) -> &BTreeSet<CfgNodeId> {
        &self.successors[id.0]
    }

    pub fn predecessors(&self, id: CfgNodeId) -> &BTreeSet<CfgNodeId> {
        &self.predecessors[id.0]
    }

    pub fn edge_count(&self) -> usize {
        self.successors.iter().map(BTreeSet::len).sum()
    }

    /// Display name of a node: `<block>_<start>`
    pub fn node_name(&self, ctx: &Context, id: CfgNodeId) -> String {
        let node = &self.nodes[id.0];
        format!("{}_{}", ctx.name(node.block), node.start)
    }

    pub fn display<'a>(&'a self, ctx: &'a Context) -> DisplayCfg<'a> {
        DisplayCfg { cfg: self, ctx }
    }
}

pub struct DisplayCfg<'a> {
    cfg: &'a Cfg,
    ctx: &'a Context,
}

impl fmt::Display for DisplayCfg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (cfg, ctx) = (self.cfg, self.ctx);
        writeln!(f, "CFG for function {}:", ctx.name(cfg.function))?;
        for (id, _) in cfg.nodes() {
            writeln!(f, "  {}", cfg.node_name(ctx, id))?;
            let successors: Vec<String> = cfg.successors(id).iter().map(|s| cfg.node_name(ctx, *s)).collect();
            writeln!(f, "    -> {}", successors.join(", "))?;
            let predecessors: Vec<String> =
                cfg.predecessors(id).iter().map(|p| cfg.node_name(ctx, *p)).collect();
            writeln!(f, "    <- {}", predecessors.join(", "))?;
        }
        Ok(())
    }
}
