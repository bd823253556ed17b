//! Liveness Analysis
//!
//! Backward dataflow over the CFG nodes of one function:
//!
//! - `OUT(N) = ∪ IN(S)` over the successors `S` of `N`
//! - `IN(N)` is `OUT(N)` pushed backward through the node, each instruction
//!   killing its results and then generating its local operands
//!
//! Sweeps repeat until no `IN` set changes. The per-instruction sets are then
//! recomputed from the final `OUT` sets.

use crate::cfg::{Cfg, CfgNodeId};
use iele_ir::{Context, InstId, LocalId};
use log::{debug, trace};
use std::collections::{BTreeSet, HashMap};

/// Locals live at a program point, in handle order
pub type LiveSet = BTreeSet<LocalId>;

#[derive(Debug, Clone, Default)]
pub struct Liveness {
    live_in: Vec<LiveSet>,
    live_out: Vec<LiveSet>,
    live_before: HashMap<InstId, LiveSet>,
    live_after: HashMap<InstId, LiveSet>,
    iterations: usize,
}

/// Push `live` backward across one instruction
fn transfer(ctx: &Context, inst: InstId, live: &mut LiveSet) {
    for result in ctx.results(inst) {
        live.remove(result);
    }
    for operand in ctx.operands(inst) {
        if let Some(local) = ctx.dyn_cast::<LocalId>(*operand) {
            live.insert(local);
        }
    }
}

impl Liveness {
    pub fn compute(ctx: &Context, cfg: &Cfg) -> Liveness {
        let count = cfg.len();
        let mut live_in = vec![LiveSet::new(); count];
        let mut live_out = vec![LiveSet::new(); count];

        let mut iterations = 0;
        loop {
            iterations += 1;
            let mut changed = false;

            for (id, node) in cfg.nodes() {
                let mut out = LiveSet::new();
                for successor in cfg.successors(id) {
                    out.extend(live_in[successor.0].iter().copied());
                }

                let mut live = out.clone();
                for &inst in node.instructions.iter().rev() {
                    transfer(ctx, inst, &mut live);
                }

                live_out[id.0] = out;
                if live != live_in[id.0] {
                    live_in[id.0] = live;
                    changed = true;
                }
            }

            if !changed {
                break;
            }
        }
        debug!(
            "liveness for '{}' converged after {} sweeps",
            ctx.name(cfg.function()),
            iterations
        );

        let mut live_before = HashMap::new();
        let mut live_after = HashMap::new();
        for (id, node) in cfg.nodes() {
            let mut live = live_out[id.0].clone();
            for &inst in node.instructions.iter().rev() {
                live_after.insert(inst, live.clone());
                transfer(ctx, inst, &mut live);
                live_before.insert(inst, live.clone());
            }
        }

        Liveness { live_in, live_out, live_before, live_after, iterations }
    }

    pub fn live_in(&self, node: CfgNodeId) -> &LiveSet {
        &self.live_in[node.0]
    }

    pub fn live_out(&self, node: CfgNodeId) -> &LiveSet {
        &self.live_out[node.0]
    }

    /// Locals live right before `inst`; `None` when it is in no CFG node
    pub fn live_before(&self, inst: InstId) -> Option<&LiveSet> {
        self.live_before.get(&inst)
    }

    /// Locals live right after `inst`; `None` when it is in no CFG node
    pub fn live_after(&self, inst: InstId) -> Option<&LiveSet> {
        self.live_after.get(&inst)
    }

    /// Whether any result of `inst` is read later on some path
    pub fn has_live_result(&self, ctx: &Context, inst: InstId) -> bool {
        match self.live_after(inst) {
            Some(live) => ctx.results(inst).iter().any(|result| live.contains(result)),
            None => false,
        }
    }

    /// Number of sweeps until the fixed point
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Log the per-node sets at trace level
    pub fn trace_sets(&self, ctx: &Context, cfg: &Cfg) {
        let names = |set: &LiveSet| -> String {
            set.iter().map(|local| ctx.name(*local)).collect::<Vec<_>>().join(", ")
        };
        for (id, _) in cfg.nodes() {
            trace!(
                "{}: IN {{{}}} OUT {{{}}}",
                cfg.node_name(ctx, id),
                names(&self.live_in[id.0]),
                names(&self.live_out[id.0])
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iele_ir::{FunctionId, Opcode};
    use pretty_assertions::assert_eq;

    fn function(ctx: &mut Context) -> FunctionId {
        let contract = ctx.create_contract("c").unwrap();
        ctx.create_function(false, "f", Some(contract)).unwrap()
    }

    #[test]
    fn test_straight_line() {
        let mut ctx = Context::new();
        let f = function(&mut ctx);
        let entry = ctx.create_block("entry", Some(f), None).unwrap();
        let a = ctx.create_argument("a", Some(f)).unwrap();
        let x = ctx.create_local_variable("x", Some(f)).unwrap();
        let y = ctx.create_local_variable("y", Some(f)).unwrap();
        let one = ctx.one();
        let def_x = ctx.create_binary_op(Opcode::Add, x, a, one, entry).unwrap();
        let def_y = ctx.create_binary_op(Opcode::Mul, y, x, x, entry).unwrap();
        let ret = ctx.create_ret(&[y.into()], entry).unwrap();

        let cfg = Cfg::build(&ctx, f).unwrap();
        let liveness = Liveness::compute(&ctx, &cfg);

        assert_eq!(liveness.live_before(def_x), Some(&LiveSet::from([a])));
        assert_eq!(liveness.live_after(def_x), Some(&LiveSet::from([x])));
        assert_eq!(liveness.live_after(def_y), Some(&LiveSet::from([y])));
        assert_eq!(liveness.live_after(ret), Some(&LiveSet::new()));
        assert!(liveness.has_live_result(&ctx, def_x));
    }

    #[test]
    fn test_loop_carries_liveness() {
        let mut ctx = Context::new();
        let f = function(&mut ctx);
        let entry = ctx.create_block("entry", Some(f), None).unwrap();
        let body = ctx.create_block("body", Some(f), None).unwrap();
        let exit = ctx.create_block("exit", Some(f), None).unwrap();
        let i = ctx.create_local_variable("i", Some(f)).unwrap();
        let c = ctx.create_local_variable("c", Some(f)).unwrap();
        let ten = ctx.int_constant(10);
        let one = ctx.one();
        let zero = ctx.zero();

        ctx.create_assign(i, zero, entry).unwrap();
        let inc = ctx.create_binary_op(Opcode::Add, i, i, one, body).unwrap();
        ctx.create_binary_op(Opcode::CmpLt, c, i, ten, body).unwrap();
        ctx.create_cond_br(c, body, body).unwrap();
        ctx.create_ret(&[i.into()], exit).unwrap();

        let cfg = Cfg::build(&ctx, f).unwrap();
        let liveness = Liveness::compute(&ctx, &cfg);
        let body_node = cfg.node_at(body, 0).unwrap();

        assert!(liveness.live_in(body_node).contains(&i));
        assert!(liveness.live_out(body_node).contains(&i));
        assert!(liveness.has_live_result(&ctx, inc));
        assert!(liveness.iterations() >= 2);
    }

    #[test]
    fn test_unreachable_tail_has_no_sets() {
        let mut ctx = Context::new();
        let f = function(&mut ctx);
        let entry = ctx.create_block("entry", Some(f), None).unwrap();
        let x = ctx.create_local_variable("x", Some(f)).unwrap();
        let one = ctx.one();
        ctx.create_ret_void(entry).unwrap();
        let dead = ctx.create_assign(x, one, entry).unwrap();

        let cfg = Cfg::build(&ctx, f).unwrap();
        let liveness = Liveness::compute(&ctx, &cfg);
        assert_eq!(liveness.live_after(dead), None);
        assert!(!liveness.has_live_result(&ctx, dead));
    }
}
