//! Instructions
//!
//! Instructions live in their own arena and are threaded through their block
//! as an intrusive doubly-linked list, so inserting and erasing in the middle
//! of a block never moves other instructions. Results are always locals;
//! operands may be any value.

use crate::context::Context;
use crate::handles::{BlockId, FunctionId, InstId, LocalId, ValueId};
use crate::opcode::Opcode;
use crate::value::{InstructionList, ValueData, ValueKind};
use iele_common::{IrError, IrResult};
use log::trace;
use std::ops::Range;

#[derive(Debug, Clone)]
pub(crate) struct InstructionData {
    pub opcode: Opcode,
    pub results: Vec<LocalId>,
    pub operands: Vec<ValueId>,
    pub parent: Option<BlockId>,
    pub prev: Option<InstId>,
    pub next: Option<InstId>,
}

/// Where a new or re-inserted instruction goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPoint {
    /// Immediately before an instruction that already sits in a block
    Before(InstId),
    /// After the last instruction of a block
    AtEnd(BlockId),
}

impl From<BlockId> for InsertPoint {
    fn from(block: BlockId) -> Self {
        InsertPoint::AtEnd(block)
    }
}

impl From<InstId> for InsertPoint {
    fn from(inst: InstId) -> Self {
        InsertPoint::Before(inst)
    }
}

/// Iterator over the instructions of a block, front to back
pub struct Instructions<'a> {
    ctx: &'a Context,
    next: Option<InstId>,
}

impl Iterator for Instructions<'_> {
    type Item = InstId;

    fn next(&mut self) -> Option<InstId> {
        let current = self.next?;
        self.next = self.ctx.inst(current).next;
        Some(current)
    }
}

impl Context {
    /// # Panics
    ///
    /// Panics on an erased instruction or one from another context.
    pub(crate) fn inst(&self, inst: InstId) -> &InstructionData {
        match self.instructions.get(inst.index as usize) {
            Some(Some(data)) if inst.context == self.id() => data,
            _ => panic!("instruction {} is erased or belongs to another context", inst),
        }
    }

    fn inst_mut(&mut self, inst: InstId) -> &mut InstructionData {
        let id = self.id();
        match self.instructions.get_mut(inst.index as usize) {
            Some(Some(data)) if inst.context == id => data,
            _ => panic!("instruction {} is erased or belongs to another context", inst),
        }
    }

    pub(crate) fn try_inst(&self, inst: InstId) -> IrResult<&InstructionData> {
        if self.owns_instruction(inst) {
            Ok(self.inst(inst))
        } else {
            Err(IrError::ownership(format!(
                "instruction {} is erased or belongs to another context",
                inst
            )))
        }
    }

    fn block_list(&self, block: BlockId) -> InstructionList {
        match &self.slot(block.0).data {
            ValueData::Block(data) => data.instructions,
            _ => unreachable!("block handle to a non-block value"),
        }
    }

    fn block_list_mut(&mut self, block: BlockId) -> &mut InstructionList {
        match &mut self.slot_mut(block.0).data {
            ValueData::Block(data) => &mut data.instructions,
            _ => unreachable!("block handle to a non-block value"),
        }
    }

    // === Queries ===
    //
    // The instruction queries below panic on an erased instruction or one
    // from another context; see `owns_instruction`.

    /// # Panics
    ///
    /// Panics if `inst` was erased or created by another context.
    pub fn opcode(&self, inst: InstId) -> Opcode {
        self.inst(inst).opcode
    }

    /// # Panics
    ///
    /// Panics if `inst` was erased or created by another context.
    pub fn operands(&self, inst: InstId) -> &[ValueId] {
        &self.inst(inst).operands
    }

    pub fn operand(&self, inst: InstId, index: usize) -> Option<ValueId> {
        self.inst(inst).operands.get(index).copied()
    }

    /// Locals written by the instruction
    ///
    /// # Panics
    ///
    /// Panics if `inst` was erased or created by another context.
    pub fn results(&self, inst: InstId) -> &[LocalId] {
        &self.inst(inst).results
    }

    pub fn instruction_parent(&self, inst: InstId) -> Option<BlockId> {
        self.inst(inst).parent
    }

    pub fn next_instruction(&self, inst: InstId) -> Option<InstId> {
        self.inst(inst).next
    }

    pub fn prev_instruction(&self, inst: InstId) -> Option<InstId> {
        self.inst(inst).prev
    }

    pub fn first_instruction(&self, block: BlockId) -> Option<InstId> {
        self.block_list(block).head
    }

    pub fn last_instruction(&self, block: BlockId) -> Option<InstId> {
        self.block_list(block).tail
    }

    pub fn instruction_count(&self, block: BlockId) -> usize {
        self.block_list(block).len
    }

    pub fn instructions(&self, block: BlockId) -> Instructions<'_> {
        Instructions { ctx: self, next: self.block_list(block).head }
    }

    pub fn is_conditional_branch(&self, inst: InstId) -> bool {
        let data = self.inst(inst);
        data.opcode == Opcode::Br && data.operands.len() == 2
    }

    /// An unconditional branch, a return or a revert
    pub fn is_unconditional_terminator(&self, inst: InstId) -> bool {
        let data = self.inst(inst);
        match data.opcode {
            Opcode::Br => data.operands.len() == 1,
            Opcode::Ret | Opcode::Revert => true,
            _ => false,
        }
    }

    /// Target block of a branch, which is always its last operand
    pub fn branch_target(&self, inst: InstId) -> Option<BlockId> {
        let data = self.inst(inst);
        if data.opcode != Opcode::Br {
            return None;
        }
        data.operands.last().and_then(|target| self.dyn_cast::<BlockId>(*target))
    }

    pub fn ends_with_ret(&self, block: BlockId) -> bool {
        self.last_instruction(block)
            .is_some_and(|last| self.opcode(last) == Opcode::Ret)
    }

    // === Construction and placement ===

    /// Create an instruction and place it at `at`
    ///
    /// Result and operand counts are checked against the opcode, and a
    /// branch's last operand must be a block.
    pub fn create_instruction(
        &mut self,
        opcode: Opcode,
        results: &[LocalId],
        operands: &[ValueId],
        at: impl Into<InsertPoint>,
    ) -> IrResult<InstId> {
        for value in results.iter().map(|r| r.0).chain(operands.iter().copied()) {
            self.check_value(value)?;
        }
        self.check_shape(opcode, results.len(), operands)?;

        let index = self.instructions.len() as u32;
        let inst = InstId { context: self.id(), index };
        self.instructions.push(Some(InstructionData {
            opcode,
            results: results.to_vec(),
            operands: operands.to_vec(),
            parent: None,
            prev: None,
            next: None,
        }));
        if let Err(err) = self.link(inst, at.into()) {
            self.instructions[index as usize] = None;
            return Err(err);
        }
        trace!("created {} instruction {}", opcode, inst);
        Ok(inst)
    }

    fn check_shape(&self, opcode: Opcode, results: usize, operands: &[ValueId]) -> IrResult<()> {
        let shape = opcode.shape();
        if !shape.results.accepts(results) {
            return Err(IrError::malformed_instruction(format!(
                "'{}' takes {} results, got {}",
                opcode, shape.results, results
            )));
        }
        if !shape.operands.accepts(operands.len()) {
            return Err(IrError::malformed_instruction(format!(
                "'{}' takes {} operands, got {}",
                opcode,
                shape.operands,
                operands.len()
            )));
        }
        if opcode == Opcode::Br {
            if let Some(target) = operands.last() {
                if self.kind(*target) != ValueKind::Block {
                    return Err(IrError::malformed_instruction("branch target must be a block"));
                }
            }
        }
        Ok(())
    }

    /// Place a detached instruction at `at`
    pub fn insert_instruction(&mut self, inst: InstId, at: impl Into<InsertPoint>) -> IrResult<()> {
        self.link(inst, at.into())
    }

    /// Detach an instruction from its block, keeping it alive for re-insertion
    pub fn remove_from_parent(&mut self, inst: InstId) -> IrResult<()> {
        self.unlink(inst).map(|_| ())
    }

    /// Detach and destroy an instruction
    ///
    /// Returns the instruction that followed it, for cursor-style loops.
    pub fn erase_from_parent(&mut self, inst: InstId) -> IrResult<Option<InstId>> {
        let next = self.try_inst(inst)?.next;
        self.unlink(inst)?;
        self.instructions[inst.index as usize] = None;
        trace!("erased instruction {}", inst);
        Ok(next)
    }

    /// Replace one operand in place
    pub fn set_operand(&mut self, inst: InstId, index: usize, value: impl Into<ValueId>) -> IrResult<()> {
        let value = value.into();
        self.check_value(value)?;
        let data = self.try_inst(inst)?;
        let opcode = data.opcode;
        let count = data.operands.len();
        if index >= count {
            return Err(IrError::malformed_instruction(format!(
                "operand index {} out of range for '{}' with {} operands",
                index, opcode, count
            )));
        }
        if opcode == Opcode::Br && index + 1 == count && self.kind(value) != ValueKind::Block {
            return Err(IrError::malformed_instruction("branch target must be a block"));
        }
        if let Some(function) = data.parent.and_then(|block| self.parent_function(block)) {
            self.check_member(value, function, opcode)?;
        }
        self.inst_mut(inst).operands[index] = value;
        Ok(())
    }

    /// Move the instructions at positions `range` of `from` to `at`
    pub fn transfer_instructions(
        &mut self,
        from: BlockId,
        range: Range<usize>,
        at: impl Into<InsertPoint>,
    ) -> IrResult<()> {
        self.check_value(from.0)?;
        let at = at.into();
        let (to, _) = self.resolve_insert_point(at)?;
        let moved: Vec<InstId> = self
            .instructions(from)
            .skip(range.start)
            .take(range.end.saturating_sub(range.start))
            .collect();
        if range.start > range.end || moved.len() != range.len() {
            return Err(IrError::ownership(format!(
                "transfer range {:?} out of bounds for a block of {} instructions",
                range,
                self.instruction_count(from)
            )));
        }
        if let InsertPoint::Before(before) = at {
            if moved.contains(&before) {
                return Err(IrError::ownership("insertion point lies inside the moved range"));
            }
        }

        // Blocks of the same function share a symbol table, nothing to revalidate
        let source_function = self.parent_function(from);
        let destination_function = self.parent_function(to);
        if source_function != destination_function {
            if let Some(function) = destination_function {
                for inst in &moved {
                    self.validate_instruction_members(*inst, function)?;
                }
            }
        }

        for inst in &moved {
            self.unlink(*inst)?;
            self.link_unchecked(*inst, at)?;
        }
        Ok(())
    }

    fn resolve_insert_point(&self, at: InsertPoint) -> IrResult<(BlockId, Option<InstId>)> {
        match at {
            InsertPoint::AtEnd(block) => {
                self.check_value(block.0)?;
                Ok((block, None))
            }
            InsertPoint::Before(before) => match self.try_inst(before)?.parent {
                Some(block) => Ok((block, Some(before))),
                None => Err(IrError::ownership(format!(
                    "insertion point {} is not in a block",
                    before
                ))),
            },
        }
    }

    fn link(&mut self, inst: InstId, at: InsertPoint) -> IrResult<()> {
        let (block, _) = self.resolve_insert_point(at)?;
        if self.try_inst(inst)?.parent.is_some() {
            return Err(IrError::ownership(format!("instruction {} already belongs to a block", inst)));
        }
        if let Some(function) = self.parent_function(block) {
            self.validate_instruction_members(inst, function)?;
        }
        self.link_unchecked(inst, at)
    }

    fn link_unchecked(&mut self, inst: InstId, at: InsertPoint) -> IrResult<()> {
        let (block, before) = self.resolve_insert_point(at)?;
        let prev = match before {
            Some(before) => self.inst(before).prev,
            None => self.block_list(block).tail,
        };
        {
            let data = self.inst_mut(inst);
            data.parent = Some(block);
            data.prev = prev;
            data.next = before;
        }
        match prev {
            Some(prev) => self.inst_mut(prev).next = Some(inst),
            None => self.block_list_mut(block).head = Some(inst),
        }
        match before {
            Some(before) => self.inst_mut(before).prev = Some(inst),
            None => self.block_list_mut(block).tail = Some(inst),
        }
        self.block_list_mut(block).len += 1;
        Ok(())
    }

    fn unlink(&mut self, inst: InstId) -> IrResult<BlockId> {
        let data = self.try_inst(inst)?;
        let Some(block) = data.parent else {
            return Err(IrError::ownership(format!("instruction {} has no parent block", inst)));
        };
        let (prev, next) = (data.prev, data.next);
        match prev {
            Some(prev) => self.inst_mut(prev).next = next,
            None => self.block_list_mut(block).head = next,
        }
        match next {
            Some(next) => self.inst_mut(next).prev = prev,
            None => self.block_list_mut(block).tail = prev,
        }
        self.block_list_mut(block).len -= 1;
        let data = self.inst_mut(inst);
        data.parent = None;
        data.prev = None;
        data.next = None;
        Ok(block)
    }

    // === Ownership validation ===

    fn check_member(&self, value: ValueId, function: FunctionId, opcode: Opcode) -> IrResult<()> {
        let kind = self.kind(value);
        let function_local = matches!(kind, ValueKind::LocalVariable | ValueKind::Argument | ValueKind::Block);
        if function_local && self.parent(value) != Some(function.0) {
            return Err(IrError::ownership(format!(
                "{} '{}' used by '{}' does not belong to function '{}'",
                kind,
                self.name(value),
                opcode,
                self.name(function)
            )));
        }
        Ok(())
    }

    fn validate_instruction_members(&self, inst: InstId, function: FunctionId) -> IrResult<()> {
        let data = self.inst(inst);
        for result in &data.results {
            self.check_member(result.0, function, data.opcode)?;
        }
        for operand in &data.operands {
            self.check_member(*operand, function, data.opcode)?;
        }
        Ok(())
    }

    /// Every instruction of `block` may be moved into `function`
    pub(crate) fn validate_block_members(&self, block: BlockId, function: FunctionId) -> IrResult<()> {
        for inst in self.instructions(block) {
            self.validate_instruction_members(inst, function)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iele_common::ErrorKind;
    use pretty_assertions::assert_eq;

    struct Fixture {
        ctx: Context,
        function: FunctionId,
        entry: BlockId,
        x: LocalId,
        y: LocalId,
    }

    fn fixture() -> Fixture {
        let mut ctx = Context::new();
        let contract = ctx.create_contract("c").unwrap();
        let function = ctx.create_function(false, "f", Some(contract)).unwrap();
        let entry = ctx.create_block("entry", Some(function), None).unwrap();
        let x = ctx.create_local_variable("x", Some(function)).unwrap();
        let y = ctx.create_local_variable("y", Some(function)).unwrap();
        Fixture { ctx, function, entry, x, y }
    }

    #[test]
    fn test_append_and_insert_before() {
        let Fixture { mut ctx, entry, x, y, .. } = fixture();
        let one = ctx.one();
        let first = ctx.create_assign(x, one, entry).unwrap();
        let ret = ctx.create_ret(&[y.into()], entry).unwrap();
        let middle = ctx.create_assign(y, x, ret).unwrap();

        assert_eq!(ctx.instructions(entry).collect::<Vec<_>>(), vec![first, middle, ret]);
        assert_eq!(ctx.instruction_count(entry), 3);
        assert_eq!(ctx.prev_instruction(ret), Some(middle));
        assert_eq!(ctx.instruction_parent(middle), Some(entry));
        assert!(ctx.ends_with_ret(entry));
    }

    #[test]
    fn test_erase_returns_next() {
        let Fixture { mut ctx, entry, x, y, .. } = fixture();
        let one = ctx.one();
        let a = ctx.create_assign(x, one, entry).unwrap();
        let b = ctx.create_assign(y, x, entry).unwrap();
        assert_eq!(ctx.erase_from_parent(a).unwrap(), Some(b));
        assert_eq!(ctx.erase_from_parent(b).unwrap(), None);
        assert_eq!(ctx.instruction_count(entry), 0);
        assert_eq!(ctx.first_instruction(entry), None);
        assert_eq!(ctx.last_instruction(entry), None);
        assert!(!ctx.owns_instruction(a));
        assert_eq!(ctx.erase_from_parent(a).unwrap_err().kind(), ErrorKind::OwnershipViolation);
    }

    #[test]
    #[should_panic(expected = "is erased or belongs to another context")]
    fn test_query_on_erased_instruction_panics() {
        let Fixture { mut ctx, entry, x, .. } = fixture();
        let one = ctx.one();
        let a = ctx.create_assign(x, one, entry).unwrap();
        ctx.erase_from_parent(a).unwrap();
        ctx.opcode(a);
    }

    #[test]
    fn test_remove_and_reinsert() {
        let Fixture { mut ctx, entry, x, y, .. } = fixture();
        let one = ctx.one();
        let a = ctx.create_assign(x, one, entry).unwrap();
        let b = ctx.create_assign(y, x, entry).unwrap();
        ctx.remove_from_parent(a).unwrap();
        assert_eq!(ctx.instruction_parent(a), None);
        ctx.insert_instruction(a, entry).unwrap();
        assert_eq!(ctx.instructions(entry).collect::<Vec<_>>(), vec![b, a]);
        assert!(ctx.remove_from_parent(a).is_ok());
        assert!(ctx.remove_from_parent(a).is_err());
    }

    #[test]
    fn test_operand_from_other_function_rejected() {
        let Fixture { mut ctx, entry, x, .. } = fixture();
        let contract = ctx.create_contract("other").unwrap();
        let g = ctx.create_function(false, "g", Some(contract)).unwrap();
        let foreign = ctx.create_local_variable("z", Some(g)).unwrap();
        let err = ctx.create_assign(x, foreign, entry).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OwnershipViolation);
        assert_eq!(ctx.instruction_count(entry), 0);
    }

    #[test]
    fn test_detached_block_defers_validation() {
        let Fixture { mut ctx, function, x, .. } = fixture();
        let contract = ctx.create_contract("other").unwrap();
        let g = ctx.create_function(false, "g", Some(contract)).unwrap();
        let foreign = ctx.create_local_variable("z", Some(g)).unwrap();

        let loose = ctx.create_block("loose", None, None).unwrap();
        ctx.create_assign(x, foreign, loose).unwrap();
        let err = ctx.insert_block_into(loose, function, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OwnershipViolation);
        assert_eq!(ctx.parent(loose), None);
        assert_eq!(ctx.blocks(function).count(), 1);
    }

    #[test]
    fn test_shape_violations() {
        let Fixture { mut ctx, entry, x, y, .. } = fixture();
        let err = ctx
            .create_instruction(Opcode::Add, &[x], &[y.into()], entry)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInstruction);

        let err = ctx
            .create_instruction(Opcode::Br, &[], &[x.into()], entry)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInstruction);
    }

    #[test]
    fn test_set_operand() {
        let Fixture { mut ctx, entry, x, y, .. } = fixture();
        let one = ctx.one();
        let add = ctx.create_binary_op(Opcode::Add, x, y, one, entry).unwrap();
        ctx.set_operand(add, 1, x).unwrap();
        assert_eq!(ctx.operands(add).to_vec(), vec![ValueId::from(y), ValueId::from(x)]);
        assert_eq!(ctx.set_operand(add, 2, x).unwrap_err().kind(), ErrorKind::MalformedInstruction);
    }

    #[test]
    fn test_transfer_instructions_between_blocks() {
        let Fixture { mut ctx, function, entry, x, y } = fixture();
        let exit = ctx.create_block("exit", Some(function), None).unwrap();
        let one = ctx.one();
        let a = ctx.create_assign(x, one, entry).unwrap();
        let b = ctx.create_assign(y, x, entry).unwrap();
        let ret = ctx.create_ret_void(exit).unwrap();

        ctx.transfer_instructions(entry, 0..2, ret).unwrap();
        assert_eq!(ctx.instruction_count(entry), 0);
        assert_eq!(ctx.instructions(exit).collect::<Vec<_>>(), vec![a, b, ret]);
        assert_eq!(ctx.instruction_parent(a), Some(exit));
    }
}
