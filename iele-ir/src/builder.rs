//! Instruction Factories
//!
//! Typed constructors for each instruction form. They fix the operand order
//! every pass relies on (for example, a branch target is always the last
//! operand) and funnel into [`Context::create_instruction`], which checks
//! counts and ownership.

use crate::context::Context;
use crate::handles::{BlockId, ContractId, FunctionId, InstId, LocalId, ValueId};
use crate::instruction::InsertPoint;
use crate::opcode::Opcode;
use iele_common::{IrError, IrResult};

/// Upper bound on indexed topics of a `log`
pub const MAX_LOG_TOPICS: usize = 4;

/// A call into another account's function
///
/// Results are laid out `[status, results...]` and operands
/// `[callee, address, transfer?, gas, args...]`; static calls carry no
/// transfer value.
#[derive(Debug, Clone, Copy)]
pub struct AccountCall<'a> {
    pub is_static: bool,
    pub status: LocalId,
    pub results: &'a [LocalId],
    pub callee: FunctionId,
    pub address: ValueId,
    pub transfer: Option<ValueId>,
    pub gas: ValueId,
    pub args: &'a [ValueId],
}

/// What a contract creation instantiates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationSource {
    /// A contract declared in this compilation
    Contract(ContractId),
    /// The code found at an account address
    Copy(ValueId),
}

/// Deploy a new contract account
///
/// Results are `[status, account]` and operands
/// `[contract-or-address, transfer, args...]`.
#[derive(Debug, Clone, Copy)]
pub struct ContractCreation<'a> {
    pub status: LocalId,
    pub result: LocalId,
    pub source: CreationSource,
    pub transfer: ValueId,
    pub args: &'a [ValueId],
}

impl Context {
    pub fn create_ret_void(&mut self, at: impl Into<InsertPoint>) -> IrResult<InstId> {
        self.create_instruction(Opcode::Ret, &[], &[], at)
    }

    pub fn create_ret(&mut self, values: &[ValueId], at: impl Into<InsertPoint>) -> IrResult<InstId> {
        self.create_instruction(Opcode::Ret, &[], values, at)
    }

    pub fn create_revert(&mut self, status: impl Into<ValueId>, at: impl Into<InsertPoint>) -> IrResult<InstId> {
        self.create_instruction(Opcode::Revert, &[], &[status.into()], at)
    }

    pub fn create_selfdestruct(
        &mut self,
        beneficiary: impl Into<ValueId>,
        at: impl Into<InsertPoint>,
    ) -> IrResult<InstId> {
        self.create_instruction(Opcode::Selfdestruct, &[], &[beneficiary.into()], at)
    }

    pub fn create_uncond_br(&mut self, target: BlockId, at: impl Into<InsertPoint>) -> IrResult<InstId> {
        self.create_instruction(Opcode::Br, &[], &[target.into()], at)
    }

    /// Branch to `target` when `condition` is non-zero; operands are `[condition, target]`
    pub fn create_cond_br(
        &mut self,
        condition: impl Into<ValueId>,
        target: BlockId,
        at: impl Into<InsertPoint>,
    ) -> IrResult<InstId> {
        self.create_instruction(Opcode::Br, &[], &[condition.into(), target.into()], at)
    }

    pub fn create_assign(
        &mut self,
        result: LocalId,
        rhs: impl Into<ValueId>,
        at: impl Into<InsertPoint>,
    ) -> IrResult<InstId> {
        self.create_instruction(Opcode::Assign, &[result], &[rhs.into()], at)
    }

    pub fn create_unary_op(
        &mut self,
        opcode: Opcode,
        result: LocalId,
        operand: impl Into<ValueId>,
        at: impl Into<InsertPoint>,
    ) -> IrResult<InstId> {
        if !opcode.is_unary_op() {
            return Err(IrError::malformed_instruction(format!("'{}' is not a unary operation", opcode)));
        }
        self.create_instruction(opcode, &[result], &[operand.into()], at)
    }

    pub fn create_binary_op(
        &mut self,
        opcode: Opcode,
        result: LocalId,
        lhs: impl Into<ValueId>,
        rhs: impl Into<ValueId>,
        at: impl Into<InsertPoint>,
    ) -> IrResult<InstId> {
        if !opcode.is_binary_op() {
            return Err(IrError::malformed_instruction(format!("'{}' is not a binary operation", opcode)));
        }
        self.create_instruction(opcode, &[result], &[lhs.into(), rhs.into()], at)
    }

    pub fn create_ternary_op(
        &mut self,
        opcode: Opcode,
        result: LocalId,
        operands: [ValueId; 3],
        at: impl Into<InsertPoint>,
    ) -> IrResult<InstId> {
        if !opcode.is_ternary_op() {
            return Err(IrError::malformed_instruction(format!("'{}' is not a ternary operation", opcode)));
        }
        self.create_instruction(opcode, &[result], &operands, at)
    }

    pub fn create_sload(
        &mut self,
        result: LocalId,
        address: impl Into<ValueId>,
        at: impl Into<InsertPoint>,
    ) -> IrResult<InstId> {
        self.create_instruction(Opcode::SLoad, &[result], &[address.into()], at)
    }

    /// Operands are `[value, address]`
    pub fn create_sstore(
        &mut self,
        value: impl Into<ValueId>,
        address: impl Into<ValueId>,
        at: impl Into<InsertPoint>,
    ) -> IrResult<InstId> {
        self.create_instruction(Opcode::SStore, &[], &[value.into(), address.into()], at)
    }

    pub fn create_load(
        &mut self,
        result: LocalId,
        address: impl Into<ValueId>,
        at: impl Into<InsertPoint>,
    ) -> IrResult<InstId> {
        self.create_instruction(Opcode::Load, &[result], &[address.into()], at)
    }

    /// Load `width` bytes at `offset` of a memory cell
    pub fn create_load_slice(
        &mut self,
        result: LocalId,
        address: impl Into<ValueId>,
        offset: impl Into<ValueId>,
        width: impl Into<ValueId>,
        at: impl Into<InsertPoint>,
    ) -> IrResult<InstId> {
        let operands = [address.into(), offset.into(), width.into()];
        self.create_instruction(Opcode::Load, &[result], &operands, at)
    }

    pub fn create_store(
        &mut self,
        value: impl Into<ValueId>,
        address: impl Into<ValueId>,
        at: impl Into<InsertPoint>,
    ) -> IrResult<InstId> {
        self.create_instruction(Opcode::Store, &[], &[value.into(), address.into()], at)
    }

    pub fn create_store_slice(
        &mut self,
        value: impl Into<ValueId>,
        address: impl Into<ValueId>,
        offset: impl Into<ValueId>,
        width: impl Into<ValueId>,
        at: impl Into<InsertPoint>,
    ) -> IrResult<InstId> {
        let operands = [value.into(), address.into(), offset.into(), width.into()];
        self.create_instruction(Opcode::Store, &[], &operands, at)
    }

    /// Emit a log entry; operands are `[data, topics...]`
    pub fn create_log(
        &mut self,
        data: impl Into<ValueId>,
        topics: &[ValueId],
        at: impl Into<InsertPoint>,
    ) -> IrResult<InstId> {
        if topics.len() > MAX_LOG_TOPICS {
            return Err(IrError::malformed_instruction(format!(
                "'log' takes at most {} topics, got {}",
                MAX_LOG_TOPICS,
                topics.len()
            )));
        }
        let mut operands = Vec::with_capacity(topics.len() + 1);
        operands.push(data.into());
        operands.extend_from_slice(topics);
        self.create_instruction(Opcode::Log, &[], &operands, at)
    }

    /// Call a function of the current contract; operands are `[callee, args...]`
    pub fn create_internal_call(
        &mut self,
        results: &[LocalId],
        callee: FunctionId,
        args: &[ValueId],
        at: impl Into<InsertPoint>,
    ) -> IrResult<InstId> {
        let mut operands = Vec::with_capacity(args.len() + 1);
        operands.push(callee.into());
        operands.extend_from_slice(args);
        self.create_instruction(Opcode::Call, results, &operands, at)
    }

    pub fn create_account_call(&mut self, call: &AccountCall<'_>, at: impl Into<InsertPoint>) -> IrResult<InstId> {
        let opcode = if call.is_static { Opcode::StaticCallAt } else { Opcode::CallAt };
        let mut operands = Vec::with_capacity(call.args.len() + 4);
        operands.push(call.callee.into());
        operands.push(call.address);
        match (call.is_static, call.transfer) {
            (false, Some(transfer)) => operands.push(transfer),
            (true, None) => {}
            (true, Some(_)) => {
                return Err(IrError::malformed_instruction("a static call cannot transfer value"))
            }
            (false, None) => {
                return Err(IrError::malformed_instruction("an account call needs a transfer value"))
            }
        }
        operands.push(call.gas);
        operands.extend_from_slice(call.args);

        let mut results = Vec::with_capacity(call.results.len() + 1);
        results.push(call.status);
        results.extend_from_slice(call.results);
        self.create_instruction(opcode, &results, &operands, at)
    }

    /// Take the address of a function for a later account call
    pub fn create_call_address(
        &mut self,
        result: LocalId,
        callee: FunctionId,
        address: impl Into<ValueId>,
        at: impl Into<InsertPoint>,
    ) -> IrResult<InstId> {
        self.create_instruction(Opcode::CallAddress, &[result], &[callee.into(), address.into()], at)
    }

    pub fn create_contract_creation(
        &mut self,
        creation: &ContractCreation<'_>,
        at: impl Into<InsertPoint>,
    ) -> IrResult<InstId> {
        let (opcode, source) = match creation.source {
            CreationSource::Contract(contract) => (Opcode::Create, ValueId::from(contract)),
            CreationSource::Copy(address) => (Opcode::CopyCreate, address),
        };
        let mut operands = Vec::with_capacity(creation.args.len() + 2);
        operands.push(source);
        operands.push(creation.transfer);
        operands.extend_from_slice(creation.args);
        self.create_instruction(opcode, &[creation.status, creation.result], &operands, at)
    }

    /// Call an `iele.*` intrinsic, optionally keeping its result
    pub fn create_intrinsic_call(
        &mut self,
        opcode: Opcode,
        result: Option<LocalId>,
        args: &[ValueId],
        at: impl Into<InsertPoint>,
    ) -> IrResult<InstId> {
        if !opcode.is_intrinsic() {
            return Err(IrError::malformed_instruction(format!("'{}' is not an intrinsic", opcode)));
        }
        let results: Vec<LocalId> = result.into_iter().collect();
        self.create_instruction(opcode, &results, args, at)
    }
}
